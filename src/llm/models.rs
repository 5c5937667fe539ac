//! Centralized model definitions for all LLM providers
//!
//! Adding a model means adding one entry here; the registry picks it up.

use super::anthropic::AnthropicModel;
use super::gemini::GeminiModel;
use super::{AnthropicService, GeminiService, LlmService};
use std::sync::Arc;

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Gemini,
    Anthropic,
}

impl Provider {
    /// Get the environment variable name for this provider's API key
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID (e.g., "gemini-2.5-flash")
    pub id: &'static str,
    /// Provider for this model
    pub provider: Provider,
    /// Factory function to create the service
    pub factory: fn(&str, Option<&str>) -> Result<Arc<dyn LlmService>, String>,
}

fn gemini(model: GeminiModel, api_key: &str, gateway: Option<&str>) -> Result<Arc<dyn LlmService>, String> {
    if api_key.is_empty() {
        return Err(format!(
            "{} requires {} or gateway",
            model.model_id(),
            Provider::Gemini.api_key_env_var()
        ));
    }
    let service = GeminiService::new(api_key.to_string(), model, gateway).map_err(|e| e.message)?;
    Ok(Arc::new(service))
}

fn anthropic(
    model: AnthropicModel,
    api_key: &str,
    gateway: Option<&str>,
) -> Result<Arc<dyn LlmService>, String> {
    if api_key.is_empty() {
        return Err(format!(
            "{} requires {} or gateway",
            model.model_id(),
            Provider::Anthropic.api_key_env_var()
        ));
    }
    let service =
        AnthropicService::new(api_key.to_string(), model, gateway).map_err(|e| e.message)?;
    Ok(Arc::new(service))
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gemini-2.5-flash",
            provider: Provider::Gemini,
            factory: |api_key, gateway| gemini(GeminiModel::Gemini25Flash, api_key, gateway),
        },
        ModelDef {
            id: "gemini-2.5-pro",
            provider: Provider::Gemini,
            factory: |api_key, gateway| gemini(GeminiModel::Gemini25Pro, api_key, gateway),
        },
        ModelDef {
            id: "claude-4.5-haiku",
            provider: Provider::Anthropic,
            factory: |api_key, gateway| anthropic(AnthropicModel::Claude45Haiku, api_key, gateway),
        },
        ModelDef {
            id: "claude-4.5-sonnet",
            provider: Provider::Anthropic,
            factory: |api_key, gateway| anthropic(AnthropicModel::Claude45Sonnet, api_key, gateway),
        },
    ]
}
