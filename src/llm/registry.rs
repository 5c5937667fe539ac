//! Model registry for managing available LLM providers

use super::{all_models, LlmService, LoggingService, Provider};
use std::collections::HashMap;
use std::sync::Arc;

/// Model used when nothing else is configured
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for LLM providers
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub gemini_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    /// Gateway base URL; when set every model is created with implicit auth
    pub gateway: Option<String>,
    /// Model ID used for extraction
    pub default_model: Option<String>,
}

impl LlmConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            gemini_api_key: lookup("GEMINI_API_KEY").or_else(|| lookup("GOOGLE_API_KEY")),
            anthropic_api_key: lookup("ANTHROPIC_API_KEY"),
            gateway: lookup("LLM_GATEWAY"),
            default_model: lookup("EXTRACTION_MODEL"),
        }
    }
}

/// Registry of available LLM models
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    pub fn new(config: &LlmConfig) -> Self {
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();

        for model_def in all_models() {
            if let Some(service) = Self::try_create_model(model_def, config) {
                services.insert(model_def.id.to_string(), service);
            }
        }

        let default_model = config
            .default_model
            .clone()
            .or_else(|| {
                if services.contains_key(DEFAULT_MODEL) {
                    Some(DEFAULT_MODEL.to_string())
                } else {
                    // Deterministic pick among whatever is available
                    let mut ids: Vec<_> = services.keys().cloned().collect();
                    ids.sort();
                    ids.into_iter().next()
                }
            })
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self {
            services,
            default_model,
        }
    }

    /// Try to create a model service, validating prerequisites
    fn try_create_model(
        model_def: &super::ModelDef,
        config: &LlmConfig,
    ) -> Option<Arc<dyn LlmService>> {
        // The gateway handles authentication itself
        let api_key = if config.gateway.is_some() {
            "implicit".to_string()
        } else {
            match model_def.provider {
                Provider::Gemini => config.gemini_api_key.as_ref()?,
                Provider::Anthropic => config.anthropic_api_key.as_ref()?,
            }
            .clone()
        };

        if config.gateway.is_none() && api_key.is_empty() {
            return None;
        }

        match (model_def.factory)(&api_key, config.gateway.as_deref()) {
            Ok(service) => Some(Arc::new(LoggingService::new(service))),
            Err(e) => {
                tracing::warn!(model = model_def.id, error = %e, "Skipping model");
                None
            }
        }
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Get the default model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.get(&self.default_model)
    }

    /// Get the default model ID
    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }

    /// Check if any models are available
    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }
}
