//! LLM provider abstraction
//!
//! Provides a common interface for the text-generation backends used by the
//! extraction adapter.

mod anthropic;
mod error;
mod gemini;
mod models;
mod registry;
mod types;

pub use anthropic::AnthropicService;
pub use error::{LlmError, LlmErrorKind};
pub use gemini::GeminiService;
pub use models::{all_models, ModelDef, Provider};
pub use registry::{LlmConfig, ModelRegistry};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Wraps a provider and records one structured log line per call
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let started = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let elapsed_ms = started.elapsed().as_millis();

        match &result {
            Ok(response) => tracing::info!(
                model = %self.model_id,
                duration_ms = %elapsed_ms,
                json_output = request.json_output,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "LLM request completed"
            ),
            // Callers decide whether a failure is fatal; extraction absorbs them
            Err(e) => tracing::warn!(
                model = %self.model_id,
                duration_ms = %elapsed_ms,
                kind = ?e.kind,
                retryable = e.kind.is_retryable(),
                error = %e.message,
                "LLM request failed"
            ),
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
