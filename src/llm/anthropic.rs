//! Anthropic Claude provider implementation

use super::types::{LlmMessage, LlmRequest, LlmResponse, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Anthropic model variants
#[derive(Debug, Clone, Copy)]
pub enum AnthropicModel {
    Claude45Haiku,
    Claude45Sonnet,
}

impl AnthropicModel {
    pub fn api_name(self) -> &'static str {
        match self {
            AnthropicModel::Claude45Haiku => "claude-haiku-4-5-20251001",
            AnthropicModel::Claude45Sonnet => "claude-sonnet-4-5-20250929",
        }
    }

    pub fn model_id(self) -> &'static str {
        match self {
            AnthropicModel::Claude45Haiku => "claude-4.5-haiku",
            AnthropicModel::Claude45Sonnet => "claude-4.5-sonnet",
        }
    }
}

/// Anthropic service implementation
pub struct AnthropicService {
    client: Client,
    api_key: String,
    model: AnthropicModel,
    base_url: String,
    model_id: String,
}

impl AnthropicService {
    pub fn new(
        api_key: String,
        model: AnthropicModel,
        gateway: Option<&str>,
    ) -> Result<Self, LlmError> {
        let base_url = match gateway {
            Some(gw) => format!("{}/_/gateway/anthropic/v1/messages", gw.trim_end_matches('/')),
            None => "https://api.anthropic.com/v1/messages".to_string(),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url,
            model_id: model.model_id().to_string(),
        })
    }

    fn translate_request(&self, request: &LlmRequest) -> AnthropicRequest {
        let system = request
            .system
            .iter()
            .map(|s| AnthropicSystemBlock {
                r#type: "text".to_string(),
                text: s.text.clone(),
            })
            .collect();

        let messages = request.messages.iter().map(translate_message).collect();

        AnthropicRequest {
            model: self.model.api_name().to_string(),
            max_tokens: request.max_tokens.unwrap_or(1024),
            temperature: 0.0,
            system,
            messages,
        }
    }

    fn normalize_response(resp: AnthropicResponse) -> LlmResponse {
        let parts = resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
                AnthropicContentBlock::Other => None,
            })
            .collect();

        LlmResponse {
            parts,
            usage: Usage {
                input_tokens: resp.usage.input_tokens,
                output_tokens: resp.usage.output_tokens,
            },
        }
    }

    fn classify_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        let err = LlmError::from_status(status.as_u16(), body);
        if status.as_u16() != 429 {
            return err;
        }
        // Try to parse retry-after from response
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|parsed| parsed.get("error")?.get("retry_after")?.as_f64())
            .map_or(err, |secs| {
                LlmError::from_status(429, body).with_retry_after(Duration::from_secs_f64(secs))
            })
    }
}

fn translate_message(msg: &LlmMessage) -> AnthropicMessage {
    AnthropicMessage {
        role: "user".to_string(),
        content: vec![AnthropicContentBlock::Text {
            text: msg.text.clone(),
        }],
    }
}

#[async_trait]
impl LlmService for AnthropicService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let anthropic_request = self.translate_request(request);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&anthropic_request)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::classify_error(status, &body));
        }

        let anthropic_response: AnthropicResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Ok(Self::normalize_response(anthropic_response))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: Vec<AnthropicSystemBlock>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicSystemBlock {
    r#type: String,
    text: String,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    /// Thinking or tool blocks; never requested, skipped if present
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}
