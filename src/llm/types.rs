//! Common types for LLM interactions

/// LLM request
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system: Vec<SystemContent>,
    pub messages: Vec<LlmMessage>,
    pub max_tokens: Option<u32>,
    /// Ask the provider for a JSON-only body where the API supports it
    pub json_output: bool,
}

/// System prompt content
#[derive(Debug, Clone)]
pub struct SystemContent {
    pub text: String,
}

impl SystemContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// User turn sent to the model
#[derive(Debug, Clone)]
pub struct LlmMessage {
    pub text: String,
}

impl LlmMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// LLM response
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    /// Text parts in the order the provider returned them
    pub parts: Vec<String>,
    pub usage: Usage,
}

impl LlmResponse {
    /// Convenience constructor for a single text part
    #[allow(dead_code)] // Used by test mocks
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![text.into()],
            usage: Usage::default(),
        }
    }

    /// Get text content from the response
    pub fn text(&self) -> String {
        self.parts.join("")
    }
}

/// Usage statistics
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
