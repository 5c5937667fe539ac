//! API request and response types

use serde::{Deserialize, Serialize};

/// Inbound WhatsApp webhook form. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
pub struct WhatsAppWebhook {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "ProfileName")]
    pub profile_name: Option<String>,
}

impl WhatsAppWebhook {
    /// Sender with the channel prefix removed
    pub fn sender(&self) -> &str {
        let from = self.from.trim();
        from.strip_prefix("whatsapp:").unwrap_or(from)
    }
}

/// Request to handle a message through the JSON endpoint
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub sender: String,
    pub text: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Reply for the JSON endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub reply: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
