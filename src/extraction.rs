//! Event extraction using an LLM
//!
//! Turns a free-text message into an [`EventCandidate`]. The call is total:
//! provider errors, timeouts and unusable output all come back as a
//! low-confidence candidate that asks the user to rephrase.

mod parse;

pub use parse::parse_candidate;

use crate::llm::{LlmError, LlmErrorKind, LlmMessage, LlmRequest, LlmResponse, SystemContent};
use crate::runtime::LlmClient;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Candidates at or above this score may be saved without asking again
pub const CONFIDENCE_THRESHOLD: f64 = 0.6;

pub const FALLBACK_QUESTION: &str =
    "I'm having trouble understanding. Could you be more specific?";

const MAX_RESPONSE_TOKENS: u32 = 512;

/// Longest provider-requested back-off honoured before giving up
const MAX_RETRY_WAIT: Duration = Duration::from_secs(5);

const EXTRACTION_PROMPT: &str = r#"You are an expert event parser specializing in meeting schedules. Extract the event described in the user's message and return ONLY valid JSON, with no markdown and no explanation.

Meeting links: if the message contains a complete URL (anything starting with http:// or https://) or a meeting link such as zoom.us/..., meet.google.com/... or teams.microsoft.com/..., put the entire link in "location", never in "notes".

Response format:
{
    "title": "Event title",
    "datetime": "YYYY-MM-DD HH:MM:SS, or null if unknown",
    "location": "Physical address or meeting link, or null",
    "notes": "Extra details such as meeting ID, passcode or instructions, or null",
    "confidence": 0.0 to 1.0,
    "needs_clarification": true or false,
    "clarification_question": "One short question for the user, or null"
}

Rules:
- If no time is given, use 12:00:00 (midday).
- If no date is given, use the soonest future date consistent with any weekday or relative term in the message.
- Lower the confidence and ask a clarification question when the title or the day cannot be determined."#;

/// Structured event proposal produced by the extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCandidate {
    pub title: Option<String>,
    pub datetime: Option<DateTime<FixedOffset>>,
    pub location: Option<String>,
    pub notes: Option<String>,
    /// Always within [0, 1]
    pub confidence: f64,
    pub needs_clarification: bool,
    pub clarification_question: Option<String>,
}

impl EventCandidate {
    /// Candidate returned whenever extraction fails
    pub fn fallback() -> Self {
        Self {
            title: None,
            datetime: None,
            location: None,
            notes: None,
            confidence: 0.0,
            needs_clarification: true,
            clarification_question: Some(FALLBACK_QUESTION.to_string()),
        }
    }

    /// Whether this candidate can go straight to validation and storage
    pub fn is_confident(&self) -> bool {
        self.confidence >= CONFIDENCE_THRESHOLD && !self.needs_clarification
    }
}

/// Extraction adapter around an LLM client
pub struct EventExtractor<L: LlmClient> {
    llm: Arc<L>,
    timeout: Duration,
}

impl<L: LlmClient> EventExtractor<L> {
    pub fn new(llm: L, timeout: Duration) -> Self {
        Self {
            llm: Arc::new(llm),
            timeout,
        }
    }

    /// Extract an event from a single message
    pub async fn extract(&self, text: &str, now: DateTime<FixedOffset>) -> EventCandidate {
        self.extract_with_history(text, &[], now).await
    }

    /// Extract an event, giving the model earlier messages of the same dialog
    pub async fn extract_with_history(
        &self,
        text: &str,
        history: &[String],
        now: DateTime<FixedOffset>,
    ) -> EventCandidate {
        let request = build_request(text, history, now);

        match timeout(self.timeout, self.complete_with_retry(&request)).await {
            Ok(Ok(response)) => match parse_candidate(&response.text(), *now.offset()) {
                Ok(candidate) => {
                    tracing::debug!(
                        confidence = candidate.confidence,
                        needs_clarification = candidate.needs_clarification,
                        has_datetime = candidate.datetime.is_some(),
                        "Extraction parsed"
                    );
                    candidate
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Extraction output unusable");
                    EventCandidate::fallback()
                }
            },
            Ok(Err(e)) => {
                tracing::warn!(error = %e.message, kind = ?e.kind, "Extraction LLM error");
                EventCandidate::fallback()
            }
            Err(_) => {
                tracing::warn!(timeout_secs = self.timeout.as_secs(), "Extraction timed out");
                EventCandidate::fallback()
            }
        }
    }

    /// One call, retried once when the provider asks for a short back-off.
    /// The whole exchange still runs under the extraction timeout.
    async fn complete_with_retry(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match self.llm.complete(request).await {
            Err(e) if e.kind == LlmErrorKind::RateLimit => match e.retry_after {
                Some(wait) if wait <= MAX_RETRY_WAIT => {
                    tracing::info!(wait_ms = %wait.as_millis(), "Extraction rate limited, retrying");
                    tokio::time::sleep(wait).await;
                    self.llm.complete(request).await
                }
                _ => Err(e),
            },
            other => other,
        }
    }
}

/// Build the extraction request for `text` as seen at `now`
pub fn build_request(text: &str, history: &[String], now: DateTime<FixedOffset>) -> LlmRequest {
    let context = format!(
        "Context:\n- Today: {} ({})\n- Current time: {}\n- UTC offset: {}",
        now.format("%Y-%m-%d"),
        now.format("%A"),
        now.format("%H:%M:%S"),
        now.format("%:z"),
    );

    let mut message = String::new();
    if !history.is_empty() {
        message.push_str("Earlier messages in this conversation:\n");
        for turn in history {
            let _ = writeln!(message, "- {turn}");
        }
        message.push('\n');
    }
    let _ = write!(message, "User message: {text}");

    LlmRequest {
        system: vec![
            SystemContent::new(EXTRACTION_PROMPT),
            SystemContent::new(context),
        ],
        messages: vec![LlmMessage::user(message)],
        max_tokens: Some(MAX_RESPONSE_TOKENS),
        json_output: true,
    }
}
