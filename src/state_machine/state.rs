//! Dialog state types

use crate::extraction::EventCandidate;
use serde::{Deserialize, Serialize};

/// Most recent user messages kept for re-extraction context
pub const MAX_DIALOG_TURNS: usize = 6;

/// Per-user event creation dialog
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogState {
    /// No dialog in progress
    #[default]
    Idle,

    /// Last extraction was uncertain; waiting for the user's answer
    AwaitingClarification {
        candidate: EventCandidate,
        /// User messages of this dialog, oldest first
        turns: Vec<String>,
    },

    /// Stored dialog that this version cannot interpret
    #[serde(other)]
    Unrecognized,
}

impl DialogState {
    /// Start or extend a clarification dialog
    pub fn awaiting(candidate: EventCandidate, prior_turns: &[String], message: &str) -> Self {
        let mut turns = prior_turns.to_vec();
        turns.push(message.to_string());
        if turns.len() > MAX_DIALOG_TURNS {
            turns.drain(..turns.len() - MAX_DIALOG_TURNS);
        }
        DialogState::AwaitingClarification { candidate, turns }
    }

    /// Whether the next free-text message belongs to an open dialog
    pub fn is_creating_event(&self) -> bool {
        !matches!(self, DialogState::Idle)
    }

    #[allow(dead_code)] // API completeness
    pub fn pending_candidate(&self) -> Option<&EventCandidate> {
        match self {
            DialogState::AwaitingClarification { candidate, .. } => Some(candidate),
            _ => None,
        }
    }
}
