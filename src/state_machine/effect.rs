//! Effects produced by state transitions

use crate::db::NewEvent;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Persist the new state
    PersistState,

    /// Run the extraction adapter
    RequestExtraction {
        /// Raw user message, carried back in `ExtractionComplete`
        message: String,
        /// Text actually sent for extraction
        probe: String,
        /// Earlier messages of the dialog
        history: Vec<String>,
    },

    /// Store a validated event and confirm it to the user
    CreateEvent { event: NewEvent },

    /// Send text back to the user
    Reply { text: String },
}

impl Effect {
    pub fn reply(text: impl Into<String>) -> Self {
        Effect::Reply { text: text.into() }
    }
}
