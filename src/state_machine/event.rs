//! Events that drive the dialog

use crate::extraction::EventCandidate;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    /// Free text that looks like a new event description
    NewDescription { text: String },
    /// Free text while a dialog is open
    Reply { text: String },
    Cancel,

    // Extraction events
    ExtractionComplete {
        /// The user message that triggered the extraction
        message: String,
        candidate: EventCandidate,
    },
}
