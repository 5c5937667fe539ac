//! HTTP API for the agenda bot
//!
//! Inbound messages arrive either from the WhatsApp webhook or the plain
//! JSON endpoint. Both funnel into the same `MessageHandler`.

mod handlers;
mod twiml;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::MessageHandler;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Prune idle sender locks once the table grows past this
const SENDER_LOCK_PRUNE_THRESHOLD: usize = 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<dyn MessageHandler>,
    sender_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl AppState {
    pub fn new(assistant: Arc<dyn MessageHandler>) -> Self {
        Self {
            assistant,
            sender_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Lock that serializes messages from one sender
    fn sender_lock(&self, sender: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .sender_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if locks.len() >= SENDER_LOCK_PRUNE_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        locks
            .entry(sender.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}
