//! Runtime for handling inbound messages
//!
//! `Assistant` routes each message by intent. Listing and menu requests are
//! answered directly; everything that touches the event creation dialog goes
//! through the `DialogExecutor`.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::DialogExecutor;
pub use traits::*;

use crate::clock::Clock;
use crate::db::EventQuery;
use crate::extraction::EventExtractor;
use crate::intent::{Intent, IntentRouter};
use crate::replies;
use crate::state_machine::{Event, TransitionError};
use async_trait::async_trait;
use chrono::{Duration, NaiveTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Maximum events shown by the upcoming list
pub const UPCOMING_LIMIT: u32 = 10;

/// Type alias for production assistant with concrete implementations
pub type ProductionAssistant = Assistant<DatabaseStorage, RegistryLlmClient>;

/// A message as delivered by a transport
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Stable sender identity, e.g. a phone number
    pub sender: String,
    pub text: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Anything that can turn an inbound message into a reply
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, message: &InboundMessage) -> Result<String, AssistantError>;
}

/// Entry point for inbound messages
pub struct Assistant<S, L>
where
    S: Storage + Clone,
    L: LlmClient,
{
    storage: S,
    executor: DialogExecutor<S, L>,
    router: IntentRouter,
    clock: Arc<dyn Clock>,
}

impl<S, L> Assistant<S, L>
where
    S: Storage + Clone,
    L: LlmClient,
{
    pub fn new(storage: S, extractor: EventExtractor<L>, clock: Arc<dyn Clock>) -> Self {
        Self {
            executor: DialogExecutor::new(storage.clone(), extractor, clock.clone()),
            storage,
            router: IntentRouter::default(),
            clock,
        }
    }

    /// Handle one message and produce the reply text
    pub async fn handle_message(&self, message: &InboundMessage) -> Result<String, AssistantError> {
        let user = self
            .storage
            .get_or_create_user(&message.sender, message.display_name.as_deref())
            .await
            .map_err(AssistantError::Storage)?;

        let dialog_active = user.dialog_state.is_creating_event();
        let intent = self.router.classify(&message.text, dialog_active);
        tracing::info!(user_id = %user.id, ?intent, dialog_active, "Routing message");

        let text = message.text.trim().to_string();
        match intent {
            Intent::Menu => Ok(replies::MENU.to_string()),
            Intent::Fallback => Ok(replies::fallback()),
            Intent::ListUpcoming => self.list_upcoming(&user.id).await,
            Intent::ListToday => self.list_today(&user.id).await,
            Intent::Cancel => {
                self.executor
                    .run(&user.id, user.dialog_state, Event::Cancel)
                    .await
            }
            Intent::ContinueDialog => {
                self.executor
                    .run(&user.id, user.dialog_state, Event::Reply { text })
                    .await
            }
            Intent::CreateEvent => {
                self.executor
                    .run(&user.id, user.dialog_state, Event::NewDescription { text })
                    .await
            }
        }
    }

    async fn list_upcoming(&self, user_id: &str) -> Result<String, AssistantError> {
        let now = self.clock.now();
        let events = self
            .storage
            .list_events(user_id, &EventQuery::upcoming(now.with_timezone(&Utc), UPCOMING_LIMIT))
            .await
            .map_err(AssistantError::Storage)?;
        Ok(replies::upcoming_events(&events, *now.offset()))
    }

    /// Events on the caller's local calendar day
    async fn list_today(&self, user_id: &str) -> Result<String, AssistantError> {
        let now = self.clock.now();
        let start = now - now.time().signed_duration_since(NaiveTime::MIN);
        let end = start + Duration::days(1);

        let events = self
            .storage
            .list_events(
                user_id,
                &EventQuery::between(start.with_timezone(&Utc), end.with_timezone(&Utc)),
            )
            .await
            .map_err(AssistantError::Storage)?;
        Ok(replies::todays_agenda(&events, now))
    }
}

#[async_trait]
impl<S, L> MessageHandler for Assistant<S, L>
where
    S: Storage + Clone + 'static,
    L: LlmClient + 'static,
{
    async fn handle_message(&self, message: &InboundMessage) -> Result<String, AssistantError> {
        Assistant::handle_message(self, message).await
    }
}
