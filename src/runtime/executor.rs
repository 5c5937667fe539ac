//! Dialog executor
//!
//! Drives the pure state machine for one message: applies transitions,
//! executes their effects and feeds generated events back in until the
//! dialog settles.

use super::traits::{LlmClient, Storage};
use super::AssistantError;
use crate::clock::Clock;
use crate::extraction::EventExtractor;
use crate::replies;
use crate::state_machine::{transition, DialogState, Effect, Event};
use std::sync::Arc;

/// Generic executor that can work with any storage and LLM implementation
pub struct DialogExecutor<S, L>
where
    S: Storage,
    L: LlmClient,
{
    storage: S,
    extractor: EventExtractor<L>,
    clock: Arc<dyn Clock>,
}

impl<S, L> DialogExecutor<S, L>
where
    S: Storage,
    L: LlmClient,
{
    pub fn new(storage: S, extractor: EventExtractor<L>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            extractor,
            clock,
        }
    }

    /// Run `event` against the user's dialog and return the reply text
    pub async fn run(
        &self,
        user_id: &str,
        state: DialogState,
        event: Event,
    ) -> Result<String, AssistantError> {
        let mut state = state;
        let mut outgoing = Vec::new();

        // We need to process events in a loop to handle chained effects
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            // Pure state transition
            let result = transition(&state, current_event)?;
            state = result.new_state;

            // Execute effects and collect generated events
            for effect in result.effects {
                if let Some(generated) = self
                    .execute_effect(user_id, &state, effect, &mut outgoing)
                    .await?
                {
                    events_to_process.push(generated);
                }
            }
        }

        if outgoing.is_empty() {
            tracing::warn!(user_id = %user_id, "Dialog produced no reply");
            return Ok(replies::GENERIC_ERROR.to_string());
        }
        Ok(outgoing.join("\n\n"))
    }

    async fn execute_effect(
        &self,
        user_id: &str,
        state: &DialogState,
        effect: Effect,
        outgoing: &mut Vec<String>,
    ) -> Result<Option<Event>, AssistantError> {
        match effect {
            Effect::PersistState => {
                self.storage
                    .update_state(user_id, state)
                    .await
                    .map_err(AssistantError::Storage)?;
                Ok(None)
            }

            Effect::RequestExtraction {
                message,
                probe,
                history,
            } => {
                let now = self.clock.now();
                let candidate = if history.is_empty() {
                    self.extractor.extract(&probe, now).await
                } else {
                    self.extractor
                        .extract_with_history(&probe, &history, now)
                        .await
                };
                tracing::info!(
                    user_id = %user_id,
                    confidence = candidate.confidence,
                    confident = candidate.is_confident(),
                    "Extraction complete"
                );
                Ok(Some(Event::ExtractionComplete { message, candidate }))
            }

            Effect::CreateEvent { event } => {
                match self.storage.create_event(user_id, &event).await {
                    Ok(stored) => {
                        tracing::info!(user_id = %user_id, event_id = %stored.id, "Event created");
                        outgoing.push(replies::event_created(&stored, *self.clock.now().offset()));
                    }
                    Err(e) => {
                        tracing::error!(user_id = %user_id, error = %e, "Failed to create event");
                        outgoing.push(replies::CREATE_FAILED.to_string());
                    }
                }
                Ok(None)
            }

            Effect::Reply { text } => {
                outgoing.push(text);
                Ok(None)
            }
        }
    }
}
