//! Pure state transition function

use super::{DialogState, Effect, Event};
use crate::db::NewEvent;
use crate::extraction::EventCandidate;
use crate::replies;
use chrono::Utc;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: DialogState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: DialogState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("No dialog is waiting for a reply")]
    NoPendingDialog,
    #[error("A dialog is already in progress")]
    DialogInProgress,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Required event field absent from a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissingField {
    #[error("event title")]
    Title,
    #[error("event time")]
    Time,
}

/// Pure transition function
///
/// Given the same inputs, it always produces the same outputs, with no I/O
/// side effects. All storage and extraction happens in the executor.
pub fn transition(state: &DialogState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Cancellation
        // ============================================================
        (_, Event::Cancel) => Ok(TransitionResult::new(DialogState::Idle)
            .with_effect(Effect::PersistState)
            .with_effect(Effect::reply(replies::CANCELLED))),

        // ============================================================
        // User Messages
        // ============================================================
        (DialogState::Idle, Event::NewDescription { text }) => {
            Ok(TransitionResult::new(DialogState::Idle).with_effect(Effect::RequestExtraction {
                message: text.clone(),
                probe: text,
                history: vec![],
            }))
        }

        // Re-extract with the previous title in front of the answer
        (DialogState::AwaitingClarification { candidate, turns }, Event::Reply { text }) => {
            let probe = format!("{} {}", candidate.title.as_deref().unwrap_or("Event"), text);
            Ok(TransitionResult::new(state.clone()).with_effect(Effect::RequestExtraction {
                message: text,
                probe,
                history: turns.clone(),
            }))
        }

        (DialogState::Unrecognized, Event::Reply { .. }) => {
            Ok(TransitionResult::new(DialogState::Idle)
                .with_effect(Effect::PersistState)
                .with_effect(Effect::reply(replies::RESTART)))
        }

        (DialogState::Idle, Event::Reply { .. }) => Err(TransitionError::NoPendingDialog),

        (
            DialogState::AwaitingClarification { .. } | DialogState::Unrecognized,
            Event::NewDescription { .. },
        ) => Err(TransitionError::DialogInProgress),

        // ============================================================
        // Extraction Results
        // ============================================================
        (DialogState::Idle, Event::ExtractionComplete { message, candidate }) => {
            if candidate.is_confident() {
                return Ok(conclude(TransitionResult::new(DialogState::Idle), &candidate));
            }
            let question = replies::clarification(
                candidate.clarification_question.as_deref(),
                replies::START_QUESTION,
            );
            Ok(
                TransitionResult::new(DialogState::awaiting(candidate, &[], &message))
                    .with_effect(Effect::PersistState)
                    .with_effect(Effect::reply(question)),
            )
        }

        (
            DialogState::AwaitingClarification { turns, .. },
            Event::ExtractionComplete { message, candidate },
        ) => {
            if candidate.is_confident() {
                let cleared =
                    TransitionResult::new(DialogState::Idle).with_effect(Effect::PersistState);
                return Ok(conclude(cleared, &candidate));
            }
            let question = replies::clarification(
                candidate.clarification_question.as_deref(),
                replies::CONTINUE_QUESTION,
            );
            Ok(
                TransitionResult::new(DialogState::awaiting(candidate, turns, &message))
                    .with_effect(Effect::PersistState)
                    .with_effect(Effect::reply(question)),
            )
        }

        (DialogState::Unrecognized, Event::ExtractionComplete { .. }) => Err(
            TransitionError::InvalidTransition("extraction result for an unreadable dialog".into()),
        ),
    }
}

/// Validate a confident candidate into an event ready to store
pub fn finalize(candidate: &EventCandidate) -> Result<NewEvent, MissingField> {
    let title = candidate
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(MissingField::Title)?;
    let scheduled_time = candidate.datetime.ok_or(MissingField::Time)?;

    Ok(NewEvent {
        title: title.to_string(),
        scheduled_time: scheduled_time.with_timezone(&Utc),
        location: candidate.location.clone(),
        notes: candidate.notes.clone().unwrap_or_default(),
    })
}

/// Store the event, or explain which field is missing
fn conclude(result: TransitionResult, candidate: &EventCandidate) -> TransitionResult {
    match finalize(candidate) {
        Ok(event) => result.with_effect(Effect::CreateEvent { event }),
        Err(MissingField::Title) => result.with_effect(Effect::reply(replies::MISSING_TITLE)),
        Err(MissingField::Time) => result.with_effect(Effect::reply(replies::MISSING_TIME)),
    }
}
