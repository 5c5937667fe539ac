//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::db::{Event, EventQuery, NewEvent, User};
use crate::llm::{LlmError, LlmRequest, LlmResponse};
use crate::state_machine::DialogState;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

#[allow(dead_code)]
impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a response whose text is `json`
    pub fn queue_json(&self, json: serde_json::Value) {
        self.queue_response(LlmResponse::from_text(json.to_string()));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self) -> Result<LlmResponse, LlmError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.next_response()
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Delayed Mock LLM Client (for timeout testing)
// ============================================================================

/// Mock LLM client with configurable delay
pub struct DelayedMockLlmClient {
    inner: MockLlmClient,
    delay: Duration,
    /// Notified when request starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl DelayedMockLlmClient {
    pub fn new(model_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            inner: MockLlmClient::new(model_id),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.inner.queue_response(response);
    }
}

#[async_trait]
impl LlmClient for DelayedMockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.inner.requests.lock().unwrap().push(request.clone());
        self.request_started.notify_waiters();
        tokio::time::sleep(self.delay).await;
        self.inner.next_response()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

// ============================================================================
// Recording Storage
// ============================================================================

/// In-memory storage that records every call made against it
#[derive(Default)]
pub struct RecordingStorage {
    /// Users keyed by contact
    users: Mutex<HashMap<String, User>>,
    events: Mutex<Vec<Event>>,
    calls: Mutex<Vec<&'static str>>,
    fail_event_creation: AtomicBool,
}

#[allow(dead_code)]
impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `create_event` call fail
    pub fn fail_event_creation(&self) {
        self.fail_event_creation.store(true, Ordering::SeqCst);
    }

    /// Names of the storage calls made so far
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Current dialog state for a contact
    pub fn state_of(&self, contact: &str) -> Option<DialogState> {
        self.users
            .lock()
            .unwrap()
            .get(contact)
            .map(|u| u.dialog_state.clone())
    }

    /// Overwrite the dialog state for a contact directly
    pub fn set_state_of(&self, contact: &str, state: DialogState) {
        if let Some(user) = self.users.lock().unwrap().get_mut(contact) {
            user.dialog_state = state;
        }
    }

    /// Insert an event without going through the dialog
    pub fn seed_event(&self, contact: &str, new: NewEvent) {
        let user_id = self.users.lock().unwrap()[contact].id.clone();
        self.events.lock().unwrap().push(stored_event(&user_id, &new));
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

fn stored_event(user_id: &str, new: &NewEvent) -> Event {
    let now = chrono::Utc::now();
    Event {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        title: new.title.clone(),
        scheduled_time: new.scheduled_time,
        location: new.location.clone(),
        notes: new.notes.clone(),
        is_recurring: false,
        recurrence_pattern: None,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl UserStore for RecordingStorage {
    async fn get_or_create_user(
        &self,
        contact: &str,
        display_name: Option<&str>,
    ) -> Result<User, String> {
        self.record("get_or_create_user");
        let mut users = self.users.lock().unwrap();
        let user = users.entry(contact.to_string()).or_insert_with(|| User {
            id: uuid::Uuid::new_v4().to_string(),
            contact: contact.to_string(),
            display_name: None,
            locale: "en".to_string(),
            dialog_state: DialogState::Idle,
            created_at: chrono::Utc::now(),
        });
        if user.display_name.is_none() {
            user.display_name = display_name.map(str::to_string);
        }
        Ok(user.clone())
    }
}

#[async_trait]
impl StateStore for RecordingStorage {
    async fn get_state(&self, user_id: &str) -> Result<DialogState, String> {
        self.record("get_state");
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.id == user_id)
            .map(|u| u.dialog_state.clone())
            .ok_or_else(|| format!("User not found: {user_id}"))
    }

    async fn update_state(&self, user_id: &str, state: &DialogState) -> Result<(), String> {
        self.record("update_state");
        let mut users = self.users.lock().unwrap();
        let user = users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| format!("User not found: {user_id}"))?;
        user.dialog_state = state.clone();
        Ok(())
    }
}

#[async_trait]
impl EventStore for RecordingStorage {
    async fn create_event(&self, user_id: &str, event: &NewEvent) -> Result<Event, String> {
        self.record("create_event");
        if self.fail_event_creation.load(Ordering::SeqCst) {
            return Err("disk full".to_string());
        }
        let stored = stored_event(user_id, event);
        self.events.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn list_events(&self, user_id: &str, query: &EventQuery) -> Result<Vec<Event>, String> {
        self.record("list_events");
        let mut events: Vec<_> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id == user_id && e.scheduled_time >= query.start)
            .filter(|e| query.end.is_none_or(|end| e.scheduled_time < end))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.scheduled_time);
        if let Some(limit) = query.limit {
            events.truncate(limit as usize);
        }
        Ok(events)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::extraction::{EventExtractor, FALLBACK_QUESTION};
    use crate::replies;
    use crate::runtime::{Assistant, InboundMessage};
    use chrono::{FixedOffset, TimeZone, Utc};
    use serde_json::json;

    const SENDER: &str = "+15551234567";

    struct Harness {
        assistant: Assistant<Arc<RecordingStorage>, Arc<MockLlmClient>>,
        storage: Arc<RecordingStorage>,
        llm: Arc<MockLlmClient>,
    }

    impl Harness {
        /// Assistant pinned to 2024-01-01 09:00 UTC
        fn new() -> Self {
            let storage = Arc::new(RecordingStorage::new());
            let llm = Arc::new(MockLlmClient::new("test-model"));
            let now = FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
                .unwrap();
            let assistant = Assistant::new(
                storage.clone(),
                EventExtractor::new(llm.clone(), Duration::from_secs(5)),
                Arc::new(FixedClock(now)),
            );
            Self {
                assistant,
                storage,
                llm,
            }
        }

        async fn send(&self, text: &str) -> String {
            self.assistant
                .handle_message(&InboundMessage {
                    sender: SENDER.to_string(),
                    text: text.to_string(),
                    display_name: None,
                })
                .await
                .unwrap()
        }

        fn state(&self) -> DialogState {
            self.storage.state_of(SENDER).unwrap()
        }
    }

    fn new_event(title: &str, y: i32, m: u32, d: u32, h: u32) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            scheduled_time: Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
            location: None,
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_mock_llm_client() {
        let mock = MockLlmClient::new("test-model");
        mock.queue_response(LlmResponse::from_text("Hello"));

        let request = LlmRequest {
            system: vec![],
            messages: vec![],
            max_tokens: Some(100),
            json_output: false,
        };

        let response = mock.complete(&request).await.unwrap();
        assert_eq!(response.text(), "Hello");

        // Second call should fail (no more responses)
        let result = mock.complete(&request).await;
        assert!(result.is_err());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_confident_description_creates_event() {
        let h = Harness::new();
        h.llm.queue_json(json!({
            "title": "Team meeting",
            "datetime": "2024-01-02 15:00:00",
            "location": null,
            "notes": null,
            "confidence": 0.9,
            "needs_clarification": false,
            "clarification_question": null
        }));

        let reply = h.send("Team meeting at 3pm tomorrow").await;

        assert!(reply.contains("Event Created Successfully"), "{reply}");
        assert!(reply.contains("Tue, Jan 02 at 03:00 PM"), "{reply}");

        let events = h.storage.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Team meeting");
        assert_eq!(events[0].scheduled_time.to_rfc3339(), "2024-01-02T15:00:00+00:00");
        assert_eq!(h.state(), DialogState::Idle);
        assert!(!h.storage.calls().contains(&"update_state"));

        let requests = h.llm.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].system[1].text.contains("2024-01-01 (Monday)"));
        assert_eq!(
            requests[0].messages[0].text,
            "User message: Team meeting at 3pm tomorrow"
        );
    }

    #[tokio::test]
    async fn test_greeting_only_looks_up_user() {
        let h = Harness::new();
        let reply = h.send("hi").await;

        assert_eq!(reply, replies::MENU);
        assert_eq!(h.storage.calls(), vec!["get_or_create_user"]);
        assert!(h.llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_clarification_round_trip() {
        let h = Harness::new();
        h.llm.queue_json(json!({
            "title": "Dentist appointment",
            "datetime": null,
            "confidence": 0.4,
            "needs_clarification": true,
            "clarification_question": "Which day next week?"
        }));
        h.llm.queue_json(json!({
            "title": "Dentist appointment",
            "datetime": "2024-01-09 10:00:00",
            "confidence": 0.85,
            "needs_clarification": false
        }));

        let first = h.send("Dentist appointment next week").await;
        assert_eq!(first, "🤔 Which day next week?");
        assert!(h.storage.events().is_empty());
        assert!(matches!(h.state(), DialogState::AwaitingClarification { .. }));

        let second = h.send("Tuesday at 10am").await;
        assert!(second.contains("Event Created Successfully"), "{second}");
        assert!(second.contains("Tue, Jan 09 at 10:00 AM"), "{second}");
        assert_eq!(h.storage.events().len(), 1);
        assert_eq!(h.state(), DialogState::Idle);

        let requests = h.llm.recorded_requests();
        let follow_up = &requests[1].messages[0].text;
        assert!(follow_up.contains("- Dentist appointment next week"), "{follow_up}");
        assert!(
            follow_up.ends_with("User message: Dentist appointment Tuesday at 10am"),
            "{follow_up}"
        );
    }

    #[tokio::test]
    async fn test_repeated_uncertainty_keeps_dialog_open() {
        let h = Harness::new();
        h.llm.queue_json(json!({"title": "Call", "confidence": 0.2, "needs_clarification": true}));
        h.llm.queue_json(json!({"title": "Call mom", "confidence": 0.5, "needs_clarification": false}));

        assert_eq!(
            h.send("remind me to call").await,
            format!("🤔 {}", replies::START_QUESTION)
        );
        assert_eq!(
            h.send("mom").await,
            format!("🤔 {}", replies::CONTINUE_QUESTION)
        );

        match h.state() {
            DialogState::AwaitingClarification { candidate, turns } => {
                assert_eq!(candidate.title.as_deref(), Some("Call mom"));
                assert_eq!(turns, vec!["remind me to call".to_string(), "mom".to_string()]);
            }
            other => panic!("expected awaiting, got {other:?}"),
        }
        assert!(h.storage.events().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_discards_pending_dialog() {
        let h = Harness::new();
        h.llm.queue_json(json!({"title": "Gym", "confidence": 0.3, "needs_clarification": true}));
        h.send("set up gym session").await;
        assert!(matches!(h.state(), DialogState::AwaitingClarification { .. }));

        let reply = h.send("cancel").await;
        assert_eq!(reply, replies::CANCELLED);
        assert_eq!(h.state(), DialogState::Idle);
        assert!(h.storage.events().is_empty());
        assert!(!h.storage.calls().contains(&"create_event"));
    }

    #[tokio::test]
    async fn test_extraction_failure_asks_to_rephrase() {
        let h = Harness::new();
        h.llm.queue_error(LlmError::network("connection reset"));

        let reply = h.send("Lunch with Ana friday at noon").await;
        assert_eq!(reply, format!("🤔 {FALLBACK_QUESTION}"));
        assert!(matches!(h.state(), DialogState::AwaitingClarification { .. }));
    }

    #[tokio::test]
    async fn test_missing_time_rejects_without_state_change() {
        let h = Harness::new();
        h.llm.queue_json(json!({
            "title": "Book club",
            "datetime": "sometime",
            "confidence": 0.8,
            "needs_clarification": false
        }));

        let reply = h.send("create book club").await;
        assert_eq!(reply, replies::MISSING_TIME);
        assert_eq!(h.state(), DialogState::Idle);
        assert!(h.storage.events().is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_on_create_is_reported() {
        let h = Harness::new();
        h.storage.fail_event_creation();
        h.llm.queue_json(json!({
            "title": "Standup",
            "datetime": "2024-01-02 09:30",
            "confidence": 0.95,
            "needs_clarification": false
        }));

        let reply = h.send("standup meeting tomorrow 9:30").await;
        assert_eq!(reply, replies::CREATE_FAILED);
    }

    #[tokio::test]
    async fn test_unrecognized_dialog_restarts() {
        let h = Harness::new();
        h.send("hello").await;
        h.storage.set_state_of(SENDER, DialogState::Unrecognized);

        let reply = h.send("next tuesday").await;
        assert_eq!(reply, replies::RESTART);
        assert_eq!(h.state(), DialogState::Idle);
        assert!(h.llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_commands_do_not_close_dialog() {
        let h = Harness::new();
        h.llm.queue_json(json!({"title": "Trip", "confidence": 0.1, "needs_clarification": true}));
        h.send("create trip").await;

        assert_eq!(h.send("menu").await, replies::MENU);
        assert!(matches!(h.state(), DialogState::AwaitingClarification { .. }));
    }

    #[tokio::test]
    async fn test_upcoming_list() {
        let h = Harness::new();
        assert_eq!(h.send("events").await, replies::NO_UPCOMING_EVENTS);

        h.storage.seed_event(SENDER, new_event("Past", 2023, 12, 31, 9));
        h.storage.seed_event(SENDER, new_event("Later", 2024, 1, 5, 14));
        h.storage.seed_event(SENDER, new_event("Sooner", 2024, 1, 2, 8));

        let reply = h.send("upcoming").await;
        assert!(reply.starts_with("📅 *Your Upcoming Events:*"));
        let sooner = reply.find("Sooner").unwrap();
        let later = reply.find("Later").unwrap();
        assert!(sooner < later);
        assert!(!reply.contains("Past"));
    }

    #[tokio::test]
    async fn test_upcoming_list_is_capped() {
        let h = Harness::new();
        h.send("hi").await;
        for day in 2..20 {
            h.storage
                .seed_event(SENDER, new_event(&format!("Event {day}"), 2024, 1, day, 12));
        }

        let reply = h.send("plans").await;
        assert_eq!(reply.matches("• ").count(), 10);
    }

    #[tokio::test]
    async fn test_todays_agenda() {
        let h = Harness::new();
        assert_eq!(h.send("agenda").await, replies::NOTHING_TODAY);

        h.storage.seed_event(SENDER, new_event("Early", 2024, 1, 1, 7));
        h.storage.seed_event(SENDER, new_event("Lunch", 2024, 1, 1, 12));
        h.storage.seed_event(SENDER, new_event("Tomorrow", 2024, 1, 2, 9));

        let reply = h.send("today").await;
        assert!(reply.starts_with("📋 *Today's Agenda (Monday, Jan 01):*"), "{reply}");
        assert!(reply.contains("• *07:00 AM* - Early"));
        assert!(reply.contains("• *12:00 PM* - Lunch"));
        assert!(!reply.contains("Tomorrow"));
    }

    #[tokio::test]
    async fn test_fallback_introduces_bot() {
        let h = Harness::new();
        assert_eq!(h.send("what can you do").await, replies::fallback());
    }

    #[tokio::test]
    async fn test_display_name_recorded_on_first_contact() {
        let h = Harness::new();
        h.assistant
            .handle_message(&InboundMessage {
                sender: SENDER.to_string(),
                text: "hi".to_string(),
                display_name: Some("Rosa".to_string()),
            })
            .await
            .unwrap();

        let user = h.storage.get_or_create_user(SENDER, None).await.unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Rosa"));
    }
}
