//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::db::{Event, EventQuery, NewEvent, User};
use crate::llm::{LlmError, LlmRequest, LlmResponse};
use crate::state_machine::DialogState;
use async_trait::async_trait;

/// Storage for user records
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up the sender, creating the record on first contact
    async fn get_or_create_user(
        &self,
        contact: &str,
        display_name: Option<&str>,
    ) -> Result<User, String>;
}

/// Storage for per-user dialog state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Get the current dialog state
    #[allow(dead_code)] // State normally arrives with the user record
    async fn get_state(&self, user_id: &str) -> Result<DialogState, String>;

    /// Replace the dialog state (full state as JSON)
    async fn update_state(&self, user_id: &str, state: &DialogState) -> Result<(), String>;

    /// Drop any pending dialog
    #[allow(dead_code)] // API completeness
    async fn clear_state(&self, user_id: &str) -> Result<(), String> {
        self.update_state(user_id, &DialogState::Idle).await
    }
}

/// Storage for events
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, user_id: &str, event: &NewEvent) -> Result<Event, String>;

    async fn list_events(&self, user_id: &str, query: &EventQuery) -> Result<Vec<Event>, String>;
}

/// Client for making LLM requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete an LLM request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    #[allow(dead_code)] // API completeness
    fn model_id(&self) -> &str;
}

/// Combined storage trait for convenience
pub trait Storage: UserStore + StateStore + EventStore {}
impl<T: UserStore + StateStore + EventStore> Storage for T {}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: UserStore + ?Sized> UserStore for Arc<T> {
    async fn get_or_create_user(
        &self,
        contact: &str,
        display_name: Option<&str>,
    ) -> Result<User, String> {
        (**self).get_or_create_user(contact, display_name).await
    }
}

#[async_trait]
impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    async fn get_state(&self, user_id: &str) -> Result<DialogState, String> {
        (**self).get_state(user_id).await
    }

    async fn update_state(&self, user_id: &str, state: &DialogState) -> Result<(), String> {
        (**self).update_state(user_id, state).await
    }

    async fn clear_state(&self, user_id: &str) -> Result<(), String> {
        (**self).clear_state(user_id).await
    }
}

#[async_trait]
impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    async fn create_event(&self, user_id: &str, event: &NewEvent) -> Result<Event, String> {
        (**self).create_event(user_id, event).await
    }

    async fn list_events(&self, user_id: &str, query: &EventQuery) -> Result<Vec<Event>, String> {
        (**self).list_events(user_id, query).await
    }
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

use crate::db::Database;
use crate::llm::ModelRegistry;
use std::sync::Arc;

/// Adapter to use Database as Storage
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[allow(dead_code)] // Useful for tests
    pub fn inner(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl UserStore for DatabaseStorage {
    async fn get_or_create_user(
        &self,
        contact: &str,
        display_name: Option<&str>,
    ) -> Result<User, String> {
        self.db
            .get_or_create_user(contact, display_name)
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl StateStore for DatabaseStorage {
    async fn get_state(&self, user_id: &str) -> Result<DialogState, String> {
        self.db.get_dialog_state(user_id).map_err(|e| e.to_string())
    }

    async fn update_state(&self, user_id: &str, state: &DialogState) -> Result<(), String> {
        self.db
            .set_dialog_state(user_id, state)
            .map_err(|e| e.to_string())
    }

    async fn clear_state(&self, user_id: &str) -> Result<(), String> {
        self.db
            .clear_dialog_state(user_id)
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl EventStore for DatabaseStorage {
    async fn create_event(&self, user_id: &str, event: &NewEvent) -> Result<Event, String> {
        self.db
            .create_event(user_id, event)
            .map_err(|e| e.to_string())
    }

    async fn list_events(&self, user_id: &str, query: &EventQuery) -> Result<Vec<Event>, String> {
        self.db
            .list_events(user_id, query)
            .map_err(|e| e.to_string())
    }
}

/// Adapter to use ModelRegistry as LlmClient
pub struct RegistryLlmClient {
    registry: Arc<ModelRegistry>,
    model_id: String,
}

impl RegistryLlmClient {
    pub fn new(registry: Arc<ModelRegistry>, model_id: String) -> Self {
        Self { registry, model_id }
    }
}

#[async_trait]
impl LlmClient for RegistryLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let llm = self
            .registry
            .get(&self.model_id)
            .or_else(|| self.registry.default())
            .ok_or_else(|| LlmError::network("No LLM available"))?;
        llm.complete(request).await
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
