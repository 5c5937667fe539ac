//! Database schema and types

pub use crate::state_machine::state::DialogState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    contact TEXT NOT NULL UNIQUE,
    display_name TEXT,
    locale TEXT NOT NULL DEFAULT 'en',
    dialog_state TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    scheduled_time TEXT NOT NULL,
    location TEXT,
    notes TEXT NOT NULL DEFAULT '',
    is_recurring BOOLEAN NOT NULL DEFAULT 0,
    recurrence_pattern TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_events_user_time ON events(user_id, scheduled_time);
";

/// User record, keyed by external contact identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Phone number or other transport identity
    pub contact: String,
    pub display_name: Option<String>,
    pub locale: String,
    pub dialog_state: DialogState,
    pub created_at: DateTime<Utc>,
}

/// Persisted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub scheduled_time: DateTime<Utc>,
    pub location: Option<String>,
    pub notes: String,
    pub is_recurring: bool,
    pub recurrence_pattern: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields for a new event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub scheduled_time: DateTime<Utc>,
    pub location: Option<String>,
    pub notes: String,
}

/// Time-window query over a user's events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventQuery {
    /// Inclusive lower bound
    pub start: DateTime<Utc>,
    /// Exclusive upper bound
    pub end: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl EventQuery {
    /// Events at or after `start`, soonest first
    pub fn upcoming(start: DateTime<Utc>, limit: u32) -> Self {
        Self {
            start,
            end: None,
            limit: Some(limit),
        }
    }

    /// Events in `[start, end)`
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end: Some(end),
            limit: None,
        }
    }
}
