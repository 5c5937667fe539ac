//! Database module
//!
//! Provides persistence for users, their events and each user's dialog state.

mod schema;

pub use schema::*;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid stored JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

const USER_COLUMNS: &str = "id, contact, display_name, locale, dialog_state, created_at";

const EVENT_COLUMNS: &str = "id, user_id, title, scheduled_time, location, notes, \
                             is_recurring, recurrence_pattern, created_at, updated_at";

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    // ==================== User Operations ====================

    /// Get the user for `contact`, creating it on first contact.
    ///
    /// A display name is only recorded if the user has none yet.
    pub fn get_or_create_user(&self, contact: &str, display_name: Option<&str>) -> DbResult<User> {
        let conn = self.conn()?;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (id, contact, display_name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                uuid::Uuid::new_v4().to_string(),
                contact,
                display_name,
                format_timestamp(Utc::now())
            ],
        )?;
        if inserted == 1 {
            tracing::info!(contact = %contact, "Created user");
        } else if let Some(name) = display_name {
            conn.execute(
                "UPDATE users SET display_name = ?2 WHERE contact = ?1 AND display_name IS NULL",
                params![contact, name],
            )?;
        }

        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE contact = ?1"),
            params![contact],
            user_from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::UserNotFound(contact.to_string()),
            other => DbError::Sqlite(other),
        })
    }

    /// Get user by ID
    #[allow(dead_code)] // API completeness
    pub fn get_user(&self, id: &str) -> DbResult<User> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::UserNotFound(id.to_string()),
            other => DbError::Sqlite(other),
        })
    }

    // ==================== Dialog State Operations ====================

    /// Get the user's dialog state
    pub fn get_dialog_state(&self, user_id: &str) -> DbResult<DialogState> {
        let conn = self.conn()?;
        let raw: Option<Option<String>> = conn
            .query_row(
                "SELECT dialog_state FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(decode_dialog_state(raw)),
            None => Err(DbError::UserNotFound(user_id.to_string())),
        }
    }

    /// Replace the user's dialog state; `Idle` is stored as NULL
    pub fn set_dialog_state(&self, user_id: &str, state: &DialogState) -> DbResult<()> {
        let encoded = match state {
            DialogState::Idle => None,
            other => Some(serde_json::to_string(other)?),
        };

        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE users SET dialog_state = ?2 WHERE id = ?1",
            params![user_id, encoded],
        )?;
        if updated == 0 {
            return Err(DbError::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    /// Drop any pending dialog
    pub fn clear_dialog_state(&self, user_id: &str) -> DbResult<()> {
        self.set_dialog_state(user_id, &DialogState::Idle)
    }

    // ==================== Event Operations ====================

    /// Persist a new event for a user
    pub fn create_event(&self, user_id: &str, new: &NewEvent) -> DbResult<Event> {
        let conn = self.conn()?;
        let id = uuid::Uuid::new_v4().to_string();
        // Second precision so stored values read back exactly
        let now = parse_datetime(&format_timestamp(Utc::now()));
        let scheduled_time = parse_datetime(&format_timestamp(new.scheduled_time));

        conn.execute(
            "INSERT INTO events (id, user_id, title, scheduled_time, location, notes,
                                 is_recurring, recurrence_pattern, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, ?7, ?7)",
            params![
                id,
                user_id,
                new.title,
                format_timestamp(scheduled_time),
                new.location,
                new.notes,
                format_timestamp(now)
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DbError::UserNotFound(user_id.to_string())
            }
            other => DbError::Sqlite(other),
        })?;

        Ok(Event {
            id,
            user_id: user_id.to_string(),
            title: new.title.clone(),
            scheduled_time,
            location: new.location.clone(),
            notes: new.notes.clone(),
            is_recurring: false,
            recurrence_pattern: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// List a user's events inside the query window, soonest first
    pub fn list_events(&self, user_id: &str, query: &EventQuery) -> DbResult<Vec<Event>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
             WHERE user_id = ?1
               AND scheduled_time >= ?2
               AND (?3 IS NULL OR scheduled_time < ?3)
             ORDER BY scheduled_time ASC, created_at ASC
             LIMIT ?4"
        ))?;

        let rows = stmt.query_map(
            params![
                user_id,
                format_timestamp(query.start),
                query.end.map(format_timestamp),
                query.limit.map_or(-1, i64::from)
            ],
            event_from_row,
        )?;

        let events = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        contact: row.get(1)?,
        display_name: row.get(2)?,
        locale: row.get(3)?,
        dialog_state: decode_dialog_state(row.get(4)?),
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        scheduled_time: parse_datetime(&row.get::<_, String>(3)?),
        location: row.get(4)?,
        notes: row.get(5)?,
        is_recurring: row.get(6)?,
        recurrence_pattern: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
        updated_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

/// A blob we cannot read is not fatal; the dialog layer resets it
fn decode_dialog_state(raw: Option<String>) -> DialogState {
    let Some(raw) = raw else {
        return DialogState::Idle;
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Undecodable dialog state");
        DialogState::Unrecognized
    })
}

/// RFC 3339 UTC at second precision; sorts lexicographically
fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
