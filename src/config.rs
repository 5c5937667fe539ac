//! Service configuration
//!
//! Everything is read from the environment once at start-up. Bad values for
//! optional knobs fall back to defaults; a bad UTC offset is fatal because
//! every stored event time depends on it.

use crate::llm::LlmConfig;
use chrono::{FixedOffset, Offset, Utc};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_EXTRACTION_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid AGENDA_UTC_OFFSET {0:?}: expected +HH:MM, -HH:MM or Z")]
    InvalidOffset(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    /// Local time zone of the bot's users
    pub utc_offset: FixedOffset,
    /// Hard cap on a single extraction round trip
    pub extraction_timeout: Duration,
    pub llm: LlmConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = lookup("AGENDA_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.agenda-bot/agenda.db"))
            },
            PathBuf::from,
        );

        let port = lookup("AGENDA_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let utc_offset = match lookup("AGENDA_UTC_OFFSET") {
            Some(raw) => parse_utc_offset(&raw).ok_or(ConfigError::InvalidOffset(raw))?,
            None => Utc.fix(),
        };

        let extraction_timeout = lookup("EXTRACTION_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map_or(DEFAULT_EXTRACTION_TIMEOUT, Duration::from_secs);

        Ok(Self {
            db_path,
            port,
            utc_offset,
            extraction_timeout,
            llm: LlmConfig::from_lookup(&lookup),
        })
    }
}

/// Parse `Z`/`UTC` or a signed `±HH:MM` / `±HHMM` offset
fn parse_utc_offset(raw: &str) -> Option<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Some(Utc.fix());
    }
    raw.parse().ok()
}
