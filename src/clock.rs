//! Reference clock
//!
//! Relative dates ("tomorrow", "next friday") and the listing windows are all
//! resolved against this clock, so it is injected rather than read globally.

use chrono::{DateTime, FixedOffset, Utc};

pub trait Clock: Send + Sync {
    /// Current time in the users' local offset
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock rendered in a fixed offset
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Clock pinned to a single instant
#[allow(dead_code)] // Used in tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
