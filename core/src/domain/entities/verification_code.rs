//! Verification code records kept in the expiring store.
//!
//! Each (business domain, recipient) pair owns two independent entries: the
//! [`CodeEntry`] holding the issued code and the [`AttemptCounter`] tracking
//! how many verifications the code still allows. Both serialize as
//! `{ "value": ..., "timestamp": ... }`.

use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use serde::{Deserialize, Serialize};

/// Verification attempts granted to a freshly issued code
pub const MAX_ATTEMPTS: u32 = 3;

/// Raw counter value marking a code as already consumed
pub const CONSUMED_SENTINEL: i64 = -1;

/// The currently active code for a pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeEntry {
    /// The code the recipient must submit
    #[serde(rename = "value")]
    pub code: String,

    /// When this code was written
    #[serde(rename = "timestamp")]
    pub issued_at: DateTime<Utc>,
}

impl CodeEntry {
    pub fn new(code: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            code: code.into(),
            issued_at,
        }
    }

    /// Whether a new code may not be issued yet
    ///
    /// An `issued_at` in the future (clock skew) counts as inside the window.
    pub fn in_cooldown(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        now.signed_duration_since(self.issued_at) < cooldown
    }

    /// Compare a submitted code without leaking timing information
    pub fn matches(&self, submitted: &str) -> bool {
        constant_time_eq(self.code.as_bytes(), submitted.as_bytes())
    }
}

/// Verification state of the current code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    /// `n >= 1` attempts left
    Active(u32),
    /// Every attempt was spent on wrong codes
    Exhausted,
    /// The code was verified successfully and cannot be replayed
    Consumed,
}

impl AttemptStatus {
    /// Status of a code that has just been issued
    pub fn fresh(max_attempts: u32) -> Self {
        if max_attempts == 0 {
            AttemptStatus::Exhausted
        } else {
            AttemptStatus::Active(max_attempts)
        }
    }

    /// Decode the stored signed counter
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            CONSUMED_SENTINEL => AttemptStatus::Consumed,
            n if n <= 0 => AttemptStatus::Exhausted,
            n => AttemptStatus::Active(u32::try_from(n).unwrap_or(u32::MAX)),
        }
    }

    /// Encode as the stored signed counter
    pub fn to_raw(self) -> i64 {
        match self {
            AttemptStatus::Active(n) => i64::from(n),
            AttemptStatus::Exhausted => 0,
            AttemptStatus::Consumed => CONSUMED_SENTINEL,
        }
    }

    pub fn can_verify(self) -> bool {
        matches!(self, AttemptStatus::Active(_))
    }

    /// Attempts left, zero when exhausted or consumed
    pub fn remaining(self) -> u32 {
        match self {
            AttemptStatus::Active(n) => n,
            AttemptStatus::Exhausted | AttemptStatus::Consumed => 0,
        }
    }

    /// Status after one wrong submission
    pub fn after_mismatch(self) -> Self {
        match self {
            AttemptStatus::Active(n) if n > 1 => AttemptStatus::Active(n - 1),
            AttemptStatus::Active(_) => AttemptStatus::Exhausted,
            other => other,
        }
    }
}

/// Remaining verification attempts for the current [`CodeEntry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "CounterRecord", into = "CounterRecord")]
pub struct AttemptCounter {
    pub status: AttemptStatus,

    /// Issue time of the code this counter belongs to
    pub issued_at: DateTime<Utc>,
}

/// Stored shape of [`AttemptCounter`]
#[derive(Serialize, Deserialize)]
struct CounterRecord {
    value: i64,
    timestamp: DateTime<Utc>,
}

impl From<CounterRecord> for AttemptCounter {
    fn from(record: CounterRecord) -> Self {
        Self {
            status: AttemptStatus::from_raw(record.value),
            issued_at: record.timestamp,
        }
    }
}

impl From<AttemptCounter> for CounterRecord {
    fn from(counter: AttemptCounter) -> Self {
        Self {
            value: counter.status.to_raw(),
            timestamp: counter.issued_at,
        }
    }
}

impl AttemptCounter {
    /// Counter written alongside a newly issued code
    pub fn fresh(max_attempts: u32, issued_at: DateTime<Utc>) -> Self {
        Self {
            status: AttemptStatus::fresh(max_attempts),
            issued_at,
        }
    }

    pub fn record_mismatch(&mut self) {
        self.status = self.status.after_mismatch();
    }

    pub fn consume(&mut self) {
        self.status = AttemptStatus::Consumed;
    }
}
