//! Login-attempt lockout.
//!
//! Failed logins are counted per `(username, client IP)` pair in an
//! [`AttemptStore`]. When the count reaches [`LockoutConfig::max_attempts`] the
//! pair is locked for [`LockoutConfig::lockout_duration`]. The counter and the
//! lock are given the same expiry instant at that moment, so both disappear
//! together when the window elapses.
//!
//! ```text
//!            failure (attempts + 1 < max)
//!           ┌──────────┐
//!           ▼          │
//!        ┌──────┐ ─────┘        ┌────────┐
//!  ────▶ │ OPEN │ ────────────▶ │ LOCKED │  failures rejected, not counted
//!        └──────┘  attempts+1   └────────┘
//!           ▲        == max         │
//!           └───────────────────────┘
//!                   TTL expiry
//! ```
//!
//! A successful login deletes both entries. There is no explicit unlock: a
//! locked pair is rejected before its credentials are checked.
//!
//! This module holds the configuration and the pure decision logic; the
//! service that drives a store lives in [`crate::services::LoginAttemptService`].

pub mod memory;
pub mod store;

use std::time::Duration;

pub use memory::MemoryAttemptStore;
pub use store::{AttemptStore, FailureOutcome};

use crate::error::{AuthError, minutes_ceil};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_LOCKOUT_SECONDS: u64 = 900;

/// Fixed lockout parameters, chosen at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutConfig {
    /// Failures that trigger a lock
    pub max_attempts: u32,
    /// How long the lock (and the counter) live once triggered
    pub lockout_duration: Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lockout_duration: Duration::from_secs(DEFAULT_LOCKOUT_SECONDS),
        }
    }
}

impl LockoutConfig {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            max_attempts,
            lockout_duration,
        }
    }

    pub fn lockout_seconds(&self) -> u64 {
        self.lockout_duration.as_secs()
    }

    /// Lockout duration in whole minutes, rounded up, for display.
    pub fn lockout_minutes(&self) -> u64 {
        minutes_ceil(self.lockout_seconds())
    }

    /// Failures still permitted after `attempts` failures.
    pub fn remaining_attempts(&self, attempts: u32) -> u32 {
        self.max_attempts.saturating_sub(attempts)
    }

    /// Error to surface for a request that arrives while the pair is locked.
    pub fn locked_error(&self, remaining: Duration) -> AuthError {
        AuthError::AccountLocked {
            remaining_seconds: ceil_seconds(remaining),
            max_attempts: self.max_attempts,
        }
    }

    /// Error to surface after a failed credential check was recorded.
    pub fn failure_error(&self, outcome: &FailureOutcome) -> AuthError {
        match outcome {
            FailureOutcome::Counted { attempts } => AuthError::InvalidCredentials {
                remaining_attempts: self.remaining_attempts(*attempts),
            },
            FailureOutcome::LockTriggered { lock_ttl, .. } => self.locked_error(*lock_ttl),
            FailureOutcome::AlreadyLocked { remaining } => self.locked_error(*remaining),
        }
    }
}

/// Identifies one counter: a username as typed, seen from one client IP.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttemptKey {
    pub username: String,
    pub ip: String,
}

impl AttemptKey {
    pub fn new(username: &str, ip: &str) -> Self {
        Self {
            username: username.to_string(),
            ip: ip.to_string(),
        }
    }

    /// Key under which the failed-attempt counter is stored.
    pub fn attempts_key(&self) -> String {
        format!("failed_login_attempts_{}_{}", self.username, self.ip)
    }

    /// Key under which the lock flag is stored.
    pub fn lock_key(&self) -> String {
        format!("account_locked_{}_{}", self.username, self.ip)
    }
}

impl std::fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.username, self.ip)
    }
}

/// Snapshot of a key's lockout state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutStatus {
    pub attempts: u32,
    pub remaining_attempts: u32,
    pub is_locked: bool,
    pub remaining_seconds: u64,
}

/// Whole seconds, rounded up.
pub fn ceil_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
