use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, lockout::AttemptKey};

/// What happened to a failed login once it reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The counter was incremented and is still below the threshold.
    Counted { attempts: u32 },
    /// This failure reached the threshold; counter and lock now share `lock_ttl`.
    LockTriggered { attempts: u32, lock_ttl: Duration },
    /// A lock was already live. Nothing was incremented.
    AlreadyLocked { remaining: Duration },
}

/// Key-value store with per-key expiry for failed-attempt counters and locks.
///
/// Expired entries must behave exactly like absent ones. Implementations must
/// be safe for concurrent callers on the same key: two simultaneous failures
/// may never lose an increment.
#[async_trait]
pub trait AttemptStore: Send + Sync + 'static {
    /// Increment the counter (creating it at 1) and refresh its TTL to `ttl`
    async fn increment(&self, key: &AttemptKey, ttl: Duration) -> Result<u32, Error>;

    /// Current counter value, zero when absent or expired
    async fn get(&self, key: &AttemptKey) -> Result<u32, Error>;

    /// Remove both the counter and the lock
    async fn delete(&self, key: &AttemptKey) -> Result<(), Error>;

    /// Set the lock flag with its own TTL
    async fn set_lock(&self, key: &AttemptKey, ttl: Duration) -> Result<(), Error>;

    /// Whether a live lock exists
    async fn is_locked(&self, key: &AttemptKey) -> Result<bool, Error>;

    /// Time left on the lock, `None` when not locked
    async fn remaining_ttl(&self, key: &AttemptKey) -> Result<Option<Duration>, Error>;

    /// Record one failed login as a single atomic step.
    ///
    /// Rejects without incrementing while a lock is live. Otherwise increments
    /// the counter, refreshes its TTL to `window`, and when the count reaches
    /// `threshold` sets the lock with the same expiry instant as the counter.
    async fn record_failure(
        &self,
        key: &AttemptKey,
        threshold: u32,
        window: Duration,
    ) -> Result<FailureOutcome, Error>;

    /// Drop expired entries, returning how many were removed
    async fn purge_expired(&self) -> Result<u64, Error>;
}
