//! In-process [`AttemptStore`] backed by a [`DashMap`].
//!
//! Each operation runs inside a single shard-locked entry, so a read and the
//! write that follows it can never interleave with another caller on the same
//! key. Expiry uses [`tokio::time::Instant`], which lets tests pause and
//! advance the clock.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;

use crate::{
    Error,
    lockout::{AttemptKey, AttemptStore, FailureOutcome},
};

#[derive(Debug, Clone, Copy)]
struct AttemptEntry {
    attempts: u32,
    attempts_expire_at: Option<Instant>,
    locked_until: Option<Instant>,
}

impl AttemptEntry {
    fn empty() -> Self {
        Self {
            attempts: 0,
            attempts_expire_at: None,
            locked_until: None,
        }
    }

    /// Forget whatever has expired by `now`.
    fn expire(&mut self, now: Instant) {
        if self.attempts_expire_at.is_some_and(|at| at <= now) {
            self.attempts = 0;
            self.attempts_expire_at = None;
        }
        if self.locked_until.is_some_and(|at| at <= now) {
            self.locked_until = None;
        }
    }

    fn is_dead(&self) -> bool {
        self.attempts == 0 && self.locked_until.is_none()
    }

    fn lock_remaining(&self, now: Instant) -> Option<Duration> {
        self.locked_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }
}

/// Attempt counters kept in memory. Counters do not survive a restart and
/// are not shared between processes.
#[derive(Debug, Default)]
pub struct MemoryAttemptStore {
    entries: DashMap<AttemptKey, AttemptEntry>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held, live or not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn live_entry(&self, key: &AttemptKey) -> Option<AttemptEntry> {
        let now = Instant::now();
        self.entries.get(key).map(|e| {
            let mut entry = *e;
            entry.expire(now);
            entry
        })
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn increment(&self, key: &AttemptKey, ttl: Duration) -> Result<u32, Error> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(AttemptEntry::empty);
        entry.expire(now);
        entry.attempts += 1;
        entry.attempts_expire_at = Some(now + ttl);
        Ok(entry.attempts)
    }

    async fn get(&self, key: &AttemptKey) -> Result<u32, Error> {
        Ok(self.live_entry(key).map_or(0, |e| e.attempts))
    }

    async fn delete(&self, key: &AttemptKey) -> Result<(), Error> {
        self.entries.remove(key);
        Ok(())
    }

    async fn set_lock(&self, key: &AttemptKey, ttl: Duration) -> Result<(), Error> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(AttemptEntry::empty);
        entry.expire(now);
        entry.locked_until = Some(now + ttl);
        Ok(())
    }

    async fn is_locked(&self, key: &AttemptKey) -> Result<bool, Error> {
        Ok(self.remaining_ttl(key).await?.is_some())
    }

    async fn remaining_ttl(&self, key: &AttemptKey) -> Result<Option<Duration>, Error> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .and_then(|entry| entry.lock_remaining(now)))
    }

    async fn record_failure(
        &self,
        key: &AttemptKey,
        threshold: u32,
        window: Duration,
    ) -> Result<FailureOutcome, Error> {
        let now = Instant::now();
        let mut entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(AttemptEntry::empty);
        entry.expire(now);

        if let Some(remaining) = entry.lock_remaining(now) {
            return Ok(FailureOutcome::AlreadyLocked { remaining });
        }

        let expires_at = now + window;
        entry.attempts += 1;
        entry.attempts_expire_at = Some(expires_at);

        if entry.attempts >= threshold {
            entry.locked_until = Some(expires_at);
            return Ok(FailureOutcome::LockTriggered {
                attempts: entry.attempts,
                lock_ttl: window,
            });
        }

        Ok(FailureOutcome::Counted {
            attempts: entry.attempts,
        })
    }

    async fn purge_expired(&self) -> Result<u64, Error> {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| {
            entry.expire(now);
            !entry.is_dead()
        });
        Ok(before.saturating_sub(self.entries.len()) as u64)
    }
}
