//! Login-attempt bookkeeping on top of an [`AttemptStore`].
//!
//! The service is the only writer of attempt counters. Callers use it in a
//! fixed order per login request:
//!
//! 1. [`LoginAttemptService::check`] before verifying credentials
//! 2. [`LoginAttemptService::record_failure`] when verification fails
//! 3. [`LoginAttemptService::reset`] when it succeeds

use std::sync::Arc;

use crate::{
    Error,
    lockout::{AttemptKey, AttemptStore, FailureOutcome, LockoutConfig, LockoutStatus, ceil_seconds},
};

/// Cleanup runs hourly by default
pub const DEFAULT_CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

/// Service for counting failed logins and enforcing lockouts.
///
/// Cheap to share: the store is behind an `Arc` and the config is `Copy`.
pub struct LoginAttemptService {
    store: Arc<dyn AttemptStore>,
    config: LockoutConfig,
}

impl LoginAttemptService {
    pub fn new(store: Arc<dyn AttemptStore>, config: LockoutConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    /// Fail with [`crate::error::AuthError::AccountLocked`] while a lock is live.
    pub async fn check(&self, key: &AttemptKey) -> Result<(), Error> {
        if let Some(remaining) = self.store.remaining_ttl(key).await? {
            tracing::debug!(key = %key, remaining_secs = remaining.as_secs(), "Rejected locked login");
            return Err(self.config.locked_error(remaining).into());
        }
        Ok(())
    }

    /// Current counters for a key.
    pub async fn status(&self, key: &AttemptKey) -> Result<LockoutStatus, Error> {
        let attempts = self.store.get(key).await?;
        let remaining = self.store.remaining_ttl(key).await?;
        Ok(LockoutStatus {
            attempts,
            remaining_attempts: self.config.remaining_attempts(attempts),
            is_locked: remaining.is_some(),
            remaining_seconds: remaining.map_or(0, ceil_seconds),
        })
    }

    /// Count one failed credential check.
    ///
    /// The returned outcome maps to the client-facing error through
    /// [`LockoutConfig::failure_error`].
    pub async fn record_failure(&self, key: &AttemptKey) -> Result<FailureOutcome, Error> {
        let outcome = self
            .store
            .record_failure(key, self.config.max_attempts, self.config.lockout_duration)
            .await?;

        match outcome {
            FailureOutcome::Counted { attempts } => {
                tracing::info!(
                    key = %key,
                    attempts,
                    remaining = self.config.remaining_attempts(attempts),
                    "Failed login attempt"
                );
            }
            FailureOutcome::LockTriggered { attempts, .. } => {
                tracing::warn!(
                    key = %key,
                    attempts,
                    lockout_secs = self.config.lockout_seconds(),
                    "Account locked after repeated failed logins"
                );
            }
            FailureOutcome::AlreadyLocked { remaining } => {
                tracing::debug!(key = %key, remaining_secs = remaining.as_secs(), "Failure while locked");
            }
        }

        Ok(outcome)
    }

    /// Forget the counter and the lock after a successful login.
    pub async fn reset(&self, key: &AttemptKey) -> Result<(), Error> {
        self.store.delete(key).await
    }

    /// Drop expired counters and locks, returning how many keys were removed.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        self.store.purge_expired().await
    }

    /// Start the background task that purges expired entries every `period`.
    pub fn start_cleanup_task(
        &self,
        period: std::time::Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(&self.store);

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        match store.purge_expired().await {
                            Ok(count) if count > 0 => {
                                tracing::info!(count, "Purged expired login attempt counters");
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Failed to purge login attempt counters");
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down login attempt cleanup task");
                        break;
                    }
                }
            }
        })
    }
}
