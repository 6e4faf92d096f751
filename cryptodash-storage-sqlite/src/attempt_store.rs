//! [`AttemptStore`] over the `login_attempts` table.
//!
//! One row per `(username, ip_address)` holds the counter, its expiry and the
//! lock expiry, all in unix milliseconds. Rows whose expiries have passed are
//! treated as absent by every read and reset by every write.
//!
//! [`AttemptStore::record_failure`] runs inside `BEGIN IMMEDIATE`, which takes
//! the database write lock up front. The lock check and the upsert that
//! follows can therefore never interleave with another writer. A connection
//! whose `COMMIT` or `ROLLBACK` fails is closed instead of returned to the pool.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use cryptodash_core::{
    Error,
    error::StorageError,
    lockout::{AttemptKey, AttemptStore, FailureOutcome},
};
use sqlx::{SqliteConnection, SqlitePool};

use crate::db_error;

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

fn remaining(until: i64, now: i64) -> Duration {
    Duration::from_millis(u64::try_from(until - now).unwrap_or_default())
}

#[derive(Debug, Clone)]
pub struct SqliteAttemptStore {
    pool: SqlitePool,
}

impl SqliteAttemptStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn live_lock(
        conn: &mut SqliteConnection,
        key: &AttemptKey,
        now: i64,
    ) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT locked_until FROM login_attempts
            WHERE username = ?1 AND ip_address = ?2 AND locked_until > ?3
            "#,
        )
        .bind(&key.username)
        .bind(&key.ip)
        .bind(now)
        .fetch_optional(conn)
        .await
    }

    /// The body of [`AttemptStore::record_failure`], run inside the write lock.
    async fn record_failure_locked(
        conn: &mut SqliteConnection,
        key: &AttemptKey,
        threshold: u32,
        window: Duration,
    ) -> Result<FailureOutcome, sqlx::Error> {
        let now = now_millis();
        if let Some(until) = Self::live_lock(&mut *conn, key, now).await? {
            return Ok(FailureOutcome::AlreadyLocked {
                remaining: remaining(until, now),
            });
        }

        let expires_at = now + millis(window);
        let attempts: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO login_attempts (username, ip_address, attempts, attempts_expire_at, locked_until)
            VALUES (?1, ?2, 1, ?4, CASE WHEN 1 >= ?5 THEN ?4 END)
            ON CONFLICT (username, ip_address) DO UPDATE SET
                attempts = CASE
                    WHEN attempts_expire_at IS NULL OR attempts_expire_at <= ?3 THEN 1
                    ELSE attempts + 1
                END,
                attempts_expire_at = ?4,
                locked_until = CASE
                    WHEN (CASE
                        WHEN attempts_expire_at IS NULL OR attempts_expire_at <= ?3 THEN 1
                        ELSE attempts + 1
                    END) >= ?5 THEN ?4
                END
            RETURNING attempts
            "#,
        )
        .bind(&key.username)
        .bind(&key.ip)
        .bind(now)
        .bind(expires_at)
        .bind(i64::from(threshold))
        .fetch_one(&mut *conn)
        .await?;

        let attempts = u32::try_from(attempts).unwrap_or(u32::MAX);
        if attempts >= threshold {
            Ok(FailureOutcome::LockTriggered {
                attempts,
                lock_ttl: window,
            })
        } else {
            Ok(FailureOutcome::Counted { attempts })
        }
    }

    async fn record_failure_immediate(
        pool: SqlitePool,
        key: AttemptKey,
        threshold: u32,
        window: Duration,
    ) -> Result<FailureOutcome, Error> {
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| db_error("Failed to acquire connection", e))?;

        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(|e| db_error("Failed to begin attempt transaction", e))?;

        let outcome = Self::record_failure_locked(&mut conn, &key, threshold, window).await;
        let finish = if outcome.is_ok() { "COMMIT" } else { "ROLLBACK" };
        if let Err(e) = sqlx::query(finish).execute(&mut *conn).await {
            // sqlx does not know about this transaction, so it may still be
            // open. The connection must not go back to the pool.
            drop(conn.detach());
            return Err(db_error("Failed to finish attempt transaction", e));
        }

        outcome.map_err(|e| db_error("Failed to record login failure", e))
    }
}

#[async_trait]
impl AttemptStore for SqliteAttemptStore {
    async fn increment(&self, key: &AttemptKey, ttl: Duration) -> Result<u32, Error> {
        let now = now_millis();
        let attempts: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO login_attempts (username, ip_address, attempts, attempts_expire_at)
            VALUES (?1, ?2, 1, ?4)
            ON CONFLICT (username, ip_address) DO UPDATE SET
                attempts = CASE
                    WHEN attempts_expire_at IS NULL OR attempts_expire_at <= ?3 THEN 1
                    ELSE attempts + 1
                END,
                attempts_expire_at = ?4,
                locked_until = CASE WHEN locked_until > ?3 THEN locked_until END
            RETURNING attempts
            "#,
        )
        .bind(&key.username)
        .bind(&key.ip)
        .bind(now)
        .bind(now + millis(ttl))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to increment login attempts", e))?;

        Ok(u32::try_from(attempts).unwrap_or(u32::MAX))
    }

    async fn get(&self, key: &AttemptKey) -> Result<u32, Error> {
        let attempts = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT attempts FROM login_attempts
            WHERE username = ?1 AND ip_address = ?2 AND attempts_expire_at > ?3
            "#,
        )
        .bind(&key.username)
        .bind(&key.ip)
        .bind(now_millis())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to read login attempts", e))?;

        Ok(attempts.map_or(0, |a| u32::try_from(a).unwrap_or(u32::MAX)))
    }

    async fn delete(&self, key: &AttemptKey) -> Result<(), Error> {
        sqlx::query("DELETE FROM login_attempts WHERE username = ?1 AND ip_address = ?2")
            .bind(&key.username)
            .bind(&key.ip)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to clear login attempts", e))?;
        Ok(())
    }

    async fn set_lock(&self, key: &AttemptKey, ttl: Duration) -> Result<(), Error> {
        let now = now_millis();
        sqlx::query(
            r#"
            INSERT INTO login_attempts (username, ip_address, attempts, locked_until)
            VALUES (?1, ?2, 0, ?4)
            ON CONFLICT (username, ip_address) DO UPDATE SET
                attempts = CASE WHEN attempts_expire_at > ?3 THEN attempts ELSE 0 END,
                attempts_expire_at = CASE WHEN attempts_expire_at > ?3 THEN attempts_expire_at END,
                locked_until = ?4
            "#,
        )
        .bind(&key.username)
        .bind(&key.ip)
        .bind(now)
        .bind(now + millis(ttl))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to set login lock", e))?;
        Ok(())
    }

    async fn is_locked(&self, key: &AttemptKey) -> Result<bool, Error> {
        Ok(self.remaining_ttl(key).await?.is_some())
    }

    async fn remaining_ttl(&self, key: &AttemptKey) -> Result<Option<Duration>, Error> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| db_error("Failed to acquire connection", e))?;
        let now = now_millis();
        let until = Self::live_lock(&mut conn, key, now)
            .await
            .map_err(|e| db_error("Failed to read login lock", e))?;
        Ok(until.map(|until| remaining(until, now)))
    }

    async fn record_failure(
        &self,
        key: &AttemptKey,
        threshold: u32,
        window: Duration,
    ) -> Result<FailureOutcome, Error> {
        // Spawned so a dropped caller cannot return the connection to the pool
        // with the transaction still open.
        let pool = self.pool.clone();
        let key = key.clone();
        tokio::spawn(Self::record_failure_immediate(pool, key, threshold, window))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Login failure task did not complete");
                Error::Storage(StorageError::Database(
                    "Failed to record login failure".to_string(),
                ))
            })?
    }

    async fn purge_expired(&self) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM login_attempts
            WHERE (locked_until IS NULL OR locked_until <= ?1)
              AND (attempts_expire_at IS NULL OR attempts_expire_at <= ?1)
            "#,
        )
        .bind(now_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to purge login attempts", e))?;

        Ok(result.rows_affected())
    }
}
