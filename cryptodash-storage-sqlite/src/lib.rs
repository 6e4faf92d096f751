//! SQLite storage backend for cryptodash.
//!
//! [`SqliteRepositoryProvider`] implements every repository trait from
//! `cryptodash-core` over one [`sqlx::SqlitePool`], and [`SqliteAttemptStore`]
//! keeps login-attempt counters in the same database so they survive restarts
//! and are shared between processes.
//!
//! Timestamps are stored as unix seconds, except for the attempt store which
//! needs millisecond resolution.

pub mod attempt_store;
pub mod migrations;
pub mod repositories;

pub use attempt_store::SqliteAttemptStore;
pub use repositories::SqliteRepositoryProvider;

use chrono::{DateTime, Utc};
use cryptodash_core::{Error, error::StorageError};

/// Log a database failure and turn it into a storage error.
pub(crate) fn db_error(context: &str, e: sqlx::Error) -> Error {
    tracing::error!(error = %e, "{context}");
    Error::Storage(StorageError::Database(context.to_string()))
}

/// Like [`db_error`], but unique violations become constraint errors.
pub(crate) fn write_error(context: &str, e: sqlx::Error) -> Error {
    if e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation())
    {
        tracing::debug!(error = %e, "{context}");
        return Error::Storage(StorageError::Constraint(context.to_string()));
    }
    db_error(context, e)
}

pub(crate) fn from_unix(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}
