//! Repository implementations for SQLite storage

pub mod alert;
pub mod error_log;
pub mod market;
pub mod password;
pub mod session;
pub mod user;
pub mod watchlist;

pub use alert::SqliteAlertRepository;
pub use error_log::SqliteErrorLogRepository;
pub use market::SqliteMarketRepository;
pub use password::SqlitePasswordRepository;
pub use session::SqliteSessionRepository;
pub use user::SqliteUserRepository;
pub use watchlist::SqliteWatchlistRepository;

use async_trait::async_trait;
use cryptodash_core::{
    Error,
    error::StorageError,
    repositories::{
        AlertRepositoryProvider, ErrorLogRepositoryProvider, MarketRepositoryProvider,
        PasswordRepositoryProvider, RepositoryProvider, SessionRepositoryProvider,
        UserRepositoryProvider, WatchlistRepositoryProvider,
    },
};
use sqlx::SqlitePool;

use crate::{
    SqliteAttemptStore, db_error,
    migrations::{self, MigrationManager, SqliteMigrationManager},
};

/// Repository provider implementation for SQLite
///
/// Implements every individual provider trait as well as the unified
/// [`RepositoryProvider`]. All repositories share one pool.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    user: SqliteUserRepository,
    session: SqliteSessionRepository,
    password: SqlitePasswordRepository,
    alert: SqliteAlertRepository,
    watchlist: SqliteWatchlistRepository,
    market: SqliteMarketRepository,
    error_log: SqliteErrorLogRepository,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            user: SqliteUserRepository::new(pool.clone()),
            session: SqliteSessionRepository::new(pool.clone()),
            password: SqlitePasswordRepository::new(pool.clone()),
            alert: SqliteAlertRepository::new(pool.clone()),
            watchlist: SqliteWatchlistRepository::new(pool.clone()),
            market: SqliteMarketRepository::new(pool.clone()),
            error_log: SqliteErrorLogRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// An attempt store over the same database.
    pub fn attempt_store(&self) -> SqliteAttemptStore {
        SqliteAttemptStore::new(self.pool.clone())
    }
}

impl UserRepositoryProvider for SqliteRepositoryProvider {
    type UserRepo = SqliteUserRepository;

    fn user(&self) -> &Self::UserRepo {
        &self.user
    }
}

impl SessionRepositoryProvider for SqliteRepositoryProvider {
    type SessionRepo = SqliteSessionRepository;

    fn session(&self) -> &Self::SessionRepo {
        &self.session
    }
}

impl PasswordRepositoryProvider for SqliteRepositoryProvider {
    type PasswordRepo = SqlitePasswordRepository;

    fn password(&self) -> &Self::PasswordRepo {
        &self.password
    }
}

impl AlertRepositoryProvider for SqliteRepositoryProvider {
    type AlertRepo = SqliteAlertRepository;

    fn alert(&self) -> &Self::AlertRepo {
        &self.alert
    }
}

impl WatchlistRepositoryProvider for SqliteRepositoryProvider {
    type WatchlistRepo = SqliteWatchlistRepository;

    fn watchlist(&self) -> &Self::WatchlistRepo {
        &self.watchlist
    }
}

impl MarketRepositoryProvider for SqliteRepositoryProvider {
    type MarketRepo = SqliteMarketRepository;

    fn market(&self) -> &Self::MarketRepo {
        &self.market
    }
}

impl ErrorLogRepositoryProvider for SqliteRepositoryProvider {
    type ErrorLogRepo = SqliteErrorLogRepository;

    fn error_log(&self) -> &Self::ErrorLogRepo {
        &self.error_log
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            Error::Storage(StorageError::Migration(
                "Failed to initialize migrations".to_string(),
            ))
        })?;

        manager.up(&migrations::all()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            Error::Storage(StorageError::Migration(
                "Failed to run migrations".to_string(),
            ))
        })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Connection(e.to_string())))?;
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>, Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list tables", e))
    }
}
