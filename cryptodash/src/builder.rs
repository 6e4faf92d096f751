//! Builder for [`CryptoDash`] instances.
//!
//! Storage has to be chosen before anything can be built; the type parameter
//! of [`CryptoDashBuilder`] tracks whether it has been.
//!
//! ```rust,no_run
//! use cryptodash::{CryptoDashBuilder, UpstreamConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let dash = CryptoDashBuilder::new()
//!     .with_sqlite("sqlite://crypto.db?mode=rwc")
//!     .await?
//!     .with_sqlite_attempt_store()
//!     .with_upstream(UpstreamConfig::from_env())
//!     .with_media_root("./media")
//!     .apply_migrations(true)
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::{path::PathBuf, sync::Arc};

use cryptodash_core::{
    AttemptStore, EventHandler, LockoutConfig, MemoryAttemptStore, RepositoryProvider,
    services::{AlertNotifier, LoginAttemptService, SessionConfig},
};
use cryptodash_upstream::{UpstreamClients, UpstreamConfig};

use crate::{CryptoDash, MediaStorage};

pub const DEFAULT_MEDIA_ROOT: &str = "./media";

#[derive(Debug, thiserror::Error)]
pub enum CryptoDashBuilderError {
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// No storage configured yet.
pub struct NoStorage;

/// Storage configured; the builder can now be finished.
pub struct WithStorage<R: RepositoryProvider> {
    repositories: Arc<R>,
}

pub struct CryptoDashBuilder<Storage> {
    storage: Storage,
    session_config: SessionConfig,
    lockout_config: LockoutConfig,
    attempt_store: Option<Arc<dyn AttemptStore>>,
    upstream_config: UpstreamConfig,
    notifier: Option<Arc<dyn AlertNotifier>>,
    event_handlers: Vec<Arc<dyn EventHandler>>,
    media_root: PathBuf,
    apply_migrations: bool,
}

impl Default for CryptoDashBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoDashBuilder<NoStorage> {
    /// Defaults: 30 minute idle sessions, lockout after 5 failures for 15
    /// minutes, in-memory attempt counters, local microservice URLs,
    /// `./media` as media root, no automatic migrations.
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            session_config: SessionConfig::default(),
            lockout_config: LockoutConfig::default(),
            attempt_store: None,
            upstream_config: UpstreamConfig::default(),
            notifier: None,
            event_handlers: Vec::new(),
            media_root: PathBuf::from(DEFAULT_MEDIA_ROOT),
            apply_migrations: false,
        }
    }

    /// Use any repository provider.
    pub fn with_repositories<R: RepositoryProvider>(
        self,
        repositories: Arc<R>,
    ) -> CryptoDashBuilder<WithStorage<R>> {
        self.with_storage(WithStorage { repositories })
    }

    fn with_storage<S>(self, storage: S) -> CryptoDashBuilder<S> {
        CryptoDashBuilder {
            storage,
            session_config: self.session_config,
            lockout_config: self.lockout_config,
            attempt_store: self.attempt_store,
            upstream_config: self.upstream_config,
            notifier: self.notifier,
            event_handlers: self.event_handlers,
            media_root: self.media_root,
            apply_migrations: self.apply_migrations,
        }
    }
}

#[cfg(feature = "sqlite")]
impl CryptoDashBuilder<NoStorage> {
    /// Connect to the SQLite database at `url`.
    ///
    /// Every connection to `sqlite::memory:` opens a separate database; pass
    /// a single-connection pool to [`Self::with_sqlite_pool`] for that case.
    pub async fn with_sqlite(
        self,
        url: &str,
    ) -> Result<CryptoDashBuilder<WithStorage<crate::SqliteRepositoryProvider>>, CryptoDashBuilderError>
    {
        let pool = sqlx::SqlitePool::connect(url)
            .await
            .map_err(|e| CryptoDashBuilderError::StorageConnection(e.to_string()))?;
        Ok(self.with_sqlite_pool(pool))
    }

    pub fn with_sqlite_pool(
        self,
        pool: sqlx::SqlitePool,
    ) -> CryptoDashBuilder<WithStorage<crate::SqliteRepositoryProvider>> {
        self.with_repositories(Arc::new(crate::SqliteRepositoryProvider::new(pool)))
    }
}

#[cfg(feature = "sqlite")]
impl CryptoDashBuilder<WithStorage<crate::SqliteRepositoryProvider>> {
    /// Keep attempt counters in the database instead of process memory, so
    /// they survive restarts and are shared by every server process.
    pub fn with_sqlite_attempt_store(mut self) -> Self {
        self.attempt_store = Some(Arc::new(self.storage.repositories.attempt_store()));
        self
    }
}

impl<R: RepositoryProvider> CryptoDashBuilder<WithStorage<R>> {
    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    pub fn with_lockout_config(mut self, config: LockoutConfig) -> Self {
        self.lockout_config = config;
        self
    }

    /// Default: [`MemoryAttemptStore`]
    pub fn with_attempt_store(mut self, store: Arc<dyn AttemptStore>) -> Self {
        self.attempt_store = Some(store);
        self
    }

    pub fn with_upstream(mut self, config: UpstreamConfig) -> Self {
        self.upstream_config = config;
        self
    }

    /// Replace the notification-service client used for alert e-mails.
    pub fn with_notifier(mut self, notifier: Arc<dyn AlertNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.event_handlers.push(handler);
        self
    }

    pub fn with_media_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.media_root = root.into();
        self
    }

    pub fn apply_migrations(mut self, apply: bool) -> Self {
        self.apply_migrations = apply;
        self
    }

    pub async fn build(self) -> Result<CryptoDash<R>, CryptoDashBuilderError> {
        let repositories = self.storage.repositories;
        if self.apply_migrations {
            repositories
                .migrate()
                .await
                .map_err(|e| CryptoDashBuilderError::Migration(e.to_string()))?;
        }

        let upstream = UpstreamClients::new(&self.upstream_config)
            .map_err(|e| CryptoDashBuilderError::InvalidConfiguration(e.to_string()))?;
        let notifier: Arc<dyn AlertNotifier> = match self.notifier {
            Some(notifier) => notifier,
            None => Arc::new(upstream.notification.clone()),
        };
        let attempt_store: Arc<dyn AttemptStore> = match self.attempt_store {
            Some(store) => store,
            None => Arc::new(MemoryAttemptStore::new()),
        };

        Ok(CryptoDash::from_builder(
            repositories,
            self.session_config,
            LoginAttemptService::new(attempt_store, self.lockout_config),
            upstream,
            notifier,
            MediaStorage::new(self.media_root),
            self.event_handlers,
        )
        .await)
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::time::Duration;

    async fn memory_pool() -> sqlx::SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_build_with_migrations() {
        let dash = CryptoDashBuilder::new()
            .with_sqlite_pool(memory_pool().await)
            .apply_migrations(true)
            .build()
            .await
            .unwrap();

        assert!(dash.health().await.is_ok());
        assert_eq!(dash.lockout_config().max_attempts, 5);
        assert_eq!(dash.session_config().lifetime_seconds(), 1800);
    }

    #[tokio::test]
    async fn test_custom_configuration() {
        let dash = CryptoDashBuilder::new()
            .with_sqlite_pool(memory_pool().await)
            .with_sqlite_attempt_store()
            .with_lockout_config(LockoutConfig::new(3, Duration::from_secs(60)))
            .with_media_root("/tmp/cryptodash-media")
            .apply_migrations(true)
            .build()
            .await
            .unwrap();

        assert_eq!(dash.lockout_config().max_attempts, 3);
        assert_eq!(dash.lockout_config().lockout_minutes(), 1);
        assert_eq!(dash.media().root(), std::path::Path::new("/tmp/cryptodash-media"));
    }

    #[tokio::test]
    async fn test_without_migrations_health_reports_missing_tables() {
        let dash = CryptoDashBuilder::new()
            .with_sqlite_pool(memory_pool().await)
            .build()
            .await
            .unwrap();

        let health = dash.health().await;
        assert_eq!(health.status, "error");
        assert!(!health.table_exists);
        assert!(health.tables.is_empty());
    }
}
