//! Versioned schema migrations.
//!
//! Each migration runs in its own transaction together with the row that
//! records it in [`MIGRATION_TABLE`], so a failed migration leaves no trace.
//! The `prices` table is written by the external ingestion job; it is created
//! here only if missing so a fresh database can be queried.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;

pub const MIGRATION_TABLE: &str = "_cryptodash_migrations";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Migration failed: {0}")]
    Migration(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, MigrationError>;

#[async_trait]
pub trait Migration: Send + Sync {
    /// Execute the migration
    async fn up<'a>(&'a self, conn: &'a mut SqliteConnection) -> Result<()>;

    /// Rollback the migration
    async fn down<'a>(&'a self, conn: &'a mut SqliteConnection) -> Result<()>;

    /// Unique version number for ordering migrations
    fn version(&self) -> i64;

    /// Human readable name of the migration
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: i64,
}

#[async_trait]
pub trait MigrationManager: Send + Sync {
    /// Create the tracking table
    async fn initialize(&self) -> Result<()>;

    /// Apply pending migrations in order
    async fn up(&self, migrations: &[Box<dyn Migration>]) -> Result<()>;

    /// Roll back applied migrations, last first
    async fn down(&self, migrations: &[Box<dyn Migration>]) -> Result<()>;

    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>>;

    async fn is_applied(&self, version: i64) -> Result<bool>;
}

pub struct SqliteMigrationManager {
    pool: SqlitePool,
}

impl SqliteMigrationManager {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MigrationManager for SqliteMigrationManager {
    async fn initialize(&self) -> Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {MIGRATION_TABLE} (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at INTEGER NOT NULL DEFAULT (unixepoch())
            );"#
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn up(&self, migrations: &[Box<dyn Migration>]) -> Result<()> {
        for migration in migrations {
            if self.is_applied(migration.version()).await? {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            tracing::info!(
                version = migration.version(),
                name = migration.name(),
                "Applying migration"
            );

            migration.up(&mut *tx).await?;

            sqlx::query(&format!(
                "INSERT INTO {MIGRATION_TABLE} (version, name, applied_at) VALUES (?1, ?2, ?3)"
            ))
            .bind(migration.version())
            .bind(migration.name())
            .bind(Utc::now().timestamp())
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
        }
        Ok(())
    }

    async fn down(&self, migrations: &[Box<dyn Migration>]) -> Result<()> {
        for migration in migrations.iter().rev() {
            if !self.is_applied(migration.version()).await? {
                continue;
            }

            let mut tx = self.pool.begin().await?;
            tracing::info!(
                version = migration.version(),
                name = migration.name(),
                "Rolling back migration"
            );

            migration.down(&mut *tx).await?;

            sqlx::query(&format!("DELETE FROM {MIGRATION_TABLE} WHERE version = ?1"))
                .bind(migration.version())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
        }
        Ok(())
    }

    async fn get_applied_migrations(&self) -> Result<Vec<MigrationRecord>> {
        let records = sqlx::query_as::<_, MigrationRecord>(&format!(
            "SELECT version, name, applied_at FROM {MIGRATION_TABLE} ORDER BY version"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn is_applied(&self, version: i64) -> Result<bool> {
        let applied: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS(SELECT 1 FROM {MIGRATION_TABLE} WHERE version = ?1)"
        ))
        .bind(version)
        .fetch_one(&self.pool)
        .await?;
        Ok(applied)
    }
}

/// A migration made of plain SQL statements.
pub struct SqlMigration {
    version: i64,
    name: &'static str,
    up: &'static [&'static str],
    down: &'static [&'static str],
}

impl SqlMigration {
    pub const fn new(
        version: i64,
        name: &'static str,
        up: &'static [&'static str],
        down: &'static [&'static str],
    ) -> Self {
        Self {
            version,
            name,
            up,
            down,
        }
    }
}

async fn run_statements(conn: &mut SqliteConnection, statements: &[&str]) -> Result<()> {
    for statement in statements {
        sqlx::query(statement).execute(&mut *conn).await?;
    }
    Ok(())
}

#[async_trait]
impl Migration for SqlMigration {
    async fn up<'a>(&'a self, conn: &'a mut SqliteConnection) -> Result<()> {
        run_statements(conn, self.up).await
    }

    async fn down<'a>(&'a self, conn: &'a mut SqliteConnection) -> Result<()> {
        run_statements(conn, self.down).await
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn name(&self) -> &str {
        self.name
    }
}

pub const CREATE_USERS_TABLE: SqlMigration = SqlMigration::new(
    1,
    "CreateUsersTable",
    &[r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT UNIQUE,
        first_name TEXT NOT NULL DEFAULT '',
        last_name TEXT NOT NULL DEFAULT '',
        avatar TEXT,
        is_staff INTEGER NOT NULL DEFAULT 0,
        password_hash TEXT,
        created_at INTEGER NOT NULL DEFAULT (unixepoch()),
        updated_at INTEGER NOT NULL DEFAULT (unixepoch())
    );"#],
    &["DROP TABLE IF EXISTS users"],
);

pub const CREATE_SESSIONS_TABLE: SqlMigration = SqlMigration::new(
    2,
    "CreateSessionsTable",
    &[
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            user_agent TEXT,
            ip_address TEXT,
            created_at INTEGER NOT NULL,
            last_activity INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );"#,
        "CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)",
    ],
    &["DROP TABLE IF EXISTS sessions"],
);

pub const CREATE_ALERTS_TABLE: SqlMigration = SqlMigration::new(
    3,
    "CreateAlertsTable",
    &[
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            crypto TEXT NOT NULL,
            symbol TEXT NOT NULL,
            condition TEXT NOT NULL CHECK (condition IN ('above', 'below')),
            price REAL NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            is_triggered INTEGER NOT NULL DEFAULT 0,
            last_triggered_at INTEGER,
            last_sent_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );"#,
        "CREATE INDEX IF NOT EXISTS idx_alerts_user_id ON alerts(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_alerts_active ON alerts(active)",
    ],
    &["DROP TABLE IF EXISTS alerts"],
);

pub const CREATE_WATCHLIST_TABLE: SqlMigration = SqlMigration::new(
    4,
    "CreateWatchlistTable",
    &[r#"
    CREATE TABLE IF NOT EXISTS watchlist (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        symbol TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE,
        UNIQUE (user_id, symbol)
    );"#],
    &["DROP TABLE IF EXISTS watchlist"],
);

pub const CREATE_MARKET_TABLES: SqlMigration = SqlMigration::new(
    5,
    "CreateMarketTables",
    &[
        r#"
        CREATE TABLE IF NOT EXISTS prices (
            symbol TEXT,
            yahoo_symbol TEXT,
            ts_readable TEXT,
            open REAL,
            high REAL,
            low REAL,
            close REAL,
            adj_close REAL,
            volume REAL,
            liquidity REAL
        );"#,
        "CREATE INDEX IF NOT EXISTS idx_prices_symbol_ts ON prices(symbol, ts_readable)",
        r#"
        CREATE TABLE IF NOT EXISTS coins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            symbol TEXT NOT NULL UNIQUE,
            active INTEGER NOT NULL DEFAULT 1
        );"#,
    ],
    &["DROP TABLE IF EXISTS coins", "DROP TABLE IF EXISTS prices"],
);

pub const CREATE_ERROR_LOGS_TABLE: SqlMigration = SqlMigration::new(
    6,
    "CreateErrorLogsTable",
    &[
        r#"
        CREATE TABLE IF NOT EXISTS error_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            error_type TEXT NOT NULL,
            endpoint TEXT,
            status INTEGER,
            message TEXT NOT NULL,
            stack_trace TEXT,
            user_id TEXT,
            timestamp INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE SET NULL
        );"#,
        "CREATE INDEX IF NOT EXISTS idx_error_logs_type ON error_logs(error_type)",
        "CREATE INDEX IF NOT EXISTS idx_error_logs_timestamp ON error_logs(timestamp)",
    ],
    &["DROP TABLE IF EXISTS error_logs"],
);

pub const CREATE_LOGIN_ATTEMPTS_TABLE: SqlMigration = SqlMigration::new(
    7,
    "CreateLoginAttemptsTable",
    &[r#"
    CREATE TABLE IF NOT EXISTS login_attempts (
        username TEXT NOT NULL,
        ip_address TEXT NOT NULL,
        attempts INTEGER NOT NULL DEFAULT 0,
        attempts_expire_at INTEGER,
        locked_until INTEGER,
        PRIMARY KEY (username, ip_address)
    );"#],
    &["DROP TABLE IF EXISTS login_attempts"],
);

/// Every migration, in application order.
pub fn all() -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(CREATE_USERS_TABLE),
        Box::new(CREATE_SESSIONS_TABLE),
        Box::new(CREATE_ALERTS_TABLE),
        Box::new(CREATE_WATCHLIST_TABLE),
        Box::new(CREATE_MARKET_TABLES),
        Box::new(CREATE_ERROR_LOGS_TABLE),
        Box::new(CREATE_LOGIN_ATTEMPTS_TABLE),
    ]
}
