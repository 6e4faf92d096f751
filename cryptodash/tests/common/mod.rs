#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use cryptodash::{
    AlertNotifier, CryptoDash, CryptoDashBuilder, PriceAlertNotice, Registration,
    SqliteRepositoryProvider, User,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use tokio::sync::Mutex;

pub type Dash = CryptoDash<SqliteRepositoryProvider>;
pub type Builder = CryptoDashBuilder<cryptodash::WithStorage<SqliteRepositoryProvider>>;

pub const PASSWORD: &str = "correct-horse-battery";

/// A builder over a fresh in-memory database.
pub async fn builder() -> Builder {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create pool");
    CryptoDashBuilder::new()
        .with_sqlite_pool(pool)
        .apply_migrations(true)
}

pub async fn setup() -> Dash {
    builder().await.build().await.expect("Failed to build")
}

pub fn pool(dash: &Dash) -> &SqlitePool {
    dash.repositories().pool()
}

pub async fn register(dash: &Dash, username: &str, email: Option<&str>) -> User {
    let registration = Registration {
        username: Some(username.to_string()),
        password: Some(PASSWORD.to_string()),
        email: email.map(str::to_string),
        ..Default::default()
    };
    let (user, _) = dash
        .register(&registration, &cryptodash::ClientInfo::new("127.0.0.1"))
        .await
        .expect("Failed to register");
    user
}

pub async fn seed_prices(pool: &SqlitePool, rows: &[(&str, &str, Option<f64>)]) {
    for (symbol, ts, close) in rows {
        sqlx::query(
            "INSERT INTO prices (symbol, ts_readable, open, high, low, close, volume) VALUES (?1, ?2, ?3, ?3, ?3, ?3, 10.0)",
        )
        .bind(symbol)
        .bind(ts)
        .bind(close)
        .execute(pool)
        .await
        .expect("Failed to seed prices");
    }
}

/// Remembers every notice and answers with `succeed`.
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<PriceAlertNotice>>,
    pub succeed: bool,
}

impl RecordingNotifier {
    pub fn new(succeed: bool) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            succeed,
        })
    }
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn send_price_alert(&self, notice: &PriceAlertNotice) -> bool {
        self.sent.lock().await.push(notice.clone());
        self.succeed
    }
}
