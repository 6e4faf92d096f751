use async_trait::async_trait;
use cryptodash_core::{Error, UserId, repositories::WatchlistRepository};
use sqlx::SqlitePool;

use crate::db_error;

pub struct SqliteWatchlistRepository {
    pool: SqlitePool,
}

impl SqliteWatchlistRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatchlistRepository for SqliteWatchlistRepository {
    async fn add(&self, user_id: &UserId, symbol: &str) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO watchlist (user_id, symbol, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (user_id, symbol) DO NOTHING
            "#,
        )
        .bind(user_id.as_str())
        .bind(symbol)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to add watchlist symbol", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, user_id: &UserId, symbol: &str) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM watchlist WHERE user_id = ?1 AND symbol = ?2")
            .bind(user_id.as_str())
            .bind(symbol)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to remove watchlist symbol", e))?;

        Ok(result.rows_affected())
    }

    async fn list(&self, user_id: &UserId) -> Result<Vec<String>, Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT symbol FROM watchlist WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list watchlist", e))
    }
}
