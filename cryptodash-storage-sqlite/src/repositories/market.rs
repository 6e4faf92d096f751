//! Read-only queries over the `prices` and `coins` tables.
//!
//! "Latest" always means the greatest `ts_readable`, with the row id breaking
//! ties.

use async_trait::async_trait;
use cryptodash_core::{
    Error,
    market::{Coin, MarketStats, PriceRow},
    repositories::MarketRepository,
};
use sqlx::SqlitePool;

use crate::db_error;

const PRICE_COLUMNS: &str = "rowid AS rowid, symbol, yahoo_symbol, ts_readable, open, high, low, \
     close, adj_close, volume, liquidity";

#[derive(Debug, Clone, sqlx::FromRow)]
struct SqlitePriceRow {
    rowid: i64,
    symbol: Option<String>,
    yahoo_symbol: Option<String>,
    ts_readable: Option<String>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    adj_close: Option<f64>,
    volume: Option<f64>,
    liquidity: Option<f64>,
}

impl From<SqlitePriceRow> for PriceRow {
    fn from(row: SqlitePriceRow) -> Self {
        PriceRow {
            rowid: row.rowid,
            symbol: row.symbol.unwrap_or_default(),
            yahoo_symbol: row.yahoo_symbol,
            ts_readable: row.ts_readable,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            adj_close: row.adj_close,
            volume: row.volume,
            liquidity: row.liquidity,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteStats {
    distinct_symbols: i64,
    latest_ts: Option<String>,
    symbols_with_volume: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteTopVolume {
    symbol: String,
    total_volume: f64,
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteCoin {
    id: i64,
    name: String,
    symbol: String,
}

pub struct SqliteMarketRepository {
    pool: SqlitePool,
}

impl SqliteMarketRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarketRepository for SqliteMarketRepository {
    async fn distinct_symbols(&self, limit: u32) -> Result<Vec<String>, Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT symbol FROM prices
            WHERE symbol IS NOT NULL AND symbol != ''
            ORDER BY symbol
            LIMIT ?1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list symbols", e))
    }

    async fn latest_for_symbol(&self, symbol: &str) -> Result<Option<PriceRow>, Error> {
        let row = sqlx::query_as::<_, SqlitePriceRow>(&format!(
            r#"
            SELECT {PRICE_COLUMNS} FROM prices
            WHERE symbol = ?1
            ORDER BY ts_readable DESC, rowid DESC
            LIMIT 1
            "#
        ))
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load latest price", e))?;

        Ok(row.map(PriceRow::from))
    }

    async fn latest_per_symbol(&self, limit: u32) -> Result<Vec<PriceRow>, Error> {
        let rows = sqlx::query_as::<_, SqlitePriceRow>(&format!(
            r#"
            SELECT * FROM (
                SELECT {PRICE_COLUMNS},
                       ROW_NUMBER() OVER (
                           PARTITION BY symbol ORDER BY ts_readable DESC, rowid DESC
                       ) AS rn
                FROM prices
                WHERE symbol IS NOT NULL AND symbol != ''
            )
            WHERE rn = 1
            ORDER BY ts_readable DESC, rowid DESC
            LIMIT ?1
            "#
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load latest prices", e))?;

        Ok(rows.into_iter().map(PriceRow::from).collect())
    }

    async fn history(&self, symbol: &str, limit: u32) -> Result<Vec<PriceRow>, Error> {
        let rows = sqlx::query_as::<_, SqlitePriceRow>(&format!(
            r#"
            SELECT {PRICE_COLUMNS} FROM prices
            WHERE symbol = ?1
            ORDER BY ts_readable DESC, rowid DESC
            LIMIT ?2
            "#
        ))
        .bind(symbol)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load price history", e))?;

        Ok(rows.into_iter().map(PriceRow::from).collect())
    }

    async fn stats(&self) -> Result<MarketStats, Error> {
        let stats = sqlx::query_as::<_, SqliteStats>(
            r#"
            SELECT
                COUNT(DISTINCT symbol) AS distinct_symbols,
                MAX(ts_readable) AS latest_ts,
                COUNT(DISTINCT CASE WHEN volume > 0 THEN symbol END) AS symbols_with_volume
            FROM prices
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to compute market stats", e))?;

        let top = sqlx::query_as::<_, SqliteTopVolume>(
            r#"
            SELECT symbol, CAST(SUM(volume) AS REAL) AS total_volume
            FROM prices
            WHERE symbol IS NOT NULL AND volume IS NOT NULL
            GROUP BY symbol
            ORDER BY total_volume DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to compute top volume", e))?;

        Ok(MarketStats {
            distinct_symbols: stats.distinct_symbols,
            latest_ts: stats.latest_ts,
            symbols_with_volume: stats.symbols_with_volume,
            top_volume: top.map(|t| (t.symbol, t.total_volume)),
        })
    }

    async fn active_coins(&self) -> Result<Vec<Coin>, Error> {
        let rows = sqlx::query_as::<_, SqliteCoin>(
            "SELECT id, name, symbol FROM coins WHERE active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list coins", e))?;

        Ok(rows
            .into_iter()
            .map(|c| Coin {
                id: c.id,
                name: c.name,
                symbol: c.symbol,
            })
            .collect())
    }
}
