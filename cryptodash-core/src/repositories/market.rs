use async_trait::async_trait;

use crate::{
    Error,
    market::{Coin, MarketStats, PriceRow},
};

/// Read-only access to ingested prices and the coin catalogue.
///
/// "Latest" always means the greatest `ts_readable`.
#[async_trait]
pub trait MarketRepository: Send + Sync + 'static {
    /// Distinct symbols, ascending
    async fn distinct_symbols(&self, limit: u32) -> Result<Vec<String>, Error>;

    /// Latest row for one symbol
    async fn latest_for_symbol(&self, symbol: &str) -> Result<Option<PriceRow>, Error>;

    /// Latest row of each symbol, newest first
    async fn latest_per_symbol(&self, limit: u32) -> Result<Vec<PriceRow>, Error>;

    /// Rows for one symbol, newest first
    async fn history(&self, symbol: &str, limit: u32) -> Result<Vec<PriceRow>, Error>;

    /// Aggregates over the whole table
    async fn stats(&self) -> Result<MarketStats, Error>;

    /// Active coins ordered by name
    async fn active_coins(&self) -> Result<Vec<Coin>, Error>;
}
