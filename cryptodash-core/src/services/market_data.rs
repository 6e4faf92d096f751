use std::sync::Arc;

use crate::{
    Error,
    error::NotFoundError,
    market::{
        CANDLES_DEFAULT_LIMIT, CANDLES_MAX_LIMIT, Candle, Coin, EXCHANGES_LIMIT, Exchange,
        MarketSummary, TICKERS_DEFAULT_LIMIT, TICKERS_MAX_LIMIT, Ticker, clamp_limit,
    },
    repositories::MarketRepository,
};

/// Read-side views over the `prices` table
pub struct MarketDataService<R: MarketRepository> {
    repository: Arc<R>,
}

impl<R: MarketRepository> MarketDataService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// One pseudo-exchange per distinct symbol, ascending
    pub async fn exchanges(&self) -> Result<Vec<Exchange>, Error> {
        Ok(self
            .repository
            .distinct_symbols(EXCHANGES_LIMIT)
            .await?
            .iter()
            .map(|symbol| Exchange::for_symbol(symbol))
            .collect())
    }

    /// Latest ticker of `base`, or of every symbol when `base` is absent.
    pub async fn tickers(
        &self,
        base: Option<&str>,
        limit: Option<&str>,
    ) -> Result<Vec<Ticker>, Error> {
        let base = base.map(str::trim).filter(|b| !b.is_empty());

        if let Some(base) = base {
            let symbol = base.to_uppercase();
            let row = self
                .repository
                .latest_for_symbol(&symbol)
                .await?
                .ok_or_else(|| Error::NotFound(NotFoundError::Symbol(symbol.clone())))?;
            return Ok(row.to_ticker().into_iter().collect());
        }

        let limit = clamp_limit(limit, TICKERS_DEFAULT_LIMIT, TICKERS_MAX_LIMIT);
        Ok(self
            .repository
            .latest_per_symbol(limit)
            .await?
            .iter()
            .filter_map(|row| row.to_ticker())
            .collect())
    }

    /// Most recent candles of `symbol`, newest first.
    pub async fn candles(&self, symbol: &str, limit: Option<&str>) -> Result<Vec<Candle>, Error> {
        let symbol = symbol.trim().to_uppercase();
        let limit = clamp_limit(limit, CANDLES_DEFAULT_LIMIT, CANDLES_MAX_LIMIT);

        let rows = self.repository.history(&symbol, limit).await?;
        if rows.is_empty() {
            return Err(Error::NotFound(NotFoundError::CandleData(symbol)));
        }
        Ok(rows.iter().filter_map(|row| row.to_candle()).collect())
    }

    pub async fn summary(&self) -> Result<MarketSummary, Error> {
        Ok(self.repository.stats().await?.into())
    }

    pub async fn supported_coins(&self) -> Result<Vec<Coin>, Error> {
        self.repository.active_coins().await
    }

    /// Price the alert checker compares against: the latest close, else adjusted close.
    pub async fn current_price(&self, symbol: &str) -> Result<Option<f64>, Error> {
        Ok(self
            .repository
            .latest_for_symbol(symbol)
            .await?
            .and_then(|row| row.alert_price()))
    }
}
