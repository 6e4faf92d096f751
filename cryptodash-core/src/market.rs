//! Market data read models.
//!
//! Prices are ingested by an external job into a `prices` table; this crate
//! only reads it. Each row is one observation of one symbol. The views below
//! derive ticker and candle shapes from those rows.
use serde::Serialize;

pub const EXCHANGES_LIMIT: u32 = 100;
pub const TICKERS_DEFAULT_LIMIT: u32 = 50;
pub const TICKERS_MAX_LIMIT: u32 = 5000;
pub const CANDLES_DEFAULT_LIMIT: u32 = 90;
pub const CANDLES_MAX_LIMIT: u32 = 1000;

/// One row of the `prices` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceRow {
    pub rowid: i64,
    pub symbol: String,
    pub yahoo_symbol: Option<String>,
    pub ts_readable: Option<String>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adj_close: Option<f64>,
    pub volume: Option<f64>,
    pub liquidity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    pub exchange_id: String,
    pub name: String,
}

impl Exchange {
    pub fn for_symbol(symbol: &str) -> Self {
        Self {
            exchange_id: symbol.to_string(),
            name: symbol.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticker {
    pub exchange: Exchange,
    pub market_symbol: String,
    pub captured_at: Option<String>,
    pub last: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub base_volume_24h: f64,
    pub quote_volume_24h: f64,
    pub liquidity: f64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub spread_bps: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candle {
    pub exchange: Exchange,
    pub market_symbol: String,
    pub time: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume_base: Option<f64>,
    pub volume_quote_est: f64,
}

/// Aggregates over the whole `prices` table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketStats {
    pub distinct_symbols: i64,
    pub latest_ts: Option<String>,
    pub symbols_with_volume: i64,
    /// Symbol with the largest summed volume, and that sum.
    pub top_volume: Option<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopVolumeMarket {
    pub market_symbol: String,
    pub quote_volume_24h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub exchanges: i64,
    pub distinct_markets: i64,
    pub latest_candle_date: Option<String>,
    pub latest_ticker_ts: Option<String>,
    pub markets_with_liquidity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_volume_market: Option<TopVolumeMarket>,
}

impl From<MarketStats> for MarketSummary {
    fn from(stats: MarketStats) -> Self {
        Self {
            exchanges: stats.distinct_symbols,
            distinct_markets: stats.distinct_symbols,
            latest_candle_date: stats.latest_ts.as_deref().map(date_part),
            latest_ticker_ts: stats.latest_ts,
            markets_with_liquidity: stats.symbols_with_volume,
            top_volume_market: stats.top_volume.map(|(symbol, volume)| TopVolumeMarket {
                market_symbol: market_symbol(&symbol),
                quote_volume_24h: volume,
            }),
        }
    }
}

/// A coin the frontend offers for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coin {
    pub id: i64,
    pub name: String,
    pub symbol: String,
}

pub fn market_symbol(symbol: &str) -> String {
    format!("{symbol}/USD")
}

/// The date portion of an ISO-like timestamp (`2024-05-01T00:00:00` -> `2024-05-01`).
pub fn date_part(ts: &str) -> String {
    ts.split_once('T')
        .map_or(ts, |(date, _)| date)
        .to_string()
}

/// Parse a `limit` query value. Missing, empty or unparseable values give
/// `default`; anything else is clamped to `1..=max`.
pub fn clamp_limit(raw: Option<&str>, default: u32, max: u32) -> u32 {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return default;
    };
    match raw.parse::<i64>() {
        Ok(parsed) => {
            let clamped = parsed.clamp(1, i64::from(max)) as u32;
            if i64::from(clamped) != parsed {
                tracing::debug!(parsed, clamped, "Clamped limit");
            }
            clamped
        }
        Err(_) => {
            tracing::debug!(value = raw, default, "Invalid limit value, using default");
            default
        }
    }
}

fn non_zero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

impl PriceRow {
    /// Last traded price: close, else adjusted close, else open, else zero.
    pub fn last_price(&self) -> f64 {
        self.close
            .or(self.adj_close)
            .or(non_zero(self.open))
            .unwrap_or(0.0)
    }

    /// Close price used for candles: close, else adjusted close, else zero.
    pub fn candle_close(&self) -> f64 {
        self.close.or(self.adj_close).unwrap_or(0.0)
    }

    /// Price used by the alert checker: close, else adjusted close.
    pub fn alert_price(&self) -> Option<f64> {
        self.close.or(self.adj_close)
    }

    /// `None` for rows without a symbol.
    pub fn to_ticker(&self) -> Option<Ticker> {
        if self.symbol.is_empty() {
            return None;
        }
        let last = self.last_price();
        let volume = self.volume.unwrap_or(0.0);
        Some(Ticker {
            exchange: Exchange::for_symbol(&self.symbol),
            market_symbol: market_symbol(&self.symbol),
            captured_at: self.ts_readable.clone(),
            last,
            high_24h: non_zero(self.high).unwrap_or(last),
            low_24h: non_zero(self.low).unwrap_or(last),
            base_volume_24h: volume,
            quote_volume_24h: volume * last,
            liquidity: self.liquidity.unwrap_or(0.0),
            bid: None,
            ask: None,
            spread_bps: None,
        })
    }

    /// `None` for rows without a timestamp.
    pub fn to_candle(&self) -> Option<Candle> {
        let time = self.ts_readable.clone().filter(|ts| !ts.is_empty())?;
        let close = self.candle_close();
        Some(Candle {
            exchange: Exchange::for_symbol(&self.symbol),
            market_symbol: market_symbol(&self.symbol),
            time,
            open: self.open,
            high: self.high,
            low: self.low,
            close,
            volume_base: self.volume,
            volume_quote_est: self.volume.unwrap_or(0.0) * close,
        })
    }
}
