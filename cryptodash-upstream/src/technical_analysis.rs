use std::str::FromStr;

use cryptodash_core::error::ValidationError;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::{
    client::{build_client, post_json},
    config::endpoint,
    error::{Result, Service, UpstreamError},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Timeframe {
    #[default]
    #[serde(rename = "1d")]
    Day,
    #[serde(rename = "1w")]
    Week,
    #[serde(rename = "1m")]
    Month,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::Day, Timeframe::Week, Timeframe::Month];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Day => "1d",
            Timeframe::Week => "1w",
            Timeframe::Month => "1m",
        }
    }
}

impl FromStr for Timeframe {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "1d" => Ok(Timeframe::Day),
            "1w" => Ok(Timeframe::Week),
            "1m" => Ok(Timeframe::Month),
            other => Err(ValidationError::InvalidTimeframe(other.to_string())),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    symbol: &'a str,
    timeframe: Timeframe,
}

/// Client for the indicator service's `/analyze` endpoint.
#[derive(Debug, Clone)]
pub struct TechnicalAnalysisClient {
    http: Client,
    url: String,
}

impl TechnicalAnalysisClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: build_client(None)?,
            url: endpoint(base_url, "analyze"),
        })
    }

    /// Analysis of `symbol` (upper-cased before sending) over one timeframe.
    pub async fn analyze(&self, symbol: &str, timeframe: Timeframe) -> Result<Value> {
        let symbol = symbol.to_uppercase();
        tracing::debug!(symbol = %symbol, timeframe = %timeframe, "Requesting technical analysis");
        post_json(
            &self.http,
            Service::TechnicalAnalysis,
            &self.url,
            &AnalyzeRequest {
                symbol: &symbol,
                timeframe,
            },
        )
        .await
    }

    /// All three timeframes keyed by name. A failing timeframe gets an
    /// `{error}` entry instead of failing the whole call.
    pub async fn analyze_all(&self, symbol: &str) -> Value {
        let mut results = Map::new();
        for timeframe in Timeframe::ALL {
            let entry = match self.analyze(symbol, timeframe).await {
                Ok(analysis) => analysis,
                Err(UpstreamError::Status { body, .. }) => json!({
                    "error": format!("{}: {body}", Service::TechnicalAnalysis.error_prefix())
                }),
                Err(_) => json!({ "error": "Service unavailable" }),
            };
            results.insert(timeframe.as_str().to_string(), entry);
        }
        Value::Object(results)
    }
}
