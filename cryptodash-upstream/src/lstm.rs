use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::{
    client::{build_client, post_json},
    config::endpoint,
    error::{Result, Service},
};

pub const LSTM_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_LOOKBACK: i64 = 30;
pub const DEFAULT_EPOCHS: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionRequest {
    pub crypto: String,
    pub lookback: i64,
    pub epochs: i64,
}

impl PredictionRequest {
    pub fn new(crypto: &str) -> Self {
        Self {
            crypto: crypto.to_string(),
            lookback: DEFAULT_LOOKBACK,
            epochs: DEFAULT_EPOCHS,
        }
    }
}

/// Client for the LSTM price prediction service. Training happens on every
/// request, hence the long timeout.
#[derive(Debug, Clone)]
pub struct LstmClient {
    http: Client,
    url: String,
}

impl LstmClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: build_client(Some(LSTM_TIMEOUT))?,
            url: endpoint(base_url, "predict"),
        })
    }

    pub async fn predict(&self, request: &PredictionRequest) -> Result<Value> {
        tracing::debug!(
            crypto = %request.crypto,
            lookback = request.lookback,
            epochs = request.epochs,
            "Requesting LSTM prediction"
        );
        post_json(&self.http, Service::Lstm, &self.url, request).await
    }

    /// Forward a client-built body, filling in `crypto` when it is absent.
    pub async fn predict_raw(&self, crypto: &str, mut body: Value) -> Result<Value> {
        if let Value::Object(map) = &mut body {
            map.entry("crypto")
                .or_insert_with(|| Value::String(crypto.to_string()));
        }
        post_json(&self.http, Service::Lstm, &self.url, &body).await
    }
}
