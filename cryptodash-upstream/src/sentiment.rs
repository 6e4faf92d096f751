use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};

use crate::{
    client::{build_client, post_json},
    config::endpoint,
    error::{Result, Service},
};

pub const SENTIMENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the sentiment and on-chain analysis service.
#[derive(Debug, Clone)]
pub struct SentimentClient {
    http: Client,
    url: String,
}

impl SentimentClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, SENTIMENT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: build_client(Some(timeout))?,
            url: endpoint(base_url, "analyze"),
        })
    }

    pub async fn analyze(&self, symbol: &str) -> Result<Value> {
        let symbol = symbol.to_uppercase();
        tracing::debug!(symbol = %symbol, "Requesting sentiment analysis");
        post_json(
            &self.http,
            Service::Sentiment,
            &self.url,
            &json!({ "symbol": symbol }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::spawn;
    use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::post};

    #[tokio::test]
    async fn test_analyze() {
        let url = spawn(Router::new().route(
            "/analyze",
            post(|Json(body): Json<Value>| async move {
                Json(json!({ "symbol": body["symbol"], "score": 0.4 }))
            }),
        ))
        .await;

        let client = SentimentClient::new(&url).unwrap();
        let result = client.analyze("sol").await.unwrap();
        assert_eq!(result["symbol"], "SOL");
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let url = spawn(Router::new().route(
            "/analyze",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                StatusCode::OK.into_response()
            }),
        ))
        .await;

        let client = SentimentClient::with_timeout(&url, Duration::from_millis(100)).unwrap();
        let err = client.analyze("sol").await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
