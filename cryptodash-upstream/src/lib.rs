//! HTTP clients for the analysis and notification microservices.
//!
//! Each service gets a small typed client over a shared [`reqwest::Client`].
//! The analysis clients hand back the service's JSON untouched; the
//! notification client implements [`AlertNotifier`] and renders the alert
//! e-mail itself.
//!
//! [`AlertNotifier`]: cryptodash_core::services::AlertNotifier

mod client;
pub mod config;
pub mod error;
pub mod lstm;
pub mod notification;
pub mod sentiment;
pub mod technical_analysis;
pub mod templates;

pub use config::UpstreamConfig;
pub use error::{Service, UpstreamError};
pub use lstm::{LstmClient, PredictionRequest};
pub use notification::NotificationClient;
pub use sentiment::SentimentClient;
pub use technical_analysis::{TechnicalAnalysisClient, Timeframe};
pub use templates::AlertEmail;

/// One client per service, built from an [`UpstreamConfig`].
#[derive(Debug, Clone)]
pub struct UpstreamClients {
    pub technical_analysis: TechnicalAnalysisClient,
    pub sentiment: SentimentClient,
    pub lstm: LstmClient,
    pub notification: NotificationClient,
}

impl UpstreamClients {
    pub fn new(config: &UpstreamConfig) -> error::Result<Self> {
        Ok(Self {
            technical_analysis: TechnicalAnalysisClient::new(&config.technical_analysis_url)?,
            sentiment: SentimentClient::new(&config.sentiment_url)?,
            lstm: LstmClient::new(&config.lstm_url)?,
            notification: NotificationClient::new(&config.notification_url)?,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    use axum::Router;
    use tokio::net::TcpListener;

    /// Serve `router` on an ephemeral port and return its base URL.
    pub(crate) async fn spawn(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    /// A base URL nothing is listening on.
    pub(crate) async fn closed_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }
}
