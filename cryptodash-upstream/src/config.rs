use serde::{Deserialize, Serialize};

pub const DEFAULT_TECHNICAL_ANALYSIS_URL: &str = "http://localhost:8001";
pub const DEFAULT_LSTM_URL: &str = "http://localhost:8002";
pub const DEFAULT_SENTIMENT_URL: &str = "http://localhost:8003";
pub const DEFAULT_NOTIFICATION_URL: &str = "http://localhost:8004";

/// Base URLs of the microservices this backend proxies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub technical_analysis_url: String,
    pub lstm_url: String,
    pub sentiment_url: String,
    pub notification_url: String,
}

impl UpstreamConfig {
    /// Read the service URLs from the environment, falling back to the local
    /// development ports.
    pub fn from_env() -> Self {
        let var = |name: &str, default: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            technical_analysis_url: var(
                "TECHNICAL_ANALYSIS_SERVICE_URL",
                DEFAULT_TECHNICAL_ANALYSIS_URL,
            ),
            lstm_url: var("LSTM_SERVICE_URL", DEFAULT_LSTM_URL),
            sentiment_url: var("SENTIMENT_ANALYSIS_SERVICE_URL", DEFAULT_SENTIMENT_URL),
            notification_url: var("NOTIFICATION_SERVICE_URL", DEFAULT_NOTIFICATION_URL),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            technical_analysis_url: DEFAULT_TECHNICAL_ANALYSIS_URL.to_string(),
            lstm_url: DEFAULT_LSTM_URL.to_string(),
            sentiment_url: DEFAULT_SENTIMENT_URL.to_string(),
            notification_url: DEFAULT_NOTIFICATION_URL.to_string(),
        }
    }
}

/// Join a base URL and a path without doubling the slash.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
