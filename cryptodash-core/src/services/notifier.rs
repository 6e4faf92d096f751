use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    Error,
    alert::AlertCondition,
    error::{DependencyError, ValidationError},
    validation::parse_price,
};

/// Everything needed to tell a user that a price alert fired.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceAlertNotice {
    pub email: String,
    pub crypto: String,
    pub symbol: String,
    /// Anything other than `"above"` reads as below.
    pub condition: String,
    pub target_price: f64,
    pub current_price: f64,
}

impl PriceAlertNotice {
    pub fn is_above(&self) -> bool {
        self.condition == AlertCondition::Above.as_str()
    }
}

/// Delivers price-alert e-mails.
///
/// Delivery is fire-and-forget: implementations log their own failures and
/// report only whether the message was accepted.
#[async_trait]
pub trait AlertNotifier: Send + Sync + 'static {
    async fn send_price_alert(&self, notice: &PriceAlertNotice) -> bool;
}

/// Body of a manual alert e-mail request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertEmailRequest {
    pub email: Option<String>,
    pub crypto: Option<String>,
    pub symbol: Option<String>,
    pub condition: Option<String>,
    pub target_price: Option<Value>,
    pub current_price: Option<Value>,
}

impl AlertEmailRequest {
    /// The four text fields must be non-empty; prices may be numbers or
    /// numeric strings and default to zero.
    pub fn into_notice(self) -> Result<PriceAlertNotice, ValidationError> {
        let field = |value: Option<String>| value.filter(|v| !v.is_empty());
        let (Some(email), Some(crypto), Some(symbol), Some(condition)) = (
            field(self.email),
            field(self.crypto),
            field(self.symbol),
            field(self.condition),
        ) else {
            return Err(ValidationError::AlertEmailFieldsMissing);
        };

        Ok(PriceAlertNotice {
            email,
            crypto,
            symbol,
            condition,
            target_price: parse_price(self.target_price.as_ref())?,
            current_price: parse_price(self.current_price.as_ref())?,
        })
    }
}

/// Validate and send a manual alert e-mail.
pub async fn send_alert_email<N: AlertNotifier + ?Sized>(
    notifier: &N,
    request: AlertEmailRequest,
) -> Result<(), Error> {
    let notice = request.into_notice()?;
    if notifier.send_price_alert(&notice).await {
        tracing::info!(symbol = %notice.symbol, "Alert e-mail sent");
        Ok(())
    } else {
        tracing::error!(crypto = %notice.crypto, symbol = %notice.symbol, "Failed to send alert e-mail");
        Err(Error::Dependency(DependencyError::NotificationFailed))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::Mutex;

    /// Records every notice; answers with `succeed`.
    pub(crate) struct RecordingNotifier {
        pub(crate) sent: Mutex<Vec<PriceAlertNotice>>,
        pub(crate) succeed: bool,
    }

    impl RecordingNotifier {
        pub(crate) fn new(succeed: bool) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                succeed,
            }
        }
    }

    #[async_trait]
    impl AlertNotifier for RecordingNotifier {
        async fn send_price_alert(&self, notice: &PriceAlertNotice) -> bool {
            self.sent.lock().await.push(notice.clone());
            self.succeed
        }
    }

    fn request(body: Value) -> AlertEmailRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_into_notice_parses_string_prices() {
        let notice = request(json!({
            "email": "a@example.com",
            "crypto": "Bitcoin",
            "symbol": "BTC",
            "condition": "above",
            "target_price": "50000",
            "current_price": 51000.5
        }))
        .into_notice()
        .unwrap();

        assert_eq!(notice.target_price, 50_000.0);
        assert_eq!(notice.current_price, 51_000.5);
        assert!(notice.is_above());
    }

    #[test]
    fn test_into_notice_missing_fields() {
        let err = request(json!({
            "email": "a@example.com",
            "crypto": "",
            "symbol": "BTC",
            "condition": "above"
        }))
        .into_notice()
        .unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields");
    }

    #[test]
    fn test_into_notice_bad_price() {
        let err = request(json!({
            "email": "a@example.com",
            "crypto": "Bitcoin",
            "symbol": "BTC",
            "condition": "below",
            "target_price": "lots"
        }))
        .into_notice()
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid price values");
    }

    #[tokio::test]
    async fn test_send_alert_email_reports_failure() {
        let notifier = RecordingNotifier::new(false);
        let err = send_alert_email(
            &notifier,
            request(json!({
                "email": "a@example.com",
                "crypto": "Bitcoin",
                "symbol": "BTC",
                "condition": "below"
            })),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.public_message(),
            "Failed to send email. Check server logs for details."
        );
        assert_eq!(notifier.sent.lock().await.len(), 1);
    }
}
