//! Price alerts.
//!
//! A user asks to be e-mailed when a symbol's price moves above or below a
//! target. Alerts are checked by a periodic job outside the request path.
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::ValidationError,
    user::UserId,
    validation::{validate_alert_price, validate_alert_symbol, validate_crypto_name},
};

/// Minimum time between two e-mails for the same alert.
pub const RENOTIFY_AFTER_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Above,
    Below,
}

impl AlertCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCondition::Above => "above",
            AlertCondition::Below => "below",
        }
    }

    /// Inclusive comparison of `current` against `target`.
    pub fn is_met(&self, current: f64, target: f64) -> bool {
        match self {
            AlertCondition::Above => current >= target,
            AlertCondition::Below => current <= target,
        }
    }
}

impl FromStr for AlertCondition {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "above" => Ok(AlertCondition::Above),
            "below" => Ok(AlertCondition::Below),
            other => Err(ValidationError::InvalidAlert(format!(
                "condition: \"{other}\" is not a valid choice."
            ))),
        }
    }
}

impl std::fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub id: i64,
    pub user_id: UserId,
    pub crypto: String,
    pub symbol: String,
    pub condition: AlertCondition,
    pub price: f64,
    pub active: bool,
    pub is_triggered: bool,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    /// Whether an e-mail went out less than [`RENOTIFY_AFTER_HOURS`] before `now`.
    pub fn sent_recently(&self, now: DateTime<Utc>) -> bool {
        self.last_sent_at
            .is_some_and(|sent| now - sent < chrono::Duration::hours(RENOTIFY_AFTER_HOURS))
    }
}

/// Validated input for a new alert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    pub crypto: String,
    pub symbol: String,
    pub condition: AlertCondition,
    pub price: f64,
    pub active: bool,
}

/// Alert fields as they arrive from a client. Every field is optional so the
/// same shape serves creation and partial updates.
/// Unknown fields (such as a read-only `id` echoed back) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertInput {
    pub crypto: Option<String>,
    pub symbol: Option<String>,
    pub condition: Option<String>,
    pub price: Option<PriceValue>,
    pub active: Option<bool>,
}

/// Prices are accepted as JSON numbers or decimal strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PriceValue {
    Number(f64),
    Text(String),
}

impl PriceValue {
    pub fn to_f64(&self) -> Result<f64, ValidationError> {
        match self {
            PriceValue::Number(n) => Ok(*n),
            PriceValue::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                ValidationError::InvalidAlert("price: A valid number is required.".to_string())
            }),
        }
    }
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ValidationError> {
    value.ok_or_else(|| ValidationError::InvalidAlert(format!("{field}: This field is required.")))
}

/// Stored with two decimal places.
fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

impl AlertInput {
    /// Validate a full alert for creation.
    pub fn into_new_alert(self) -> Result<NewAlert, ValidationError> {
        let crypto = required(self.crypto, "crypto")?;
        let symbol = required(self.symbol, "symbol")?;
        let condition: AlertCondition = required(self.condition, "condition")?.parse()?;
        let price = required(self.price, "price")?.to_f64()?;

        validate_crypto_name(&crypto)?;
        validate_alert_symbol(&symbol)?;
        validate_alert_price(price)?;

        Ok(NewAlert {
            crypto,
            symbol,
            condition,
            price: round_price(price),
            active: self.active.unwrap_or(true),
        })
    }

    /// Validate the present fields and apply them to `alert`.
    pub fn apply_to(self, alert: &mut Alert) -> Result<(), ValidationError> {
        if let Some(crypto) = self.crypto {
            validate_crypto_name(&crypto)?;
            alert.crypto = crypto;
        }
        if let Some(symbol) = self.symbol {
            validate_alert_symbol(&symbol)?;
            alert.symbol = symbol;
        }
        if let Some(condition) = self.condition {
            alert.condition = condition.parse()?;
        }
        if let Some(price) = self.price {
            let price = price.to_f64()?;
            validate_alert_price(price)?;
            alert.price = round_price(price);
        }
        if let Some(active) = self.active {
            alert.active = active;
        }
        Ok(())
    }
}

/// Counters produced by one pass of the alert checker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertCheckReport {
    pub total_active: usize,
    pub skipped_recent: usize,
    pub missing_price: usize,
    pub checked: usize,
    pub triggered: usize,
    pub skipped_no_email: usize,
    pub failed: usize,
}
