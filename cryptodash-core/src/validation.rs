//! Input validation shared by the services.
//!
//! Every function returns the first rule that fails as a [`ValidationError`];
//! the error's display string is the message shown to clients.
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::ValidationError;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const MAX_CRYPTO_NAME_LENGTH: usize = 100;
pub const MAX_SYMBOL_LENGTH: usize = 20;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("Invalid email regex pattern")
});

/// Both credentials must be present and non-empty.
pub fn require_credentials<'a>(
    username: Option<&'a str>,
    password: Option<&'a str>,
) -> Result<(&'a str, &'a str), ValidationError> {
    match (username, password) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Ok((u, p)),
        _ => Err(ValidationError::CredentialsRequired),
    }
}

/// Length is counted in characters, not bytes.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong(MAX_PASSWORD_LENGTH));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > 254 || !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }
    Ok(())
}

/// Trim and upper-case a ticker symbol. Blank symbols are rejected.
pub fn normalize_symbol(symbol: &str) -> Result<String, ValidationError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(ValidationError::SymbolRequired);
    }
    Ok(symbol.to_uppercase())
}

pub fn validate_crypto_name(crypto: &str) -> Result<(), ValidationError> {
    if crypto.trim().is_empty() {
        return Err(ValidationError::InvalidAlert(
            "crypto: This field may not be blank.".to_string(),
        ));
    }
    if crypto.chars().count() > MAX_CRYPTO_NAME_LENGTH {
        return Err(ValidationError::InvalidAlert(format!(
            "crypto: Ensure this field has no more than {MAX_CRYPTO_NAME_LENGTH} characters."
        )));
    }
    Ok(())
}

pub fn validate_alert_symbol(symbol: &str) -> Result<(), ValidationError> {
    if symbol.trim().is_empty() {
        return Err(ValidationError::InvalidAlert(
            "symbol: This field may not be blank.".to_string(),
        ));
    }
    if symbol.chars().count() > MAX_SYMBOL_LENGTH {
        return Err(ValidationError::InvalidAlert(format!(
            "symbol: Ensure this field has no more than {MAX_SYMBOL_LENGTH} characters."
        )));
    }
    Ok(())
}

pub fn validate_alert_price(price: f64) -> Result<(), ValidationError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(ValidationError::InvalidAlert(
            "price: Ensure this value is greater than 0.".to_string(),
        ));
    }
    Ok(())
}

/// Read a price that may arrive as a JSON number or a numeric string.
/// A missing value counts as zero.
pub fn parse_price(value: Option<&Value>) -> Result<f64, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n.as_f64().ok_or(ValidationError::InvalidPriceValues),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
            .ok_or(ValidationError::InvalidPriceValues),
        Some(_) => Err(ValidationError::InvalidPriceValues),
    }
}
