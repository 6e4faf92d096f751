//! Error reports sent by the frontend.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::ValidationError, user::UserId};

pub const MAX_TYPE_LENGTH: usize = 50;
pub const MAX_ENDPOINT_LENGTH: usize = 255;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub id: i64,
    #[serde(rename = "type")]
    pub error_type: String,
    pub endpoint: Option<String>,
    pub status: Option<i64>,
    pub message: String,
    pub stack_trace: Option<String>,
    #[serde(rename = "user")]
    pub user_id: Option<UserId>,
    pub username: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewErrorReport {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub endpoint: Option<String>,
    pub status: Option<i64>,
    pub message: Option<String>,
    pub stack_trace: Option<String>,
    #[serde(skip)]
    pub user_id: Option<UserId>,
}

impl NewErrorReport {
    /// `type` and `message` are required; length limits match the table.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let error_type = self.error_type.as_deref().unwrap_or_default();
        if error_type.trim().is_empty() {
            return Err(ValidationError::MissingField("type".to_string()));
        }
        if error_type.chars().count() > MAX_TYPE_LENGTH {
            return Err(ValidationError::InvalidField(format!(
                "type: Ensure this field has no more than {MAX_TYPE_LENGTH} characters."
            )));
        }
        if self
            .endpoint
            .as_deref()
            .is_some_and(|e| e.chars().count() > MAX_ENDPOINT_LENGTH)
        {
            return Err(ValidationError::InvalidField(format!(
                "endpoint: Ensure this field has no more than {MAX_ENDPOINT_LENGTH} characters."
            )));
        }
        if self.message.as_deref().unwrap_or_default().trim().is_empty() {
            return Err(ValidationError::MissingField("message".to_string()));
        }
        Ok(())
    }
}

/// Filters for the grouped error listing. `type = "all"` means no filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorLogFilter {
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ErrorLogFilter {
    pub fn type_filter(&self) -> Option<&str> {
        self.error_type
            .as_deref()
            .filter(|t| !t.is_empty() && *t != "all")
    }

    /// Unparseable dates are ignored.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start_date.as_deref().and_then(parse_datetime)
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end_date.as_deref().and_then(parse_datetime)
    }
}

/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM[:SS]` (read as UTC), or a bare date.
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Reports sharing `(type, endpoint, status, message)`, folded into one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorLogGroup {
    /// Highest report id in the group
    pub id: i64,
    #[serde(rename = "type")]
    pub error_type: String,
    pub endpoint: String,
    pub status: Option<i64>,
    pub message: String,
    /// Stack trace of the most recent report
    pub stack_trace: Option<String>,
    /// Reporter of the most recent report
    pub username: Option<String>,
    /// Time of the most recent report
    pub timestamp: DateTime<Utc>,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_type_and_message() {
        let report = NewErrorReport {
            error_type: Some("network".to_string()),
            message: Some("timeout".to_string()),
            ..Default::default()
        };
        assert!(report.validate().is_ok());

        let missing_type = NewErrorReport {
            message: Some("timeout".to_string()),
            ..Default::default()
        };
        assert!(missing_type.validate().is_err());

        let missing_message = NewErrorReport {
            error_type: Some("network".to_string()),
            ..Default::default()
        };
        assert!(missing_message.validate().is_err());
    }

    #[test]
    fn test_filter_all_means_no_type() {
        let filter = ErrorLogFilter {
            error_type: Some("all".to_string()),
            ..Default::default()
        };
        assert!(filter.type_filter().is_none());
    }

    #[test]
    fn test_parse_datetime_forms() {
        assert!(parse_datetime("2024-05-01T10:00:00Z").is_some());
        assert!(parse_datetime("2024-05-01T10:00:00").is_some());
        assert!(parse_datetime("2024-05-01").is_some());
        assert!(parse_datetime("yesterday").is_none());
    }
}
