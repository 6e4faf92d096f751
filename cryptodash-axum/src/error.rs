use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cryptodash::{AuthError, Error, ErrorKind};
use cryptodash_core::error::DependencyError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] Error),

    #[error("CSRF Failed: CSRF token missing or incorrect.")]
    CsrfFailed,

    /// Bare `{error: "Unauthorized"}` answer of the error-log listing.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn not_authenticated() -> Self {
        ApiError::Core(Error::Auth(AuthError::NotAuthenticated))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(e) => core_status(e),
            ApiError::CsrfFailed | ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

fn core_status(error: &Error) -> StatusCode {
    if let Error::Dependency(DependencyError::Upstream { status, .. }) = error {
        return StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY);
    }
    match error.kind() {
        ErrorKind::Validation | ErrorKind::Conflict => StatusCode::BAD_REQUEST,
        ErrorKind::AuthFailure => StatusCode::UNAUTHORIZED,
        ErrorKind::Locked | ErrorKind::NotAuthenticated => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DependencyUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match &self {
            ApiError::Core(Error::Auth(
                auth @ AuthError::InvalidCredentials { remaining_attempts },
            )) => json!({
                "success": false,
                "error": auth.to_string(),
                "remaining_attempts": remaining_attempts,
            }),
            ApiError::Core(Error::Auth(
                auth @ AuthError::AccountLocked {
                    remaining_seconds, ..
                },
            )) => json!({
                "success": false,
                "error": auth.to_string(),
                "locked": true,
                "remaining_time": remaining_seconds,
                "remaining_time_seconds": remaining_seconds,
            }),
            ApiError::Core(e) => {
                if status.is_server_error() && e.kind() == ErrorKind::Internal {
                    tracing::error!(error = %e, code = e.code(), "Request failed");
                } else if status.is_server_error() {
                    tracing::warn!(error = %e, code = e.code(), "Dependency failure");
                }
                json!({ "error": e.public_message(), "code": e.code() })
            }
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
