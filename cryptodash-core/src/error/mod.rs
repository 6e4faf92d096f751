pub mod utilities;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Dependency error: {0}")]
    Dependency(#[from] DependencyError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),
}

/// Authentication and lockout failures.
///
/// The failed-attempt and lockout variants carry the numbers the client is
/// shown, so they survive every conversion up to the HTTP layer.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{}", invalid_credentials_message(.remaining_attempts))]
    InvalidCredentials { remaining_attempts: u32 },

    #[error(
        "Account locked after {max_attempts} failed login attempts. Try again in {} minutes.",
        display_minutes(.remaining_seconds)
    )]
    AccountLocked {
        remaining_seconds: u64,
        max_attempts: u32,
    },

    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,

    #[error("No active session found.")]
    NoActiveSession,

    #[error("Password hash error: {0}")]
    PasswordHashError(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error("Session expired")]
    Expired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("File storage error: {0}")]
    File(String),
}

/// Malformed or missing input. The display string is the client-facing message.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Username and password are required.")]
    CredentialsRequired,

    #[error("Password must be at least {0} characters long.")]
    PasswordTooShort(usize),

    #[error("Password must be no more than {0} characters long.")]
    PasswordTooLong(usize),

    #[error("Enter a valid email address.")]
    InvalidEmail(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Symbol is required and cannot be empty")]
    SymbolRequired,

    #[error("Invalid timeframe. Must be 1d, 1w, or 1m")]
    InvalidTimeframe(String),

    #[error("No file uploaded")]
    NoFileUploaded,

    #[error("Missing required fields")]
    AlertEmailFieldsMissing,

    #[error("Invalid price values")]
    InvalidPriceValues,

    #[error("Invalid alert data: {0}")]
    InvalidAlert(String),
}

/// Uniqueness violations. Rendered as client errors, not server errors.
#[derive(Debug, Error)]
pub enum ConflictError {
    #[error("Username already exists.")]
    UsernameTaken,

    #[error("Email already registered.")]
    EmailTaken,

    #[error("This email is already registered to another user.")]
    EmailInUse,

    #[error("User already has the email address {0}.")]
    EmailAlreadySet(String),
}

#[derive(Debug, Error)]
pub enum NotFoundError {
    #[error("Symbol {0} not found")]
    Symbol(String),

    #[error("No data found for symbol {0}")]
    CandleData(String),

    #[error("Alert with ID {0} not found")]
    Alert(i64),

    #[error("Insufficient data for symbol {symbol} with timeframe {timeframe}")]
    AnalysisData { symbol: String, timeframe: String },

    #[error("User not found")]
    User,
}

/// Failures of the external microservices this backend proxies to.
#[derive(Debug, Error)]
pub enum DependencyError {
    #[error("{0} is unavailable")]
    Unavailable(String),

    /// The dependency answered with a non-success status; the message is
    /// passed through to the client with the same status.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    #[error("Failed to send email. Check server logs for details.")]
    NotificationFailed,
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event bus error: {0}")]
    BusError(String),

    #[error("Event handler error: {0}")]
    HandlerError(String),
}

/// Coarse classification used to pick an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    AuthFailure,
    Locked,
    NotAuthenticated,
    NotFound,
    Conflict,
    DependencyUnavailable,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Auth(AuthError::InvalidCredentials { .. }) => ErrorKind::AuthFailure,
            Error::Auth(AuthError::AccountLocked { .. }) => ErrorKind::Locked,
            Error::Auth(AuthError::NotAuthenticated) => ErrorKind::NotAuthenticated,
            Error::Auth(AuthError::NoActiveSession) => ErrorKind::Validation,
            Error::Auth(AuthError::PasswordHashError(_)) => ErrorKind::Internal,
            Error::Session(SessionError::NotFound | SessionError::Expired) => {
                ErrorKind::NotAuthenticated
            }
            Error::Session(SessionError::InvalidToken(_)) => ErrorKind::NotAuthenticated,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Dependency(DependencyError::Unavailable(_)) => ErrorKind::DependencyUnavailable,
            Error::Dependency(DependencyError::Upstream { .. }) => ErrorKind::DependencyUnavailable,
            Error::Dependency(DependencyError::NotificationFailed) => ErrorKind::Internal,
            Error::Storage(_) | Error::Event(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Auth(AuthError::InvalidCredentials { .. }) => "login_failed",
            Error::Auth(AuthError::AccountLocked { .. }) => "account_locked",
            Error::Auth(AuthError::NotAuthenticated) => "not_authenticated",
            Error::Auth(AuthError::NoActiveSession) => "no_active_session",
            Error::Auth(AuthError::PasswordHashError(_)) => "internal_error",
            Error::Session(_) => "not_authenticated",
            Error::Validation(_) => "validation_error",
            Error::Conflict(_) => "conflict",
            Error::NotFound(_) => "not_found",
            Error::Dependency(DependencyError::Unavailable(_)) => "service_unavailable",
            Error::Dependency(DependencyError::Upstream { .. }) => "upstream_error",
            Error::Dependency(DependencyError::NotificationFailed) => "email_send_failed",
            Error::Storage(_) | Error::Event(_) => "internal_error",
        }
    }

    /// The message shown to clients. Internal failures never leak their details.
    pub fn public_message(&self) -> String {
        match self {
            Error::Auth(e) => match e {
                AuthError::PasswordHashError(_) => "Internal server error".to_string(),
                other => other.to_string(),
            },
            Error::Validation(e) => e.to_string(),
            Error::Conflict(e) => e.to_string(),
            Error::NotFound(e) => e.to_string(),
            Error::Dependency(e) => e.to_string(),
            Error::Session(_) => AuthError::NotAuthenticated.to_string(),
            Error::Storage(_) | Error::Event(_) => "Internal server error".to_string(),
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_session_error(&self) -> bool {
        matches!(self, Error::Session(_))
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Error::Auth(AuthError::AccountLocked { .. }))
    }
}

/// Whole minutes, rounded up, for display.
pub fn minutes_ceil(seconds: u64) -> u64 {
    seconds.div_ceil(60)
}

fn display_minutes(seconds: &u64) -> u64 {
    minutes_ceil(*seconds)
}

fn invalid_credentials_message(remaining_attempts: &u32) -> String {
    let mut message = String::from("Invalid username or password.");
    if *remaining_attempts > 0 {
        message.push_str(&format!(
            " {remaining_attempts} attempts remaining before lockout."
        ));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let auth_error = Error::Auth(AuthError::NotAuthenticated);
        assert_eq!(
            auth_error.to_string(),
            "Authentication error: Authentication credentials were not provided."
        );

        let storage_error = Error::Storage(StorageError::NotFound);
        assert_eq!(storage_error.to_string(), "Storage error: Record not found");
    }

    #[test]
    fn test_invalid_credentials_message() {
        let err = AuthError::InvalidCredentials {
            remaining_attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "Invalid username or password. 3 attempts remaining before lockout."
        );

        let err = AuthError::InvalidCredentials {
            remaining_attempts: 0,
        };
        assert_eq!(err.to_string(), "Invalid username or password.");
    }

    #[test]
    fn test_locked_message_rounds_minutes_up() {
        let err = AuthError::AccountLocked {
            remaining_seconds: 900,
            max_attempts: 5,
        };
        assert_eq!(
            err.to_string(),
            "Account locked after 5 failed login attempts. Try again in 15 minutes."
        );

        let err = AuthError::AccountLocked {
            remaining_seconds: 61,
            max_attempts: 5,
        };
        assert!(err.to_string().ends_with("Try again in 2 minutes."));
    }

    #[test]
    fn test_kind_and_code() {
        let locked = Error::from(AuthError::AccountLocked {
            remaining_seconds: 10,
            max_attempts: 5,
        });
        assert_eq!(locked.kind(), ErrorKind::Locked);
        assert_eq!(locked.code(), "account_locked");
        assert!(locked.is_locked());

        let conflict = Error::from(ConflictError::UsernameTaken);
        assert_eq!(conflict.kind(), ErrorKind::Conflict);
        assert_eq!(conflict.public_message(), "Username already exists.");

        let unavailable = Error::from(DependencyError::Unavailable(
            "LSTM Service".to_string(),
        ));
        assert_eq!(unavailable.kind(), ErrorKind::DependencyUnavailable);
        assert_eq!(unavailable.public_message(), "LSTM Service is unavailable");
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let err = Error::Storage(StorageError::Database("disk I/O error".to_string()));
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_minutes_ceil() {
        assert_eq!(minutes_ceil(0), 0);
        assert_eq!(minutes_ceil(1), 1);
        assert_eq!(minutes_ceil(60), 1);
        assert_eq!(minutes_ceil(899), 15);
    }
}
