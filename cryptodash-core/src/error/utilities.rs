use crate::{
    Error,
    error::{StorageError, ValidationError},
};

/// Extension trait for mapping storage driver errors into [`Error::Storage`].
///
/// ```rust,ignore
/// use cryptodash_core::error::utilities::DatabaseResultExt;
///
/// query.execute(&pool).await.map_db_err()?;
/// ```
pub trait DatabaseResultExt<T> {
    /// Convert a driver error to a storage error
    fn map_db_err(self) -> Result<T, Error>;

    /// Convert a driver error to a storage error, prefixed with some context
    fn map_db_err_with_context(self, context: &str) -> Result<T, Error>;
}

impl<T, E: std::fmt::Display> DatabaseResultExt<T> for Result<T, E> {
    fn map_db_err(self) -> Result<T, Error> {
        self.map_err(|e| Error::Storage(StorageError::Database(e.to_string())))
    }

    fn map_db_err_with_context(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| Error::Storage(StorageError::Database(format!("{context}: {e}"))))
    }
}

/// Turns a missing (or blank) optional value into a [`ValidationError::MissingField`].
pub trait RequiredFieldExt<T> {
    fn require_field(self, field_name: &str) -> Result<T, ValidationError>;
}

impl RequiredFieldExt<String> for Option<String> {
    fn require_field(self, field_name: &str) -> Result<String, ValidationError> {
        match self {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ValidationError::MissingField(field_name.to_string())),
        }
    }
}
