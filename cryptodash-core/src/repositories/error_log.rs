use async_trait::async_trait;

use crate::{
    Error,
    error_log::{ErrorLogFilter, ErrorLogGroup, ErrorReport, NewErrorReport},
};

/// Repository for client-side error reports
#[async_trait]
pub trait ErrorLogRepository: Send + Sync + 'static {
    /// Store a validated report
    async fn create(&self, report: NewErrorReport) -> Result<ErrorReport, Error>;

    /// Reports grouped by `(type, endpoint, status, message)`, most recent group first
    async fn grouped(&self, filter: &ErrorLogFilter) -> Result<Vec<ErrorLogGroup>, Error>;
}
