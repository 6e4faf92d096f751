use std::sync::Arc;

use crate::{
    Error, UserId,
    error_log::{ErrorLogFilter, ErrorLogGroup, ErrorReport, NewErrorReport},
    repositories::ErrorLogRepository,
};

/// Service for error reports sent by the frontend
pub struct ErrorLogService<R: ErrorLogRepository> {
    repository: Arc<R>,
}

impl<R: ErrorLogRepository> ErrorLogService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Store a report, attributed to `reporter` when the request carried a session.
    pub async fn report(
        &self,
        mut report: NewErrorReport,
        reporter: Option<&UserId>,
    ) -> Result<ErrorReport, Error> {
        report.validate()?;
        report.user_id = reporter.cloned();
        let stored = self.repository.create(report).await?;
        tracing::debug!(
            error_log.id = stored.id,
            error_type = %stored.error_type,
            "Stored client error report"
        );
        Ok(stored)
    }

    pub async fn grouped(&self, filter: &ErrorLogFilter) -> Result<Vec<ErrorLogGroup>, Error> {
        self.repository.grouped(filter).await
    }
}
