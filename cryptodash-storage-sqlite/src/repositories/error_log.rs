use async_trait::async_trait;
use chrono::Utc;
use cryptodash_core::{
    Error, UserId,
    error::StorageError,
    error_log::{ErrorLogFilter, ErrorLogGroup, ErrorReport, NewErrorReport},
    repositories::ErrorLogRepository,
};
use sqlx::SqlitePool;

use crate::{db_error, from_unix};

#[derive(Debug, sqlx::FromRow)]
struct SqliteErrorReport {
    id: i64,
    error_type: String,
    endpoint: Option<String>,
    status: Option<i64>,
    message: String,
    stack_trace: Option<String>,
    user_id: Option<String>,
    username: Option<String>,
    timestamp: i64,
}

impl From<SqliteErrorReport> for ErrorReport {
    fn from(row: SqliteErrorReport) -> Self {
        ErrorReport {
            id: row.id,
            error_type: row.error_type,
            endpoint: row.endpoint,
            status: row.status,
            message: row.message,
            stack_trace: row.stack_trace,
            user_id: row.user_id.as_deref().map(UserId::new),
            username: row.username,
            timestamp: from_unix(row.timestamp),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteErrorLogGroup {
    id: i64,
    error_type: String,
    endpoint: String,
    status: Option<i64>,
    message: String,
    stack_trace: Option<String>,
    username: Option<String>,
    timestamp: i64,
    count: i64,
}

impl From<SqliteErrorLogGroup> for ErrorLogGroup {
    fn from(row: SqliteErrorLogGroup) -> Self {
        ErrorLogGroup {
            id: row.id,
            error_type: row.error_type,
            endpoint: row.endpoint,
            status: row.status,
            message: row.message,
            stack_trace: row.stack_trace,
            username: row.username,
            timestamp: from_unix(row.timestamp),
            count: row.count,
        }
    }
}

pub struct SqliteErrorLogRepository {
    pool: SqlitePool,
}

impl SqliteErrorLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ErrorLogRepository for SqliteErrorLogRepository {
    async fn create(&self, report: NewErrorReport) -> Result<ErrorReport, Error> {
        let (Some(error_type), Some(message)) = (report.error_type, report.message) else {
            return Err(Error::Storage(StorageError::Constraint(
                "Error reports need a type and a message".to_string(),
            )));
        };

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO error_logs (error_type, endpoint, status, message, stack_trace, user_id, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING id
            "#,
        )
        .bind(&error_type)
        .bind(&report.endpoint)
        .bind(report.status)
        .bind(&message)
        .bind(&report.stack_trace)
        .bind(report.user_id.as_ref().map(UserId::as_str))
        .bind(Utc::now().timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to store error report", e))?;

        let row = sqlx::query_as::<_, SqliteErrorReport>(
            r#"
            SELECT e.id, e.error_type, e.endpoint, e.status, e.message, e.stack_trace,
                   e.user_id, u.username, e.timestamp
            FROM error_logs e
            LEFT JOIN users u ON u.id = e.user_id
            WHERE e.id = ?1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load error report", e))?;

        Ok(row.into())
    }

    async fn grouped(&self, filter: &ErrorLogFilter) -> Result<Vec<ErrorLogGroup>, Error> {
        let rows = sqlx::query_as::<_, SqliteErrorLogGroup>(
            r#"
            SELECT g.id, g.error_type, g.endpoint, g.status, g.message, g.count,
                   g.last_seen AS timestamp, latest.stack_trace, u.username
            FROM (
                SELECT MAX(id) AS id, error_type, COALESCE(endpoint, '') AS endpoint, status,
                       message, COUNT(*) AS count, MAX(timestamp) AS last_seen
                FROM error_logs
                WHERE (?1 IS NULL OR error_type = ?1)
                  AND (?2 IS NULL OR timestamp >= ?2)
                  AND (?3 IS NULL OR timestamp <= ?3)
                GROUP BY error_type, COALESCE(endpoint, ''), status, message
            ) g
            JOIN error_logs latest ON latest.id = g.id
            LEFT JOIN users u ON u.id = latest.user_id
            ORDER BY g.last_seen DESC, g.id DESC
            "#,
        )
        .bind(filter.type_filter())
        .bind(filter.start().map(|t| t.timestamp()))
        .bind(filter.end().map(|t| t.timestamp()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to group error reports", e))?;

        Ok(rows.into_iter().map(ErrorLogGroup::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::tests::setup_provider;
    use cryptodash_core::{
        repositories::{ErrorLogRepositoryProvider, UserRepository, UserRepositoryProvider},
        user::NewUser,
    };

    fn report(error_type: &str, message: &str) -> NewErrorReport {
        NewErrorReport {
            error_type: Some(error_type.to_string()),
            endpoint: Some("/api/tickers/".to_string()),
            status: Some(500),
            message: Some(message.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_attaches_username() {
        let provider = setup_provider().await;
        let user = provider.user().create(NewUser::new("alice")).await.unwrap();

        let mut new = report("network", "timeout");
        new.user_id = Some(user.id.clone());
        let stored = provider.error_log().create(new).await.unwrap();
        assert_eq!(stored.username.as_deref(), Some("alice"));
        assert_eq!(stored.user_id, Some(user.id));

        let anonymous = provider
            .error_log()
            .create(report("network", "timeout"))
            .await
            .unwrap();
        assert!(anonymous.user_id.is_none());
        assert!(anonymous.username.is_none());
    }

    #[tokio::test]
    async fn test_grouped_counts_and_filters() {
        let provider = setup_provider().await;
        let repo = provider.error_log();
        repo.create(report("network", "timeout")).await.unwrap();
        let mut last = report("network", "timeout");
        last.stack_trace = Some("at fetch()".to_string());
        let last = repo.create(last).await.unwrap();
        repo.create(report("render", "undefined is not a function"))
            .await
            .unwrap();

        let groups = repo.grouped(&ErrorLogFilter::default()).await.unwrap();
        assert_eq!(groups.len(), 2);
        let network = groups.iter().find(|g| g.error_type == "network").unwrap();
        assert_eq!(network.count, 2);
        assert_eq!(network.id, last.id);
        assert_eq!(network.stack_trace.as_deref(), Some("at fetch()"));

        let only_render = repo
            .grouped(&ErrorLogFilter {
                error_type: Some("render".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(only_render.len(), 1);

        let all = repo
            .grouped(&ErrorLogFilter {
                error_type: Some("all".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let future = repo
            .grouped(&ErrorLogFilter {
                start_date: Some("2999-01-01".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(future.is_empty());
    }
}
