use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cryptodash_core::{
    Error, UserId,
    alert::{Alert, AlertCondition, NewAlert},
    error::StorageError,
    repositories::AlertRepository,
};
use sqlx::SqlitePool;

use crate::{db_error, from_unix};

const ALERT_COLUMNS: &str = "id, user_id, crypto, symbol, condition, price, active, is_triggered, \
     last_triggered_at, last_sent_at, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
struct SqliteAlert {
    id: i64,
    user_id: String,
    crypto: String,
    symbol: String,
    condition: String,
    price: f64,
    active: bool,
    is_triggered: bool,
    last_triggered_at: Option<i64>,
    last_sent_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<SqliteAlert> for Alert {
    type Error = Error;

    fn try_from(row: SqliteAlert) -> Result<Self, Self::Error> {
        let condition: AlertCondition = row.condition.parse().map_err(|_| {
            tracing::error!(alert_id = row.id, condition = %row.condition, "Stored alert has an unknown condition");
            Error::Storage(StorageError::Database(format!(
                "Alert {} has an invalid condition",
                row.id
            )))
        })?;

        Ok(Alert {
            id: row.id,
            user_id: UserId::new(&row.user_id),
            crypto: row.crypto,
            symbol: row.symbol,
            condition,
            price: row.price,
            active: row.active,
            is_triggered: row.is_triggered,
            last_triggered_at: row.last_triggered_at.map(from_unix),
            last_sent_at: row.last_sent_at.map(from_unix),
            created_at: from_unix(row.created_at),
            updated_at: from_unix(row.updated_at),
        })
    }
}

fn into_alerts(rows: Vec<SqliteAlert>) -> Result<Vec<Alert>, Error> {
    rows.into_iter().map(Alert::try_from).collect()
}

pub struct SqliteAlertRepository {
    pool: SqlitePool,
}

impl SqliteAlertRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertRepository for SqliteAlertRepository {
    async fn create(&self, user_id: &UserId, alert: NewAlert) -> Result<Alert, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteAlert>(&format!(
            r#"
            INSERT INTO alerts (user_id, crypto, symbol, condition, price, active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            RETURNING {ALERT_COLUMNS}
            "#
        ))
        .bind(user_id.as_str())
        .bind(&alert.crypto)
        .bind(&alert.symbol)
        .bind(alert.condition.as_str())
        .bind(alert.price)
        .bind(alert.active)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to create alert", e))?;

        row.try_into()
    }

    async fn find_for_user(&self, user_id: &UserId, id: i64) -> Result<Option<Alert>, Error> {
        let row = sqlx::query_as::<_, SqliteAlert>(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1 AND user_id = ?2"
        ))
        .bind(id)
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load alert", e))?;

        row.map(Alert::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Alert>, Error> {
        let rows = sqlx::query_as::<_, SqliteAlert>(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE user_id = ?1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list alerts", e))?;

        into_alerts(rows)
    }

    async fn update(&self, alert: &Alert) -> Result<Alert, Error> {
        let row = sqlx::query_as::<_, SqliteAlert>(&format!(
            r#"
            UPDATE alerts
            SET crypto = ?3, symbol = ?4, condition = ?5, price = ?6, active = ?7, updated_at = ?8
            WHERE id = ?1 AND user_id = ?2
            RETURNING {ALERT_COLUMNS}
            "#
        ))
        .bind(alert.id)
        .bind(alert.user_id.as_str())
        .bind(&alert.crypto)
        .bind(&alert.symbol)
        .bind(alert.condition.as_str())
        .bind(alert.price)
        .bind(alert.active)
        .bind(alert.updated_at.timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update alert", e))?;

        row.ok_or(Error::Storage(StorageError::NotFound))?.try_into()
    }

    async fn delete_for_user(&self, user_id: &UserId, id: i64) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM alerts WHERE id = ?1 AND user_id = ?2")
            .bind(id)
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete alert", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_active(&self) -> Result<Vec<Alert>, Error> {
        let rows = sqlx::query_as::<_, SqliteAlert>(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE active = 1 ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list active alerts", e))?;

        into_alerts(rows)
    }

    async fn mark_triggered(&self, id: i64, at: DateTime<Utc>) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE alerts
            SET is_triggered = 1, last_triggered_at = ?2, last_sent_at = ?2, updated_at = ?2
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark alert as triggered", e))?;

        Ok(())
    }
}
