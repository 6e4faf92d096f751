use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error, UserId,
    alert::{Alert, NewAlert},
};

/// Repository for price alerts
///
/// Lookups that take a `user_id` only see that user's alerts.
#[async_trait]
pub trait AlertRepository: Send + Sync + 'static {
    /// Create an alert owned by `user_id`
    async fn create(&self, user_id: &UserId, alert: NewAlert) -> Result<Alert, Error>;

    /// Find one of the user's alerts
    async fn find_for_user(&self, user_id: &UserId, id: i64) -> Result<Option<Alert>, Error>;

    /// All of the user's alerts, newest first
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Alert>, Error>;

    /// Persist the editable fields of an alert
    async fn update(&self, alert: &Alert) -> Result<Alert, Error>;

    /// Delete one of the user's alerts, returning whether it existed
    async fn delete_for_user(&self, user_id: &UserId, id: i64) -> Result<bool, Error>;

    /// Every active alert across all users
    async fn list_active(&self) -> Result<Vec<Alert>, Error>;

    /// Mark an alert as triggered and notified at `at`
    async fn mark_triggered(&self, id: i64, at: DateTime<Utc>) -> Result<(), Error>;
}
