use std::sync::Arc;

use chrono::Utc;

use crate::{
    Error, UserId,
    alert::{Alert, AlertInput},
    error::NotFoundError,
    repositories::AlertRepository,
};

/// Service for a user's own price alerts
pub struct AlertService<R: AlertRepository> {
    repository: Arc<R>,
}

impl<R: AlertRepository> AlertService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// The user's alerts, newest first
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<Alert>, Error> {
        self.repository.list_for_user(user_id).await
    }

    pub async fn create(&self, user_id: &UserId, input: AlertInput) -> Result<Alert, Error> {
        let new_alert = input.into_new_alert()?;
        let alert = self.repository.create(user_id, new_alert).await?;
        tracing::info!(
            alert.id = alert.id,
            user.id = %user_id,
            symbol = %alert.symbol,
            condition = %alert.condition,
            "Created price alert"
        );
        Ok(alert)
    }

    /// One of the user's alerts. Other users' alerts are reported as missing.
    pub async fn get(&self, user_id: &UserId, id: i64) -> Result<Alert, Error> {
        self.repository
            .find_for_user(user_id, id)
            .await?
            .ok_or(Error::NotFound(NotFoundError::Alert(id)))
    }

    /// Partial update: only fields present in `input` change.
    pub async fn update(&self, user_id: &UserId, id: i64, input: AlertInput) -> Result<Alert, Error> {
        let mut alert = self.get(user_id, id).await?;
        input.apply_to(&mut alert)?;
        alert.updated_at = Utc::now();
        self.repository.update(&alert).await
    }

    pub async fn delete(&self, user_id: &UserId, id: i64) -> Result<(), Error> {
        if !self.repository.delete_for_user(user_id, id).await? {
            return Err(Error::NotFound(NotFoundError::Alert(id)));
        }
        tracing::info!(alert.id = id, user.id = %user_id, "Deleted price alert");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::alert::{NewAlert, PriceValue};
    use async_trait::async_trait;
    use chrono::DateTime;
    use tokio::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct MockAlertRepository {
        pub(crate) alerts: Mutex<Vec<Alert>>,
    }

    #[async_trait]
    impl AlertRepository for MockAlertRepository {
        async fn create(&self, user_id: &UserId, alert: NewAlert) -> Result<Alert, Error> {
            let mut alerts = self.alerts.lock().await;
            let now = Utc::now();
            let alert = Alert {
                id: alerts.len() as i64 + 1,
                user_id: user_id.clone(),
                crypto: alert.crypto,
                symbol: alert.symbol,
                condition: alert.condition,
                price: alert.price,
                active: alert.active,
                is_triggered: false,
                last_triggered_at: None,
                last_sent_at: None,
                created_at: now,
                updated_at: now,
            };
            alerts.push(alert.clone());
            Ok(alert)
        }

        async fn find_for_user(&self, user_id: &UserId, id: i64) -> Result<Option<Alert>, Error> {
            Ok(self
                .alerts
                .lock()
                .await
                .iter()
                .find(|a| a.id == id && &a.user_id == user_id)
                .cloned())
        }

        async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Alert>, Error> {
            let mut alerts: Vec<Alert> = self
                .alerts
                .lock()
                .await
                .iter()
                .filter(|a| &a.user_id == user_id)
                .cloned()
                .collect();
            alerts.sort_by(|a, b| b.id.cmp(&a.id));
            Ok(alerts)
        }

        async fn update(&self, alert: &Alert) -> Result<Alert, Error> {
            let mut alerts = self.alerts.lock().await;
            if let Some(existing) = alerts.iter_mut().find(|a| a.id == alert.id) {
                *existing = alert.clone();
            }
            Ok(alert.clone())
        }

        async fn delete_for_user(&self, user_id: &UserId, id: i64) -> Result<bool, Error> {
            let mut alerts = self.alerts.lock().await;
            let before = alerts.len();
            alerts.retain(|a| !(a.id == id && &a.user_id == user_id));
            Ok(alerts.len() < before)
        }

        async fn list_active(&self) -> Result<Vec<Alert>, Error> {
            Ok(self
                .alerts
                .lock()
                .await
                .iter()
                .filter(|a| a.active)
                .cloned()
                .collect())
        }

        async fn mark_triggered(&self, id: i64, at: DateTime<Utc>) -> Result<(), Error> {
            if let Some(alert) = self.alerts.lock().await.iter_mut().find(|a| a.id == id) {
                alert.is_triggered = true;
                alert.last_triggered_at = Some(at);
                alert.last_sent_at = Some(at);
            }
            Ok(())
        }
    }

    fn input(symbol: &str, price: f64) -> AlertInput {
        AlertInput {
            crypto: Some("Bitcoin".to_string()),
            symbol: Some(symbol.to_string()),
            condition: Some("above".to_string()),
            price: Some(PriceValue::Number(price)),
            active: None,
        }
    }

    #[tokio::test]
    async fn test_crud_is_scoped_to_owner() {
        let service = AlertService::new(Arc::new(MockAlertRepository::default()));
        let alice = UserId::new_random();
        let bob = UserId::new_random();

        let alert = service.create(&alice, input("BTC", 50_000.0)).await.unwrap();
        assert!(alert.active);

        let err = service.get(&bob, alert.id).await.unwrap_err();
        assert_eq!(
            err.public_message(),
            format!("Alert with ID {} not found", alert.id)
        );
        assert!(service.delete(&bob, alert.id).await.is_err());
        assert!(service.list(&bob).await.unwrap().is_empty());

        service.delete(&alice, alert.id).await.unwrap();
        assert!(service.list(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let service = AlertService::new(Arc::new(MockAlertRepository::default()));
        let user = UserId::new_random();
        service.create(&user, input("BTC", 1.0)).await.unwrap();
        service.create(&user, input("ETH", 2.0)).await.unwrap();

        let symbols: Vec<String> = service
            .list(&user)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.symbol)
            .collect();
        assert_eq!(symbols, vec!["ETH", "BTC"]);
    }

    #[tokio::test]
    async fn test_update_is_partial() {
        let service = AlertService::new(Arc::new(MockAlertRepository::default()));
        let user = UserId::new_random();
        let alert = service.create(&user, input("BTC", 100.0)).await.unwrap();

        let updated = service
            .update(
                &user,
                alert.id,
                AlertInput {
                    condition: Some("below".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.condition.as_str(), "below");
        assert_eq!(updated.price, 100.0);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_data() {
        let service = AlertService::new(Arc::new(MockAlertRepository::default()));
        let err = service
            .create(&UserId::new_random(), input("BTC", 0.0))
            .await
            .unwrap_err();
        assert!(err.public_message().starts_with("Invalid alert data: "));
    }
}
