//! Periodic evaluation of price alerts.
//!
//! For each active alert: skip it when an e-mail went out in the last 24
//! hours, look up the latest price, compare it with the target, and e-mail the
//! owner when the condition holds. A run never aborts because one alert fails.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    Error,
    alert::{Alert, AlertCheckReport},
    events::{Event, EventBus},
    repositories::{AlertRepository, MarketRepository, UserRepository},
    services::{
        MarketDataService,
        notifier::{AlertNotifier, PriceAlertNotice},
    },
};

enum Verdict {
    SkippedRecent,
    MissingPrice,
    NotMet,
    NoEmail,
    Triggered,
    Failed,
}

pub struct AlertCheckService<A: AlertRepository, U: UserRepository, M: MarketRepository> {
    alerts: Arc<A>,
    users: Arc<U>,
    market: MarketDataService<M>,
    notifier: Arc<dyn AlertNotifier>,
    event_bus: Option<EventBus>,
}

impl<A: AlertRepository, U: UserRepository, M: MarketRepository> AlertCheckService<A, U, M> {
    pub fn new(
        alerts: Arc<A>,
        users: Arc<U>,
        market: Arc<M>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Self {
        Self {
            alerts,
            users,
            market: MarketDataService::new(market),
            notifier,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Check every active alert once.
    pub async fn run(&self) -> Result<AlertCheckReport, Error> {
        let active = self.alerts.list_active().await?;
        let mut report = AlertCheckReport {
            total_active: active.len(),
            ..Default::default()
        };
        tracing::info!(count = active.len(), "Checking active price alerts");

        for alert in &active {
            let verdict = match self.check_one(alert).await {
                Ok(verdict) => verdict,
                Err(e) => {
                    tracing::error!(alert.id = alert.id, error = %e, "Error processing alert");
                    Verdict::Failed
                }
            };

            match verdict {
                Verdict::SkippedRecent => report.skipped_recent += 1,
                Verdict::MissingPrice => report.missing_price += 1,
                Verdict::NotMet => report.checked += 1,
                Verdict::NoEmail => {
                    report.checked += 1;
                    report.skipped_no_email += 1;
                }
                Verdict::Triggered => {
                    report.checked += 1;
                    report.triggered += 1;
                }
                Verdict::Failed => {
                    report.checked += 1;
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            total_active = report.total_active,
            checked = report.checked,
            triggered = report.triggered,
            skipped_recent = report.skipped_recent,
            failed = report.failed,
            "Alert check completed"
        );
        Ok(report)
    }

    async fn check_one(&self, alert: &Alert) -> Result<Verdict, Error> {
        let now = Utc::now();
        if alert.sent_recently(now) {
            tracing::debug!(alert.id = alert.id, symbol = %alert.symbol, "Skipping alert, e-mailed recently");
            return Ok(Verdict::SkippedRecent);
        }

        let Some(current_price) = self.market.current_price(&alert.symbol).await? else {
            tracing::warn!(symbol = %alert.symbol, "Could not fetch price");
            return Ok(Verdict::MissingPrice);
        };

        if !alert.condition.is_met(current_price, alert.price) {
            return Ok(Verdict::NotMet);
        }
        tracing::info!(
            alert.id = alert.id,
            symbol = %alert.symbol,
            current_price,
            target = alert.price,
            condition = %alert.condition,
            "Alert condition met"
        );

        let email = self
            .users
            .find_by_id(&alert.user_id)
            .await?
            .and_then(|user| user.email)
            .filter(|email| !email.trim().is_empty());
        let Some(email) = email else {
            tracing::warn!(alert.id = alert.id, user.id = %alert.user_id, "Owner has no e-mail address");
            return Ok(Verdict::NoEmail);
        };

        let notice = PriceAlertNotice {
            email,
            crypto: alert.crypto.clone(),
            symbol: alert.symbol.clone(),
            condition: alert.condition.as_str().to_string(),
            target_price: alert.price,
            current_price,
        };
        if !self.notifier.send_price_alert(&notice).await {
            tracing::error!(alert.id = alert.id, symbol = %alert.symbol, "Failed to send alert e-mail");
            return Ok(Verdict::Failed);
        }

        self.alerts.mark_triggered(alert.id, now).await?;
        if let Some(event_bus) = &self.event_bus {
            event_bus
                .publish(Event::AlertTriggered {
                    alert_id: alert.id,
                    user_id: alert.user_id.clone(),
                    symbol: alert.symbol.clone(),
                    price: current_price,
                })
                .await;
        }
        Ok(Verdict::Triggered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        UserId,
        alert::{AlertInput, PriceValue},
        services::{
            alert::tests::MockAlertRepository,
            market_data::tests::{MockMarketRepository, price_row},
            notifier::tests::RecordingNotifier,
            user::tests::MockUserRepository,
        },
        user::NewUser,
    };

    struct Fixture {
        alerts: Arc<MockAlertRepository>,
        users: Arc<MockUserRepository>,
        notifier: Arc<RecordingNotifier>,
        service: AlertCheckService<MockAlertRepository, MockUserRepository, MockMarketRepository>,
    }

    fn fixture(rows: Vec<crate::market::PriceRow>, notifier_succeeds: bool) -> Fixture {
        let alerts = Arc::new(MockAlertRepository::default());
        let users = Arc::new(MockUserRepository::default());
        let notifier = Arc::new(RecordingNotifier::new(notifier_succeeds));
        let service = AlertCheckService::new(
            alerts.clone(),
            users.clone(),
            Arc::new(MockMarketRepository::with_rows(rows)),
            notifier.clone(),
        );
        Fixture {
            alerts,
            users,
            notifier,
            service,
        }
    }

    async fn user(users: &MockUserRepository, email: Option<&str>) -> UserId {
        users
            .create(NewUser::new("alice").with_email(email.map(str::to_string)))
            .await
            .unwrap()
            .id
    }

    async fn alert(alerts: &MockAlertRepository, owner: &UserId, symbol: &str, condition: &str, price: f64) -> i64 {
        let input = AlertInput {
            crypto: Some("Bitcoin".to_string()),
            symbol: Some(symbol.to_string()),
            condition: Some(condition.to_string()),
            price: Some(PriceValue::Number(price)),
            active: None,
        };
        alerts
            .create(owner, input.into_new_alert().unwrap())
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_triggers_and_marks_alert() {
        let f = fixture(vec![price_row("BTC", "2024-05-01T00:00:00", Some(50_000.0))], true);
        let owner = user(&f.users, Some("alice@example.com")).await;
        let id = alert(&f.alerts, &owner, "BTC", "above", 50_000.0).await;

        let report = f.service.run().await.unwrap();
        assert_eq!(report.total_active, 1);
        assert_eq!(report.checked, 1);
        assert_eq!(report.triggered, 1);

        let sent = f.notifier.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].email, "alice@example.com");
        assert_eq!(sent[0].current_price, 50_000.0);

        let stored = f.alerts.find_for_user(&owner, id).await.unwrap().unwrap();
        assert!(stored.is_triggered);
        assert!(stored.last_sent_at.is_some());
    }

    #[tokio::test]
    async fn test_second_run_within_a_day_is_skipped() {
        let f = fixture(vec![price_row("BTC", "2024-05-01T00:00:00", Some(10.0))], true);
        let owner = user(&f.users, Some("alice@example.com")).await;
        alert(&f.alerts, &owner, "BTC", "below", 20.0).await;

        f.service.run().await.unwrap();
        let report = f.service.run().await.unwrap();
        assert_eq!(report.skipped_recent, 1);
        assert_eq!(report.triggered, 0);
        assert_eq!(f.notifier.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_condition_not_met_and_missing_price() {
        let f = fixture(vec![price_row("BTC", "2024-05-01T00:00:00", Some(10.0))], true);
        let owner = user(&f.users, Some("alice@example.com")).await;
        alert(&f.alerts, &owner, "BTC", "above", 20.0).await;
        alert(&f.alerts, &owner, "ETH", "above", 20.0).await;

        let report = f.service.run().await.unwrap();
        assert_eq!(report.checked, 1);
        assert_eq!(report.missing_price, 1);
        assert_eq!(report.triggered, 0);
        assert!(f.notifier.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_owner_without_email_is_skipped() {
        let f = fixture(vec![price_row("BTC", "2024-05-01T00:00:00", Some(30.0))], true);
        let owner = user(&f.users, None).await;
        let id = alert(&f.alerts, &owner, "BTC", "above", 20.0).await;

        let report = f.service.run().await.unwrap();
        assert_eq!(report.skipped_no_email, 1);
        let stored = f.alerts.find_for_user(&owner, id).await.unwrap().unwrap();
        assert!(!stored.is_triggered);
    }

    #[tokio::test]
    async fn test_failed_send_leaves_alert_untouched() {
        let f = fixture(vec![price_row("BTC", "2024-05-01T00:00:00", Some(30.0))], false);
        let owner = user(&f.users, Some("alice@example.com")).await;
        let id = alert(&f.alerts, &owner, "BTC", "above", 20.0).await;

        let report = f.service.run().await.unwrap();
        assert_eq!(report.failed, 1);
        let stored = f.alerts.find_for_user(&owner, id).await.unwrap().unwrap();
        assert!(stored.last_sent_at.is_none());
    }
}
