use async_trait::async_trait;
use cryptodash_core::services::{AlertNotifier, PriceAlertNotice};
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::{
    client::build_client,
    config::endpoint,
    error::{Result, Service},
    templates::AlertEmail,
};

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    subject: &'a str,
    body: &'a str,
    recipients: [&'a str; 1],
    is_html: bool,
}

/// Client for the notification service's `/send-email` endpoint.
#[derive(Debug, Clone)]
pub struct NotificationClient {
    http: Client,
    url: String,
    html: bool,
}

impl NotificationClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            http: build_client(None)?,
            url: endpoint(base_url, "send-email"),
            html: true,
        })
    }

    /// Send the plain-text rendering instead of the HTML one.
    pub fn plain_text(mut self) -> Self {
        self.html = false;
        self
    }

    async fn deliver(&self, notice: &PriceAlertNotice) -> Result<bool> {
        let email = AlertEmail::render(notice)?;
        let request = SendEmailRequest {
            subject: &email.subject,
            body: if self.html { &email.html } else { &email.text },
            recipients: [notice.email.trim()],
            is_html: self.html,
        };

        let response = self.http.post(&self.url).json(&request).send().await?;
        if response.status() == StatusCode::OK {
            tracing::info!(recipient = %notice.email, "Alert e-mail accepted by notification service");
            return Ok(true);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        tracing::error!(
            service = %Service::Notification,
            status,
            body = %body,
            "Notification service rejected the e-mail"
        );
        Ok(false)
    }
}

#[async_trait]
impl AlertNotifier for NotificationClient {
    async fn send_price_alert(&self, notice: &PriceAlertNotice) -> bool {
        if notice.email.trim().is_empty() {
            tracing::error!("Cannot send alert e-mail: recipient is empty");
            return false;
        }

        match self.deliver(notice).await {
            Ok(sent) => sent,
            Err(e) => {
                tracing::error!(service = %Service::Notification, error = %e, "Failed to call notification service");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{closed_url, spawn};
    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
    use serde_json::Value;
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Clone, Default)]
    struct Inbox {
        calls: Arc<AtomicUsize>,
        last: Arc<Mutex<Option<Value>>>,
    }

    async fn fake_service(status: StatusCode) -> (String, Inbox) {
        let inbox = Inbox::default();
        let router = Router::new()
            .route(
                "/send-email",
                post(
                    move |State(inbox): State<Inbox>, Json(body): Json<Value>| async move {
                        inbox.calls.fetch_add(1, Ordering::SeqCst);
                        *inbox.last.lock().unwrap() = Some(body);
                        status
                    },
                ),
            )
            .with_state(inbox.clone());
        (spawn(router).await, inbox)
    }

    fn notice(email: &str) -> PriceAlertNotice {
        PriceAlertNotice {
            email: email.to_string(),
            crypto: "Ethereum".to_string(),
            symbol: "ETH".to_string(),
            condition: "below".to_string(),
            target_price: 2_000.0,
            current_price: 1_950.25,
        }
    }

    #[tokio::test]
    async fn test_sends_html_payload() {
        let (url, inbox) = fake_service(StatusCode::OK).await;
        let client = NotificationClient::new(&url).unwrap();

        assert!(client.send_price_alert(&notice("a@example.com")).await);

        let body = inbox.last.lock().unwrap().clone().unwrap();
        assert_eq!(body["recipients"], serde_json::json!(["a@example.com"]));
        assert_eq!(body["is_html"], true);
        assert_eq!(body["subject"], "🔔 Предупредување за цена: Ethereum (ETH)");
        assert!(body["body"].as_str().unwrap().contains("<html>"));
    }

    #[tokio::test]
    async fn test_plain_text_payload() {
        let (url, inbox) = fake_service(StatusCode::OK).await;
        let client = NotificationClient::new(&url).unwrap().plain_text();

        assert!(client.send_price_alert(&notice("a@example.com")).await);

        let body = inbox.last.lock().unwrap().clone().unwrap();
        assert_eq!(body["is_html"], false);
        assert!(body["body"].as_str().unwrap().contains("Цена под $2,000.00"));
    }

    #[tokio::test]
    async fn test_non_200_is_failure() {
        let (url, inbox) = fake_service(StatusCode::ACCEPTED).await;
        let client = NotificationClient::new(&url).unwrap();

        assert!(!client.send_price_alert(&notice("a@example.com")).await);
        assert_eq!(inbox.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_recipient_skips_request() {
        let (url, inbox) = fake_service(StatusCode::OK).await;
        let client = NotificationClient::new(&url).unwrap();

        assert!(!client.send_price_alert(&notice("   ")).await);
        assert_eq!(inbox.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let client = NotificationClient::new(&closed_url().await).unwrap();
        assert!(!client.send_price_alert(&notice("a@example.com")).await);
    }
}
