use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{Session, User, UserId, error::EventError, session::SessionToken};

/// Things that happened, for handlers that want to react to them.
///
/// Emission is best effort: callers log a failing handler and carry on, so an
/// observer can never change the outcome of the request that produced the
/// event.
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserCreated(User),
    UserUpdated(User),

    // Session events
    SessionCreated(UserId, Session),
    SessionDeleted(UserId, SessionToken),

    // Lockout events
    /// A credential check failed and was counted.
    LoginFailed {
        /// Username as typed by the client
        username: String,
        /// Failures in the current window, this one included
        failed_attempts: u32,
        ip_address: String,
        timestamp: DateTime<Utc>,
    },

    /// A failure reached the threshold and the pair is now locked.
    AccountLocked {
        username: String,
        failed_attempts: u32,
        /// When the lock and the counter expire
        locked_until: DateTime<Utc>,
        ip_address: String,
        timestamp: DateTime<Utc>,
    },

    // Watchlist events
    WatchlistSubscribed { user_id: UserId, symbol: String },
    WatchlistUnsubscribed { user_id: UserId, symbol: String },

    // Alert events
    /// A price alert fired and its e-mail went out.
    AlertTriggered {
        alert_id: i64,
        user_id: UserId,
        symbol: String,
        price: f64,
    },
}

/// Receives every event emitted on an [`EventBus`] it is registered with.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle_event(&self, event: &Event) -> Result<(), EventError>;
}

/// Fans events out to registered handlers, in registration order.
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register an event handler with the event bus
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.push(handler);
    }

    /// Emit an event to all registered handlers, stopping at the first error
    pub async fn emit(&self, event: &Event) -> Result<(), EventError> {
        for handler in self.handlers.read().await.iter() {
            handler.handle_event(event).await?;
        }

        Ok(())
    }

    /// Emit an event and log, rather than return, a handler failure
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.emit(&event).await {
            tracing::warn!(error = %e, ?event, "Event handler failed");
        }
    }
}

/// Handler that writes every event to the tracing log.
pub struct TracingEventHandler;

#[async_trait]
impl EventHandler for TracingEventHandler {
    async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
        match event {
            Event::UserCreated(user) => {
                tracing::info!(user.id = %user.id, username = %user.username, "User created")
            }
            Event::UserUpdated(user) => tracing::debug!(user.id = %user.id, "User updated"),
            Event::SessionCreated(user_id, _) => {
                tracing::debug!(user.id = %user_id, "Session created")
            }
            Event::SessionDeleted(user_id, _) => {
                tracing::debug!(user.id = %user_id, "Session deleted")
            }
            Event::LoginFailed {
                username,
                failed_attempts,
                ip_address,
                ..
            } => tracing::info!(
                username = %username,
                ip = %ip_address,
                failed_attempts,
                "Login failed"
            ),
            Event::AccountLocked {
                username,
                failed_attempts,
                locked_until,
                ip_address,
                ..
            } => tracing::warn!(
                username = %username,
                ip = %ip_address,
                failed_attempts,
                locked_until = %locked_until,
                "Account locked"
            ),
            Event::WatchlistSubscribed { user_id, symbol } => {
                tracing::info!(user.id = %user_id, symbol = %symbol, "Watchlist subscribed")
            }
            Event::WatchlistUnsubscribed { user_id, symbol } => {
                tracing::info!(user.id = %user_id, symbol = %symbol, "Watchlist unsubscribed")
            }
            Event::AlertTriggered {
                alert_id,
                user_id,
                symbol,
                price,
            } => tracing::info!(
                alert.id = alert_id,
                user.id = %user_id,
                symbol = %symbol,
                price,
                "Alert triggered"
            ),
        }
        Ok(())
    }
}
