use std::sync::Arc;

use crate::{
    Error, UserId,
    events::{Event, EventBus},
    repositories::WatchlistRepository,
    validation::normalize_symbol,
    watchlist::{Subscription, Unsubscription},
};

/// Service for per-user watchlists.
///
/// Every effective change is published on the event bus; handler failures
/// are logged and never fail the request.
pub struct WatchlistService<R: WatchlistRepository> {
    repository: Arc<R>,
    event_bus: EventBus,
}

impl<R: WatchlistRepository> WatchlistService<R> {
    pub fn new(repository: Arc<R>, event_bus: EventBus) -> Self {
        Self {
            repository,
            event_bus,
        }
    }

    /// The user's symbols, most recently added first
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<String>, Error> {
        self.repository.list(user_id).await
    }

    pub async fn subscribe(&self, user_id: &UserId, symbol: &str) -> Result<Subscription, Error> {
        let symbol = normalize_symbol(symbol)?;
        let created = self.repository.add(user_id, &symbol).await?;

        if created {
            self.event_bus
                .publish(Event::WatchlistSubscribed {
                    user_id: user_id.clone(),
                    symbol: symbol.clone(),
                })
                .await;
        }

        Ok(Subscription {
            ok: true,
            symbol,
            created,
        })
    }

    pub async fn unsubscribe(
        &self,
        user_id: &UserId,
        symbol: &str,
    ) -> Result<Unsubscription, Error> {
        let symbol = normalize_symbol(symbol)?;
        let deleted = self.repository.remove(user_id, &symbol).await?;

        if deleted > 0 {
            self.event_bus
                .publish(Event::WatchlistUnsubscribed {
                    user_id: user_id.clone(),
                    symbol: symbol.clone(),
                })
                .await;
        }

        Ok(Unsubscription {
            ok: true,
            symbol,
            deleted,
        })
    }
}
