use async_trait::async_trait;

use crate::{Error, UserId};

/// Repository for per-user watchlists. Symbols arrive already normalized.
#[async_trait]
pub trait WatchlistRepository: Send + Sync + 'static {
    /// Add a symbol, returning false when it was already listed
    async fn add(&self, user_id: &UserId, symbol: &str) -> Result<bool, Error>;

    /// Remove a symbol, returning the number of rows deleted
    async fn remove(&self, user_id: &UserId, symbol: &str) -> Result<u64, Error>;

    /// The user's symbols, most recently added first
    async fn list(&self, user_id: &UserId) -> Result<Vec<String>, Error>;
}
