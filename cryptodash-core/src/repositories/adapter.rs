use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error, Session, User, UserId,
    alert::{Alert, NewAlert},
    error_log::{ErrorLogFilter, ErrorLogGroup, ErrorReport, NewErrorReport},
    market::{Coin, MarketStats, PriceRow},
    repositories::{
        AlertRepository, ErrorLogRepository, MarketRepository, PasswordRepository,
        RepositoryProvider, SessionRepository, UserRepository, WatchlistRepository,
    },
    session::SessionToken,
    user::NewUser,
};

/// Adapter that wraps a RepositoryProvider and implements individual repository traits
pub struct UserRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> UserRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> UserRepository for UserRepositoryAdapter<R> {
    async fn create(&self, user: NewUser) -> Result<User, Error> {
        self.provider.user().create(user).await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.provider.user().find_by_id(id).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, Error> {
        self.provider.user().find_by_username(username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.provider.user().find_by_email(email).await
    }

    async fn list_without_email(&self) -> Result<Vec<User>, Error> {
        self.provider.user().list_without_email().await
    }

    async fn update(&self, user: &User) -> Result<User, Error> {
        self.provider.user().update(user).await
    }
}

pub struct SessionRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> SessionRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> SessionRepository for SessionRepositoryAdapter<R> {
    async fn create(&self, session: Session) -> Result<Session, Error> {
        self.provider.session().create(session).await
    }

    async fn find_by_token(&self, token: &SessionToken) -> Result<Option<Session>, Error> {
        self.provider.session().find_by_token(token).await
    }

    async fn touch(
        &self,
        token: &SessionToken,
        last_activity: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), Error> {
        self.provider
            .session()
            .touch(token, last_activity, expires_at)
            .await
    }

    async fn delete(&self, token: &SessionToken) -> Result<(), Error> {
        self.provider.session().delete(token).await
    }

    async fn delete_by_user_id(&self, user_id: &UserId) -> Result<(), Error> {
        self.provider.session().delete_by_user_id(user_id).await
    }

    async fn cleanup_expired(&self) -> Result<u64, Error> {
        self.provider.session().cleanup_expired().await
    }
}

pub struct PasswordRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> PasswordRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> PasswordRepository for PasswordRepositoryAdapter<R> {
    async fn set_password_hash(&self, user_id: &UserId, hash: &str) -> Result<(), Error> {
        self.provider
            .password()
            .set_password_hash(user_id, hash)
            .await
    }

    async fn get_password_hash(&self, user_id: &UserId) -> Result<Option<String>, Error> {
        self.provider.password().get_password_hash(user_id).await
    }
}

pub struct AlertRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AlertRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AlertRepository for AlertRepositoryAdapter<R> {
    async fn create(&self, user_id: &UserId, alert: NewAlert) -> Result<Alert, Error> {
        self.provider.alert().create(user_id, alert).await
    }

    async fn find_for_user(&self, user_id: &UserId, id: i64) -> Result<Option<Alert>, Error> {
        self.provider.alert().find_for_user(user_id, id).await
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Alert>, Error> {
        self.provider.alert().list_for_user(user_id).await
    }

    async fn update(&self, alert: &Alert) -> Result<Alert, Error> {
        self.provider.alert().update(alert).await
    }

    async fn delete_for_user(&self, user_id: &UserId, id: i64) -> Result<bool, Error> {
        self.provider.alert().delete_for_user(user_id, id).await
    }

    async fn list_active(&self) -> Result<Vec<Alert>, Error> {
        self.provider.alert().list_active().await
    }

    async fn mark_triggered(&self, id: i64, at: DateTime<Utc>) -> Result<(), Error> {
        self.provider.alert().mark_triggered(id, at).await
    }
}

pub struct WatchlistRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> WatchlistRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> WatchlistRepository for WatchlistRepositoryAdapter<R> {
    async fn add(&self, user_id: &UserId, symbol: &str) -> Result<bool, Error> {
        self.provider.watchlist().add(user_id, symbol).await
    }

    async fn remove(&self, user_id: &UserId, symbol: &str) -> Result<u64, Error> {
        self.provider.watchlist().remove(user_id, symbol).await
    }

    async fn list(&self, user_id: &UserId) -> Result<Vec<String>, Error> {
        self.provider.watchlist().list(user_id).await
    }
}

pub struct MarketRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> MarketRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> MarketRepository for MarketRepositoryAdapter<R> {
    async fn distinct_symbols(&self, limit: u32) -> Result<Vec<String>, Error> {
        self.provider.market().distinct_symbols(limit).await
    }

    async fn latest_for_symbol(&self, symbol: &str) -> Result<Option<PriceRow>, Error> {
        self.provider.market().latest_for_symbol(symbol).await
    }

    async fn latest_per_symbol(&self, limit: u32) -> Result<Vec<PriceRow>, Error> {
        self.provider.market().latest_per_symbol(limit).await
    }

    async fn history(&self, symbol: &str, limit: u32) -> Result<Vec<PriceRow>, Error> {
        self.provider.market().history(symbol, limit).await
    }

    async fn stats(&self) -> Result<MarketStats, Error> {
        self.provider.market().stats().await
    }

    async fn active_coins(&self) -> Result<Vec<Coin>, Error> {
        self.provider.market().active_coins().await
    }
}

pub struct ErrorLogRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> ErrorLogRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> ErrorLogRepository for ErrorLogRepositoryAdapter<R> {
    async fn create(&self, report: NewErrorReport) -> Result<ErrorReport, Error> {
        self.provider.error_log().create(report).await
    }

    async fn grouped(&self, filter: &ErrorLogFilter) -> Result<Vec<ErrorLogGroup>, Error> {
        self.provider.error_log().grouped(filter).await
    }
}
