//! Repository traits for the data access layer
//!
//! Services talk to storage only through these traits.
//!
//! - Individual `*Repository` traits define the operations for each data domain
//! - Individual `*RepositoryProvider` traits hand out one repository each
//! - [`RepositoryProvider`] combines all of them plus lifecycle methods
//!
//! The `*RepositoryAdapter` types in [`adapter`] turn a shared provider back into
//! standalone repositories, which is what the services are generic over.

pub mod adapter;
pub mod alert;
pub mod error_log;
pub mod market;
pub mod password;
pub mod session;
pub mod user;
pub mod watchlist;

pub use adapter::{
    AlertRepositoryAdapter, ErrorLogRepositoryAdapter, MarketRepositoryAdapter,
    PasswordRepositoryAdapter, SessionRepositoryAdapter, UserRepositoryAdapter,
    WatchlistRepositoryAdapter,
};
pub use alert::AlertRepository;
pub use error_log::ErrorLogRepository;
pub use market::MarketRepository;
pub use password::PasswordRepository;
pub use session::SessionRepository;
pub use user::UserRepository;
pub use watchlist::WatchlistRepository;

use async_trait::async_trait;

use crate::Error;

/// Provider trait for user repository access.
pub trait UserRepositoryProvider: Send + Sync + 'static {
    type UserRepo: UserRepository;

    fn user(&self) -> &Self::UserRepo;
}

/// Provider trait for session repository access.
pub trait SessionRepositoryProvider: Send + Sync + 'static {
    type SessionRepo: SessionRepository;

    fn session(&self) -> &Self::SessionRepo;
}

/// Provider trait for password repository access.
pub trait PasswordRepositoryProvider: Send + Sync + 'static {
    type PasswordRepo: PasswordRepository;

    fn password(&self) -> &Self::PasswordRepo;
}

/// Provider trait for price alert repository access.
pub trait AlertRepositoryProvider: Send + Sync + 'static {
    type AlertRepo: AlertRepository;

    fn alert(&self) -> &Self::AlertRepo;
}

/// Provider trait for watchlist repository access.
pub trait WatchlistRepositoryProvider: Send + Sync + 'static {
    type WatchlistRepo: WatchlistRepository;

    fn watchlist(&self) -> &Self::WatchlistRepo;
}

/// Provider trait for market data repository access.
pub trait MarketRepositoryProvider: Send + Sync + 'static {
    type MarketRepo: MarketRepository;

    fn market(&self) -> &Self::MarketRepo;
}

/// Provider trait for error report repository access.
pub trait ErrorLogRepositoryProvider: Send + Sync + 'static {
    type ErrorLogRepo: ErrorLogRepository;

    fn error_log(&self) -> &Self::ErrorLogRepo;
}

/// Provider trait that storage implementations must implement to provide all repositories.
///
/// # Example
///
/// ```rust,ignore
/// use cryptodash_core::repositories::*;
///
/// struct MyStorage { /* ... */ }
///
/// impl UserRepositoryProvider for MyStorage {
///     type UserRepo = MyUserRepository;
///     fn user(&self) -> &Self::UserRepo { &self.user_repo }
/// }
///
/// // ... implement other provider traits ...
///
/// #[async_trait]
/// impl RepositoryProvider for MyStorage {
///     async fn migrate(&self) -> Result<(), Error> { /* ... */ }
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
///     async fn list_tables(&self) -> Result<Vec<String>, Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider:
    UserRepositoryProvider
    + SessionRepositoryProvider
    + PasswordRepositoryProvider
    + AlertRepositoryProvider
    + WatchlistRepositoryProvider
    + MarketRepositoryProvider
    + ErrorLogRepositoryProvider
{
    /// Run migrations for all repositories
    async fn migrate(&self) -> Result<(), Error>;

    /// Check that the database answers
    async fn health_check(&self) -> Result<(), Error>;

    /// Names of the user tables in the database, sorted
    async fn list_tables(&self) -> Result<Vec<String>, Error>;
}
