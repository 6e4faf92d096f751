//! Core domain types and services for the cryptodash backend.
//!
//! Storage backends implement the traits in [`repositories`]; the services in
//! [`services`] hold the business rules and are generic over those traits.
//! The login-attempt lockout lives in [`lockout`] (policy and counter stores)
//! and [`services::LoginAttemptService`] (bookkeeping).
pub mod alert;
pub mod crypto;
pub mod error;
pub mod error_log;
pub mod events;
pub mod id;
pub mod lockout;
pub mod market;
pub mod repositories;
pub mod services;
pub mod session;
pub mod user;
pub mod validation;
pub mod watchlist;

pub use error::Error;
pub use events::{Event, EventBus, EventHandler};
pub use lockout::{AttemptKey, AttemptStore, LockoutConfig, MemoryAttemptStore};
pub use repositories::RepositoryProvider;
pub use session::{Session, SessionToken};
pub use user::{User, UserId};
