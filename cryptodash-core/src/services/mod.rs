//! Service layer for business logic
//!
//! Each service is generic over the repository traits it needs and holds
//! them behind `Arc`, so one instance can be shared by every request.

pub mod alert;
pub mod alert_check;
pub mod error_log;
pub mod lockout;
pub mod market_data;
pub mod notifier;
pub mod password;
pub mod session;
pub mod user;
pub mod watchlist;

pub use alert::AlertService;
pub use alert_check::AlertCheckService;
pub use error_log::ErrorLogService;
pub use lockout::LoginAttemptService;
pub use market_data::MarketDataService;
pub use notifier::{AlertEmailRequest, AlertNotifier, PriceAlertNotice, send_alert_email};
pub use password::{PasswordService, Registration};
pub use session::{SessionConfig, SessionService};
pub use user::UserService;
pub use watchlist::WatchlistService;
