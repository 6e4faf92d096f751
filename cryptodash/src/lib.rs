//! # cryptodash
//!
//! Backend for a cryptocurrency dashboard: session authentication guarded by a
//! login-attempt lockout, price alerts, watchlists, read-only market data and
//! proxies to the analysis microservices.
//!
//! [`CryptoDash`] is the composition root. It owns one instance of every
//! service, wires them to a single [`RepositoryProvider`], and is what the
//! HTTP layer holds in its state.
//!
//! ## Login lockout
//!
//! Failed logins are counted per `(username, client IP)`. After five failures
//! inside the window the pair is locked for fifteen minutes; while locked,
//! requests are rejected before the password is even checked and do not
//! extend the lock. A successful login clears the counter.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cryptodash::{ClientInfo, CryptoDashBuilder, Credentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dash = CryptoDashBuilder::new()
//!         .with_sqlite("sqlite://crypto.db?mode=rwc")
//!         .await?
//!         .apply_migrations(true)
//!         .build()
//!         .await?;
//!
//!     let credentials = Credentials::new("alice", "correct horse");
//!     match dash.login(&credentials, &ClientInfo::new("127.0.0.1")).await {
//!         Ok((user, _session)) => println!("welcome {}", user.username),
//!         Err(e) => println!("{}", e.public_message()),
//!     }
//!     Ok(())
//! }
//! ```
pub mod builder;
pub mod health;
pub mod media;

use std::sync::Arc;

use chrono::Utc;
use cryptodash_core::{
    error::{NotFoundError, SessionError},
    events::TracingEventHandler,
    lockout::FailureOutcome,
    repositories::{
        AlertRepositoryAdapter, ErrorLogRepositoryAdapter, MarketRepositoryAdapter,
        PasswordRepositoryAdapter, SessionRepositoryAdapter, UserRepositoryAdapter,
        WatchlistRepositoryAdapter,
    },
    services::{
        AlertCheckService, AlertService, ErrorLogService, LoginAttemptService, MarketDataService,
        PasswordService, SessionService, UserService, WatchlistService,
    },
    validation::require_credentials,
};
use cryptodash_upstream::{Service, UpstreamClients, UpstreamError};
use serde::Deserialize;
use serde_json::Value;
use tokio::{sync::watch, task::JoinHandle};

pub use builder::{CryptoDashBuilder, CryptoDashBuilderError, NoStorage, WithStorage};
pub use health::HealthReport;
pub use media::{MediaStorage, media_url};

pub use cryptodash_core::{
    AttemptKey, AttemptStore, Error, Event, EventBus, EventHandler, LockoutConfig,
    MemoryAttemptStore, RepositoryProvider, Session, SessionToken, User, UserId,
    alert::{Alert, AlertCheckReport, AlertInput},
    error::{AuthError, ErrorKind},
    error_log::{ErrorLogFilter, ErrorLogGroup, ErrorReport, NewErrorReport},
    lockout::LockoutStatus,
    market::{Candle, Coin, Exchange, MarketSummary, Ticker},
    services::{AlertEmailRequest, AlertNotifier, PriceAlertNotice, Registration, SessionConfig},
    user::ProfileUpdate,
    watchlist::{Subscription, Unsubscription},
};
pub use cryptodash_upstream::{NotificationClient, PredictionRequest, Timeframe, UpstreamConfig};

/// Default microservice addresses.
pub mod upstream {
    pub use cryptodash_upstream::config::{
        DEFAULT_LSTM_URL, DEFAULT_NOTIFICATION_URL, DEFAULT_SENTIMENT_URL,
        DEFAULT_TECHNICAL_ANALYSIS_URL,
    };
}

#[cfg(feature = "sqlite")]
pub use cryptodash_storage_sqlite::{SqliteAttemptStore, SqliteRepositoryProvider};

/// How often expired sessions and attempt counters are purged
pub const HOUSEKEEPING_INTERVAL: std::time::Duration = std::time::Duration::from_secs(3600);

/// Username and password as submitted. Either may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }
}

/// Where a request came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: String,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn new(ip_address: &str) -> Self {
        Self {
            ip_address: ip_address.to_string(),
            user_agent: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }
}

type AlertChecker<R> =
    AlertCheckService<AlertRepositoryAdapter<R>, UserRepositoryAdapter<R>, MarketRepositoryAdapter<R>>;

/// The assembled backend.
///
/// Build one with [`CryptoDashBuilder`] and share it behind an `Arc`.
pub struct CryptoDash<R: RepositoryProvider> {
    repositories: Arc<R>,
    user_service: Arc<UserService<UserRepositoryAdapter<R>>>,
    password_service: Arc<PasswordService<UserRepositoryAdapter<R>, PasswordRepositoryAdapter<R>>>,
    session_service: Arc<SessionService<SessionRepositoryAdapter<R>>>,
    login_attempts: Arc<LoginAttemptService>,
    alert_service: Arc<AlertService<AlertRepositoryAdapter<R>>>,
    alert_checker: Arc<AlertChecker<R>>,
    watchlist_service: Arc<WatchlistService<WatchlistRepositoryAdapter<R>>>,
    market_service: Arc<MarketDataService<MarketRepositoryAdapter<R>>>,
    error_log_service: Arc<ErrorLogService<ErrorLogRepositoryAdapter<R>>>,
    upstream: UpstreamClients,
    notifier: Arc<dyn AlertNotifier>,
    media: MediaStorage,
    event_bus: EventBus,
}

impl<R: RepositoryProvider> CryptoDash<R> {
    pub(crate) async fn from_builder(
        repositories: Arc<R>,
        session_config: SessionConfig,
        lockout: LoginAttemptService,
        upstream: UpstreamClients,
        notifier: Arc<dyn AlertNotifier>,
        media: MediaStorage,
        handlers: Vec<Arc<dyn EventHandler>>,
    ) -> Self {
        let event_bus = EventBus::new();
        event_bus.register(Arc::new(TracingEventHandler)).await;
        for handler in handlers {
            event_bus.register(handler).await;
        }

        let user_repo = Arc::new(UserRepositoryAdapter::new(repositories.clone()));
        let alert_repo = Arc::new(AlertRepositoryAdapter::new(repositories.clone()));
        let market_repo = Arc::new(MarketRepositoryAdapter::new(repositories.clone()));

        let alert_checker = AlertCheckService::new(
            alert_repo.clone(),
            user_repo.clone(),
            market_repo.clone(),
            notifier.clone(),
        )
        .with_event_bus(event_bus.clone());

        Self {
            user_service: Arc::new(UserService::new(user_repo.clone())),
            password_service: Arc::new(PasswordService::new(
                user_repo,
                Arc::new(PasswordRepositoryAdapter::new(repositories.clone())),
            )),
            session_service: Arc::new(SessionService::new(
                Arc::new(SessionRepositoryAdapter::new(repositories.clone())),
                session_config,
            )),
            login_attempts: Arc::new(lockout),
            alert_service: Arc::new(AlertService::new(alert_repo)),
            alert_checker: Arc::new(alert_checker),
            watchlist_service: Arc::new(WatchlistService::new(
                Arc::new(WatchlistRepositoryAdapter::new(repositories.clone())),
                event_bus.clone(),
            )),
            market_service: Arc::new(MarketDataService::new(market_repo)),
            error_log_service: Arc::new(ErrorLogService::new(Arc::new(
                ErrorLogRepositoryAdapter::new(repositories.clone()),
            ))),
            repositories,
            upstream,
            notifier,
            media,
            event_bus,
        }
    }

    pub fn repositories(&self) -> &Arc<R> {
        &self.repositories
    }

    /// Register extra handlers here; every service publishes to this bus.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn lockout_config(&self) -> &LockoutConfig {
        self.login_attempts.config()
    }

    pub fn session_config(&self) -> &SessionConfig {
        self.session_service.config()
    }

    pub fn media(&self) -> &MediaStorage {
        &self.media
    }

    /// Run migrations for all repositories
    pub async fn migrate(&self) -> Result<(), Error> {
        self.repositories.migrate().await
    }

    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    /// Storage health with the table listing, for the health endpoint.
    pub async fn health(&self) -> HealthReport {
        match self.repositories.list_tables().await {
            Ok(tables) => HealthReport::from_tables(tables),
            Err(e) => {
                tracing::warn!(error = %e, "Health check could not list tables");
                HealthReport::unreachable(e.to_string())
            }
        }
    }

    /// Spawn the hourly purge of expired attempt counters and sessions.
    /// Both tasks stop when `shutdown` changes.
    pub fn start_housekeeping(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        vec![
            self.login_attempts
                .start_cleanup_task(HOUSEKEEPING_INTERVAL, shutdown.clone()),
            self.session_service
                .start_cleanup_task(HOUSEKEEPING_INTERVAL, shutdown),
        ]
    }
}

// Authentication and sessions
impl<R: RepositoryProvider> CryptoDash<R> {
    /// Log a user in.
    ///
    /// Missing credentials fail validation without touching the counters. A
    /// locked `(username, ip)` pair is rejected before the password check.
    /// A wrong password is counted, and the failure that reaches the
    /// threshold comes back as the lockout error itself.
    pub async fn login(
        &self,
        credentials: &Credentials,
        client: &ClientInfo,
    ) -> Result<(User, Session), Error> {
        let (username, password) = require_credentials(
            credentials.username.as_deref(),
            credentials.password.as_deref(),
        )?;
        let key = AttemptKey::new(username, &client.ip_address);

        self.login_attempts.check(&key).await?;

        let Some(user) = self
            .password_service
            .authenticate(username, password)
            .await?
        else {
            return Err(self.count_failed_login(&key).await?);
        };

        self.login_attempts.reset(&key).await?;
        let session = self.start_session(&user, client).await?;
        tracing::info!(user.id = %user.id, ip = %client.ip_address, "User logged in");
        Ok((user, session))
    }

    /// [`login`](Self::login) from a request that may already carry a
    /// session. On success the previous session is ended, whoever it belonged
    /// to, so one browser never holds two live sessions.
    pub async fn login_replacing(
        &self,
        credentials: &Credentials,
        client: &ClientInfo,
        previous: Option<&Session>,
    ) -> Result<(User, Session), Error> {
        let (user, session) = self.login(credentials, client).await?;
        if let Some(previous) = previous {
            self.end_session(previous).await?;
        }
        Ok((user, session))
    }

    async fn count_failed_login(&self, key: &AttemptKey) -> Result<Error, Error> {
        let outcome = self.login_attempts.record_failure(key).await?;
        let now = Utc::now();

        match outcome {
            FailureOutcome::Counted { attempts } => {
                self.event_bus
                    .publish(Event::LoginFailed {
                        username: key.username.clone(),
                        failed_attempts: attempts,
                        ip_address: key.ip.clone(),
                        timestamp: now,
                    })
                    .await;
            }
            FailureOutcome::LockTriggered { attempts, lock_ttl } => {
                let lock_ttl = chrono::Duration::from_std(lock_ttl)
                    .unwrap_or_else(|_| chrono::Duration::zero());
                self.event_bus
                    .publish(Event::AccountLocked {
                        username: key.username.clone(),
                        failed_attempts: attempts,
                        locked_until: now + lock_ttl,
                        ip_address: key.ip.clone(),
                        timestamp: now,
                    })
                    .await;
            }
            FailureOutcome::AlreadyLocked { .. } => {}
        }

        Ok(self.login_attempts.config().failure_error(&outcome).into())
    }

    /// Current lockout counters of a `(username, ip)` pair.
    pub async fn lockout_status(&self, key: &AttemptKey) -> Result<LockoutStatus, Error> {
        self.login_attempts.status(key).await
    }

    /// Create an account and log it in.
    pub async fn register(
        &self,
        registration: &Registration,
        client: &ClientInfo,
    ) -> Result<(User, Session), Error> {
        let user = self.password_service.register_user(registration).await?;
        self.event_bus.publish(Event::UserCreated(user.clone())).await;

        let session = self.start_session(&user, client).await?;
        Ok((user, session))
    }

    async fn start_session(&self, user: &User, client: &ClientInfo) -> Result<Session, Error> {
        let session = self
            .session_service
            .create_session(
                &user.id,
                client.user_agent.clone(),
                Some(client.ip_address.clone()),
            )
            .await?;
        self.event_bus
            .publish(Event::SessionCreated(user.id.clone(), session.clone()))
            .await;
        Ok(session)
    }

    /// End the session attached to the request.
    pub async fn logout(&self, session: Option<&Session>) -> Result<(), Error> {
        let session = session.ok_or(Error::Auth(AuthError::NoActiveSession))?;
        self.end_session(session).await?;
        tracing::info!(user.id = %session.user_id, "User logged out");
        Ok(())
    }

    async fn end_session(&self, session: &Session) -> Result<(), Error> {
        self.session_service.delete_session(&session.token).await?;
        self.event_bus
            .publish(Event::SessionDeleted(
                session.user_id.clone(),
                session.token.clone(),
            ))
            .await;
        Ok(())
    }

    /// Resolve a session cookie, sliding its idle window forward.
    ///
    /// A session idle for longer than its lifetime is deleted and reported as
    /// expired; the request then counts as anonymous.
    pub async fn authenticate(&self, token: &SessionToken) -> Result<(User, Session), Error> {
        let session = self.session_service.touch(token).await?;
        let user = self
            .user_service
            .get_user(&session.user_id)
            .await?
            .ok_or(Error::Session(SessionError::NotFound))?;
        Ok((user, session))
    }
}

// Profile
impl<R: RepositoryProvider> CryptoDash<R> {
    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, Error> {
        self.user_service.get_user(user_id).await
    }

    pub async fn update_profile(
        &self,
        user_id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<User, Error> {
        let user = self.user_service.update_profile(user_id, update).await?;
        self.event_bus.publish(Event::UserUpdated(user.clone())).await;
        Ok(user)
    }

    /// Accounts without an e-mail address; their alerts never notify.
    pub async fn users_without_email(&self) -> Result<Vec<User>, Error> {
        self.user_service.users_without_email().await
    }

    /// Set the e-mail address of `username`. The address must be valid and
    /// not registered to another account; an existing address is only
    /// overwritten with `replace`.
    pub async fn set_user_email(
        &self,
        username: &str,
        email: &str,
        replace: bool,
    ) -> Result<User, Error> {
        let user = self.user_service.set_email(username, email, replace).await?;
        self.event_bus.publish(Event::UserUpdated(user.clone())).await;
        tracing::info!(user.id = %user.id, "E-mail address set");
        Ok(user)
    }

    /// Store a new avatar and drop the one it replaces.
    pub async fn upload_avatar(
        &self,
        user_id: &UserId,
        file_name: Option<&str>,
        data: &[u8],
    ) -> Result<User, Error> {
        let relative = self.media.save_avatar(file_name, data).await?;

        let (user, previous) = match self.user_service.set_avatar(user_id, &relative).await {
            Ok(updated) => updated,
            Err(e) => {
                self.media.remove(&relative).await;
                return Err(e);
            }
        };
        if let Some(previous) = previous.filter(|p| *p != relative) {
            self.media.remove(&previous).await;
        }

        self.event_bus.publish(Event::UserUpdated(user.clone())).await;
        Ok(user)
    }
}

// Price alerts
impl<R: RepositoryProvider> CryptoDash<R> {
    pub async fn list_alerts(&self, user_id: &UserId) -> Result<Vec<Alert>, Error> {
        self.alert_service.list(user_id).await
    }

    pub async fn create_alert(&self, user_id: &UserId, input: AlertInput) -> Result<Alert, Error> {
        self.alert_service.create(user_id, input).await
    }

    pub async fn get_alert(&self, user_id: &UserId, id: i64) -> Result<Alert, Error> {
        self.alert_service.get(user_id, id).await
    }

    pub async fn update_alert(
        &self,
        user_id: &UserId,
        id: i64,
        input: AlertInput,
    ) -> Result<Alert, Error> {
        self.alert_service.update(user_id, id, input).await
    }

    pub async fn delete_alert(&self, user_id: &UserId, id: i64) -> Result<(), Error> {
        self.alert_service.delete(user_id, id).await
    }

    /// One pass of the alert checker over every active alert.
    pub async fn check_alerts(&self) -> Result<AlertCheckReport, Error> {
        self.alert_checker.run().await
    }

    /// Validate and send an alert e-mail on behalf of a client.
    pub async fn send_alert_email(&self, request: AlertEmailRequest) -> Result<(), Error> {
        cryptodash_core::services::send_alert_email(&*self.notifier, request).await
    }
}

// Watchlist
impl<R: RepositoryProvider> CryptoDash<R> {
    pub async fn watchlist(&self, user_id: &UserId) -> Result<Vec<String>, Error> {
        self.watchlist_service.list(user_id).await
    }

    pub async fn watch(&self, user_id: &UserId, symbol: &str) -> Result<Subscription, Error> {
        self.watchlist_service.subscribe(user_id, symbol).await
    }

    pub async fn unwatch(&self, user_id: &UserId, symbol: &str) -> Result<Unsubscription, Error> {
        self.watchlist_service.unsubscribe(user_id, symbol).await
    }
}

// Market data
impl<R: RepositoryProvider> CryptoDash<R> {
    pub async fn exchanges(&self) -> Result<Vec<Exchange>, Error> {
        self.market_service.exchanges().await
    }

    pub async fn tickers(
        &self,
        base: Option<&str>,
        limit: Option<&str>,
    ) -> Result<Vec<Ticker>, Error> {
        self.market_service.tickers(base, limit).await
    }

    pub async fn candles(&self, symbol: &str, limit: Option<&str>) -> Result<Vec<Candle>, Error> {
        self.market_service.candles(symbol, limit).await
    }

    pub async fn market_summary(&self) -> Result<MarketSummary, Error> {
        self.market_service.summary().await
    }

    pub async fn supported_coins(&self) -> Result<Vec<Coin>, Error> {
        self.market_service.supported_coins().await
    }
}

// Analysis proxies
impl<R: RepositoryProvider> CryptoDash<R> {
    /// Technical indicators for `symbol`.
    ///
    /// With `all` the three timeframes are fetched and failures are reported
    /// per timeframe; `timeframe` is then ignored.
    pub async fn technical_analysis(
        &self,
        symbol: &str,
        timeframe: Option<&str>,
        all: bool,
    ) -> Result<Value, Error> {
        let client = &self.upstream.technical_analysis;
        if all {
            return Ok(client.analyze_all(symbol).await);
        }

        let timeframe: Timeframe = match timeframe {
            Some(tf) => tf.parse()?,
            None => Timeframe::default(),
        };
        client
            .analyze(symbol, timeframe)
            .await
            .map_err(|e| match e.status() {
                Some(404) => Error::NotFound(NotFoundError::AnalysisData {
                    symbol: symbol.to_string(),
                    timeframe: timeframe.to_string(),
                }),
                _ => upstream_error(e, Service::TechnicalAnalysis),
            })
    }

    pub async fn sentiment_analysis(&self, symbol: &str) -> Result<Value, Error> {
        self.upstream
            .sentiment
            .analyze(symbol)
            .await
            .map_err(|e| upstream_error(e, Service::Sentiment))
    }

    pub async fn lstm_prediction(&self, request: &PredictionRequest) -> Result<Value, Error> {
        self.upstream
            .lstm
            .predict(request)
            .await
            .map_err(|e| upstream_error(e, Service::Lstm))
    }

    /// Forward a client-built prediction request for `symbol`.
    pub async fn lstm_prediction_raw(&self, symbol: &str, body: Value) -> Result<Value, Error> {
        self.upstream
            .lstm
            .predict_raw(symbol, body)
            .await
            .map_err(|e| upstream_error(e, Service::Lstm))
    }
}

fn upstream_error(error: UpstreamError, service: Service) -> Error {
    Error::Dependency(error.into_dependency_error(service))
}

// Client error reports
impl<R: RepositoryProvider> CryptoDash<R> {
    pub async fn report_error(
        &self,
        report: NewErrorReport,
        reporter: Option<&UserId>,
    ) -> Result<ErrorReport, Error> {
        self.error_log_service.report(report, reporter).await
    }

    pub async fn error_groups(&self, filter: &ErrorLogFilter) -> Result<Vec<ErrorLogGroup>, Error> {
        self.error_log_service.grouped(filter).await
    }
}
