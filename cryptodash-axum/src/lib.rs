//! # CryptoDash Axum Integration
//!
//! The HTTP surface of the dashboard: JSON endpoints for authentication,
//! profiles, price alerts, watchlists, market data and the analysis
//! proxies, plus the session and CSRF middleware they sit behind.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::{net::SocketAddr, sync::Arc};
//! use cryptodash::CryptoDash;
//! use cryptodash_axum::{routes, CookieConfig};
//!
//! # async fn run(dash: Arc<CryptoDash<cryptodash::SqliteRepositoryProvider>>) {
//! let app = routes(dash)
//!     .with_cookie_config(CookieConfig::development())
//!     .with_cors_origins(vec!["http://localhost:3000".to_string()])
//!     .build();
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
//!     .await
//!     .unwrap();
//! # }
//! ```

mod error;
mod extractors;
mod middleware;
mod routes;
mod types;

pub use error::{ApiError, Result};
pub use extractors::{AuthUser, BaseUrl, CurrentUser, OptionalAuthUser, UNKNOWN_IP};
pub use middleware::{AppState, csrf_middleware, session_middleware};
pub use routes::{RouterConfig, build_cors_layer, create_router};
pub use types::{
    AlertResponse, AuthResponse, AvatarResponse, CSRF_COOKIE_MAX_AGE, CSRF_COOKIE_NAME,
    CSRF_HEADER_NAME, ConnectionInfo, CookieConfig, CookieSameSite, CsrfConfig, CsrfResponse,
    IndexResponse, MessageResponse, SESSION_COOKIE_NAME, SessionResponse, UserResponse,
};

use std::sync::Arc;

use axum::Router;
use cryptodash::{CryptoDash, RepositoryProvider};

/// Create the application router for `dash`.
///
/// The session cookie's `Max-Age` defaults to the configured session
/// lifetime; override it with [`ApiRouterBuilder::with_cookie_config`].
pub fn routes<R>(dash: Arc<CryptoDash<R>>) -> ApiRouterBuilder<R>
where
    R: RepositoryProvider,
{
    let cookies =
        CookieConfig::default().with_max_age(dash.session_config().lifetime_seconds());
    ApiRouterBuilder {
        dash,
        config: RouterConfig {
            cookies,
            ..RouterConfig::default()
        },
    }
}

/// Builder for configuring the application router
pub struct ApiRouterBuilder<R: RepositoryProvider> {
    dash: Arc<CryptoDash<R>>,
    config: RouterConfig,
}

impl<R: RepositoryProvider> ApiRouterBuilder<R> {
    pub fn with_cookie_config(mut self, config: CookieConfig) -> Self {
        self.config.cookies = config;
        self
    }

    pub fn with_csrf_config(mut self, config: CsrfConfig) -> Self {
        self.config.csrf = config;
        self
    }

    /// Absolute URLs (avatars, the index) use this base instead of `Host`.
    pub fn with_public_url(mut self, url: Option<String>) -> Self {
        self.config.public_url = url.filter(|u| !u.is_empty());
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.config.cors_origins = origins;
        self
    }

    pub fn build(self) -> Router {
        create_router(self.dash, self.config)
    }
}

impl<R: RepositoryProvider> From<ApiRouterBuilder<R>> for Router {
    fn from(builder: ApiRouterBuilder<R>) -> Self {
        builder.build()
    }
}
