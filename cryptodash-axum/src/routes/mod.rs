mod alerts;
mod analysis;
mod auth;
mod market;
mod misc;
mod profile;
mod watchlist;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderName, HeaderValue, Method,
        header::{ACCEPT, CONTENT_TYPE},
    },
    middleware::from_fn_with_state,
    routing::{get, post},
};
use cryptodash::{CryptoDash, RepositoryProvider, media::MAX_AVATAR_BYTES};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    middleware::{AppState, csrf_middleware, session_middleware},
    types::{CookieConfig, CsrfConfig},
};

/// Room for the multipart framing around the largest accepted avatar.
const AVATAR_BODY_LIMIT: usize = MAX_AVATAR_BYTES + 64 * 1024;

/// Everything the router needs besides the service itself.
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    pub cookies: CookieConfig,
    pub csrf: CsrfConfig,
    pub public_url: Option<String>,
    pub cors_origins: Vec<String>,
}

pub fn create_router<R>(dash: Arc<CryptoDash<R>>, config: RouterConfig) -> Router
where
    R: RepositoryProvider,
{
    let media_root = dash.media().root().to_path_buf();
    let state = AppState {
        dash,
        cookies: config.cookies,
        csrf: config.csrf,
        public_url: config.public_url,
    };

    let auth_routes = Router::new()
        .route("/auth/register/", post(auth::register_handler::<R>))
        .route("/auth/login/", post(auth::login_handler::<R>))
        .route("/auth/logout/", post(auth::logout_handler::<R>))
        .route("/auth/session/", get(auth::session_handler::<R>))
        .route("/auth/csrf/", get(auth::csrf_handler::<R>))
        .route("/send-alert-email/", post(auth::send_alert_email_handler::<R>));

    let profile_routes = Router::new()
        .route(
            "/profile/me/",
            get(profile::me_handler::<R>).put(profile::update_me_handler::<R>),
        )
        .route(
            "/profile/upload-avatar/",
            post(profile::upload_avatar_handler::<R>)
                .layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        );

    let alert_routes = Router::new()
        .route(
            "/alerts/",
            get(alerts::list_alerts_handler::<R>).post(alerts::create_alert_handler::<R>),
        )
        .route(
            "/alerts/{id}/",
            get(alerts::get_alert_handler::<R>)
                .put(alerts::update_alert_handler::<R>)
                .delete(alerts::delete_alert_handler::<R>),
        );

    let watchlist_routes = Router::new()
        .route("/watchlist/", get(watchlist::watchlist_handler::<R>))
        .route("/watchlist/add/", post(watchlist::add_handler::<R>))
        .route("/watchlist/remove/", post(watchlist::remove_handler::<R>));

    let market_routes = Router::new()
        .route("/exchanges/", get(market::exchanges_handler::<R>))
        .route("/tickers/", get(market::tickers_handler::<R>))
        .route("/candles/{symbol}/", get(market::candles_handler::<R>))
        .route("/summary/", get(market::summary_handler::<R>))
        .route("/supported-coins/", get(market::supported_coins_handler::<R>));

    let analysis_routes = Router::new()
        .route(
            "/technical-analysis/{symbol}/",
            get(analysis::technical_analysis_handler::<R>),
        )
        .route("/analysis/{symbol}/", post(analysis::sentiment_handler::<R>))
        .route(
            "/predict/lstm/{symbol}/",
            get(analysis::lstm_handler::<R>).post(analysis::lstm_raw_handler::<R>),
        );

    let misc_routes = Router::new()
        .route("/", get(misc::index_handler::<R>))
        .route("/health/", get(misc::health_handler::<R>))
        .route(
            "/errors/",
            get(misc::error_groups_handler::<R>).post(misc::report_error_handler::<R>),
        );

    // Layers run bottom-up: the session is resolved before the CSRF check.
    let router = Router::new()
        .merge(auth_routes)
        .merge(profile_routes)
        .merge(alert_routes)
        .merge(watchlist_routes)
        .merge(market_routes)
        .merge(analysis_routes)
        .merge(misc_routes)
        .layer(from_fn_with_state(state.clone(), csrf_middleware::<R>))
        .layer(from_fn_with_state(state.clone(), session_middleware::<R>))
        .with_state(state)
        .nest_service("/media", ServeDir::new(media_root))
        .layer(TraceLayer::new_for_http());

    match build_cors_layer(&config.cors_origins) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS for the listed origins, with credentials. `None` when no origin is usable.
pub fn build_cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                CONTENT_TYPE,
                ACCEPT,
                HeaderName::from_static(crate::types::CSRF_HEADER_NAME),
            ])
            .allow_credentials(true)
            .max_age(Duration::from_secs(3600)),
    )
}
