#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use cryptodash::{
    CryptoDash, CryptoDashBuilder, LockoutConfig, SessionConfig, SqliteRepositoryProvider,
};
use cryptodash_axum::{CookieConfig, CsrfConfig, routes};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

pub type Dash = CryptoDash<SqliteRepositoryProvider>;

pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub router: Router,
    pub dash: Arc<Dash>,
    pub media: tempfile::TempDir,
}

pub async fn app() -> TestApp {
    app_with(LockoutConfig::default(), CsrfConfig::default()).await
}

pub async fn app_with(lockout: LockoutConfig, csrf: CsrfConfig) -> TestApp {
    build_app(lockout, csrf, SessionConfig::default()).await
}

/// CSRF off, sessions with the given idle lifetime.
pub async fn app_with_session(session: SessionConfig) -> TestApp {
    build_app(LockoutConfig::default(), CsrfConfig::disabled(), session).await
}

async fn build_app(lockout: LockoutConfig, csrf: CsrfConfig, session: SessionConfig) -> TestApp {
    let media = tempfile::tempdir().expect("Failed to create media dir");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create pool");
    let dash = CryptoDashBuilder::new()
        .with_sqlite_pool(pool)
        .apply_migrations(true)
        .with_lockout_config(lockout)
        .with_session_config(session)
        .with_media_root(media.path())
        .build()
        .await
        .expect("Failed to build");
    let dash = Arc::new(dash);

    let router = routes(dash.clone())
        .with_cookie_config(CookieConfig::development().with_max_age(session.lifetime_seconds()))
        .with_csrf_config(csrf)
        .with_public_url(Some("http://testserver".to_string()))
        .build();

    TestApp {
        router,
        dash,
        media,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Value of the named cookie in `Set-Cookie`, if any.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&prefix))
            .map(|v| {
                v[prefix.len()..]
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .to_string()
            })
    }

    /// Number of `Set-Cookie` headers for the named cookie.
    pub fn set_cookie_count(&self, name: &str) -> usize {
        let prefix = format!("{name}=");
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter(|v| v.starts_with(&prefix))
            .count()
    }

    pub fn set_cookie_header(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&prefix))
            .map(str::to_string)
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Register `username` and return its session cookie.
    pub async fn register(&self, username: &str) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/auth/register/",
                serde_json::json!({
                    "username": username,
                    "password": PASSWORD,
                    "email": format!("{username}@example.com"),
                }),
            ))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.cookie("sessionid").expect("No session cookie")
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Failed to build request")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("Failed to build request")
}

/// Attach cookies to a request.
pub fn with_cookies(mut request: Request<Body>, cookies: &[(&str, &str)]) -> Request<Body> {
    let value = cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");
    request
        .headers_mut()
        .insert(header::COOKIE, value.parse().expect("Invalid cookie"));
    request
}

pub fn with_header(mut request: Request<Body>, name: &'static str, value: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(name, value.parse().expect("Invalid header"));
    request
}
