use axum_extra::extract::cookie::Cookie;
use chrono::{DateTime, Utc};
use cryptodash::{Alert, SessionToken, User, media_url};
use serde::{Deserialize, Serialize};

/// The user as clients see it. `email` is empty rather than null when unset.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub is_staff: bool,
}

impl UserResponse {
    pub fn new(user: &User, base_url: &str) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email_or_empty().to_string(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            avatar_url: user.avatar.as_deref().map(|a| media_url(base_url, a)),
            is_staff: user.is_staff,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub user: UserResponse,
}

impl AuthResponse {
    pub fn new(message: &str, user: UserResponse) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            user,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CsrfResponse {
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvatarResponse {
    pub avatar_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailSentResponse {
    pub message: String,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertResponse {
    pub id: i64,
    pub crypto: String,
    pub symbol: String,
    pub condition: &'static str,
    pub price: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Alert> for AlertResponse {
    fn from(alert: Alert) -> Self {
        Self {
            id: alert.id,
            crypto: alert.crypto,
            symbol: alert.symbol,
            condition: alert.condition.as_str(),
            price: alert.price,
            active: alert.active,
            created_at: alert.created_at,
            updated_at: alert.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CountedResponse<T> {
    pub count: usize,
    pub results: Vec<T>,
}

impl<T> From<Vec<T>> for CountedResponse<T> {
    fn from(results: Vec<T>) -> Self {
        Self {
            count: results.len(),
            results,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsResponse<T> {
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistResponse {
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SymbolRequest {
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TickerQuery {
    pub base: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TechnicalAnalysisQuery {
    pub timeframe: Option<String>,
    pub all: Option<String>,
}

impl TechnicalAnalysisQuery {
    pub fn all(&self) -> bool {
        self.all
            .as_deref()
            .is_some_and(|a| a.eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionQuery {
    pub lookback: Option<String>,
    pub epochs: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexEndpoints {
    pub health: String,
    pub exchanges: String,
    pub tickers: String,
    pub candles: String,
    pub summary: String,
    pub alerts: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexResponse {
    pub status: &'static str,
    pub endpoints: IndexEndpoints,
}

impl IndexResponse {
    pub fn new(base_url: &str) -> Self {
        let url = |path: &str| format!("{}/{path}", base_url.trim_end_matches('/'));
        Self {
            status: "ok",
            endpoints: IndexEndpoints {
                health: url("health/"),
                exchanges: url("exchanges/"),
                tickers: url("tickers/"),
                candles: url("candles/<symbol>/"),
                summary: url("summary/"),
                alerts: url("alerts/"),
            },
        }
    }
}

/// Client connection details taken from the request.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub ip: String,
    pub user_agent: Option<String>,
}

impl From<ConnectionInfo> for cryptodash::ClientInfo {
    fn from(info: ConnectionInfo) -> Self {
        cryptodash::ClientInfo::new(&info.ip).with_user_agent(info.user_agent)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CookieSameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl From<CookieSameSite> for axum_extra::extract::cookie::SameSite {
    fn from(same_site: CookieSameSite) -> Self {
        use axum_extra::extract::cookie::SameSite;
        match same_site {
            CookieSameSite::Strict => SameSite::Strict,
            CookieSameSite::Lax => SameSite::Lax,
            CookieSameSite::None => SameSite::None,
        }
    }
}

pub const SESSION_COOKIE_NAME: &str = "sessionid";

/// Session cookie attributes.
#[derive(Debug, Clone)]
pub struct CookieConfig {
    pub name: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: CookieSameSite,
    pub path: String,
    /// Seconds; should match the session idle lifetime
    pub max_age: i64,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: SESSION_COOKIE_NAME.to_string(),
            http_only: true,
            secure: true,
            same_site: CookieSameSite::Lax,
            path: "/".to_string(),
            max_age: 1800,
        }
    }
}

impl CookieConfig {
    /// Plain-HTTP development setup: no `Secure` attribute.
    pub fn development() -> Self {
        Self {
            secure: false,
            ..Self::default()
        }
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = seconds;
        self
    }

    /// The session cookie carrying `token`, valid for `max_age` seconds from now.
    pub fn session_cookie(&self, token: &SessionToken) -> Cookie<'static> {
        Cookie::build((self.name.clone(), token.as_str().to_string()))
            .path(self.path.clone())
            .http_only(self.http_only)
            .secure(self.secure)
            .same_site(self.same_site.into())
            .max_age(time::Duration::seconds(self.max_age))
            .build()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.name.clone(), "")).path(self.path.clone()).build()
    }
}

pub const CSRF_COOKIE_NAME: &str = "csrftoken";
pub const CSRF_HEADER_NAME: &str = "x-csrftoken";
/// One year, in seconds
pub const CSRF_COOKIE_MAX_AGE: i64 = 31_449_600;

/// Double-submit CSRF check settings.
#[derive(Debug, Clone)]
pub struct CsrfConfig {
    pub enforced: bool,
    pub cookie_name: String,
    pub header_name: String,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            enforced: true,
            cookie_name: CSRF_COOKIE_NAME.to_string(),
            header_name: CSRF_HEADER_NAME.to_string(),
        }
    }
}

impl CsrfConfig {
    pub fn disabled() -> Self {
        Self {
            enforced: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_urls() {
        let index = IndexResponse::new("http://localhost:8000/");
        assert_eq!(index.endpoints.health, "http://localhost:8000/health/");
        assert_eq!(index.endpoints.candles, "http://localhost:8000/candles/<symbol>/");
    }

    #[test]
    fn test_all_flag() {
        let query = |all: Option<&str>| TechnicalAnalysisQuery {
            all: all.map(str::to_string),
            ..Default::default()
        };
        assert!(query(Some("TRUE")).all());
        assert!(!query(Some("yes")).all());
        assert!(!query(None).all());
    }

    #[test]
    fn test_counted_response() {
        let response = CountedResponse::from(vec![1, 2, 3]);
        assert_eq!(response.count, 3);
    }
}
