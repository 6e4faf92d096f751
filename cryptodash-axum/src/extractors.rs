use std::net::SocketAddr;

use axum::{
    RequestPartsExt,
    extract::{ConnectInfo, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use axum_extra::{TypedHeader, headers::UserAgent};
use cryptodash::{RepositoryProvider, Session, User};

use crate::{error::ApiError, middleware::AppState, types::ConnectionInfo};

/// Placeholder address when the peer cannot be determined.
pub const UNKNOWN_IP: &str = "unknown";

impl<S> FromRequestParts<S> for ConnectionInfo
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .extract::<Option<TypedHeader<UserAgent>>>()
            .await
            .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid user agent header"))?
            .map(|ua| ua.to_string());

        // First hop of X-Forwarded-For, then the socket peer.
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);

        let ip = match forwarded {
            Some(ip) => ip,
            None => parts
                .extract::<ConnectInfo<SocketAddr>>()
                .await
                .map(|ConnectInfo(addr)| addr.ip().to_string())
                .unwrap_or_else(|_| UNKNOWN_IP.to_string()),
        };

        Ok(ConnectionInfo { ip, user_agent })
    }
}

/// The user and session attached by the session middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

/// Requires a live session; answers 403 otherwise.
pub struct AuthUser(pub CurrentUser);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(ApiError::not_authenticated)
    }
}

pub struct OptionalAuthUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuthUser(parts.extensions.get::<CurrentUser>().cloned()))
    }
}

/// Scheme and authority clients reach us at, for absolute URLs.
pub struct BaseUrl(pub String);

impl<R> FromRequestParts<AppState<R>> for BaseUrl
where
    R: RepositoryProvider,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<R>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(url) = &state.public_url {
            return Ok(BaseUrl(url.trim_end_matches('/').to_string()));
        }

        let header_value = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        };
        let scheme = header_value("x-forwarded-proto").unwrap_or_else(|| "http".to_string());
        let host = header_value(header::HOST.as_str())
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        Ok(BaseUrl(format!("{scheme}://{host}")))
    }
}
