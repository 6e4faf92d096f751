use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, Method, header::SET_COOKIE},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use cryptodash::{CryptoDash, ErrorKind, RepositoryProvider, SessionToken};
use cryptodash_core::crypto::constant_time_compare;

use crate::{
    error::ApiError,
    extractors::CurrentUser,
    types::{CookieConfig, CsrfConfig},
};

pub struct AppState<R: RepositoryProvider> {
    pub dash: Arc<CryptoDash<R>>,
    pub cookies: CookieConfig,
    pub csrf: CsrfConfig,
    /// Base used for absolute URLs instead of the request's `Host`
    pub public_url: Option<String>,
}

impl<R: RepositoryProvider> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            dash: self.dash.clone(),
            cookies: self.cookies.clone(),
            csrf: self.csrf.clone(),
            public_url: self.public_url.clone(),
        }
    }
}

/// Attach the session's user to the request when the session cookie is live.
///
/// Resolving the session slides its idle window, and the cookie is sent again
/// with a fresh `Max-Age` so the browser keeps it as long as the server does.
/// An idle or unknown session leaves the request anonymous.
pub async fn session_middleware<R>(
    State(state): State<AppState<R>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response
where
    R: RepositoryProvider,
{
    let token = jar
        .get(&state.cookies.name)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .map(SessionToken::new);

    let mut live = None;
    if let Some(token) = token {
        match state.dash.authenticate(&token).await {
            Ok((user, session)) => {
                request
                    .extensions_mut()
                    .insert(CurrentUser { user, session });
                live = Some(token);
            }
            Err(e) if e.kind() == ErrorKind::NotAuthenticated => {
                tracing::debug!(error = %e, "Ignoring invalid or expired session");
            }
            Err(e) => {
                tracing::error!(error = %e, "Error resolving session");
            }
        }
    }

    let mut response = next.run(request).await;
    if let Some(token) = live {
        refresh_session_cookie(&state.cookies, &token, &mut response);
    }
    response
}

/// Re-send the session cookie unless the handler already set or cleared it.
fn refresh_session_cookie(config: &CookieConfig, token: &SessionToken, response: &mut Response) {
    let prefix = format!("{}=", config.name);
    let handled = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix));
    if handled {
        return;
    }

    match HeaderValue::from_str(&config.session_cookie(token).to_string()) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "Could not encode session cookie"),
    }
}

fn is_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Double-submit check for unsafe requests that ride on a session.
///
/// Must run after [`session_middleware`]; anonymous requests pass through.
pub async fn csrf_middleware<R>(
    State(state): State<AppState<R>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    R: RepositoryProvider,
{
    if !state.csrf.enforced
        || is_safe(request.method())
        || request.extensions().get::<CurrentUser>().is_none()
    {
        return Ok(next.run(request).await);
    }

    let cookie = jar
        .get(&state.csrf.cookie_name)
        .map(|c| c.value().to_string())
        .unwrap_or_default();
    let header = request
        .headers()
        .get(state.csrf.header_name.as_str())
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    if cookie.is_empty() || !constant_time_compare(cookie.as_bytes(), header.as_bytes()) {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "Rejected request with missing or mismatched CSRF token"
        );
        return Err(ApiError::CsrfFailed);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn set_cookies(response: &Response) -> Vec<String> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_refresh_session_cookie() {
        let config = CookieConfig::development();
        let token = SessionToken::new("abc");
        let mut response = Response::new(Body::empty());

        refresh_session_cookie(&config, &token, &mut response);
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("sessionid=abc"));
        assert!(cookies[0].contains("Max-Age=1800"));
        assert!(cookies[0].contains("HttpOnly"));
    }

    #[test]
    fn test_refresh_leaves_handler_cookie_alone() {
        let config = CookieConfig::development();
        let mut response = Response::new(Body::empty());
        response
            .headers_mut()
            .append(SET_COOKIE, HeaderValue::from_static("sessionid=; Path=/; Max-Age=0"));
        response
            .headers_mut()
            .append(SET_COOKIE, HeaderValue::from_static("csrftoken=x; Path=/"));

        refresh_session_cookie(&config, &SessionToken::new("abc"), &mut response);
        let cookies = set_cookies(&response);
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| !c.starts_with("sessionid=abc")));
    }
}
