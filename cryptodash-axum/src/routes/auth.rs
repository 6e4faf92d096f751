use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use cryptodash::{AlertEmailRequest, Credentials, Registration, RepositoryProvider};
use cryptodash_core::crypto::generate_secure_token;
use time::Duration;

use crate::{
    error::Result,
    extractors::{BaseUrl, OptionalAuthUser},
    middleware::AppState,
    types::{
        AuthResponse, CSRF_COOKIE_MAX_AGE, ConnectionInfo, CookieConfig, CsrfResponse,
        EmailSentResponse, MessageResponse, SessionResponse, UserResponse,
    },
};

pub async fn register_handler<R>(
    State(state): State<AppState<R>>,
    BaseUrl(base): BaseUrl,
    connection: ConnectionInfo,
    jar: CookieJar,
    Json(registration): Json<Registration>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let (user, session) = state
        .dash
        .register(&registration, &connection.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        jar.add(state.cookies.session_cookie(&session.token)),
        Json(AuthResponse::new(
            "Registration successful.",
            UserResponse::new(&user, &base),
        )),
    ))
}

pub async fn login_handler<R>(
    State(state): State<AppState<R>>,
    BaseUrl(base): BaseUrl,
    connection: ConnectionInfo,
    OptionalAuthUser(current): OptionalAuthUser,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let (user, session) = state
        .dash
        .login_replacing(
            &credentials,
            &connection.into(),
            current.as_ref().map(|c| &c.session),
        )
        .await?;

    Ok((
        jar.add(state.cookies.session_cookie(&session.token)),
        Json(AuthResponse::new(
            "Login successful.",
            UserResponse::new(&user, &base),
        )),
    ))
}

pub async fn logout_handler<R>(
    State(state): State<AppState<R>>,
    OptionalAuthUser(current): OptionalAuthUser,
    jar: CookieJar,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state
        .dash
        .logout(current.as_ref().map(|c| &c.session))
        .await?;

    Ok((
        jar.remove(state.cookies.removal_cookie()),
        Json(MessageResponse {
            success: true,
            message: "Logout successful.".to_string(),
        }),
    ))
}

pub async fn session_handler<R>(
    State(_state): State<AppState<R>>,
    BaseUrl(base): BaseUrl,
    OptionalAuthUser(current): OptionalAuthUser,
) -> Json<SessionResponse>
where
    R: RepositoryProvider,
{
    Json(SessionResponse {
        authenticated: current.is_some(),
        user: current.map(|c| UserResponse::new(&c.user, &base)),
    })
}

/// Hand out the CSRF token, reusing the one the client already holds.
pub async fn csrf_handler<R>(
    State(state): State<AppState<R>>,
    jar: CookieJar,
) -> impl IntoResponse
where
    R: RepositoryProvider,
{
    let token = jar
        .get(&state.csrf.cookie_name)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(generate_secure_token);

    let cookie = Cookie::build((state.csrf.cookie_name.clone(), token.clone()))
        .path("/")
        .http_only(false)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(CSRF_COOKIE_MAX_AGE))
        .build();

    (jar.add(cookie), Json(CsrfResponse { csrf_token: token }))
}

pub async fn send_alert_email_handler<R>(
    State(state): State<AppState<R>>,
    Json(request): Json<AlertEmailRequest>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    state.dash.send_alert_email(request).await?;

    Ok(Json(EmailSentResponse {
        message: "Email sent successfully".to_string(),
        success: true,
    }))
}
