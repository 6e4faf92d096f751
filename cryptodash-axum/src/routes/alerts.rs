use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use cryptodash::{AlertInput, RepositoryProvider};

use crate::{error::Result, extractors::AuthUser, middleware::AppState, types::AlertResponse};

pub async fn list_alerts_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(current): AuthUser,
) -> Result<Json<Vec<AlertResponse>>>
where
    R: RepositoryProvider,
{
    let alerts = state.dash.list_alerts(&current.user.id).await?;
    Ok(Json(alerts.into_iter().map(AlertResponse::from).collect()))
}

pub async fn create_alert_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(current): AuthUser,
    Json(input): Json<AlertInput>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let alert = state.dash.create_alert(&current.user.id, input).await?;
    Ok((StatusCode::CREATED, Json(AlertResponse::from(alert))))
}

pub async fn get_alert_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(current): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<AlertResponse>>
where
    R: RepositoryProvider,
{
    let alert = state.dash.get_alert(&current.user.id, id).await?;
    Ok(Json(alert.into()))
}

pub async fn update_alert_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(current): AuthUser,
    Path(id): Path<i64>,
    Json(input): Json<AlertInput>,
) -> Result<Json<AlertResponse>>
where
    R: RepositoryProvider,
{
    let alert = state.dash.update_alert(&current.user.id, id, input).await?;
    Ok(Json(alert.into()))
}

pub async fn delete_alert_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(current): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode>
where
    R: RepositoryProvider,
{
    state.dash.delete_alert(&current.user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
