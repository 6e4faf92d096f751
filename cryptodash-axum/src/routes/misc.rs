use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use cryptodash::{
    ErrorLogFilter, ErrorLogGroup, ErrorReport, HealthReport, NewErrorReport, RepositoryProvider,
};

use crate::{
    error::{ApiError, Result},
    extractors::{BaseUrl, OptionalAuthUser},
    middleware::AppState,
    types::IndexResponse,
};

pub async fn index_handler<R>(
    State(_state): State<AppState<R>>,
    BaseUrl(base): BaseUrl,
) -> Json<IndexResponse>
where
    R: RepositoryProvider,
{
    Json(IndexResponse::new(&base))
}

/// Always 200; the body says whether storage is usable.
pub async fn health_handler<R>(State(state): State<AppState<R>>) -> Json<HealthReport>
where
    R: RepositoryProvider,
{
    Json(state.dash.health().await)
}

pub async fn report_error_handler<R>(
    State(state): State<AppState<R>>,
    OptionalAuthUser(current): OptionalAuthUser,
    Json(report): Json<NewErrorReport>,
) -> Result<impl IntoResponse>
where
    R: RepositoryProvider,
{
    let reporter = current.as_ref().map(|c| &c.user.id);
    let stored: ErrorReport = state.dash.report_error(report, reporter).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn error_groups_handler<R>(
    State(state): State<AppState<R>>,
    OptionalAuthUser(current): OptionalAuthUser,
    Query(filter): Query<ErrorLogFilter>,
) -> Result<Json<Vec<ErrorLogGroup>>>
where
    R: RepositoryProvider,
{
    if current.is_none() {
        return Err(ApiError::Unauthorized);
    }
    Ok(Json(state.dash.error_groups(&filter).await?))
}
