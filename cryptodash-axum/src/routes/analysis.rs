use axum::{
    Json,
    extract::{Path, Query, State},
};
use cryptodash::{Error, PredictionRequest, RepositoryProvider};
use cryptodash_core::error::ValidationError;
use serde_json::Value;

use crate::{
    error::Result,
    extractors::AuthUser,
    middleware::AppState,
    types::{PredictionQuery, TechnicalAnalysisQuery},
};

pub async fn technical_analysis_handler<R>(
    State(state): State<AppState<R>>,
    Path(symbol): Path<String>,
    Query(query): Query<TechnicalAnalysisQuery>,
) -> Result<Json<Value>>
where
    R: RepositoryProvider,
{
    let analysis = state
        .dash
        .technical_analysis(&symbol, query.timeframe.as_deref(), query.all())
        .await?;
    Ok(Json(analysis))
}

pub async fn sentiment_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(_current): AuthUser,
    Path(symbol): Path<String>,
) -> Result<Json<Value>>
where
    R: RepositoryProvider,
{
    Ok(Json(state.dash.sentiment_analysis(&symbol).await?))
}

fn integer_param(name: &str, value: Option<&str>, default: i64) -> Result<i64> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            Error::Validation(ValidationError::InvalidField(format!(
                "{name} must be an integer"
            )))
            .into()
        }),
    }
}

pub async fn lstm_handler<R>(
    State(state): State<AppState<R>>,
    Path(symbol): Path<String>,
    Query(query): Query<PredictionQuery>,
) -> Result<Json<Value>>
where
    R: RepositoryProvider,
{
    let defaults = PredictionRequest::new(&symbol);
    let request = PredictionRequest {
        lookback: integer_param("lookback", query.lookback.as_deref(), defaults.lookback)?,
        epochs: integer_param("epochs", query.epochs.as_deref(), defaults.epochs)?,
        ..defaults
    };
    Ok(Json(state.dash.lstm_prediction(&request).await?))
}

pub async fn lstm_raw_handler<R>(
    State(state): State<AppState<R>>,
    Path(symbol): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>>
where
    R: RepositoryProvider,
{
    Ok(Json(state.dash.lstm_prediction_raw(&symbol, body).await?))
}
