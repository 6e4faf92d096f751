use axum::{
    Json,
    extract::{Path, Query, State},
};
use cryptodash::{Candle, Coin, Exchange, MarketSummary, RepositoryProvider, Ticker};

use crate::{
    error::Result,
    middleware::AppState,
    types::{CountedResponse, LimitQuery, ResultsResponse, TickerQuery},
};

pub async fn exchanges_handler<R>(
    State(state): State<AppState<R>>,
) -> Result<Json<ResultsResponse<Exchange>>>
where
    R: RepositoryProvider,
{
    let results = state.dash.exchanges().await?;
    Ok(Json(ResultsResponse { results }))
}

pub async fn tickers_handler<R>(
    State(state): State<AppState<R>>,
    Query(query): Query<TickerQuery>,
) -> Result<Json<CountedResponse<Ticker>>>
where
    R: RepositoryProvider,
{
    let tickers = state
        .dash
        .tickers(query.base.as_deref(), query.limit.as_deref())
        .await?;
    Ok(Json(tickers.into()))
}

pub async fn candles_handler<R>(
    State(state): State<AppState<R>>,
    Path(symbol): Path<String>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<CountedResponse<Candle>>>
where
    R: RepositoryProvider,
{
    let candles = state.dash.candles(&symbol, query.limit.as_deref()).await?;
    Ok(Json(candles.into()))
}

pub async fn summary_handler<R>(State(state): State<AppState<R>>) -> Result<Json<MarketSummary>>
where
    R: RepositoryProvider,
{
    Ok(Json(state.dash.market_summary().await?))
}

pub async fn supported_coins_handler<R>(
    State(state): State<AppState<R>>,
) -> Result<Json<Vec<Coin>>>
where
    R: RepositoryProvider,
{
    Ok(Json(state.dash.supported_coins().await?))
}
