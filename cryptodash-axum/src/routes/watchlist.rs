use axum::{Json, extract::State};
use cryptodash::{RepositoryProvider, Subscription, Unsubscription};

use crate::{
    error::Result,
    extractors::AuthUser,
    middleware::AppState,
    types::{SymbolRequest, WatchlistResponse},
};

pub async fn watchlist_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(current): AuthUser,
) -> Result<Json<WatchlistResponse>>
where
    R: RepositoryProvider,
{
    let symbols = state.dash.watchlist(&current.user.id).await?;
    Ok(Json(WatchlistResponse { symbols }))
}

pub async fn add_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(current): AuthUser,
    Json(request): Json<SymbolRequest>,
) -> Result<Json<Subscription>>
where
    R: RepositoryProvider,
{
    let symbol = request.symbol.unwrap_or_default();
    Ok(Json(state.dash.watch(&current.user.id, &symbol).await?))
}

pub async fn remove_handler<R>(
    State(state): State<AppState<R>>,
    AuthUser(current): AuthUser,
    Json(request): Json<SymbolRequest>,
) -> Result<Json<Unsubscription>>
where
    R: RepositoryProvider,
{
    let symbol = request.symbol.unwrap_or_default();
    Ok(Json(state.dash.unwatch(&current.user.id, &symbol).await?))
}
