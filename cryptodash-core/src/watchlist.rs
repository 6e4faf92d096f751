//! Per-user watchlists of ticker symbols.
use serde::Serialize;

/// Outcome of adding a symbol. `created` is false when it was already listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subscription {
    pub ok: bool,
    pub symbol: String,
    pub created: bool,
}

/// Outcome of removing a symbol. `deleted` counts the rows removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unsubscription {
    pub ok: bool,
    pub symbol: String,
    pub deleted: u64,
}
