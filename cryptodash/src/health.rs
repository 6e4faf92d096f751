use serde::Serialize;

/// Table the market views read from; its absence means the data importer
/// has not run yet.
pub const PRICES_TABLE: &str = "prices";

/// Storage health as reported by `GET /health/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub database: &'static str,
    pub table_exists: bool,
    pub tables: Vec<String>,
    pub error: Option<String>,
}

impl HealthReport {
    pub fn from_tables(tables: Vec<String>) -> Self {
        let table_exists = tables.iter().any(|t| t == PRICES_TABLE);
        Self {
            status: if table_exists { "ok" } else { "error" },
            database: "connected",
            table_exists,
            tables,
            error: None,
        }
    }

    pub fn unreachable(error: String) -> Self {
        Self {
            status: "error",
            database: "unreachable",
            table_exists: false,
            tables: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
