//! Frozen shapes of the deprecated v1 backend protocol.
//!
//! The protocol is JSON-bodied and no longer evolves; these structs exist
//! only so the dispatch layer can keep talking to backends that never
//! adopted v2. Do not add fields.

use serde::{Deserialize, Serialize};

/// Data source identification as the v1 protocol carried it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasourceInfo {
    pub id: i64,
    pub name: String,
    pub url: String,
    /// Backend-defined settings, JSON-encoded to a string (v1 never
    /// shipped raw bytes).
    pub json_data: String,
}

/// The v1 protocol sent both the raw boundary strings and the resolved
/// epoch values; v1 backends picked whichever they understood.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTimeRange {
    pub from_raw: String,
    pub to_raw: String,
    pub from_epoch_ms: i64,
    pub to_epoch_ms: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LegacyQuery {
    pub ref_id: String,
    /// Query model, JSON-encoded to a string.
    pub model_json: String,
    pub interval_ms: i64,
    pub max_data_points: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    pub datasource: DatasourceInfo,
    pub time_range: RawTimeRange,
    pub queries: Vec<LegacyQuery>,
    pub debug: bool,
}

/// Per-query reply; correlation is by `ref_id`, not position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub ref_id: String,
    /// Non-empty when this query failed inside the backend.
    pub error: String,
    /// Optional JSON metadata, encoded to a string ("" when absent).
    pub meta_json: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<QueryResult>,
    pub message: String,
}
