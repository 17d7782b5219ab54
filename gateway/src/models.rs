//! HTTP request/response models for the gateway's query API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------ //
//  Inbound (client → gateway)                                         //
// ------------------------------------------------------------------ //

/// Request body for `POST /api/ds/query`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequestBody {
    /// Lower time boundary: epoch millis, shorthand (`"1h"`), or
    /// date-math (`"now-1d/d"`).
    pub from: String,
    /// Upper time boundary, same syntaxes.
    pub to: String,
    /// Fixed offset for calendar-relative boundaries, e.g. `"+05:30"`.
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub debug: bool,
    /// Target data source; the built-in sample source when omitted.
    #[serde(default)]
    pub datasource_uid: Option<String>,
    pub queries: Vec<QueryBody>,
}

/// One query within the batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBody {
    pub ref_id: String,
    #[serde(default)]
    pub query_type: String,
    #[serde(default = "default_max_data_points")]
    pub max_data_points: i64,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: i64,
    /// Backend-defined query model.
    #[serde(default)]
    pub model: serde_json::Value,
}

fn default_max_data_points() -> i64 {
    1000
}

fn default_interval_ms() -> i64 {
    1000
}

// ------------------------------------------------------------------ //
//  Outbound (gateway → client)                                        //
// ------------------------------------------------------------------ //

#[derive(Debug, Serialize)]
pub struct QueryResponseBody {
    pub results: HashMap<String, ResultBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResultBody {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    pub frames: Vec<serde_json::Value>,
}
