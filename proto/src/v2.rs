//! Current backend protocol messages.
//!
//! Field numbers are part of the wire contract; never renumber or reuse
//! them.

use std::collections::HashMap;

/// Identity of the end user on whose behalf a query runs.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RemoteUser {
    #[prost(string, tag = "1")]
    pub login: String,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(string, tag = "3")]
    pub email: String,
    #[prost(string, tag = "4")]
    pub role: String,
}

/// Per-instance data source configuration handed to the backend.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataSourceInstanceSettings {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub uid: String,
    #[prost(string, tag = "3")]
    pub name: String,
    #[prost(string, tag = "4")]
    pub url: String,
    /// Backend-defined settings as raw JSON bytes.
    #[prost(bytes = "vec", tag = "5")]
    pub json_data: Vec<u8>,
    /// Secret settings, decrypted server-side before dispatch.
    #[prost(map = "string, string", tag = "6")]
    pub decrypted_secure_json_data: HashMap<String, String>,
    /// Epoch milliseconds of the last configuration change.
    #[prost(int64, tag = "7")]
    pub last_updated_ms: i64,
}

/// Call-scoped context accompanying every request to a backend.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PluginContext {
    #[prost(int64, tag = "1")]
    pub org_id: i64,
    #[prost(string, tag = "2")]
    pub plugin_id: String,
    #[prost(message, optional, tag = "3")]
    pub user: Option<RemoteUser>,
    #[prost(message, optional, tag = "4")]
    pub data_source_instance_settings: Option<DataSourceInstanceSettings>,
}

/// Absolute query window, both bounds in epoch milliseconds.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TimeRange {
    #[prost(int64, tag = "1")]
    pub from_epoch_ms: i64,
    #[prost(int64, tag = "2")]
    pub to_epoch_ms: i64,
}

/// One query within a batch.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataQuery {
    /// Correlation key, unique within the batch.
    #[prost(string, tag = "1")]
    pub ref_id: String,
    #[prost(int64, tag = "2")]
    pub max_data_points: i64,
    #[prost(int64, tag = "3")]
    pub interval_ms: i64,
    #[prost(message, optional, tag = "4")]
    pub time_range: Option<TimeRange>,
    /// Backend-defined query model, JSON-encoded.
    #[prost(bytes = "vec", tag = "5")]
    pub json: Vec<u8>,
    #[prost(string, tag = "6")]
    pub query_type: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryDataRequest {
    #[prost(message, optional, tag = "1")]
    pub plugin_context: Option<PluginContext>,
    /// Forwarded HTTP-style headers, including any injected credentials.
    #[prost(map = "string, string", tag = "2")]
    pub headers: HashMap<String, String>,
    #[prost(message, repeated, tag = "3")]
    pub queries: Vec<DataQuery>,
}

/// Backend reply for a single query.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataResponse {
    /// Encoded data frames; decoding is the frame layer's concern.
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub frames: Vec<Vec<u8>>,
    /// Non-empty when this query failed inside the backend.
    #[prost(string, tag = "2")]
    pub error: String,
    /// Optional JSON metadata attached by the backend.
    #[prost(bytes = "vec", tag = "3")]
    pub json_meta: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryDataResponse {
    /// Replies keyed by the originating query's `ref_id`.
    #[prost(map = "string, message", tag = "1")]
    pub responses: HashMap<String, DataResponse>,
}
