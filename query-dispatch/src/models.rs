//! Core data model shared by the dispatcher and both wire adapters.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timerange::TimeRange;

// ------------------------------------------------------------------ //
//  Data source & user                                                 //
// ------------------------------------------------------------------ //

/// Server-side record of one configured data source integration.
///
/// Loading and persisting these records is the configuration store's
/// concern; dispatch only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub id: i64,
    /// Stable identifier used in API routes.
    pub uid: String,
    pub org_id: i64,
    pub name: String,
    /// Keys the backend registration: which plugin process serves this
    /// data source.
    pub plugin_id: String,
    pub url: String,
    /// Backend-defined settings. Must be a JSON object (or null).
    #[serde(default)]
    pub json_data: serde_json::Value,
    /// Secret settings, already decrypted by the secrets layer.
    #[serde(default)]
    pub decrypted_secure_json_data: HashMap<String, String>,
    pub updated: DateTime<Utc>,
}

impl DataSource {
    /// Whether the calling user's OAuth token should be forwarded to the
    /// backend in place of any statically configured credential.
    pub fn oauth_forward_enabled(&self) -> bool {
        self.json_data
            .get("forwardOauth")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

/// Identity of the user a batch runs on behalf of.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRef {
    pub login: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

// ------------------------------------------------------------------ //
//  Request side                                                       //
// ------------------------------------------------------------------ //

/// One logical query against a single backend. Immutable once handed to
/// the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    /// Correlation key, unique within a batch.
    pub ref_id: String,
    /// Backend-defined discriminator; empty when the backend has only
    /// one query kind.
    #[serde(default)]
    pub query_type: String,
    /// Upper bound on the number of points the caller can render.
    pub max_data_points: i64,
    /// Suggested sampling interval in milliseconds.
    pub interval_ms: i64,
    /// Opaque backend-defined payload.
    pub model: serde_json::Value,
}

/// A batch of queries sharing one time range, consumed by exactly one
/// dispatch call.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub queries: Vec<Query>,
    /// Shared by every query in the batch; resolved lazily by the
    /// adapters.
    pub time_range: TimeRange,
    /// Forwarded to the backend; the credential injector may add an
    /// `Authorization` entry to a copy of this map.
    pub headers: HashMap<String, String>,
    pub debug: bool,
    /// Present when the batch runs on behalf of an authenticated user.
    pub user: Option<UserRef>,
}

impl BatchRequest {
    pub fn new(time_range: TimeRange, queries: Vec<Query>) -> Self {
        Self {
            queries,
            time_range,
            headers: HashMap::new(),
            debug: false,
            user: None,
        }
    }
}

// ------------------------------------------------------------------ //
//  Response side                                                      //
// ------------------------------------------------------------------ //

/// An encoded data frame, passed through undecoded. Decoding belongs to
/// the frame layer consuming the dispatch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(pub Vec<u8>);

/// Outcome for a single query, keyed by its ref id in [`BatchResult`].
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub frames: Vec<Frame>,
    /// Set when the backend reported a failure for this query; sibling
    /// results stay valid.
    pub error: Option<String>,
    /// Backend-attached metadata, if any.
    pub meta: Option<serde_json::Value>,
}

impl QueryResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Normalized reply for a whole batch. Correlation is by key; a ref id
/// absent from the input batch never appears here.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub results: HashMap<String, QueryResult>,
    pub message: Option<String>,
}
