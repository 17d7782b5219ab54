//! Built-in sample data backend.
//!
//! Implements the current-protocol client in process, so the gateway can
//! answer queries with synthesized series when no external backend
//! processes are running. Frames are JSON-encoded:
//! `{"name": ..., "fields": [{"name":"time","values":[...]}, {"name":"value","values":[...]}]}`.

use std::collections::HashMap;
use std::f64::consts::TAU;

use async_trait::async_trait;
use chrono::Utc;
use proto::client::DataClient;
use proto::v2;
use query_dispatch::DataSource;
use tonic::Status;
use uuid::Uuid;

pub const PLUGIN_ID: &str = "sample-data";

/// Data source record pointing at the in-process backend.
pub fn demo_datasource() -> DataSource {
    DataSource {
        id: 1,
        uid: Uuid::new_v4().to_string(),
        org_id: 1,
        name: "Sample Data".into(),
        plugin_id: PLUGIN_ID.into(),
        url: String::new(),
        json_data: serde_json::json!({}),
        decrypted_secure_json_data: HashMap::new(),
        updated: Utc::now(),
    }
}

#[derive(Default)]
pub struct SampleDataBackend;

#[async_trait]
impl DataClient for SampleDataBackend {
    async fn query_data(
        &self,
        request: v2::QueryDataRequest,
    ) -> Result<v2::QueryDataResponse, Status> {
        let mut responses = HashMap::with_capacity(request.queries.len());
        for query in &request.queries {
            responses.insert(query.ref_id.clone(), synthesize(query));
        }
        Ok(v2::QueryDataResponse { responses })
    }
}

fn synthesize(query: &v2::DataQuery) -> v2::DataResponse {
    let model: serde_json::Value = match serde_json::from_slice(&query.json) {
        Ok(value) => value,
        Err(e) => {
            // Per-query failure; sibling queries still succeed.
            return v2::DataResponse {
                error: format!("invalid query model: {e}"),
                ..v2::DataResponse::default()
            };
        }
    };

    let wave = model.get("wave").and_then(serde_json::Value::as_str).unwrap_or("sine");
    let period_ms = model
        .get("periodMs")
        .and_then(serde_json::Value::as_i64)
        .unwrap_or(60_000)
        .max(1);

    let range = query.time_range.clone().unwrap_or_default();
    let span = (range.to_epoch_ms - range.from_epoch_ms).max(0);
    let max_points = query.max_data_points.clamp(1, 10_000);
    let step = (span / max_points).max(query.interval_ms.max(1));

    let mut times = Vec::new();
    let mut values = Vec::new();
    let mut t = range.from_epoch_ms;
    while t <= range.to_epoch_ms && (times.len() as i64) < max_points {
        let phase = (t % period_ms) as f64 / period_ms as f64;
        let value = match wave {
            "square" => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            "linear" => phase,
            _ => (phase * TAU).sin(),
        };
        times.push(t);
        values.push(value);
        t += step;
    }

    let frame = serde_json::json!({
        "name": wave,
        "fields": [
            {"name": "time", "values": times},
            {"name": "value", "values": values},
        ],
    });

    v2::DataResponse {
        frames: vec![frame.to_string().into_bytes()],
        error: String::new(),
        json_meta: serde_json::json!({"generator": wave}).to_string().into_bytes(),
    }
}
