//! Axum HTTP handlers for the gateway.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::FixedOffset;
use query_dispatch::{BatchRequest, BatchResult, Query, QueryError, TimeRange};
use tracing::{error, warn};

use crate::models::{QueryRequestBody, QueryResponseBody, ResultBody};
use crate::AppState;

// ------------------------------------------------------------------ //
//  POST /api/ds/query                                                 //
// ------------------------------------------------------------------ //

pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QueryRequestBody>,
) -> impl IntoResponse {
    if body.queries.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({"error": "at least one query is required"})),
        );
    }

    let uid = body
        .datasource_uid
        .clone()
        .unwrap_or_else(|| state.default_uid.clone());
    let Some(ds) = state.datasources.get(&uid) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": format!("no data source with uid '{uid}'")})),
        );
    };

    let mut range = TimeRange::new(&body.from, &body.to);
    if let Some(tz) = &body.timezone {
        match tz.parse::<FixedOffset>() {
            Ok(offset) => range = range.with_location(offset),
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({"error": format!("invalid timezone offset '{tz}'")})),
                )
            }
        }
    }

    let queries = body
        .queries
        .into_iter()
        .map(|q| Query {
            ref_id: q.ref_id,
            query_type: q.query_type,
            max_data_points: q.max_data_points,
            interval_ms: q.interval_ms,
            model: q.model,
        })
        .collect();

    let mut batch = BatchRequest::new(range, queries);
    batch.debug = body.debug;

    match state.dispatcher.dispatch(ds, batch).await {
        Ok(result) => (StatusCode::OK, Json(render(result))),
        Err(e) => {
            error!(error = %e, uid = %uid, "dispatch failed");
            (
                status_for(&e),
                Json(serde_json::json!({"error": e.to_string()})),
            )
        }
    }
}

fn status_for(e: &QueryError) -> StatusCode {
    match e {
        QueryError::TimeRange(_) | QueryError::ModelSerialization { .. } => StatusCode::BAD_REQUEST,
        QueryError::UnsupportedBackend { .. } => StatusCode::NOT_FOUND,
        QueryError::InvalidSettings { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        QueryError::Transport(_) => StatusCode::BAD_GATEWAY,
    }
}

fn render(result: BatchResult) -> serde_json::Value {
    let results: HashMap<String, ResultBody> = result
        .results
        .into_iter()
        .map(|(ref_id, r)| {
            let frames = r
                .frames
                .iter()
                .filter_map(|frame| match serde_json::from_slice(&frame.0) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!(ref_id = %ref_id, error = %e, "skipping non-JSON frame");
                        None
                    }
                })
                .collect();
            let body = ResultBody {
                success: r.is_success(),
                error: r.error,
                meta: r.meta,
                frames,
            };
            (ref_id, body)
        })
        .collect();

    serde_json::to_value(QueryResponseBody {
        results,
        message: result.message,
    })
    .unwrap_or_else(|e| serde_json::json!({"error": e.to_string()}))
}

// ------------------------------------------------------------------ //
//  Health                                                             //
// ------------------------------------------------------------------ //

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}
