//! Wire adapter for the deprecated v1 backend protocol.
//!
//! A thin translation kept only for backends that never adopted v2: same
//! one-call-in, one-result-out contract as the current adapter, same
//! abort-whole-batch transport semantics. The v1 protocol predates data
//! frames and credential forwarding, so results carry no frames and the
//! header map is never forwarded.

use std::collections::{HashMap, HashSet};

use proto::client::LegacyClient;
use proto::v1;
use tracing::warn;

use crate::error::QueryError;
use crate::models::{BatchRequest, BatchResult, DataSource, Query, QueryResult};

pub(crate) async fn query(
    client: &dyn LegacyClient,
    ds: &DataSource,
    batch: &BatchRequest,
) -> Result<BatchResult, QueryError> {
    let request = to_wire_request(ds, batch)?;
    let reply = client.query(request).await?;
    Ok(decode_response(reply, &batch.queries))
}

fn to_wire_request(ds: &DataSource, batch: &BatchRequest) -> Result<v1::QueryRequest, QueryError> {
    // v1 backends received the raw boundary strings alongside the
    // resolved epoch values and picked whichever they understood.
    let time_range = v1::RawTimeRange {
        from_raw: batch.time_range.from.clone(),
        to_raw: batch.time_range.to.clone(),
        from_epoch_ms: batch.time_range.from_epoch_ms()?,
        to_epoch_ms: batch.time_range.to_epoch_ms()?,
    };

    let datasource = v1::DatasourceInfo {
        id: ds.id,
        name: ds.name.clone(),
        url: ds.url.clone(),
        json_data: serde_json::to_string(&ds.json_data).map_err(|e| {
            QueryError::InvalidSettings {
                name: ds.name.clone(),
                reason: e.to_string(),
            }
        })?,
    };

    let mut queries = Vec::with_capacity(batch.queries.len());
    for q in &batch.queries {
        let model_json =
            serde_json::to_string(&q.model).map_err(|source| QueryError::ModelSerialization {
                ref_id: q.ref_id.clone(),
                source,
            })?;
        queries.push(v1::LegacyQuery {
            ref_id: q.ref_id.clone(),
            model_json,
            interval_ms: q.interval_ms,
            max_data_points: q.max_data_points,
        });
    }

    Ok(v1::QueryRequest {
        datasource,
        time_range,
        queries,
        debug: batch.debug,
    })
}

fn decode_response(reply: v1::QueryResponse, queries: &[Query]) -> BatchResult {
    let known: HashSet<&str> = queries.iter().map(|q| q.ref_id.as_str()).collect();

    let mut results = HashMap::with_capacity(reply.results.len());
    for result in reply.results {
        if !known.contains(result.ref_id.as_str()) {
            warn!(ref_id = %result.ref_id, "v1 backend replied for a ref id not in the batch, dropping");
            continue;
        }
        let error = (!result.error.is_empty()).then_some(result.error);
        let meta = if result.meta_json.is_empty() {
            None
        } else {
            serde_json::from_str(&result.meta_json).ok()
        };
        results.insert(
            result.ref_id,
            QueryResult {
                frames: Vec::new(),
                error,
                meta,
            },
        );
    }

    BatchResult {
        results,
        message: (!reply.message.is_empty()).then_some(reply.message),
    }
}
