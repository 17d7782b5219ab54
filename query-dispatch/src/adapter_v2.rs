//! Wire adapter for the current backend protocol.
//!
//! Converts a uniform [`BatchRequest`] into one `QueryDataRequest`,
//! performs the single remote call, and normalizes the keyed reply back
//! into a [`BatchResult`]. Setup failures (settings conversion, model
//! marshaling, time-range resolution) abort the whole batch before
//! anything is sent; per-query failures reported by the backend ride
//! inside the individual results.

use std::collections::{HashMap, HashSet};

use proto::client::DataClient;
use proto::v2;
use tracing::warn;

use crate::error::QueryError;
use crate::models::{BatchRequest, BatchResult, DataSource, Frame, Query, QueryResult, UserRef};
use crate::oauth::{forward_oauth, OAuthTokenStore};
use crate::timerange::TimeRange;

pub(crate) async fn query(
    client: &dyn DataClient,
    token_store: &dyn OAuthTokenStore,
    ds: &DataSource,
    batch: &BatchRequest,
) -> Result<BatchResult, QueryError> {
    let settings = to_instance_settings(ds)?;
    let headers = forward_oauth(
        &batch.headers,
        ds.oauth_forward_enabled(),
        token_store,
        batch.user.as_ref(),
    )
    .await;

    let mut queries = Vec::with_capacity(batch.queries.len());
    for q in &batch.queries {
        queries.push(to_wire_query(q, &batch.time_range)?);
    }

    let request = v2::QueryDataRequest {
        plugin_context: Some(v2::PluginContext {
            org_id: ds.org_id,
            plugin_id: ds.plugin_id.clone(),
            user: batch.user.as_ref().map(to_wire_user),
            data_source_instance_settings: Some(settings),
        }),
        headers,
        queries,
    };

    if batch.debug {
        tracing::debug!(
            plugin_id = %ds.plugin_id,
            queries = request.queries.len(),
            "dispatching v2 query batch"
        );
    }

    let reply = client.query_data(request).await?;
    Ok(decode_response(reply, &batch.queries))
}

/// Shape the data source record the way the backend expects its instance
/// settings. Fails when the record is malformed; nothing is dispatched.
fn to_instance_settings(ds: &DataSource) -> Result<v2::DataSourceInstanceSettings, QueryError> {
    let json_data = match &ds.json_data {
        serde_json::Value::Null => Vec::new(),
        value @ serde_json::Value::Object(_) => {
            serde_json::to_vec(value).map_err(|e| QueryError::InvalidSettings {
                name: ds.name.clone(),
                reason: e.to_string(),
            })?
        }
        other => {
            return Err(QueryError::InvalidSettings {
                name: ds.name.clone(),
                reason: format!("json_data must be an object, got {}", json_kind(other)),
            })
        }
    };

    Ok(v2::DataSourceInstanceSettings {
        id: ds.id,
        uid: ds.uid.clone(),
        name: ds.name.clone(),
        url: ds.url.clone(),
        json_data,
        decrypted_secure_json_data: ds.decrypted_secure_json_data.clone(),
        last_updated_ms: ds.updated.timestamp_millis(),
    })
}

fn to_wire_query(q: &Query, range: &TimeRange) -> Result<v2::DataQuery, QueryError> {
    let json = serde_json::to_vec(&q.model).map_err(|source| QueryError::ModelSerialization {
        ref_id: q.ref_id.clone(),
        source,
    })?;
    // Boundaries resolve here, not at batch construction; the TimeRange
    // caches, so the batch still pays for resolution once.
    let time_range = v2::TimeRange {
        from_epoch_ms: range.from_epoch_ms()?,
        to_epoch_ms: range.to_epoch_ms()?,
    };
    Ok(v2::DataQuery {
        ref_id: q.ref_id.clone(),
        max_data_points: q.max_data_points,
        interval_ms: q.interval_ms,
        time_range: Some(time_range),
        json,
        query_type: q.query_type.clone(),
    })
}

fn to_wire_user(user: &UserRef) -> v2::RemoteUser {
    v2::RemoteUser {
        login: user.login.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role.clone(),
    }
}

fn decode_response(reply: v2::QueryDataResponse, queries: &[Query]) -> BatchResult {
    let known: HashSet<&str> = queries.iter().map(|q| q.ref_id.as_str()).collect();

    let mut results = HashMap::with_capacity(reply.responses.len());
    for (ref_id, response) in reply.responses {
        if !known.contains(ref_id.as_str()) {
            warn!(ref_id = %ref_id, "backend replied for a ref id not in the batch, dropping");
            continue;
        }
        results.insert(ref_id, decode_result(response));
    }
    BatchResult {
        results,
        message: None,
    }
}

fn decode_result(response: v2::DataResponse) -> QueryResult {
    let error = (!response.error.is_empty()).then_some(response.error);

    // A backend error can still carry metadata worth surfacing.
    let meta = if response.json_meta.is_empty() {
        None
    } else {
        match serde_json::from_slice(&response.json_meta) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "backend metadata is not valid JSON, dropping");
                None
            }
        }
    };

    QueryResult {
        frames: response.frames.into_iter().map(Frame).collect(),
        error,
        meta,
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::Token;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tonic::{Code, Status};

    struct MockBackend {
        calls: AtomicUsize,
        captured: Mutex<Option<v2::QueryDataRequest>>,
        reply: Result<v2::QueryDataResponse, (Code, String)>,
    }

    impl MockBackend {
        fn replying(reply: v2::QueryDataResponse) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                captured: Mutex::new(None),
                reply: Ok(reply),
            }
        }

        fn failing(code: Code, message: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                captured: Mutex::new(None),
                reply: Err((code, message.to_string())),
            }
        }

        fn captured(&self) -> v2::QueryDataRequest {
            self.captured.lock().unwrap().clone().expect("no request captured")
        }
    }

    #[async_trait]
    impl DataClient for MockBackend {
        async fn query_data(
            &self,
            request: v2::QueryDataRequest,
        ) -> Result<v2::QueryDataResponse, Status> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.captured.lock().unwrap() = Some(request);
            match &self.reply {
                Ok(reply) => Ok(reply.clone()),
                Err((code, message)) => Err(Status::new(*code, message.clone())),
            }
        }
    }

    struct NoTokens;

    #[async_trait]
    impl OAuthTokenStore for NoTokens {
        async fn current_token(&self, _user: &UserRef) -> Option<Token> {
            None
        }
    }

    struct AlwaysToken;

    #[async_trait]
    impl OAuthTokenStore for AlwaysToken {
        async fn current_token(&self, _user: &UserRef) -> Option<Token> {
            Some(Token {
                access_token: "tok".into(),
                token_type: "Bearer".into(),
            })
        }
    }

    fn datasource() -> DataSource {
        DataSource {
            id: 7,
            uid: "ds-uid".into(),
            org_id: 2,
            name: "metrics".into(),
            plugin_id: "example-backend".into(),
            url: "http://localhost:9090".into(),
            json_data: serde_json::json!({"defaultBucket": "ops"}),
            decrypted_secure_json_data: HashMap::new(),
            updated: Utc::now(),
        }
    }

    fn batch(ref_ids: &[&str]) -> BatchRequest {
        let queries = ref_ids
            .iter()
            .map(|id| Query {
                ref_id: (*id).to_string(),
                query_type: String::new(),
                max_data_points: 500,
                interval_ms: 1000,
                model: serde_json::json!({"expr": "up"}),
            })
            .collect();
        let range = TimeRange::with_now(
            "1609459200000",
            "now",
            "2021-01-02T00:00:00Z".parse().unwrap(),
        );
        BatchRequest::new(range, queries)
    }

    fn reply_for(entries: &[(&str, v2::DataResponse)]) -> v2::QueryDataResponse {
        v2::QueryDataResponse {
            responses: entries
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        }
    }

    #[tokio::test]
    async fn builds_wire_request_with_resolved_range() {
        let backend = MockBackend::replying(reply_for(&[("A", v2::DataResponse::default())]));
        query(&backend, &NoTokens, &datasource(), &batch(&["A"]))
            .await
            .unwrap();

        let sent = backend.captured();
        let ctx = sent.plugin_context.unwrap();
        assert_eq!(ctx.org_id, 2);
        assert_eq!(ctx.plugin_id, "example-backend");
        let settings = ctx.data_source_instance_settings.unwrap();
        assert_eq!(settings.uid, "ds-uid");
        let json_data: serde_json::Value = serde_json::from_slice(&settings.json_data).unwrap();
        assert_eq!(json_data["defaultBucket"], "ops");

        assert_eq!(sent.queries.len(), 1);
        let q = &sent.queries[0];
        assert_eq!(q.ref_id, "A");
        let range = q.time_range.as_ref().unwrap();
        assert_eq!(range.from_epoch_ms, 1_609_459_200_000);
        assert_eq!(range.to_epoch_ms, 1_609_545_600_000);
        let model: serde_json::Value = serde_json::from_slice(&q.json).unwrap();
        assert_eq!(model["expr"], "up");
    }

    #[tokio::test]
    async fn forwards_oauth_token_when_datasource_opts_in() {
        let backend = MockBackend::replying(reply_for(&[("A", v2::DataResponse::default())]));
        let mut ds = datasource();
        ds.json_data = serde_json::json!({"forwardOauth": true});
        let mut req = batch(&["A"]);
        req.user = Some(UserRef {
            login: "alice".into(),
            ..UserRef::default()
        });

        query(&backend, &AlwaysToken, &ds, &req).await.unwrap();

        let sent = backend.captured();
        assert_eq!(
            sent.headers.get("Authorization").map(String::as_str),
            Some("Bearer tok")
        );
        // The batch's own header map stays untouched.
        assert!(req.headers.is_empty());
    }

    #[tokio::test]
    async fn per_query_error_leaves_siblings_valid() {
        let frame = vec![1u8, 2, 3];
        let backend = MockBackend::replying(reply_for(&[
            (
                "A",
                v2::DataResponse {
                    error: "series limit exceeded".into(),
                    json_meta: br#"{"limit":500}"#.to_vec(),
                    ..v2::DataResponse::default()
                },
            ),
            (
                "B",
                v2::DataResponse {
                    frames: vec![frame.clone()],
                    ..v2::DataResponse::default()
                },
            ),
        ]));

        let result = query(&backend, &NoTokens, &datasource(), &batch(&["A", "B"]))
            .await
            .unwrap();

        let a = &result.results["A"];
        assert_eq!(a.error.as_deref(), Some("series limit exceeded"));
        assert_eq!(a.meta.as_ref().unwrap()["limit"], 500);
        assert!(!a.is_success());

        let b = &result.results["B"];
        assert!(b.is_success());
        assert_eq!(b.frames, vec![Frame(frame)]);
    }

    #[tokio::test]
    async fn unknown_ref_ids_never_reach_the_output() {
        let backend = MockBackend::replying(reply_for(&[
            ("A", v2::DataResponse::default()),
            ("B", v2::DataResponse::default()),
            ("C", v2::DataResponse::default()),
        ]));

        let result = query(&backend, &NoTokens, &datasource(), &batch(&["A", "B"]))
            .await
            .unwrap();

        let mut keys: Vec<_> = result.results.keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["A", "B"]);
    }

    #[tokio::test]
    async fn malformed_settings_abort_before_any_remote_call() {
        let backend = MockBackend::replying(reply_for(&[]));
        let mut ds = datasource();
        ds.json_data = serde_json::json!("not an object");

        let err = query(&backend, &NoTokens, &ds, &batch(&["A"]))
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::InvalidSettings { .. }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unresolvable_range_aborts_before_any_remote_call() {
        let backend = MockBackend::replying(reply_for(&[]));
        let mut req = batch(&["A"]);
        req.time_range = TimeRange::with_now("garbage", "now", Utc::now());

        let err = query(&backend, &NoTokens, &datasource(), &req)
            .await
            .unwrap_err();

        assert!(matches!(err, QueryError::TimeRange(_)));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transport_failure_aborts_the_whole_batch() {
        let backend = MockBackend::failing(Code::Unavailable, "backend process exited");
        let err = query(&backend, &NoTokens, &datasource(), &batch(&["A"]))
            .await
            .unwrap_err();

        match err {
            QueryError::Transport(status) => assert_eq!(status.code(), Code::Unavailable),
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
