//! Async client traits implemented by the backend transport layer.
//!
//! The plugin supervisor owns the actual gRPC channel to each backend
//! process and hands the dispatch layer one of these clients at
//! plugin-start time. Remote failures surface as [`tonic::Status`], the
//! same error a generated stub returns, so cancellation and deadline
//! codes pass through unchanged.

use async_trait::async_trait;
use tonic::Status;

use crate::{v1, v2};

/// Client for backends speaking the current protocol.
#[async_trait]
pub trait DataClient: Send + Sync {
    async fn query_data(
        &self,
        request: v2::QueryDataRequest,
    ) -> Result<v2::QueryDataResponse, Status>;
}

/// Client for backends that never adopted v2. Deprecated.
#[async_trait]
pub trait LegacyClient: Send + Sync {
    async fn query(&self, request: v1::QueryRequest) -> Result<v1::QueryResponse, Status>;
}
