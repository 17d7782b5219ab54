//! Query gateway — HTTP entry point for data source queries.
//!
//! Accepts JSON query batches and dispatches them to whichever backend
//! serves the target data source. Ships with an in-process sample-data
//! backend so it runs standalone; real backends are registered by the
//! plugin supervisor at startup.
//!
//! # Configuration
//!
//! | Env var        | Default        |
//! |----------------|----------------|
//! | `GATEWAY_ADDR` | `0.0.0.0:3000` |

mod handlers;
mod models;
mod sampledata;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    routing::{get, post},
    Router,
};
use query_dispatch::{
    BackendClient, BackendRegistry, DataSource, Dispatcher, OAuthTokenStore, Token, UserRef,
};
use tower_http::trace::TraceLayer;
use tracing::info;

// ------------------------------------------------------------------ //
//  Shared application state                                           //
// ------------------------------------------------------------------ //

/// Shared state injected into every Axum handler via `State`.
pub struct AppState {
    pub dispatcher: Dispatcher,
    /// Configured data sources keyed by uid.
    pub datasources: HashMap<String, DataSource>,
    /// Uid used when a request names no data source.
    pub default_uid: String,
}

/// The gateway has no session layer, so no user ever has a token here;
/// a server embedding the dispatcher supplies its real token store.
struct NoSessionTokens;

#[async_trait]
impl OAuthTokenStore for NoSessionTokens {
    async fn current_token(&self, _user: &UserRef) -> Option<Token> {
        None
    }
}

// ------------------------------------------------------------------ //
//  Entry point                                                        //
// ------------------------------------------------------------------ //

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gateway=info".parse()?),
        )
        .json()
        .init();

    let registry = Arc::new(BackendRegistry::new());
    registry.register(
        sampledata::PLUGIN_ID,
        BackendClient::Current(Arc::new(sampledata::SampleDataBackend)),
    )?;

    let demo = sampledata::demo_datasource();
    info!(uid = %demo.uid, "sample data source registered");

    let state = Arc::new(AppState {
        dispatcher: Dispatcher::new(registry, Arc::new(NoSessionTokens)),
        default_uid: demo.uid.clone(),
        datasources: HashMap::from([(demo.uid.clone(), demo)]),
    });

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/ds/query", post(handlers::query))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_addr = std::env::var("GATEWAY_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = bind_addr, "gateway listening");

    axum::serve(listener, app).await?;

    Ok(())
}
