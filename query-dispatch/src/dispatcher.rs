//! Backend selection and the uniform dispatch entry point.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use proto::client::{DataClient, LegacyClient};
use thiserror::Error;
use tracing::debug;

use crate::error::QueryError;
use crate::models::{BatchRequest, BatchResult, DataSource};
use crate::oauth::OAuthTokenStore;
use crate::{adapter_v1, adapter_v2};

/// The protocol client a backend registered at plugin-start time.
///
/// Exactly one protocol per backend, by construction; there is no
/// "neither" or "both" state to check at dispatch time.
#[derive(Clone)]
pub enum BackendClient {
    Legacy(Arc<dyn LegacyClient>),
    Current(Arc<dyn DataClient>),
}

/// Collaborator that knows which protocol client is active for a plugin.
pub trait ClientProvider: Send + Sync {
    fn client_for(&self, plugin_id: &str) -> Option<BackendClient>;
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a backend is already registered for plugin '{0}'")]
    AlreadyRegistered(String),
}

/// In-memory, write-once registry of running backends.
///
/// The plugin supervisor registers each backend once when its process
/// starts; dispatch calls only read afterwards.
#[derive(Default)]
pub struct BackendRegistry {
    clients: RwLock<HashMap<String, BackendClient>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        plugin_id: impl Into<String>,
        client: BackendClient,
    ) -> Result<(), RegistryError> {
        let plugin_id = plugin_id.into();
        let mut clients = self.clients.write().expect("registry lock poisoned");
        match clients.entry(plugin_id) {
            Entry::Occupied(entry) => Err(RegistryError::AlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(plugin_id = %entry.key(), "backend registered");
                entry.insert(client);
                Ok(())
            }
        }
    }
}

impl ClientProvider for BackendRegistry {
    fn client_for(&self, plugin_id: &str) -> Option<BackendClient> {
        self.clients
            .read()
            .expect("registry lock poisoned")
            .get(plugin_id)
            .cloned()
    }
}

/// The single uniform query entry point consumed by the API layer.
pub struct Dispatcher {
    provider: Arc<dyn ClientProvider>,
    token_store: Arc<dyn OAuthTokenStore>,
}

impl Dispatcher {
    pub fn new(provider: Arc<dyn ClientProvider>, token_store: Arc<dyn OAuthTokenStore>) -> Self {
        Self {
            provider,
            token_store,
        }
    }

    /// Dispatch one batch against the backend serving `ds`.
    ///
    /// Exactly one attempt against exactly one backend; no retries.
    /// Cancellation propagates by dropping the returned future, which
    /// aborts the in-flight remote call.
    pub async fn dispatch(
        &self,
        ds: &DataSource,
        batch: BatchRequest,
    ) -> Result<BatchResult, QueryError> {
        match self.provider.client_for(&ds.plugin_id) {
            Some(BackendClient::Current(client)) => {
                debug!(plugin_id = %ds.plugin_id, "dispatching via current protocol");
                adapter_v2::query(client.as_ref(), self.token_store.as_ref(), ds, &batch).await
            }
            Some(BackendClient::Legacy(client)) => {
                debug!(plugin_id = %ds.plugin_id, "dispatching via deprecated v1 protocol");
                adapter_v1::query(client.as_ref(), ds, &batch).await
            }
            None => Err(QueryError::UnsupportedBackend {
                plugin_id: ds.plugin_id.clone(),
            }),
        }
    }
}
