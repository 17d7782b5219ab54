//! Error taxonomy for the dispatch path.

use thiserror::Error;

/// A failure that aborts an entire batch before or during the remote
/// call. Per-query backend failures are not represented here; they ride
/// inside [`crate::QueryResult::error`].
#[derive(Debug, Error)]
pub enum QueryError {
    /// The data source record could not be converted into backend
    /// instance settings.
    #[error("invalid data source settings for '{name}': {reason}")]
    InvalidSettings { name: String, reason: String },

    /// A query model failed to serialize to JSON; nothing was sent.
    #[error("query model for ref id '{ref_id}' is not serializable: {source}")]
    ModelSerialization {
        ref_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Neither protocol client is registered for the plugin.
    #[error("plugin '{plugin_id}' does not support data queries")]
    UnsupportedBackend { plugin_id: String },

    /// The remote call itself failed (network, cancellation, deadline).
    #[error("backend transport error: {0}")]
    Transport(#[from] tonic::Status),

    /// A time boundary on the authoritative path failed to resolve.
    #[error(transparent)]
    TimeRange(#[from] TimeRangeError),
}

/// A time boundary string that could not be resolved to an instant.
///
/// `Clone` so a resolved-or-failed boundary can be cached inside
/// [`crate::TimeRange`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeRangeError {
    /// No parser in the fallback chain matched the input.
    #[error("could not parse time boundary '{0}'")]
    Unparseable(String),

    /// A parser matched the input's shape but its content is invalid,
    /// e.g. `now-0x/d` or an out-of-range epoch value.
    #[error("invalid time boundary '{raw}': {reason}")]
    Invalid { raw: String, reason: String },
}
