//! Query dispatch for out-of-process data source backends.
//!
//! The server core hands this crate a uniform batch of queries plus the
//! data source record they target; the crate converts the batch into
//! whichever wire protocol that backend registered at plugin-start time
//! (current protobuf protocol or the deprecated v1 protocol), performs
//! the single remote call, and normalizes the reply into one
//! [`BatchResult`] keyed by query ref id.
//!
//! Along the way it resolves textual time boundaries (epoch millis,
//! relative shorthand, date-math expressions) into absolute instants and
//! optionally forwards the calling user's OAuth token to the backend in
//! place of a static credential.

mod adapter_v1;
mod adapter_v2;
pub mod datemath;
mod dispatcher;
mod error;
mod models;
mod oauth;
mod timerange;

pub use dispatcher::{BackendClient, BackendRegistry, ClientProvider, Dispatcher, RegistryError};
pub use error::{QueryError, TimeRangeError};
pub use models::{BatchRequest, BatchResult, DataSource, Frame, Query, QueryResult, UserRef};
pub use oauth::{forward_oauth, OAuthTokenStore, Token};
pub use timerange::TimeRange;
