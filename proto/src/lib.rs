//! Wire-level types shared between the dispatch library and backend
//! transports.
//!
//! Two backend protocols exist side by side:
//!
//! * [`v2`]: the current protobuf protocol. Messages are maintained as
//!   hand-written `prost` structs (byte-compatible with codegen output)
//!   so building the workspace does not require a `protoc` binary.
//! * [`v1`]: the frozen, deprecated JSON protocol. Kept only until the
//!   last v1-only backend is retired.
//!
//! The [`client`] module defines the async client traits a transport must
//! implement; the concrete gRPC channel lives with the plugin supervisor,
//! not in this workspace.

pub mod client;
pub mod v1;
pub mod v2;
