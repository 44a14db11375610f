//! Shared protocol bindings, error definitions and record types.
//!
//! ## Submodules
//!
//! - [`error`] - Unified error type for every call shape and the stream
//!   driver.
//! - [`types`] - Record aliases, the default record set and defaults.
//! - [`proto`] - Generated `userreg` service and message definitions.

pub mod error;
pub mod types;

pub use error::{Error, Result};

/// gRPC service and message definitions generated from
/// `proto/userreg.proto`.
pub mod proto {
    tonic::include_proto!("userreg");
}
