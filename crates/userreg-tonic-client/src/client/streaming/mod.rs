//! Bidirectional stream driving.
//!
//! A duplex stream is split by direction: the [`sender`] owns the outbound
//! half and the [`receiver`] owns the inbound half. The [`coordinator`] runs
//! both as independent tasks and completes once the inbound half reports
//! end-of-stream.

pub mod coordinator;
pub mod receiver;
pub mod sender;

pub use coordinator::{DriverConfig, Duplex, StreamDriver};
