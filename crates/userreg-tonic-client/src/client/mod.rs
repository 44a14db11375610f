//! Client-side configuration, telemetry, stream driving and the typed
//! `UserService` wrapper.
//!
//! ## Structure
//!
//! - [`config`] - CLI/environment configuration.
//! - [`service`] - Connection handling and the four call shapes.
//! - [`streaming`] - Paced send loop, receive loop and the bidirectional
//!   stream driver that pairs them.
//! - [`telemetry`] - Logging, tracing and metrics setup.

pub mod config;
pub mod service;
pub mod streaming;
pub mod telemetry;
