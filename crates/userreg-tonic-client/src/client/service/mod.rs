//! Connection handling and the four registration call shapes.
//!
//! ## Structure
//!
//! - [`handler`] - [`UserClient`](handler::UserClient), one method per call
//!   shape.
//! - [`stream`] - Background opening and forwarding of response streams.

pub mod handler;
pub mod stream;
