//! Error types for the user-registration client.
//!
//! This module defines the central `Error` enum, which captures every
//! reportable fault of the four call shapes and of the bidirectional stream
//! driver. Faults are classified by where they happen so callers can decide
//! their own halting policy.
//!
//! ## Error Cases
//! - `Connect`: The channel could not be established.
//! - `Transmission`: The transport stopped accepting outbound records.
//! - `Reception`: The inbound stream reported a fault other than a clean
//!   end-of-stream.
//! - `Cancelled`: The caller cancelled the call mid-flight.
//! - `DeadlineExceeded`: The configured overall deadline elapsed.
//! - `TaskFailed`: A background task panicked or dropped its completion
//!   signal.

use core::time::Duration;
use tonic::{Code, Status};

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the user-registration client.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// The channel could not be established before any call was made.
    #[error("Connection error: {context}")]
    Connect { context: String },

    /// The outbound direction rejected the record at `index`.
    #[error("Transmission error at record {index}: {context}")]
    Transmission { index: usize, context: String },

    /// The inbound direction failed with a non-EOF status.
    #[error("Reception error ({code:?}): {message}")]
    Reception { code: Code, message: String },

    /// The call was cancelled by the caller.
    #[error("Call cancelled")]
    Cancelled,

    /// The overall deadline elapsed before the remote ended its output.
    #[error("Deadline exceeded after {after:?}")]
    DeadlineExceeded { after: Duration },

    /// A driver task terminated abnormally.
    #[error("Task failed: {context}")]
    TaskFailed { context: String },
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Error::Reception {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

impl From<tonic::transport::Error> for Error {
    fn from(err: tonic::transport::Error) -> Self {
        Error::Connect {
            context: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_to_reception() {
        let err: Error = Status::internal("disk full").into();
        match err {
            Error::Reception { code, message } => {
                assert_eq!(code, Code::Internal);
                assert_eq!(message, "disk full");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn display_names_the_fault() {
        let err = Error::Transmission {
            index: 2,
            context: "outbound stream closed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Transmission error at record 2: outbound stream closed"
        );

        let err = Error::DeadlineExceeded {
            after: Duration::from_secs(10),
        };
        assert_eq!(err.to_string(), "Deadline exceeded after 10s");

        assert_eq!(Error::Cancelled.to_string(), "Call cancelled");
    }
}
