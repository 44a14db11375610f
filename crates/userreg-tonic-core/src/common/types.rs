//! # Common Record Types and Defaults
//!
//! This module defines the domain aliases shared by every call shape and the
//! defaults the client binary falls back to when nothing is configured.
//!
//! ## Type Aliases
//!
//! - [`Record`] - A request payload (`userreg.User`).
//! - [`ResponseEnvelope`] - A status-tagged response (`userreg.UserResultStream`).
//!
//! ## Constants
//!
//! - [`DEFAULT_SERVER_ADDR`] - Endpoint the client dials by default.
//! - [`DEFAULT_SEND_INTERVAL`] - Pause between two outbound records.

use super::proto::{User, UserResultStream};
use core::time::Duration;

/// A request payload. Uniqueness of `id` and format of `email` are left to
/// the service.
pub type Record = User;

/// A response payload: an opaque `status` plus the echoed or derived record.
pub type ResponseEnvelope = UserResultStream;

/// The endpoint dialed when no address is configured.
pub const DEFAULT_SERVER_ADDR: &str = "http://localhost:50051";

/// The pause between two consecutive outbound records.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(3);

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
        }
    }
}

impl UserResultStream {
    /// Name of the enclosed record, or an empty string when the service sent
    /// no record.
    pub fn user_name(&self) -> &str {
        self.user.as_ref().map_or("", |user| user.name.as_str())
    }
}

/// The built-in record set sent when no records file is configured.
pub fn default_records() -> Vec<Record> {
    vec![
        Record::new("1", "Francisco", "francisco@email.com"),
        Record::new("2", "Chuck", "chuck@email.com"),
        Record::new("3", "Henrique", "henrique@email.com"),
        Record::new("4", "Mike", "mike@email.com"),
        Record::new("5", "Marpin", "marpin@email.com"),
        Record::new("6", "Doug", "doug@email.com"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_records_keep_their_order() {
        let ids: Vec<_> = default_records().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["1", "2", "3", "4", "5", "6"]);
    }

    #[test]
    fn user_name_tolerates_missing_record() {
        let envelope = ResponseEnvelope {
            status: "Added".to_string(),
            user: None,
        };
        assert_eq!(envelope.user_name(), "");

        let envelope = ResponseEnvelope {
            status: "Added".to_string(),
            user: Some(Record::new("7", "Ana", "ana@email.com")),
        };
        assert_eq!(envelope.user_name(), "Ana");
    }
}
