//! Error taxonomy for the responder.
//!
//! | Error | Recovery |
//! |-------|----------|
//! | [`ConfigError`] | fatal at startup |
//! | [`BrokerError`] | fatal; the process manager restarts the service |
//! | [`QueryFailure`] | local: becomes the generic error reply |
//! | [`MalformedEvent`] | local: event dropped after logging, no reply |
//! | [`DeliveryError`] | local: logged, never retried |

use thiserror::Error;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// The four required configuration fields, named by their key in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigField {
    /// Broker channel token (`beebotteChannelToken`).
    BrokerToken,
    /// Broker channel (`beebotteChannel`).
    Channel,
    /// Broker resource (`beebotteResource`).
    Resource,
    /// Status endpoint base URL (`endpoint`).
    Endpoint,
}

impl ConfigField {
    /// Every required field, in file order.
    pub const ALL: [ConfigField; 4] = [
        ConfigField::BrokerToken,
        ConfigField::Channel,
        ConfigField::Resource,
        ConfigField::Endpoint,
    ];

    /// Returns the key used for this field in the configuration file.
    pub fn key(self) -> &'static str {
        match self {
            ConfigField::BrokerToken => "beebotteChannelToken",
            ConfigField::Channel => "beebotteChannel",
            ConfigField::Resource => "beebotteResource",
            ConfigField::Endpoint => "endpoint",
        }
    }
}

impl std::fmt::Display for ConfigField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Why a configuration field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// The key is not present.
    Absent,
    /// The key is present but its value is not a string.
    NotAString,
    /// The value is an empty string.
    Empty,
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidReason::Absent => f.write_str("absent"),
            InvalidReason::NotAString => f.write_str("not a string"),
            InvalidReason::Empty => f.write_str("empty"),
        }
    }
}

/// Errors raised while loading the startup configuration.
///
/// All variants are fatal: a bad configuration fails identically on every
/// retry, so the service never starts degraded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Configuration file '{path}' could not be read: {reason}")]
    Missing {
        /// Location that was read.
        path: String,
        /// Underlying I/O failure.
        reason: String,
    },

    /// The file was read but is not a document of the expected shape.
    #[error("Configuration file '{path}' is malformed: {reason}")]
    Malformed {
        /// Location that was read.
        path: String,
        /// Parser or shape failure.
        reason: String,
    },

    /// A required field is absent, not a string, or empty.
    #[error("Configuration field '{field}' is invalid: {reason}")]
    Invalid {
        /// The offending field.
        field: ConfigField,
        /// Why it was rejected.
        reason: InvalidReason,
    },
}

impl ConfigError {
    /// Returns `true` when the failure is specifically an empty broker token.
    ///
    /// Operators alert on this separately from other configuration problems.
    pub fn is_empty_credential(&self) -> bool {
        matches!(
            self,
            ConfigError::Invalid {
                field: ConfigField::BrokerToken,
                reason: InvalidReason::Empty,
            }
        )
    }
}

// ---------------------------------------------------------------------------
// Broker
// ---------------------------------------------------------------------------

/// Fatal broker-level failures. Any of these moves the bridge to `Failed`.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The transport reported an error (TLS, TCP, protocol).
    #[error("Broker connection failed: {0}")]
    Connection(String),

    /// The broker answered the CONNECT with a non-success return code.
    #[error("Broker refused the connection: {0}")]
    Refused(String),

    /// The subscribe request could not be issued.
    #[error("Subscription request failed: {0}")]
    Subscribe(String),

    /// The subscription acknowledgment did not have the expected shape.
    #[error("Subscription acknowledgment is malformed: {0}")]
    MalformedAck(String),

    /// The broker acknowledged the subscription but granted nothing.
    #[error("Broker granted no subscriptions for '{topic}'")]
    NothingGranted {
        /// Topic filter that was requested.
        topic: String,
    },
}

// ---------------------------------------------------------------------------
// Per-event failures
// ---------------------------------------------------------------------------

/// Why an occupancy query produced no count.
///
/// Only used for logging; callers see [`crate::OccupancyResult::QueryFailed`].
#[derive(Debug, Error)]
pub enum QueryFailure {
    /// The request never produced a response body.
    #[error("Status request failed: {0}")]
    Transport(String),

    /// The body is not JSON.
    #[error("Status response (HTTP {status}) is not JSON: {body}")]
    NotJson {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The body is JSON but not an object.
    #[error("Status response (HTTP {status}) is not a JSON object: {body}")]
    NotAnObject {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The object has no `data` array.
    #[error("Status response (HTTP {status}) has no 'data' array: {body}")]
    MissingData {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
}

/// An inbound broker message that cannot be answered.
#[derive(Debug, Error)]
pub enum MalformedEvent {
    /// The message body is not valid JSON or not the expected envelope.
    #[error("Event body is not a valid request: {0}")]
    Undecodable(String),

    /// The envelope has no `data.response_url` field.
    #[error("Event has no reply destination")]
    MissingCallback,

    /// `data.response_url` is not an absolute http(s) URL.
    #[error("Event reply destination '{0}' is not an http(s) URL")]
    InvalidCallback(String),
}

/// The reply webhook could not be delivered.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The POST did not complete.
    #[error("Reply delivery failed: {0}")]
    Transport(String),

    /// The webhook answered with a non-success status.
    #[error("Reply webhook rejected the message (HTTP {status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_the_only_empty_credential() {
        let empty_token = ConfigError::Invalid {
            field: ConfigField::BrokerToken,
            reason: InvalidReason::Empty,
        };
        let absent_token = ConfigError::Invalid {
            field: ConfigField::BrokerToken,
            reason: InvalidReason::Absent,
        };
        let empty_channel = ConfigError::Invalid {
            field: ConfigField::Channel,
            reason: InvalidReason::Empty,
        };

        assert!(empty_token.is_empty_credential());
        assert!(!absent_token.is_empty_credential());
        assert!(!empty_channel.is_empty_credential());
    }

    #[test]
    fn invalid_error_names_the_file_key() {
        let err = ConfigError::Invalid {
            field: ConfigField::Resource,
            reason: InvalidReason::NotAString,
        };
        assert_eq!(
            err.to_string(),
            "Configuration field 'beebotteResource' is invalid: not a string"
        );
    }
}
