//! Process exit statuses.
//!
//! Each fatal condition maps to its own non-zero code so the process manager
//! and alerting can tell a bad deployment from a broker outage.

use responder::{BrokerError, ConfigError};
use thiserror::Error;

/// Logging or tracing could not be set up.
pub const SETUP_FAILURE: u8 = 1;
/// The configuration file is missing, malformed or invalid.
pub const BAD_CONFIGURATION: u8 = 2;
/// The broker token is an empty string.
pub const EMPTY_CREDENTIAL: u8 = 3;
/// The broker refused, dropped or never confirmed the subscription.
pub const BROKER_FAILURE: u8 = 4;

/// A condition that ends the process.
#[derive(Debug, Error)]
pub enum FatalError {
    /// Startup configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The broker session failed.
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

impl FatalError {
    /// Exit status reported to the process manager.
    pub fn exit_code(&self) -> u8 {
        match self {
            FatalError::Config(e) if e.is_empty_credential() => EMPTY_CREDENTIAL,
            FatalError::Config(_) => BAD_CONFIGURATION,
            FatalError::Broker(_) => BROKER_FAILURE,
        }
    }
}
