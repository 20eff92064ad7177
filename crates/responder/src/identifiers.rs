//! Newtype identifiers and validated string values.
//!
//! Every configuration value and payload field that crosses a boundary is
//! wrapped in a distinct newtype so a [`ChannelName`] cannot be passed where a
//! [`ResourceName`] is expected, and a callback URL cannot be confused with the
//! status endpoint base.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new value, returning `None` if it is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Broker addressing
// ---------------------------------------------------------------------------

string_id! {
    /// The broker channel that owns the subscribed resource.
    ChannelName
}

string_id! {
    /// The resource within a [`ChannelName`] that carries status requests.
    ResourceName
}

// ---------------------------------------------------------------------------
// HTTP addressing
// ---------------------------------------------------------------------------

string_id! {
    /// Base URL of the status REST service (e.g. `"https://status.example.org"`).
    ///
    /// The occupancy sub-path is appended by the query client.
    EndpointUrl
}

/// The reply destination carried inside an inbound event.
///
/// Only absolute `http://` or `https://` URLs are accepted; anything else is
/// rejected at the payload boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackUrl(String);

impl CallbackUrl {
    /// Creates a [`CallbackUrl`], returning `None` unless `value` starts with
    /// an `http://` or `https://` scheme followed by a host.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        let rest = v
            .strip_prefix("https://")
            .or_else(|| v.strip_prefix("http://"))?;
        if rest.is_empty() || rest.starts_with('/') || v.chars().any(char::is_whitespace) {
            return None;
        }
        Some(Self(v))
    }

    /// Returns the URL as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallbackUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// Channel token used to authenticate against the broker.
///
/// `Debug` and `Display` never reveal the token.
#[derive(Clone, PartialEq, Eq)]
pub struct BrokerToken(String);

impl BrokerToken {
    /// Creates a token, returning `None` if `value` is empty.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        if v.is_empty() {
            None
        } else {
            Some(Self(v))
        }
    }

    /// Returns the raw token. Only the broker connection should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BrokerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BrokerToken(***)")
    }
}

impl std::fmt::Display for BrokerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies the handling of one inbound broker message.
///
/// Generated when the message arrives; recorded on the per-event span so all
/// log lines for one request can be correlated even when events interleave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Generates a new random event identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
