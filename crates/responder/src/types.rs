//! Value types that flow through one request/response cycle.
//!
//! Only [`ConnectionConfig`] lives for the whole process. Everything else is
//! created for a single inbound event and dropped once its reply has been
//! handed to the delivery port.

use serde_json::Value;

use crate::{
    BrokerToken, CallbackUrl, ChannelName, ConfigError, ConfigField, EndpointUrl, InvalidReason,
    MalformedEvent, ResourceName,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Validated connection parameters.
///
/// Built once at startup and never mutated. All four values are guaranteed
/// non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    broker_token: BrokerToken,
    channel: ChannelName,
    resource: ResourceName,
    status_endpoint: EndpointUrl,
}

impl ConnectionConfig {
    /// Validates raw field values and builds a [`ConnectionConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] with [`InvalidReason::Empty`] naming the
    /// first empty field.
    pub fn new(
        broker_token: impl Into<String>,
        channel: impl Into<String>,
        resource: impl Into<String>,
        status_endpoint: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let empty = |field| ConfigError::Invalid {
            field,
            reason: InvalidReason::Empty,
        };

        Ok(Self {
            broker_token: BrokerToken::new(broker_token)
                .ok_or_else(|| empty(ConfigField::BrokerToken))?,
            channel: ChannelName::new(channel).ok_or_else(|| empty(ConfigField::Channel))?,
            resource: ResourceName::new(resource).ok_or_else(|| empty(ConfigField::Resource))?,
            status_endpoint: EndpointUrl::new(status_endpoint)
                .ok_or_else(|| empty(ConfigField::Endpoint))?,
        })
    }

    /// Broker credential.
    pub fn broker_token(&self) -> &BrokerToken {
        &self.broker_token
    }

    /// Subscribed channel.
    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// Subscribed resource.
    pub fn resource(&self) -> &ResourceName {
        &self.resource
    }

    /// Base URL of the status service.
    pub fn status_endpoint(&self) -> &EndpointUrl {
        &self.status_endpoint
    }

    /// Topic filter to subscribe to: `"{channel}/{resource}"`.
    pub fn subscription_topic(&self) -> String {
        format!("{}/{}", self.channel, self.resource)
    }
}

// ---------------------------------------------------------------------------
// Inbound event
// ---------------------------------------------------------------------------

/// A decoded status request.
///
/// The broker envelope carries the chat platform's slash-command payload
/// under `data`. Only `data.response_url` is required; the remaining fields
/// are kept for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Where the reply must be posted.
    pub callback_url: CallbackUrl,
    /// Name of the requesting user, if present.
    pub user_name: Option<String>,
    /// Slash command that triggered the request, if present.
    pub command: Option<String>,
    /// Free text typed after the command, if present.
    pub text: Option<String>,
}

impl InboundEvent {
    /// Decodes a raw broker message body.
    ///
    /// # Errors
    ///
    /// - [`MalformedEvent::Undecodable`] if the body is not JSON.
    /// - [`MalformedEvent::MissingCallback`] if `data.response_url` is absent.
    /// - [`MalformedEvent::InvalidCallback`] if it is not an http(s) URL string.
    pub fn from_payload(payload: &[u8]) -> Result<Self, MalformedEvent> {
        let body: Value = serde_json::from_slice(payload)
            .map_err(|e| MalformedEvent::Undecodable(e.to_string()))?;

        let data = body.get("data");
        let callback_url = match data.and_then(|d| d.get("response_url")) {
            None | Some(Value::Null) => return Err(MalformedEvent::MissingCallback),
            Some(Value::String(url)) => CallbackUrl::new(url.as_str())
                .ok_or_else(|| MalformedEvent::InvalidCallback(url.clone()))?,
            Some(other) => return Err(MalformedEvent::InvalidCallback(other.to_string())),
        };

        let optional = |key: &str| {
            data.and_then(|d| d.get(key))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        Ok(Self {
            callback_url,
            user_name: optional("user_name"),
            command: optional("command"),
            text: optional("text"),
        })
    }
}

// ---------------------------------------------------------------------------
// Occupancy
// ---------------------------------------------------------------------------

/// Outcome of one occupancy query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyResult {
    /// Number of people currently in the room.
    Count(usize),
    /// The status source could not be queried or interpreted.
    QueryFailed,
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// A reply ready for delivery.
///
/// Headline and footer are always set together; there is no way to observe
/// one without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyMessage {
    headline: String,
    footer: String,
}

impl ReplyMessage {
    /// Creates a reply from both of its parts.
    pub fn new(headline: impl Into<String>, footer: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            footer: footer.into(),
        }
    }

    /// Main status line.
    pub fn headline(&self) -> &str {
        &self.headline
    }

    /// Secondary context line.
    pub fn footer(&self) -> &str {
        &self.footer
    }
}
