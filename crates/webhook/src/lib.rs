//! Chat reply webhook adapter.
//!
//! Implements the [`responder::ReplyDelivery`] trait by POSTing an ephemeral
//! (requester-only) message to the `response_url` a slash command supplied.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** The chat platform's block-kit payload shape and the HTTP
//! transport live here. The [`responder`] crate only knows
//! [`responder::ReplyMessage`].
//!
//! ## Payload
//!
//! ```json
//! {
//!   "text": "from boushitsu",
//!   "response_type": "ephemeral",
//!   "blocks": [
//!     { "type": "section", "text": { "type": "mrkdwn", "text": "<headline>" } },
//!     { "type": "context", "elements": [ { "type": "mrkdwn", "text": "<footer>" } ] }
//!   ]
//! }
//! ```

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use responder::{CallbackUrl, DeliveryError, ReplyDelivery, ReplyMessage};
use serde::Serialize;
use tracing::{debug, instrument};

/// Fallback text shown in notifications that cannot render blocks.
pub const FALLBACK_TEXT: &str = "from boushitsu";

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// Who can see the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Only the user who issued the command.
    Ephemeral,
}

/// A text object inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TextObject {
    /// Markdown-flavoured text.
    #[serde(rename = "mrkdwn")]
    Markdown {
        /// Rendered text.
        text: String,
    },
}

/// A layout block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Main body text.
    Section {
        /// Body text.
        text: TextObject,
    },
    /// Small, muted context line(s).
    Context {
        /// Context elements.
        elements: Vec<TextObject>,
    },
}

/// The JSON body posted to a `response_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EphemeralReply {
    /// Notification fallback text.
    pub text: String,
    /// Visibility of the reply.
    pub response_type: ResponseType,
    /// Headline section followed by the footer context block.
    pub blocks: Vec<Block>,
}

impl From<&ReplyMessage> for EphemeralReply {
    fn from(reply: &ReplyMessage) -> Self {
        Self {
            text: FALLBACK_TEXT.to_owned(),
            response_type: ResponseType::Ephemeral,
            blocks: vec![
                Block::Section {
                    text: TextObject::Markdown {
                        text: reply.headline().to_owned(),
                    },
                },
                Block::Context {
                    elements: vec![TextObject::Markdown {
                        text: reply.footer().to_owned(),
                    }],
                },
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Posts replies to slash-command response URLs.
#[derive(Debug, Clone, Default)]
pub struct WebhookResponder {
    http: Client,
}

impl WebhookResponder {
    /// Creates a responder with transport defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a responder that reuses an existing connection pool.
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ReplyDelivery for WebhookResponder {
    #[instrument(name = "deliver_reply", skip_all)]
    async fn deliver(
        &self,
        callback: &CallbackUrl,
        reply: &ReplyMessage,
    ) -> Result<(), DeliveryError> {
        let payload = EphemeralReply::from(reply);

        let response = self
            .http
            .post(callback.as_str())
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), "reply delivered");
        Ok(())
    }
}
