//! Per-message pipeline: decode, query, compose, deliver.

use std::sync::Arc;

use responder::{compose, EndpointUrl, EventId, InboundEvent, OccupancyQuery, ReplyDelivery};
use tracing::{error, field, info, info_span, warn, Instrument, Span};

/// How the handling of one message ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The message could not be decoded; no reply was attempted.
    Dropped,
    /// The reply was posted and accepted.
    Delivered,
    /// The reply was composed but the POST failed or was rejected.
    DeliveryFailed,
}

/// Answers status requests.
///
/// Cheap to clone; every inbound message is handled on its own task with its
/// own clone, sharing only the immutable ports and endpoint.
#[derive(Clone)]
pub struct MessageHandler {
    query: Arc<dyn OccupancyQuery>,
    delivery: Arc<dyn ReplyDelivery>,
    endpoint: EndpointUrl,
}

impl MessageHandler {
    /// Creates a handler that queries `endpoint` for every request.
    pub fn new(
        query: Arc<dyn OccupancyQuery>,
        delivery: Arc<dyn ReplyDelivery>,
        endpoint: EndpointUrl,
    ) -> Self {
        Self {
            query,
            delivery,
            endpoint,
        }
    }

    /// Handles one broker message end to end.
    ///
    /// Each call opens a new root span so concurrent requests produce
    /// independent traces.
    pub async fn handle(&self, topic: &str, payload: &[u8]) -> Outcome {
        let event_id = EventId::new_random();
        let span = info_span!(
            parent: Span::none(),
            "inbound_event",
            event_id = %event_id,
            topic = %topic,
            payload_size = payload.len(),
            user = field::Empty,
        );

        async {
            let event = match InboundEvent::from_payload(payload) {
                Ok(event) => event,
                Err(e) => {
                    error!(error = %e, "discarding malformed event");
                    return Outcome::Dropped;
                }
            };

            if let Some(user) = &event.user_name {
                Span::current().record("user", user.as_str());
            }
            info!(command = ?event.command, "status request received");

            let result = self.query.fetch_count(&self.endpoint).await;
            let reply = compose(result);

            match self.delivery.deliver(&event.callback_url, &reply).await {
                Ok(()) => {
                    info!(?result, "reply delivered");
                    Outcome::Delivered
                }
                Err(e) => {
                    warn!(error = %e, "reply delivery failed");
                    Outcome::DeliveryFailed
                }
            }
        }
        .instrument(span)
        .await
    }
}
