//! Status-request event bridge.
//!
//! Subscribes to `{channel}/{resource}` on the hosted MQTT broker and answers
//! every inbound status request with a private reply posted to the request's
//! callback URL.
//!
//! - [`EventBridge`] owns the MQTT client and event loop for the lifetime of
//!   the process. It drives the [`Session`] state machine and spawns one task
//!   per inbound message.
//! - [`MessageHandler`] is the per-message pipeline: decode the event, query
//!   occupancy, compose the reply, deliver it.
//!
//! ## Architectural Layer
//!
//! **Infrastructure + orchestration.** Broker transport and subscription
//! lifecycle live here. Occupancy lookup and reply delivery are reached only
//! through the [`responder::OccupancyQuery`] and [`responder::ReplyDelivery`]
//! ports.
//!
//! ## Concurrency
//!
//! Messages are handled independently: a slow status query delays only its
//! own reply, and replies may be sent out of arrival order. Nothing is shared
//! between per-message tasks except immutable `Arc`s. On shutdown the client
//! sends DISCONNECT and in-flight tasks are aborted.
//!
//! ## Failure
//!
//! Connection errors, refused connections and bad subscription
//! acknowledgments are terminal ([`BridgeState::Failed`]); there is no
//! in-process reconnect. The supervising process manager restarts the service.

mod bridge;
mod handler;
mod session;

pub use bridge::{BrokerSettings, EventBridge, BROKER_HOST, BROKER_TLS_PORT};
pub use handler::{MessageHandler, Outcome};
pub use session::{BridgeState, GrantedTopic, Session, Step};
