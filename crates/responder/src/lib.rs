//! Core domain for the room-status responder.
//!
//! This crate holds every value type, error type and port trait used by the
//! bridge, plus the pure reply policy. Infrastructure crates implement the
//! ports defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate performs no I/O. It
//! defines *what* is needed; `occupancy`, `webhook` and `listener` define *how*
//! to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype values (`ChannelName`, `CallbackUrl`, `EventId`, etc.) |
//! | [`types`] | `ConnectionConfig`, `InboundEvent`, `OccupancyResult`, `ReplyMessage` |
//! | [`reply`] | The reply policy ([`compose`]) |
//! | [`ports`] | `OccupancyQuery` and `ReplyDelivery` traits |
//! | [`errors`] | Error taxonomy |

pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod reply;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{
    BrokerError, ConfigError, ConfigField, DeliveryError, InvalidReason, MalformedEvent,
    QueryFailure,
};
pub use identifiers::{BrokerToken, CallbackUrl, ChannelName, EndpointUrl, EventId, ResourceName};
pub use ports::{OccupancyQuery, ReplyDelivery};
#[cfg(any(test, feature = "testing"))]
pub use ports::{MockOccupancyQuery, MockReplyDelivery};
pub use reply::{compose, PRESENCE_MARKER};
pub use types::{ConnectionConfig, InboundEvent, OccupancyResult, ReplyMessage};
