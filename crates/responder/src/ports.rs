//! Port traits implemented by the infrastructure crates.
//!
//! The event bridge depends only on these traits, so its per-event pipeline can
//! be exercised with mocks instead of live HTTP endpoints.

use async_trait::async_trait;

use crate::{CallbackUrl, DeliveryError, EndpointUrl, OccupancyResult, ReplyMessage};

/// Source of the live occupancy count.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait OccupancyQuery: Send + Sync {
    /// Queries the status service rooted at `base` once.
    ///
    /// Never fails: every problem is logged by the implementation and
    /// reported as [`OccupancyResult::QueryFailed`].
    async fn fetch_count(&self, base: &EndpointUrl) -> OccupancyResult;
}

/// Sends a composed reply back to the requester.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReplyDelivery: Send + Sync {
    /// Posts `reply` to `callback` exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] when the POST fails or is rejected. Callers
    /// log it; nothing is retried.
    async fn deliver(&self, callback: &CallbackUrl, reply: &ReplyMessage)
        -> Result<(), DeliveryError>;
}
