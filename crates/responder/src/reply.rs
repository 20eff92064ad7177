//! Maps an occupancy outcome to the reply shown to the requester.

use crate::{OccupancyResult, ReplyMessage};

/// One marker per person in the room.
pub const PRESENCE_MARKER: &str = ":bust_in_silhouette:";

const ERROR_HEADLINE: &str = "boushitsu status: *error* (Sorry, something went wrong.) :x:";
const ERROR_FOOTER: &str = ":bow:_< Sorry_";
const CLOSED_HEADLINE: &str = "boushitsu status: *closed* :zzz:";
const CLOSED_FOOTER: &str = "No one is currently in the room.";
const OPEN_HEADLINE: &str = "boushitsu status: *open* :heavy_check_mark:";
const OPEN_FOOTER_PREFIX: &str = "Currently in the room ";

/// Builds the reply for `result`.
///
/// A count of `n` renders [`PRESENCE_MARKER`] exactly `n` times; there is no
/// cap. Query failures never expose their cause to the requester.
pub fn compose(result: OccupancyResult) -> ReplyMessage {
    match result {
        OccupancyResult::QueryFailed => ReplyMessage::new(ERROR_HEADLINE, ERROR_FOOTER),
        OccupancyResult::Count(0) => ReplyMessage::new(CLOSED_HEADLINE, CLOSED_FOOTER),
        OccupancyResult::Count(n) => ReplyMessage::new(
            OPEN_HEADLINE,
            format!("{OPEN_FOOTER_PREFIX}{}", PRESENCE_MARKER.repeat(n)),
        ),
    }
}
