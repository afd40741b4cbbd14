use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message published on an event's topic after every committed registration or
/// cancellation.
///
/// `current_count` is the number of registrations the event held at the moment the
/// transaction committed. Observers apply these as absolute values, not deltas, so a
/// dropped message is repaired by the next one (or by reading a fresh
/// [`CapacitySnapshot`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountUpdate {
    /// The event whose attendee count changed.
    pub event_id: Uuid,
    /// Number of registrations held by the event as of the commit.
    pub current_count: i64,
}

/// Consistent read of one event's capacity state.
///
/// Observers read one of these once, right after subscribing to the event's topic, and
/// only then trust incremental [`CountUpdate`]s: updates published before the
/// subscription are never replayed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    /// The event this snapshot describes.
    pub event_id: Uuid,
    /// Event title, denormalized for display.
    pub title: String,
    /// Maximum number of registrations the event accepts.
    pub max_capacity: i32,
    /// Number of registrations currently held, computed from the registration rows.
    pub current_count: i64,
}
