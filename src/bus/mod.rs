use std::sync::Arc;

use async_trait::async_trait;

use crate::types::CountUpdate;

pub mod channel;

/// The responsibility of a [`CountBus`] is to push a committed [`CountUpdate`] out to
/// live observers of the event's topic.
///
/// Delivery is best-effort and at-most-once per subscriber, and is never persisted: a
/// bus owns no state and a missed message is recovered by reading a fresh capacity
/// snapshot. All the errors should be handled from within the [`CountBus`] and
/// shouldn't panic.
#[async_trait]
pub trait CountBus: Send + Sync {
    /// Publish a count update on the topic derived from its event id.
    async fn publish(&self, update: &CountUpdate);
}

/// Blanket implementation letting a shared bus handle be attached to a registrar while
/// subscribers keep their own clone.
#[async_trait]
impl<B> CountBus for Arc<B>
where
    B: CountBus,
{
    async fn publish(&self, update: &CountUpdate) {
        self.as_ref().publish(update).await;
    }
}
