use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::bus::CountBus;
use crate::types::CountUpdate;

const DEFAULT_TOPIC_CAPACITY: usize = 64;

/// In-process, topic-scoped implementation of [`CountBus`], backed by one
/// [`broadcast`] channel per event topic.
///
/// Topics are named `event_<uuid>` and created lazily on first subscription.
/// Publishing on a topic nobody joined is a no-op. A subscriber that falls more than
/// the topic backlog behind loses the oldest updates; since updates carry absolute
/// counts, it resynchronizes by reading a capacity snapshot.
pub struct ChannelBus {
    capacity: usize,
    topics: RwLock<HashMap<String, broadcast::Sender<CountUpdate>>>,
}

impl ChannelBus {
    /// Creates a new instance of a [`ChannelBus`] with the default per-topic backlog.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TOPIC_CAPACITY)
    }

    /// Creates a new instance of a [`ChannelBus`], keeping up to `capacity` undelivered
    /// updates per topic.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0, as the underlying [`broadcast`] channel does.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            topics: RwLock::new(HashMap::new()),
        }
    }

    /// Name of the topic carrying updates for the given event.
    pub fn topic(event_id: Uuid) -> String {
        format!("event_{event_id}")
    }

    /// Joins the topic for `event_id`, returning the receiving half. Dropping the
    /// receiver leaves the topic.
    ///
    /// Updates published before this call are not replayed: read a capacity snapshot
    /// once after subscribing, then trust the incremental updates.
    pub async fn subscribe(&self, event_id: Uuid) -> broadcast::Receiver<CountUpdate> {
        let mut topics = self.topics.write().await;

        topics
            .entry(Self::topic(event_id))
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }
}

impl Default for ChannelBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CountBus for ChannelBus {
    async fn publish(&self, update: &CountUpdate) {
        let topic = Self::topic(update.event_id);
        let mut topics = self.topics.write().await;

        if let Some(sender) = topics.get(&topic) {
            if sender.send(*update).is_err() {
                // The last receiver left: drop the topic until someone re-subscribes.
                let _ = topics.remove(&topic);
                tracing::debug!(topic = %topic, "count update dropped, topic has no subscribers");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_is_derived_from_the_event_id() {
        let event_id = Uuid::new_v4();

        assert_eq!(ChannelBus::topic(event_id), format!("event_{event_id}"));
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_a_no_op() {
        let bus = ChannelBus::new();
        let update = CountUpdate {
            event_id: Uuid::new_v4(),
            current_count: 1,
        };

        // No topic exists yet, nothing to deliver to.
        bus.publish(&update).await;

        assert!(bus.topics.read().await.is_empty());
    }

    #[tokio::test]
    async fn subscriber_receives_published_updates() {
        let bus = ChannelBus::new();
        let event_id = Uuid::new_v4();
        let mut receiver = bus.subscribe(event_id).await;

        let update = CountUpdate {
            event_id,
            current_count: 3,
        };
        bus.publish(&update).await;

        assert_eq!(receiver.recv().await.unwrap(), update);
    }

    #[tokio::test]
    async fn abandoned_topic_is_pruned_on_publish() {
        let bus = ChannelBus::new();
        let event_id = Uuid::new_v4();

        let receiver = bus.subscribe(event_id).await;
        drop(receiver);

        bus.publish(&CountUpdate {
            event_id,
            current_count: 1,
        })
        .await;

        assert!(bus.topics.read().await.is_empty());
    }

    #[tokio::test]
    async fn topics_are_scoped_per_event() {
        let bus = ChannelBus::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let mut first_rx = bus.subscribe(first).await;
        let mut second_rx = bus.subscribe(second).await;

        bus.publish(&CountUpdate {
            event_id: first,
            current_count: 7,
        })
        .await;

        assert_eq!(first_rx.recv().await.unwrap().current_count, 7);
        assert!(matches!(
            second_rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
