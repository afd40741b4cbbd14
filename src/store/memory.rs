use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::RegistrarError;
use crate::store::RegistrationStore;
use crate::types::{CapacitySnapshot, CountUpdate};

/// In-memory implementation of the [`RegistrationStore`], for tests and local
/// development.
///
/// A single async [`Mutex`] over the event map stands in for the per-row lock of the
/// Postgres store: every register/cancel runs to completion under it, so capacity
/// checks observe the same serialized order the row lock would impose (coarser, but
/// with identical observable semantics). Cloning yields a handle on the same
/// underlying map.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    events: Arc<Mutex<HashMap<Uuid, EventRecord>>>,
}

struct EventRecord {
    title: String,
    max_capacity: i32,
    registrations: HashMap<Uuid, DateTime<Utc>>,
}

impl InMemoryStore {
    /// Creates a new, empty instance of an [`InMemoryStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an event with the given capacity. Event management is outside the
    /// registrar's contract; this exists so the store is usable standalone.
    pub async fn insert_event(&self, event_id: Uuid, title: impl Into<String>, max_capacity: i32) {
        let mut events = self.events.lock().await;

        events.insert(
            event_id,
            EventRecord {
                title: title.into(),
                max_capacity,
                registrations: HashMap::new(),
            },
        );
    }
}

#[async_trait]
impl RegistrationStore for InMemoryStore {
    async fn register(&self, event_id: Uuid, registrant_id: Uuid) -> Result<CountUpdate, RegistrarError> {
        let mut events = self.events.lock().await;
        let event = events.get_mut(&event_id).ok_or(RegistrarError::NotFound(event_id))?;

        if event.registrations.contains_key(&registrant_id) {
            return Err(RegistrarError::AlreadyRegistered {
                event_id,
                registrant_id,
            });
        }

        let count = event.registrations.len() as i64;
        if count >= i64::from(event.max_capacity) {
            return Err(RegistrarError::CapacityExceeded(event_id));
        }

        let _ = event.registrations.insert(registrant_id, Utc::now());

        Ok(CountUpdate {
            event_id,
            current_count: count + 1,
        })
    }

    async fn cancel(&self, event_id: Uuid, registrant_id: Uuid) -> Result<CountUpdate, RegistrarError> {
        let mut events = self.events.lock().await;
        let event = events.get_mut(&event_id).ok_or(RegistrarError::NotFound(event_id))?;

        if event.registrations.remove(&registrant_id).is_none() {
            return Err(RegistrarError::RegistrationNotFound {
                event_id,
                registrant_id,
            });
        }

        Ok(CountUpdate {
            event_id,
            current_count: event.registrations.len() as i64,
        })
    }

    async fn snapshot(&self, event_id: Uuid) -> Result<CapacitySnapshot, RegistrarError> {
        let events = self.events.lock().await;
        let event = events.get(&event_id).ok_or(RegistrarError::NotFound(event_id))?;

        Ok(CapacitySnapshot {
            event_id,
            title: event.title.clone(),
            max_capacity: event.max_capacity,
            current_count: event.registrations.len() as i64,
        })
    }

    async fn snapshot_all(&self) -> Result<Vec<CapacitySnapshot>, RegistrarError> {
        let events = self.events.lock().await;

        let mut snapshots: Vec<CapacitySnapshot> = events
            .iter()
            .map(|(event_id, event)| CapacitySnapshot {
                event_id: *event_id,
                title: event.title.clone(),
                max_capacity: event.max_capacity,
                current_count: event.registrations.len() as i64,
            })
            .collect();

        // Same ordering the Postgres store applies.
        snapshots.sort_by(|a, b| a.title.cmp(&b.title).then(a.event_id.cmp(&b.event_id)));

        Ok(snapshots)
    }
}
