use futures::future::join_all;
use uuid::Uuid;

use crate::bus::CountBus;
use crate::error::RegistrarError;
use crate::store::RegistrationStore;
use crate::types::{CapacitySnapshot, CountUpdate};

/// The `Registrar` couples a [`RegistrationStore`] with a set of [`CountBus`]es, so
/// that every committed registration change is pushed to live observers.
///
/// Both the store handle and the buses are injected at construction; the registrar
/// keeps no ambient state and caches no counts, so several instances (or processes)
/// can safely serve the same store — the store's own locking is the only arbiter.
///
/// The registrar performs no retries: a [`RegistrarError::Store`] failure is reported
/// to the caller, who may retry the whole operation.
pub struct Registrar<S> {
    store: S,
    buses: Vec<Box<dyn CountBus>>,
}

impl<S> Registrar<S>
where
    S: RegistrationStore,
{
    /// Creates a new instance of a [`Registrar`] with no buses attached.
    pub fn new(store: S) -> Self {
        Self { store, buses: vec![] }
    }

    /// Add a single count bus. Every committed update is published to every bus.
    #[must_use]
    pub fn add_bus(mut self, bus: impl CountBus + 'static) -> Self {
        self.buses.push(Box::new(bus));
        self
    }

    /// Set the count buses list.
    #[must_use]
    pub fn with_buses(mut self, buses: Vec<Box<dyn CountBus>>) -> Self {
        self.buses = buses;
        self
    }

    /// Registers `registrant_id` for `event_id`, then publishes the committed count on
    /// the event's topic.
    ///
    /// Not idempotent: a second call for the same pair fails with
    /// [`RegistrarError::AlreadyRegistered`]. The publish happens strictly after the
    /// store reports a successful commit; a failed transaction publishes nothing.
    ///
    /// # Errors
    ///
    /// See [`RegistrationStore::register`].
    #[tracing::instrument(skip_all, fields(event_id = %event_id, registrant_id = %registrant_id), err)]
    pub async fn register(&self, event_id: Uuid, registrant_id: Uuid) -> Result<CountUpdate, RegistrarError> {
        let update = self.store.register(event_id, registrant_id).await?;
        self.publish(&update).await;
        Ok(update)
    }

    /// Cancels the registration for (`event_id`, `registrant_id`), then publishes the
    /// recounted value on the event's topic.
    ///
    /// # Errors
    ///
    /// See [`RegistrationStore::cancel`].
    #[tracing::instrument(skip_all, fields(event_id = %event_id, registrant_id = %registrant_id), err)]
    pub async fn cancel(&self, event_id: Uuid, registrant_id: Uuid) -> Result<CountUpdate, RegistrarError> {
        let update = self.store.cancel(event_id, registrant_id).await?;
        self.publish(&update).await;
        Ok(update)
    }

    /// Consistent read of one event's capacity state, used to initialize observers
    /// before they trust incremental updates. Publishes nothing.
    ///
    /// # Errors
    ///
    /// See [`RegistrationStore::snapshot`].
    pub async fn snapshot(&self, event_id: Uuid) -> Result<CapacitySnapshot, RegistrarError> {
        self.store.snapshot(event_id).await
    }

    /// Consistent read of every event's capacity state. Publishes nothing.
    ///
    /// # Errors
    ///
    /// See [`RegistrationStore::snapshot_all`].
    pub async fn snapshot_all(&self) -> Result<Vec<CapacitySnapshot>, RegistrarError> {
        self.store.snapshot_all().await
    }

    /// Returns the internal registration store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fans a committed update out to every configured bus. Buses handle their own
    /// delivery errors; publication is best-effort.
    async fn publish(&self, update: &CountUpdate) {
        let futures: Vec<_> = self.buses.iter().map(|bus| bus.publish(update)).collect();
        let _ = join_all(futures).await;
    }
}
