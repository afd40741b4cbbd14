use std::ops::Deref;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RegistrarError;
use crate::types::{CapacitySnapshot, CountUpdate};

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

/// A `RegistrationStore` owns the canonical registration set and arbitrates every
/// mutation of it.
///
/// `register` and `cancel` must run with serializable effect on the target event: the
/// capacity check and the row change execute inside a single transaction, serialized
/// against any concurrent mutation of the same event by the store's own locking. Both
/// return only after a successful commit; on any error the transaction has been fully
/// rolled back. Since multiple registrar processes may share one store, no count may be
/// cached outside of it.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Atomically registers `registrant_id` for `event_id` and returns the committed
    /// count.
    ///
    /// # Errors
    ///
    /// [`NotFound`](RegistrarError::NotFound) if the event does not exist,
    /// [`AlreadyRegistered`](RegistrarError::AlreadyRegistered) if the pair already
    /// holds a registration, [`CapacityExceeded`](RegistrarError::CapacityExceeded) if
    /// the event is full at the time of the serialized check.
    async fn register(&self, event_id: Uuid, registrant_id: Uuid) -> Result<CountUpdate, RegistrarError>;

    /// Atomically deletes the registration for (`event_id`, `registrant_id`) and
    /// returns the recounted value.
    ///
    /// # Errors
    ///
    /// [`NotFound`](RegistrarError::NotFound) if the event does not exist,
    /// [`RegistrationNotFound`](RegistrarError::RegistrationNotFound) if the pair holds
    /// no registration.
    async fn cancel(&self, event_id: Uuid, registrant_id: Uuid) -> Result<CountUpdate, RegistrarError>;

    /// Consistent read of one event's capacity state. Takes no lock.
    ///
    /// # Errors
    ///
    /// [`NotFound`](RegistrarError::NotFound) if the event does not exist.
    async fn snapshot(&self, event_id: Uuid) -> Result<CapacitySnapshot, RegistrarError>;

    /// Consistent read of every event's capacity state, ordered by title.
    ///
    /// # Errors
    ///
    /// [`Store`](RegistrarError::Store) on a transient store failure.
    async fn snapshot_all(&self) -> Result<Vec<CapacitySnapshot>, RegistrarError>;
}

/// Blanket implementation making a [`RegistrationStore`] of every (smart) pointer to a
/// [`RegistrationStore`], e.g. `&Store`, `Box<Store>`, `Arc<Store>`.
#[async_trait]
impl<T, S> RegistrationStore for T
where
    S: RegistrationStore + ?Sized,
    T: Deref<Target = S> + Send + Sync,
{
    /// Deref call to [`RegistrationStore::register`].
    async fn register(&self, event_id: Uuid, registrant_id: Uuid) -> Result<CountUpdate, RegistrarError> {
        self.deref().register(event_id, registrant_id).await
    }

    /// Deref call to [`RegistrationStore::cancel`].
    async fn cancel(&self, event_id: Uuid, registrant_id: Uuid) -> Result<CountUpdate, RegistrarError> {
        self.deref().cancel(event_id, registrant_id).await
    }

    /// Deref call to [`RegistrationStore::snapshot`].
    async fn snapshot(&self, event_id: Uuid) -> Result<CapacitySnapshot, RegistrarError> {
        self.deref().snapshot(event_id).await
    }

    /// Deref call to [`RegistrationStore::snapshot_all`].
    async fn snapshot_all(&self) -> Result<Vec<CapacitySnapshot>, RegistrarError> {
        self.deref().snapshot_all().await
    }
}
