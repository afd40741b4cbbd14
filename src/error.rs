use uuid::Uuid;

/// Failure taxonomy of the registrar.
///
/// Every variant except [`Store`](RegistrarError::Store) is an expected, reportable
/// outcome of a well-formed request. Whatever the failure, the underlying transaction
/// has been fully rolled back and no count update has been published.
#[derive(Debug, thiserror::Error)]
pub enum RegistrarError {
    /// The referenced event does not exist.
    #[error("event {0} does not exist")]
    NotFound(Uuid),
    /// The event was full at the time of the serialized capacity check.
    #[error("event {0} is at capacity")]
    CapacityExceeded(Uuid),
    /// The registrant already holds a registration for this event.
    #[error("registrant {registrant_id} is already registered for event {event_id}")]
    AlreadyRegistered {
        /// The event the duplicate registration was attempted on.
        event_id: Uuid,
        /// The registrant that already holds a seat.
        registrant_id: Uuid,
    },
    /// No registration exists for this (event, registrant) pair.
    #[error("registrant {registrant_id} holds no registration for event {event_id}")]
    RegistrationNotFound {
        /// The event the cancellation was attempted on.
        event_id: Uuid,
        /// The registrant without a seat.
        registrant_id: Uuid,
    },
    /// Transient store failure (lock timeout, connection loss). The caller may retry
    /// the whole operation; it is never resumed mid-transaction.
    #[error("transient store failure: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for RegistrarError {
    fn from(error: sqlx::Error) -> Self {
        Self::Store(Box::new(error))
    }
}
