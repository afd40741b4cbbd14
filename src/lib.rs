//! Capacity-bounded event registration with live attendee-count broadcast.
//!
//! The [`Registrar`] applies registrations and cancellations against a shared capacity
//! limit, delegating all mutual exclusion to the transactional store behind the
//! [`store::RegistrationStore`] trait. Every successful commit fans a [`CountUpdate`]
//! out to the configured [`bus::CountBus`]es; a failed transaction publishes nothing.
//!
//! The crate ships two stores: `store::postgres::PgRegistrationStore` (behind the
//! default `postgres` feature), which serializes capacity checks with a
//! `SELECT ... FOR UPDATE` row lock, and [`store::memory::InMemoryStore`] for tests
//! and local development. [`bus::channel::ChannelBus`] provides in-process
//! topic-scoped fan-out.

mod error;
mod registrar;
mod types;

pub mod bus;
pub mod store;

pub use error::RegistrarError;
pub use registrar::Registrar;
pub use types::{CapacitySnapshot, CountUpdate};
