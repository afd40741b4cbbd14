use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

pub use builder::PgStoreBuilder;

use crate::error::RegistrarError;
use crate::store::RegistrationStore;
use crate::types::{CapacitySnapshot, CountUpdate};

use statements::Statements;

mod builder;
mod statements;

/// Default Postgres implementation of the [`RegistrationStore`]. Use this struct in
/// order to have registrations persisted on Postgres with the capacity invariant
/// enforced by the database itself.
///
/// Every `register`/`cancel` opens a transaction and takes a `SELECT ... FOR UPDATE`
/// lock on the target event row. The lock serializes all concurrent mutations of the
/// same event, so the in-transaction count can never race with another insert or
/// delete; this holds across processes, which is why no in-process guard exists beside
/// it. Dropping the transaction without committing (any error path) rolls it back.
///
/// The store is protected by an [`Arc`] that allows it to be cloneable still having
/// the same memory reference.
#[derive(Clone)]
pub struct PgRegistrationStore {
    inner: Arc<InnerPgStore>,
}

struct InnerPgStore {
    pool: PgPool,
    statements: Statements,
}

#[derive(sqlx::FromRow)]
struct EventRow {
    club_id: Uuid,
    max_capacity: i32,
}

/// Capacity snapshot representation on the store, converted into the public record
/// after fetching.
#[derive(sqlx::FromRow)]
struct SnapshotRow {
    event_id: Uuid,
    title: String,
    max_capacity: i32,
    current_count: i64,
}

impl From<SnapshotRow> for CapacitySnapshot {
    fn from(row: SnapshotRow) -> Self {
        Self {
            event_id: row.event_id,
            title: row.title,
            max_capacity: row.max_capacity,
            current_count: row.current_count,
        }
    }
}

impl PgRegistrationStore {
    pub(super) fn new(pool: PgPool) -> Self {
        Self {
            inner: Arc::new(InnerPgStore {
                pool,
                statements: Statements::new(),
            }),
        }
    }

    /// Acquires the exclusive row lock on the event, returning its capacity and owning
    /// club. Blocks until every earlier transaction holding the lock completes.
    async fn lock_event(
        &self,
        transaction: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
    ) -> Result<EventRow, RegistrarError> {
        sqlx::query_as::<_, EventRow>(self.inner.statements.lock_event())
            .bind(event_id)
            .fetch_optional(&mut **transaction)
            .await?
            .ok_or(RegistrarError::NotFound(event_id))
    }

    /// Counts the event's registrations as seen by the given transaction.
    async fn count_registrations(
        &self,
        transaction: &mut Transaction<'_, Postgres>,
        event_id: Uuid,
    ) -> Result<i64, RegistrarError> {
        let (count,): (i64,) = sqlx::query_as(self.inner.statements.count_registrations())
            .bind(event_id)
            .fetch_one(&mut **transaction)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl RegistrationStore for PgRegistrationStore {
    async fn register(&self, event_id: Uuid, registrant_id: Uuid) -> Result<CountUpdate, RegistrarError> {
        let mut transaction: Transaction<Postgres> = self.inner.pool.begin().await?;

        let event = self.lock_event(&mut transaction, event_id).await?;

        // Explicit pre-insert check, serialized by the row lock above. The unique
        // index on (event_id, registrant_id) remains in the schema as a backstop.
        let existing: Option<(Uuid,)> = sqlx::query_as(self.inner.statements.registration_exists())
            .bind(event_id)
            .bind(registrant_id)
            .fetch_optional(&mut *transaction)
            .await?;

        if existing.is_some() {
            return Err(RegistrarError::AlreadyRegistered {
                event_id,
                registrant_id,
            });
        }

        let count = self.count_registrations(&mut transaction, event_id).await?;
        if count >= i64::from(event.max_capacity) {
            return Err(RegistrarError::CapacityExceeded(event_id));
        }

        let _ = sqlx::query(self.inner.statements.insert_registration())
            .bind(Uuid::new_v4())
            .bind(event_id)
            .bind(registrant_id)
            .bind(event.club_id)
            .bind(Utc::now())
            .execute(&mut *transaction)
            .await?;

        transaction.commit().await?;

        Ok(CountUpdate {
            event_id,
            current_count: count + 1,
        })
    }

    async fn cancel(&self, event_id: Uuid, registrant_id: Uuid) -> Result<CountUpdate, RegistrarError> {
        let mut transaction: Transaction<Postgres> = self.inner.pool.begin().await?;

        // Same lock `register` takes, so cancellations never interleave with
        // registrations on this event.
        let _event = self.lock_event(&mut transaction, event_id).await?;

        let deleted = sqlx::query(self.inner.statements.delete_registration())
            .bind(event_id)
            .bind(registrant_id)
            .execute(&mut *transaction)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(RegistrarError::RegistrationNotFound {
                event_id,
                registrant_id,
            });
        }

        let count = self.count_registrations(&mut transaction, event_id).await?;

        transaction.commit().await?;

        Ok(CountUpdate {
            event_id,
            current_count: count,
        })
    }

    async fn snapshot(&self, event_id: Uuid) -> Result<CapacitySnapshot, RegistrarError> {
        sqlx::query_as::<_, SnapshotRow>(self.inner.statements.snapshot_by_event_id())
            .bind(event_id)
            .fetch_optional(&self.inner.pool)
            .await?
            .map(CapacitySnapshot::from)
            .ok_or(RegistrarError::NotFound(event_id))
    }

    async fn snapshot_all(&self) -> Result<Vec<CapacitySnapshot>, RegistrarError> {
        Ok(sqlx::query_as::<_, SnapshotRow>(self.inner.statements.snapshot_all())
            .fetch_all(&self.inner.pool)
            .await?
            .into_iter()
            .map(CapacitySnapshot::from)
            .collect())
    }
}

/// Debug implementation for [`PgRegistrationStore`]. It just shows the statements,
/// that are the only thing that might be useful to debug.
impl std::fmt::Debug for PgRegistrationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgRegistrationStore")
            .field("statements", &self.inner.statements)
            .finish()
    }
}
