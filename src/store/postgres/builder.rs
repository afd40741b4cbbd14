use sqlx::postgres::PgQueryResult;
use sqlx::{PgPool, Postgres, Transaction};

use crate::store::postgres::PgRegistrationStore;

/// Struct used to build a brand new [`PgRegistrationStore`].
pub struct PgStoreBuilder {
    pool: PgPool,
    run_migrations: bool,
}

impl PgStoreBuilder {
    /// Creates a new instance of a [`PgStoreBuilder`].
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            run_migrations: true,
        }
    }

    /// Calling this function the caller avoid running migrations. Use it when the
    /// schema is managed elsewhere; otherwise migrations should run at least once per
    /// store per startup.
    #[must_use]
    pub fn without_running_migrations(mut self) -> Self {
        self.run_migrations = false;
        self
    }

    /// This function runs all the needed migrations, atomically setting up the
    /// database if `run_migrations` isn't explicitly set to false.
    ///
    /// Eventually returns an instance of [`PgRegistrationStore`].
    ///
    /// # Errors
    ///
    /// Will return an `Err` if there's an error running the migrations.
    pub async fn try_build(self) -> Result<PgRegistrationStore, sqlx::Error> {
        if self.run_migrations {
            run_migrations(&self.pool).await?;
        }

        Ok(PgRegistrationStore::new(self.pool))
    }
}

async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut transaction: Transaction<Postgres> = pool.begin().await?;

    let migrations: [&str; 4] = [
        include_str!("migrations/01_create_events.sql"),
        include_str!("migrations/02_create_registrations.sql"),
        include_str!("migrations/03_create_unique_constraint.sql"),
        include_str!("migrations/04_create_index.sql"),
    ];

    for migration in migrations {
        let _: PgQueryResult = sqlx::query(migration).execute(&mut *transaction).await?;
    }

    transaction.commit().await
}
