/// Precomputed statements used by [`super::PgRegistrationStore`]. Table names are
/// fixed, so the statements are plain included files.
#[derive(Clone, Debug)]
pub struct Statements {
    lock_event: &'static str,
    registration_exists: &'static str,
    count_registrations: &'static str,
    insert_registration: &'static str,
    delete_registration: &'static str,
    snapshot_by_event_id: &'static str,
    snapshot_all: &'static str,
}

impl Statements {
    pub fn new() -> Self {
        Self {
            lock_event: include_str!("statements/lock_event.sql"),
            registration_exists: include_str!("statements/registration_exists.sql"),
            count_registrations: include_str!("statements/count_registrations.sql"),
            insert_registration: include_str!("statements/insert_registration.sql"),
            delete_registration: include_str!("statements/delete_registration.sql"),
            snapshot_by_event_id: include_str!("statements/snapshot_by_event_id.sql"),
            snapshot_all: include_str!("statements/snapshot_all.sql"),
        }
    }

    pub fn lock_event(&self) -> &str {
        self.lock_event
    }

    pub fn registration_exists(&self) -> &str {
        self.registration_exists
    }

    pub fn count_registrations(&self) -> &str {
        self.count_registrations
    }

    pub fn insert_registration(&self) -> &str {
        self.insert_registration
    }

    pub fn delete_registration(&self) -> &str {
        self.delete_registration
    }

    pub fn snapshot_by_event_id(&self) -> &str {
        self.snapshot_by_event_id
    }

    pub fn snapshot_all(&self) -> &str {
        self.snapshot_all
    }
}
