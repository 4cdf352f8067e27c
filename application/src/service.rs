mod lifecycle;
mod ride;
mod seat;
mod user;
mod view;

pub use self::{lifecycle::*, ride::*, seat::*, user::*, view::*};

use error_stack::Report;
use kernel::{KernelError, RejectReason};

/// Upper bound on read-validate-commit rounds when conditional writes keep
/// losing to concurrent writers. Each lost round means another writer
/// committed, so the system as a whole is making progress.
pub(crate) const MAX_COMMIT_ATTEMPTS: usize = 8;

/// Bounded retries for idempotent reads hitting transient store trouble.
pub(crate) const MAX_READ_ATTEMPTS: usize = 3;

pub(crate) fn reject(reason: RejectReason) -> Report<KernelError> {
    Report::new(KernelError::Rejected(reason))
}

pub(crate) fn is_conflict(report: &Report<KernelError>) -> bool {
    matches!(report.current_context(), KernelError::Concurrency)
}

pub(crate) fn is_transient(report: &Report<KernelError>) -> bool {
    matches!(report.current_context(), KernelError::Timeout)
}

#[cfg(test)]
pub(crate) mod test_support {
    use driver::database::MemoryStore;
    use uuid::Uuid;

    use crate::service::{CreateRideService, CreateUserService, GetRideService};
    use crate::transfer::{CreateRideDto, CreateUserDto, GetRideDto, RideDto};

    pub(crate) async fn new_user(store: &MemoryStore, role: &str) -> Uuid {
        store
            .create_user(CreateUserDto {
                name: "someone".into(),
                email: "someone@example.com".into(),
                role: role.into(),
                hostel: None,
            })
            .await
            .unwrap()
    }

    pub(crate) async fn new_driver(store: &MemoryStore) -> Uuid {
        new_user(store, "driver").await
    }

    pub(crate) async fn new_passenger(store: &MemoryStore) -> Uuid {
        new_user(store, "passenger").await
    }

    pub(crate) async fn upcoming_ride(store: &MemoryStore, driver_id: Uuid, seats: i32) -> Uuid {
        store
            .create_ride(CreateRideDto {
                driver_id,
                origin: "Main Gate".into(),
                destination: "CBD".into(),
                date: "2040-01-15".into(),
                time: "08:30".into(),
                seats,
            })
            .await
            .unwrap()
    }

    pub(crate) async fn current_ride(store: &MemoryStore, id: Uuid) -> RideDto {
        store.get_ride(GetRideDto { id }).await.unwrap().unwrap()
    }
}
