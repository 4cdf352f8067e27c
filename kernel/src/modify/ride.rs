use crate::entity::Ride;
use crate::KernelError;

#[async_trait::async_trait]
pub trait RideModifier<Connection: Send>: 'static + Sync + Send {
    async fn create(
        &self,
        con: &mut Connection,
        ride: &Ride,
    ) -> error_stack::Result<(), KernelError>;

    /// Conditional write: commits only while the stored revision still
    /// equals `ride.version()`, and bumps the revision with the commit.
    /// Fails with [`KernelError::Concurrency`] when another writer got
    /// there first.
    async fn update(
        &self,
        con: &mut Connection,
        ride: &Ride,
    ) -> error_stack::Result<(), KernelError>;
}

pub trait DependOnRideModifier<Connection: Send>: 'static + Sync + Send {
    type RideModifier: RideModifier<Connection>;
    fn ride_modifier(&self) -> &Self::RideModifier;
}
