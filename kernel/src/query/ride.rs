use crate::entity::{Ride, RideId, UserId};
use crate::KernelError;

#[async_trait::async_trait]
pub trait RideQuery<Connection: Send>: Sync + Send + 'static {
    async fn find_by_id(
        &self,
        con: &mut Connection,
        id: &RideId,
    ) -> error_stack::Result<Option<Ride>, KernelError>;

    async fn find_all(&self, con: &mut Connection)
        -> error_stack::Result<Vec<Ride>, KernelError>;

    async fn find_by_driver(
        &self,
        con: &mut Connection,
        driver_id: &UserId,
    ) -> error_stack::Result<Vec<Ride>, KernelError>;

    async fn find_by_passenger(
        &self,
        con: &mut Connection,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Ride>, KernelError>;
}

pub trait DependOnRideQuery<Connection: Send>: Sync + Send + 'static {
    type RideQuery: RideQuery<Connection>;
    fn ride_query(&self) -> &Self::RideQuery;
}
