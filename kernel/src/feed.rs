use futures::stream::BoxStream;

use crate::entity::{Ride, User, UserId};
use crate::KernelError;

/// Which slice of the `rides` collection a live query follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RideScope {
    All,
    DrivenBy(UserId),
    JoinedBy(UserId),
}

impl RideScope {
    pub fn admits(&self, ride: &Ride) -> bool {
        match self {
            RideScope::All => true,
            RideScope::DrivenBy(driver_id) => ride.is_driven_by(driver_id),
            RideScope::JoinedBy(user_id) => ride.carries(user_id),
        }
    }
}

pub type RideSnapshots = BoxStream<'static, Vec<Ride>>;
pub type UserSnapshots = BoxStream<'static, Option<User>>;

/// Live query over rides: yields the full matching set once immediately,
/// then again after every committed change. Lazy and restartable; dropping
/// the stream cancels the subscription and releases its resources.
#[async_trait::async_trait]
pub trait RideFeed: 'static + Sync + Send {
    async fn watch(&self, scope: RideScope) -> error_stack::Result<RideSnapshots, KernelError>;
}

pub trait DependOnRideFeed: 'static + Sync + Send {
    type RideFeed: RideFeed;
    fn ride_feed(&self) -> &Self::RideFeed;
}

impl<T> DependOnRideFeed for T
where
    T: RideFeed,
{
    type RideFeed = T;
    fn ride_feed(&self) -> &Self::RideFeed {
        self
    }
}

/// Live query over a single user record, same delivery contract as
/// [`RideFeed`].
#[async_trait::async_trait]
pub trait UserFeed: 'static + Sync + Send {
    async fn watch_user(&self, id: &UserId)
        -> error_stack::Result<UserSnapshots, KernelError>;
}

pub trait DependOnUserFeed: 'static + Sync + Send {
    type UserFeed: UserFeed;
    fn user_feed(&self) -> &Self::UserFeed;
}

impl<T> DependOnUserFeed for T
where
    T: UserFeed,
{
    type UserFeed = T;
    fn user_feed(&self) -> &Self::UserFeed {
        self
    }
}
