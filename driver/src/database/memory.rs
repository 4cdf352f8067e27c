use std::collections::HashMap;
use std::sync::Arc;

use error_stack::Report;
use tokio::sync::RwLock;

use kernel::interface::feed::{RideFeed, RideScope, RideSnapshots, UserFeed, UserSnapshots};
use kernel::interface::query::{
    DependOnRideQuery, DependOnUserQuery, RideQuery, UserQuery,
};
use kernel::interface::store::RecordStore;
use kernel::interface::update::{
    DependOnRideModifier, DependOnUserModifier, RideModifier, UserModifier,
};
use kernel::prelude::entity::{Ride, RideId, User, UserId};
use kernel::KernelError;

use crate::database::feed::{snapshots, ChangeSignal};

/// In-memory rendition of the record store: versioned documents,
/// conditional writes and live queries with the same semantics as the
/// replicated backend, minus the network. Backs the test suites and local
/// development.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Collections>,
}

#[derive(Default)]
struct Collections {
    users: RwLock<HashMap<UserId, User>>,
    rides: RwLock<HashMap<RideId, Ride>>,
    changes: ChangeSignal,
}

pub struct MemoryConnection {
    inner: Arc<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RecordStore<MemoryConnection> for MemoryStore {
    async fn open(&self) -> error_stack::Result<MemoryConnection, KernelError> {
        Ok(MemoryConnection {
            inner: Arc::clone(&self.inner),
        })
    }
}

impl DependOnRideQuery<MemoryConnection> for MemoryStore {
    type RideQuery = MemoryRideRepository;
    fn ride_query(&self) -> &MemoryRideRepository {
        &MemoryRideRepository
    }
}

impl DependOnRideModifier<MemoryConnection> for MemoryStore {
    type RideModifier = MemoryRideRepository;
    fn ride_modifier(&self) -> &MemoryRideRepository {
        &MemoryRideRepository
    }
}

impl DependOnUserQuery<MemoryConnection> for MemoryStore {
    type UserQuery = MemoryUserRepository;
    fn user_query(&self) -> &MemoryUserRepository {
        &MemoryUserRepository
    }
}

impl DependOnUserModifier<MemoryConnection> for MemoryStore {
    type UserModifier = MemoryUserRepository;
    fn user_modifier(&self) -> &MemoryUserRepository {
        &MemoryUserRepository
    }
}

fn ordered(mut rides: Vec<Ride>) -> Vec<Ride> {
    rides.sort_by(|a, b| {
        a.departs_at()
            .cmp(&b.departs_at())
            .then_with(|| a.id().cmp(b.id()))
    });
    rides
}

pub struct MemoryRideRepository;

#[async_trait::async_trait]
impl RideQuery<MemoryConnection> for MemoryRideRepository {
    async fn find_by_id(
        &self,
        con: &mut MemoryConnection,
        id: &RideId,
    ) -> error_stack::Result<Option<Ride>, KernelError> {
        let rides = con.inner.rides.read().await;
        Ok(rides.get(id).cloned())
    }

    async fn find_all(
        &self,
        con: &mut MemoryConnection,
    ) -> error_stack::Result<Vec<Ride>, KernelError> {
        let rides = con.inner.rides.read().await;
        Ok(ordered(rides.values().cloned().collect()))
    }

    async fn find_by_driver(
        &self,
        con: &mut MemoryConnection,
        driver_id: &UserId,
    ) -> error_stack::Result<Vec<Ride>, KernelError> {
        let rides = con.inner.rides.read().await;
        Ok(ordered(
            rides
                .values()
                .filter(|ride| ride.is_driven_by(driver_id))
                .cloned()
                .collect(),
        ))
    }

    async fn find_by_passenger(
        &self,
        con: &mut MemoryConnection,
        user_id: &UserId,
    ) -> error_stack::Result<Vec<Ride>, KernelError> {
        let rides = con.inner.rides.read().await;
        Ok(ordered(
            rides
                .values()
                .filter(|ride| ride.carries(user_id))
                .cloned()
                .collect(),
        ))
    }
}

#[async_trait::async_trait]
impl RideModifier<MemoryConnection> for MemoryRideRepository {
    async fn create(
        &self,
        con: &mut MemoryConnection,
        ride: &Ride,
    ) -> error_stack::Result<(), KernelError> {
        let mut rides = con.inner.rides.write().await;
        if rides.contains_key(ride.id()) {
            return Err(Report::new(KernelError::Concurrency)
                .attach_printable("ride id already taken"));
        }
        rides.insert(ride.id().clone(), ride.clone());
        drop(rides);
        con.inner.changes.mark();
        Ok(())
    }

    async fn update(
        &self,
        con: &mut MemoryConnection,
        ride: &Ride,
    ) -> error_stack::Result<(), KernelError> {
        let mut rides = con.inner.rides.write().await;
        let stored = rides
            .get(ride.id())
            .ok_or_else(|| Report::new(KernelError::NotFound))?;
        if stored.version() != ride.version() {
            return Err(Report::new(KernelError::Concurrency));
        }
        let mut committed = ride.clone();
        committed.substitute(|ride| *ride.version = ride.version.next());
        rides.insert(committed.id().clone(), committed);
        drop(rides);
        con.inner.changes.mark();
        Ok(())
    }
}

pub struct MemoryUserRepository;

#[async_trait::async_trait]
impl UserQuery<MemoryConnection> for MemoryUserRepository {
    async fn find_by_id(
        &self,
        con: &mut MemoryConnection,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError> {
        let users = con.inner.users.read().await;
        Ok(users.get(id).cloned())
    }
}

#[async_trait::async_trait]
impl UserModifier<MemoryConnection> for MemoryUserRepository {
    async fn create(
        &self,
        con: &mut MemoryConnection,
        user: &User,
    ) -> error_stack::Result<(), KernelError> {
        let mut users = con.inner.users.write().await;
        if users.contains_key(user.id()) {
            return Err(Report::new(KernelError::Concurrency)
                .attach_printable("user id already taken"));
        }
        users.insert(user.id().clone(), user.clone());
        drop(users);
        con.inner.changes.mark();
        Ok(())
    }

    async fn update(
        &self,
        con: &mut MemoryConnection,
        user: &User,
    ) -> error_stack::Result<(), KernelError> {
        let mut users = con.inner.users.write().await;
        let stored = users
            .get(user.id())
            .ok_or_else(|| Report::new(KernelError::NotFound))?;
        if stored.version() != user.version() {
            return Err(Report::new(KernelError::Concurrency));
        }
        let mut committed = user.clone();
        committed.substitute(|user| *user.version = user.version.next());
        users.insert(committed.id().clone(), committed);
        drop(users);
        con.inner.changes.mark();
        Ok(())
    }
}

#[async_trait::async_trait]
impl RideFeed for MemoryStore {
    async fn watch(&self, scope: RideScope) -> error_stack::Result<RideSnapshots, KernelError> {
        let inner = Arc::clone(&self.inner);
        let stream = snapshots(self.inner.changes.follow(), move || {
            let inner = Arc::clone(&inner);
            let scope = scope.clone();
            async move {
                let rides = inner.rides.read().await;
                let matched = rides
                    .values()
                    .filter(|ride| scope.admits(ride))
                    .cloned()
                    .collect();
                Some(ordered(matched))
            }
        });
        Ok(stream)
    }
}

#[async_trait::async_trait]
impl UserFeed for MemoryStore {
    async fn watch_user(
        &self,
        id: &UserId,
    ) -> error_stack::Result<UserSnapshots, KernelError> {
        let inner = Arc::clone(&self.inner);
        let id = id.clone();
        let stream = snapshots(self.inner.changes.follow(), move || {
            let inner = Arc::clone(&inner);
            let id = id.clone();
            async move {
                let users = inner.users.read().await;
                Some(users.get(&id).cloned())
            }
        });
        Ok(stream)
    }
}

#[cfg(test)]
mod test {
    use futures::StreamExt;
    use time::macros::{date, time};
    use uuid::Uuid;

    use kernel::interface::feed::{RideFeed, RideScope, UserFeed};
    use kernel::interface::query::{DependOnRideQuery, RideQuery};
    use kernel::interface::store::RecordStore;
    use kernel::interface::update::{
        DependOnRideModifier, DependOnUserModifier, RideModifier, UserModifier,
    };
    use kernel::prelude::entity::{
        Destination, DocumentVersion, Hostel, Origin, Ride, RideDate, RideId, RideRatings,
        RideStatus, RideTime, SeatCount, User, UserEmail, UserId, UserName, UserRole,
    };
    use kernel::KernelError;

    use super::MemoryStore;

    fn ride(driver_id: UserId, passengers: Vec<UserId>) -> Ride {
        Ride::new(
            RideId::new(Uuid::new_v4()),
            driver_id,
            Origin::new("Main Gate"),
            Destination::new("CBD"),
            RideDate::new(date!(2024 - 06 - 01)),
            RideTime::new(time!(17:30)),
            SeatCount::new(3),
            passengers,
            RideStatus::Upcoming,
            RideRatings::default(),
            DocumentVersion::initial(),
        )
    }

    fn user(role: UserRole) -> User {
        User::new(
            UserId::new(Uuid::new_v4()),
            UserName::new("name"),
            UserEmail::new("name@example.com"),
            role,
            Some(Hostel::new("North")),
            None,
            DocumentVersion::initial(),
        )
    }

    #[tokio::test]
    async fn conditional_update_refuses_stale_revision() -> error_stack::Result<(), KernelError> {
        let store = MemoryStore::new();
        let mut con = store.open().await?;

        let ride = ride(UserId::new(Uuid::new_v4()), Vec::new());
        store.ride_modifier().create(&mut con, &ride).await?;

        let stale = ride.clone();
        store.ride_modifier().update(&mut con, &ride).await?;

        let refused = store.ride_modifier().update(&mut con, &stale).await;
        assert!(matches!(
            refused.unwrap_err().current_context(),
            KernelError::Concurrency
        ));
        Ok(())
    }

    #[tokio::test]
    async fn feeds_redeliver_after_each_commit() -> error_stack::Result<(), KernelError> {
        let store = MemoryStore::new();
        let mut con = store.open().await?;

        let mut all = store.watch(RideScope::All).await?;
        assert_eq!(all.next().await, Some(Vec::new()));

        let ride = ride(UserId::new(Uuid::new_v4()), Vec::new());
        store.ride_modifier().create(&mut con, &ride).await?;
        assert_eq!(all.next().await, Some(vec![ride]));
        Ok(())
    }

    #[tokio::test]
    async fn ride_feed_applies_its_scope() -> error_stack::Result<(), KernelError> {
        let store = MemoryStore::new();
        let mut con = store.open().await?;

        let driver = UserId::new(Uuid::new_v4());
        let passenger = UserId::new(Uuid::new_v4());
        let driven = ride(driver.clone(), Vec::new());
        let joined = ride(UserId::new(Uuid::new_v4()), vec![passenger.clone()]);
        store.ride_modifier().create(&mut con, &driven).await?;
        store.ride_modifier().create(&mut con, &joined).await?;

        let mut driven_feed = store.watch(RideScope::DrivenBy(driver)).await?;
        assert_eq!(driven_feed.next().await, Some(vec![driven]));

        let mut joined_feed = store.watch(RideScope::JoinedBy(passenger)).await?;
        assert_eq!(joined_feed.next().await, Some(vec![joined]));
        Ok(())
    }

    #[tokio::test]
    async fn user_feed_tracks_a_single_record() -> error_stack::Result<(), KernelError> {
        let store = MemoryStore::new();
        let mut con = store.open().await?;

        let user = user(UserRole::Passenger);
        let mut feed = store.watch_user(user.id()).await?;
        assert_eq!(feed.next().await, Some(None));

        store.user_modifier().create(&mut con, &user).await?;
        assert_eq!(feed.next().await, Some(Some(user)));
        Ok(())
    }

    #[tokio::test]
    async fn queries_see_committed_membership() -> error_stack::Result<(), KernelError> {
        let store = MemoryStore::new();
        let mut con = store.open().await?;

        let passenger = UserId::new(Uuid::new_v4());
        let ride = ride(UserId::new(Uuid::new_v4()), vec![passenger.clone()]);
        store.ride_modifier().create(&mut con, &ride).await?;

        let found = store
            .ride_query()
            .find_by_passenger(&mut con, &passenger)
            .await?;
        assert_eq!(found, vec![ride]);
        Ok(())
    }
}
