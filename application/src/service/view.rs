use error_stack::{Report, ResultExt};
use futures::stream::BoxStream;
use futures::{future, stream, StreamExt};
use time::{OffsetDateTime, PrimitiveDateTime};

use kernel::interface::feed::{
    DependOnRideFeed, DependOnUserFeed, RideFeed, RideScope, RideSnapshots, UserFeed,
    UserSnapshots,
};
use kernel::prelude::entity::{Ride, RideDate, RideStatus, User, UserId, Viewer};
use kernel::KernelError;

use crate::transfer::{HistoryFilterDto, RideDto, WatchViewDto};

enum ViewUpdate {
    Rides(Vec<Ride>),
    Viewer(Option<User>),
}

/// Merge the two upstream feeds into one recomputed projection.
///
/// Every view recomputes whenever the rides collection or the viewer's own
/// record changes, always from the latest snapshot of each; dropping the
/// returned stream drops both subscriptions.
fn project<T, F>(
    rides: RideSnapshots,
    viewer: UserSnapshots,
    mut compute: F,
) -> BoxStream<'static, T>
where
    T: Send + 'static,
    F: FnMut(&[Ride], Option<&User>) -> T + Send + 'static,
{
    let rides = rides.map(ViewUpdate::Rides);
    let viewer = viewer.map(ViewUpdate::Viewer);
    stream::select(rides, viewer)
        .scan(
            (Vec::new(), None),
            move |state: &mut (Vec<Ride>, Option<User>), update| {
                match update {
                    ViewUpdate::Rides(snapshot) => state.0 = snapshot,
                    ViewUpdate::Viewer(snapshot) => state.1 = snapshot,
                }
                future::ready(Some(compute(&state.0, state.1.as_ref())))
            },
        )
        .boxed()
}

fn evaluation_time() -> PrimitiveDateTime {
    let now = OffsetDateTime::now_utc();
    PrimitiveDateTime::new(now.date(), now.time())
}

fn involves<'a>(rides: &'a [Ride], viewer_id: &'a UserId) -> impl Iterator<Item = &'a Ride> + 'a {
    rides
        .iter()
        .filter(move |ride| ride.is_driven_by(viewer_id) || ride.carries(viewer_id))
}

/// Soonest strictly-future departure among the viewer's rides; the ride ID
/// breaks ties so every client resolves the same winner.
fn next_departure(rides: &[Ride], viewer_id: &UserId, now: PrimitiveDateTime) -> Option<Ride> {
    involves(rides, viewer_id)
        .filter(|ride| ride.departs_at() > now)
        .min_by(|a, b| {
            a.departs_at()
                .cmp(&b.departs_at())
                .then_with(|| a.id().cmp(b.id()))
        })
        .cloned()
}

/// Drivers look at rides they posted, passengers at rides they joined.
fn role_rides<'a>(rides: &'a [Ride], viewer: &Viewer) -> Vec<&'a Ride> {
    match viewer {
        Viewer::Driver(id) => rides.iter().filter(|ride| ride.is_driven_by(id)).collect(),
        Viewer::Passenger(id) => rides.iter().filter(|ride| ride.carries(id)).collect(),
    }
}

#[async_trait::async_trait]
pub trait RideViewService: 'static + Sync + Send + DependOnRideFeed + DependOnUserFeed {
    async fn watch_next_ride(
        &self,
        dto: WatchViewDto,
    ) -> error_stack::Result<BoxStream<'static, Option<RideDto>>, KernelError> {
        let viewer_id = UserId::new(dto.user_id);
        let rides = self.ride_feed().watch(RideScope::All).await?;
        let viewer = self.user_feed().watch_user(&viewer_id).await?;
        Ok(project(rides, viewer, move |rides, _| {
            next_departure(rides, &viewer_id, evaluation_time()).map(RideDto::from)
        }))
    }

    async fn watch_upcoming(
        &self,
        dto: WatchViewDto,
    ) -> error_stack::Result<BoxStream<'static, Vec<RideDto>>, KernelError> {
        let viewer_id = UserId::new(dto.user_id);
        let rides = self.ride_feed().watch(RideScope::All).await?;
        let viewer = self.user_feed().watch_user(&viewer_id).await?;
        Ok(project(rides, viewer, |rides, viewer| {
            let Some(viewer) = viewer else {
                return Vec::new();
            };
            role_rides(rides, &Viewer::from(viewer))
                .into_iter()
                .filter(|ride| *ride.status() == RideStatus::Upcoming)
                .cloned()
                .map(RideDto::from)
                .collect()
        }))
    }

    async fn watch_history(
        &self,
        dto: HistoryFilterDto,
    ) -> error_stack::Result<BoxStream<'static, Vec<RideDto>>, KernelError> {
        let status = dto
            .status
            .map(|status| status.parse::<RideStatus>())
            .transpose()
            .map_err(|()| Report::new(KernelError::Validation))?;
        let date = dto
            .date
            .map(|date| RideDate::parse(&date))
            .transpose()
            .change_context(KernelError::Validation)?;

        let viewer_id = UserId::new(dto.user_id);
        let rides = self.ride_feed().watch(RideScope::All).await?;
        let viewer = self.user_feed().watch_user(&viewer_id).await?;
        Ok(project(rides, viewer, move |rides, viewer| {
            let Some(viewer) = viewer else {
                return Vec::new();
            };
            role_rides(rides, &Viewer::from(viewer))
                .into_iter()
                .filter(|ride| status.map_or(true, |wanted| *ride.status() == wanted))
                .filter(|ride| date.map_or(true, |wanted| *ride.date() == wanted))
                .cloned()
                .map(RideDto::from)
                .collect()
        }))
    }

    /// Rides the viewer could still ask to join: everything they are not
    /// already aboard. The viewer's record still drives recomputation;
    /// role and pointer changes flip what the client may act on.
    async fn watch_open_rides(
        &self,
        dto: WatchViewDto,
    ) -> error_stack::Result<BoxStream<'static, Vec<RideDto>>, KernelError> {
        let viewer_id = UserId::new(dto.user_id);
        let rides = self.ride_feed().watch(RideScope::All).await?;
        let viewer = self.user_feed().watch_user(&viewer_id).await?;
        Ok(project(rides, viewer, move |rides, _| {
            rides
                .iter()
                .filter(|ride| !ride.carries(&viewer_id))
                .cloned()
                .map(RideDto::from)
                .collect()
        }))
    }
}

impl<T> RideViewService for T where T: DependOnRideFeed + DependOnUserFeed {}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use driver::database::MemoryStore;
    use futures::stream::BoxStream;
    use futures::StreamExt;
    use time::macros::datetime;
    use uuid::Uuid;

    use kernel::prelude::entity::{
        Destination, DocumentVersion, Origin, Ride, RideDate, RideId, RideRatings, RideStatus,
        RideTime, SeatCount, UserId,
    };

    use super::next_departure;
    use crate::service::test_support::{new_driver, new_passenger, upcoming_ride};
    use crate::service::{JoinRideService, RideStatusService, RideViewService};
    use crate::transfer::{HistoryFilterDto, JoinRideDto, SetRideStatusDto, WatchViewDto};

    fn scheduled(id: u128, driver: &UserId, passengers: Vec<UserId>, departs: &str) -> Ride {
        let (date, time) = departs.split_once(' ').unwrap();
        Ride::new(
            RideId::new(Uuid::from_u128(id)),
            driver.clone(),
            Origin::new("Main Gate"),
            Destination::new("CBD"),
            RideDate::parse(date).unwrap(),
            RideTime::parse(time).unwrap(),
            SeatCount::new(3),
            passengers,
            RideStatus::Upcoming,
            RideRatings::default(),
            DocumentVersion::initial(),
        )
    }

    #[test]
    fn next_departure_picks_the_soonest_future_ride() {
        let driver = UserId::new(Uuid::new_v4());
        let other = UserId::new(Uuid::new_v4());
        let rides = vec![
            scheduled(1, &driver, Vec::new(), "2024-05-01 08:00"),
            scheduled(2, &driver, Vec::new(), "2024-05-03 09:00"),
            scheduled(3, &driver, Vec::new(), "2024-05-02 10:00"),
            scheduled(4, &other, Vec::new(), "2024-05-02 08:00"),
        ];

        let now = datetime!(2024 - 05 - 01 12:00);
        let next = next_departure(&rides, &driver, now).unwrap();
        assert_eq!(next.id(), &RideId::new(Uuid::from_u128(3)));
    }

    #[test]
    fn next_departure_breaks_ties_by_ride_id() {
        let driver = UserId::new(Uuid::new_v4());
        let rides = vec![
            scheduled(7, &driver, Vec::new(), "2024-05-02 08:00"),
            scheduled(2, &driver, Vec::new(), "2024-05-02 08:00"),
        ];

        let now = datetime!(2024 - 05 - 01 12:00);
        let next = next_departure(&rides, &driver, now).unwrap();
        assert_eq!(next.id(), &RideId::new(Uuid::from_u128(2)));
    }

    #[test]
    fn next_departure_ignores_past_and_foreign_rides() {
        let driver = UserId::new(Uuid::new_v4());
        let passenger = UserId::new(Uuid::new_v4());
        let rides = vec![
            scheduled(1, &driver, Vec::new(), "2024-04-30 08:00"),
            scheduled(2, &driver, vec![passenger.clone()], "2024-05-02 08:00"),
        ];

        let now = datetime!(2024 - 05 - 01 12:00);
        assert!(next_departure(&rides, &driver, now).is_some());
        assert!(next_departure(&rides, &passenger, now).is_some());
        let stranger = UserId::new(Uuid::new_v4());
        assert!(next_departure(&rides, &stranger, now).is_none());
    }

    async fn snapshot_matching<T, F>(stream: &mut BoxStream<'static, T>, mut accept: F) -> T
    where
        F: FnMut(&T) -> bool,
    {
        for _ in 0..10 {
            let item = tokio::time::timeout(Duration::from_secs(5), stream.next())
                .await
                .expect("snapshot did not arrive in time")
                .expect("feed ended unexpectedly");
            if accept(&item) {
                return item;
            }
        }
        panic!("expected snapshot never arrived");
    }

    #[tokio::test]
    async fn open_rides_exclude_what_the_viewer_already_joined() {
        let store = MemoryStore::new();
        let driver = new_driver(&store).await;
        let first = upcoming_ride(&store, driver, 2).await;
        let second = upcoming_ride(&store, driver, 2).await;
        let passenger = new_passenger(&store).await;

        let mut open = store
            .watch_open_rides(WatchViewDto { user_id: passenger })
            .await
            .unwrap();
        snapshot_matching(&mut open, |rides| rides.len() == 2).await;

        store
            .join_ride(JoinRideDto {
                user_id: passenger,
                ride_id: first,
            })
            .await
            .unwrap();

        let after = snapshot_matching(&mut open, |rides| rides.len() == 1).await;
        assert_eq!(after[0].id, second);
    }

    #[tokio::test]
    async fn upcoming_view_follows_the_ride_lifecycle() {
        let store = MemoryStore::new();
        let driver = new_driver(&store).await;
        let first = upcoming_ride(&store, driver, 2).await;
        let second = upcoming_ride(&store, driver, 2).await;

        let mut upcoming = store
            .watch_upcoming(WatchViewDto { user_id: driver })
            .await
            .unwrap();
        snapshot_matching(&mut upcoming, |rides| rides.len() == 2).await;

        store
            .set_status(SetRideStatusDto {
                actor_id: driver,
                ride_id: first,
                status: "completed".into(),
            })
            .await
            .unwrap();

        let after = snapshot_matching(&mut upcoming, |rides| rides.len() == 1).await;
        assert_eq!(after[0].id, second);
    }

    #[tokio::test]
    async fn history_applies_status_and_date_filters() {
        let store = MemoryStore::new();
        let driver = new_driver(&store).await;
        let completed = upcoming_ride(&store, driver, 2).await;
        let _open = upcoming_ride(&store, driver, 2).await;
        store
            .set_status(SetRideStatusDto {
                actor_id: driver,
                ride_id: completed,
                status: "completed".into(),
            })
            .await
            .unwrap();

        let mut history = store
            .watch_history(HistoryFilterDto {
                user_id: driver,
                status: Some("completed".into()),
                date: Some("2040-01-15".into()),
            })
            .await
            .unwrap();
        let snapshot = snapshot_matching(&mut history, |rides| rides.len() == 1).await;
        assert_eq!(snapshot[0].id, completed);
        assert_eq!(snapshot[0].status, "completed");
    }

    #[tokio::test]
    async fn next_ride_view_tracks_memberships() {
        let store = MemoryStore::new();
        let driver = new_driver(&store).await;
        let ride_id = upcoming_ride(&store, driver, 2).await;
        let passenger = new_passenger(&store).await;

        let mut next = store
            .watch_next_ride(WatchViewDto { user_id: passenger })
            .await
            .unwrap();
        snapshot_matching(&mut next, Option::is_none).await;

        store
            .join_ride(JoinRideDto {
                user_id: passenger,
                ride_id,
            })
            .await
            .unwrap();
        let joined = snapshot_matching(&mut next, Option::is_some).await;
        assert_eq!(joined.unwrap().id, ride_id);
    }
}
