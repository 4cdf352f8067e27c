use error_stack::Report;

use kernel::interface::query::{DependOnRideQuery, DependOnUserQuery, RideQuery, UserQuery};
use kernel::interface::store::{DependOnRecordStore, RecordStore};
use kernel::interface::update::{
    DependOnRideModifier, DependOnUserModifier, RideModifier, UserModifier,
};
use kernel::prelude::entity::{RideId, User, UserId, Viewer};
use kernel::{KernelError, RejectReason};

use crate::service::{is_conflict, reject, MAX_COMMIT_ATTEMPTS};
use crate::transfer::{JoinRideDto, LeaveRideDto};

/// Seat a passenger on a ride.
///
/// The ride document is the source of truth for membership and is only
/// ever written conditionally: validation happens against the state a read
/// observed, the write commits only if that state is still current, and a
/// lost race re-reads and re-validates. The user's `joined_ride` pointer
/// is a secondary document: committed after the seat, compensated when
/// the single-active-ride race is lost, and reconciled when found stale.
#[async_trait::async_trait]
pub trait JoinRideService<Connection: Send>:
    'static
    + Sync
    + Send
    + DependOnRecordStore<Connection>
    + DependOnRideQuery<Connection>
    + DependOnRideModifier<Connection>
    + DependOnUserQuery<Connection>
    + DependOnUserModifier<Connection>
{
    async fn join_ride(&self, dto: JoinRideDto) -> error_stack::Result<(), KernelError> {
        let mut con = self.record_store().open().await?;
        let user_id = UserId::new(dto.user_id);
        let ride_id = RideId::new(dto.ride_id);

        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let user = self
                .user_query()
                .find_by_id(&mut con, &user_id)
                .await?
                .ok_or_else(|| Report::new(KernelError::NotFound))?;
            if Viewer::from(&user).is_driver() {
                return Err(reject(RejectReason::NotAuthorized));
            }
            let user = effective_user(self, &mut con, user).await?;
            if user.joined_ride().is_some() {
                return Err(reject(RejectReason::AlreadyInRide));
            }

            // rides not on record are not joinable, same as terminal ones
            let ride = self
                .ride_query()
                .find_by_id(&mut con, &ride_id)
                .await?
                .ok_or_else(|| reject(RejectReason::RideNotJoinable))?;
            let admitted = ride.admit(&user_id).map_err(reject)?;
            match self.ride_modifier().update(&mut con, &admitted).await {
                Ok(()) => return commit_pointer(self, &mut con, &user_id, &ride_id).await,
                Err(report) if is_conflict(&report) => continue,
                Err(report) => return Err(report),
            }
        }
        Err(Report::new(KernelError::Concurrency))
    }
}

impl<Connection: Send, T> JoinRideService<Connection> for T where
    T: DependOnRecordStore<Connection>
        + DependOnRideQuery<Connection>
        + DependOnRideModifier<Connection>
        + DependOnUserQuery<Connection>
        + DependOnUserModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait LeaveRideService<Connection: Send>:
    'static
    + Sync
    + Send
    + DependOnRecordStore<Connection>
    + DependOnRideQuery<Connection>
    + DependOnRideModifier<Connection>
    + DependOnUserQuery<Connection>
    + DependOnUserModifier<Connection>
{
    async fn leave_ride(&self, dto: LeaveRideDto) -> error_stack::Result<(), KernelError> {
        let mut con = self.record_store().open().await?;
        let user_id = UserId::new(dto.user_id);
        let ride_id = RideId::new(dto.ride_id);

        let mut attempts = 0;
        loop {
            let ride = self
                .ride_query()
                .find_by_id(&mut con, &ride_id)
                .await?
                .ok_or_else(|| Report::new(KernelError::NotFound))?;
            let released = ride.release(&user_id).map_err(reject)?;
            match self.ride_modifier().update(&mut con, &released).await {
                Ok(()) => break,
                Err(report) if is_conflict(&report) && attempts + 1 < MAX_COMMIT_ATTEMPTS => {
                    attempts += 1;
                }
                Err(report) => return Err(report),
            }
        }

        clear_pointer(self, &mut con, &user_id, &ride_id).await
    }
}

impl<Connection: Send, T> LeaveRideService<Connection> for T where
    T: DependOnRecordStore<Connection>
        + DependOnRideQuery<Connection>
        + DependOnRideModifier<Connection>
        + DependOnUserQuery<Connection>
        + DependOnUserModifier<Connection>
{
}

/// Resolve the user's effective active ride.
///
/// The pointer is reconciled state: when it names a ride that is missing,
/// terminal, or no longer carries the user, it is repaired here instead of
/// blocking a fresh join.
async fn effective_user<Connection, T>(
    service: &T,
    con: &mut Connection,
    user: User,
) -> error_stack::Result<User, KernelError>
where
    Connection: Send,
    T: ?Sized
        + DependOnRideQuery<Connection>
        + DependOnUserQuery<Connection>
        + DependOnUserModifier<Connection>,
{
    let mut user = user;
    for _ in 0..MAX_COMMIT_ATTEMPTS {
        let Some(pointer) = user.joined_ride().clone() else {
            return Ok(user);
        };
        let pointed = service.ride_query().find_by_id(con, &pointer).await?;
        let stale = match &pointed {
            Some(ride) => ride.status().is_terminal() || !ride.carries(user.id()),
            None => true,
        };
        if !stale {
            return Ok(user);
        }

        tracing::debug!(user = %user.id().as_ref(), "clearing stale ride pointer");
        let cleared = user.withdraw();
        match service.user_modifier().update(con, &cleared).await {
            Ok(()) => {}
            Err(report) if is_conflict(&report) => {}
            Err(report) => return Err(report),
        }
        user = service
            .user_query()
            .find_by_id(con, cleared.id())
            .await?
            .ok_or_else(|| Report::new(KernelError::NotFound))?;
    }
    Err(Report::new(KernelError::Concurrency))
}

/// Commit the secondary `joined_ride` pointer after a seat was taken.
///
/// Losing here means another join of the same user committed first; the
/// seat taken above is handed back so the single-active-ride property
/// holds across both documents.
async fn commit_pointer<Connection, T>(
    service: &T,
    con: &mut Connection,
    user_id: &UserId,
    ride_id: &RideId,
) -> error_stack::Result<(), KernelError>
where
    Connection: Send,
    T: ?Sized
        + DependOnRideQuery<Connection>
        + DependOnRideModifier<Connection>
        + DependOnUserQuery<Connection>
        + DependOnUserModifier<Connection>,
{
    for _ in 0..MAX_COMMIT_ATTEMPTS {
        let Some(user) = service.user_query().find_by_id(con, user_id).await? else {
            release_seat(service, con, ride_id, user_id).await;
            return Err(Report::new(KernelError::NotFound));
        };
        match user.commit_to(ride_id) {
            Ok(pointed) => match service.user_modifier().update(con, &pointed).await {
                Ok(()) => return Ok(()),
                Err(report) if is_conflict(&report) => continue,
                Err(report) => {
                    release_seat(service, con, ride_id, user_id).await;
                    return Err(report);
                }
            },
            Err(_) => {
                if user.joined_ride().as_ref() == Some(ride_id) {
                    return Ok(());
                }
                release_seat(service, con, ride_id, user_id).await;
                return Err(reject(RejectReason::AlreadyInRide));
            }
        }
    }
    release_seat(service, con, ride_id, user_id).await;
    Err(Report::new(KernelError::Concurrency))
}

/// Hand a seat back after the pointer commit failed. Best effort: on give
/// up, membership is left to the next reconciliation pass.
async fn release_seat<Connection, T>(
    service: &T,
    con: &mut Connection,
    ride_id: &RideId,
    user_id: &UserId,
) where
    Connection: Send,
    T: ?Sized + DependOnRideQuery<Connection> + DependOnRideModifier<Connection>,
{
    for _ in 0..MAX_COMMIT_ATTEMPTS {
        let ride = match service.ride_query().find_by_id(con, ride_id).await {
            Ok(Some(ride)) => ride,
            Ok(None) => return,
            Err(_) => break,
        };
        let released = match ride.release(user_id) {
            Ok(released) => released,
            Err(_) => return,
        };
        match service.ride_modifier().update(con, &released).await {
            Ok(()) => return,
            Err(report) if is_conflict(&report) => continue,
            Err(_) => break,
        }
    }
    tracing::warn!(
        ride = %ride_id.as_ref(),
        user = %user_id.as_ref(),
        "seat admission could not be rolled back"
    );
}

/// Clear the pointer after leaving, but only while it still names the ride
/// that was left.
async fn clear_pointer<Connection, T>(
    service: &T,
    con: &mut Connection,
    user_id: &UserId,
    ride_id: &RideId,
) -> error_stack::Result<(), KernelError>
where
    Connection: Send,
    T: ?Sized + DependOnUserQuery<Connection> + DependOnUserModifier<Connection>,
{
    for _ in 0..MAX_COMMIT_ATTEMPTS {
        let Some(user) = service.user_query().find_by_id(con, user_id).await? else {
            return Ok(());
        };
        if user.joined_ride().as_ref() != Some(ride_id) {
            return Ok(());
        }
        let cleared = user.withdraw();
        match service.user_modifier().update(con, &cleared).await {
            Ok(()) => return Ok(()),
            Err(report) if is_conflict(&report) => continue,
            Err(report) => return Err(report),
        }
    }
    tracing::warn!(
        user = %user_id.as_ref(),
        "ride pointer left behind after leave; next read reconciles it"
    );
    Ok(())
}

#[cfg(test)]
mod test {
    use driver::database::MemoryStore;
    use rand::Rng;

    use kernel::{KernelError, RejectReason};

    use crate::service::test_support::{current_ride, new_driver, new_passenger, upcoming_ride};
    use crate::service::{GetUserService, JoinRideService, LeaveRideService, RideStatusService};
    use crate::transfer::{GetUserDto, JoinRideDto, LeaveRideDto, SetRideStatusDto};

    fn is_rejected(
        result: &error_stack::Result<(), KernelError>,
        expected: RejectReason,
    ) -> bool {
        matches!(
            result.as_ref().map_err(|report| report.current_context()),
            Err(KernelError::Rejected(reason)) if *reason == expected
        )
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_joins_fill_exactly_the_capacity() {
        let store = MemoryStore::new();
        let driver = new_driver(&store).await;
        let seats = rand::thread_rng().gen_range(1..=4);
        let ride_id = upcoming_ride(&store, driver, seats).await;

        let mut handles = Vec::new();
        for _ in 0..seats + 2 {
            let passenger = new_passenger(&store).await;
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .join_ride(JoinRideDto {
                        user_id: passenger,
                        ride_id,
                    })
                    .await
            }));
        }

        let mut admitted = 0;
        let mut refused = 0;
        for handle in handles {
            let result = handle.await.unwrap();
            if result.is_ok() {
                admitted += 1;
            } else {
                assert!(is_rejected(&result, RejectReason::RideFull));
                refused += 1;
            }
        }
        assert_eq!(admitted, seats);
        assert_eq!(refused, 2);

        let ride = current_ride(&store, ride_id).await;
        assert_eq!(ride.passengers.len(), seats as usize);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_double_join_admits_one_ride() {
        let store = MemoryStore::new();
        let driver = new_driver(&store).await;
        let first = upcoming_ride(&store, driver, 2).await;
        let second = upcoming_ride(&store, driver, 2).await;
        let passenger = new_passenger(&store).await;

        let mut handles = Vec::new();
        for ride_id in [first, second] {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .join_ride(JoinRideDto {
                        user_id: passenger,
                        ride_id,
                    })
                    .await
            }));
        }
        let results = [
            handles.remove(0).await.unwrap(),
            handles.remove(0).await.unwrap(),
        ];

        let admitted = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(admitted, 1);
        for result in &results {
            if result.is_err() {
                assert!(is_rejected(result, RejectReason::AlreadyInRide));
            }
        }

        let pointer = store
            .get_user(GetUserDto { id: passenger })
            .await
            .unwrap()
            .unwrap()
            .joined_ride
            .unwrap();
        for (ride_id, result) in [first, second].into_iter().zip(&results) {
            let ride = current_ride(&store, ride_id).await;
            if result.is_ok() {
                assert_eq!(pointer, ride_id);
                assert_eq!(ride.passengers, vec![passenger]);
            } else {
                assert!(ride.passengers.is_empty());
            }
        }
    }

    #[tokio::test]
    async fn second_join_is_refused_and_changes_nothing() {
        let store = MemoryStore::new();
        let driver = new_driver(&store).await;
        let first = upcoming_ride(&store, driver, 2).await;
        let second = upcoming_ride(&store, driver, 2).await;
        let passenger = new_passenger(&store).await;

        store
            .join_ride(JoinRideDto {
                user_id: passenger,
                ride_id: first,
            })
            .await
            .unwrap();
        let refused = store
            .join_ride(JoinRideDto {
                user_id: passenger,
                ride_id: second,
            })
            .await;
        assert!(is_rejected(&refused, RejectReason::AlreadyInRide));

        assert_eq!(
            current_ride(&store, first).await.passengers,
            vec![passenger]
        );
        assert!(current_ride(&store, second).await.passengers.is_empty());
    }

    #[tokio::test]
    async fn leave_then_join_restores_membership() {
        let store = MemoryStore::new();
        let driver = new_driver(&store).await;
        let ride_id = upcoming_ride(&store, driver, 2).await;
        let passenger = new_passenger(&store).await;

        let membership = JoinRideDto {
            user_id: passenger,
            ride_id,
        };
        store.join_ride(membership).await.unwrap();
        store
            .leave_ride(LeaveRideDto {
                user_id: passenger,
                ride_id,
            })
            .await
            .unwrap();
        assert!(current_ride(&store, ride_id).await.passengers.is_empty());

        store
            .join_ride(JoinRideDto {
                user_id: passenger,
                ride_id,
            })
            .await
            .unwrap();
        assert_eq!(
            current_ride(&store, ride_id).await.passengers,
            vec![passenger]
        );
    }

    #[tokio::test]
    async fn leaving_without_a_seat_is_refused() {
        let store = MemoryStore::new();
        let driver = new_driver(&store).await;
        let ride_id = upcoming_ride(&store, driver, 2).await;
        let stranger = new_passenger(&store).await;

        let refused = store
            .leave_ride(LeaveRideDto {
                user_id: stranger,
                ride_id,
            })
            .await;
        assert!(is_rejected(&refused, RejectReason::NotAPassenger));
    }

    #[tokio::test]
    async fn drivers_do_not_take_seats() {
        let store = MemoryStore::new();
        let driver = new_driver(&store).await;
        let other_driver = new_driver(&store).await;
        let ride_id = upcoming_ride(&store, driver, 2).await;

        let refused = store
            .join_ride(JoinRideDto {
                user_id: other_driver,
                ride_id,
            })
            .await;
        assert!(is_rejected(&refused, RejectReason::NotAuthorized));
    }

    #[tokio::test]
    async fn terminal_rides_are_not_joinable() {
        let store = MemoryStore::new();
        let driver = new_driver(&store).await;
        let ride_id = upcoming_ride(&store, driver, 2).await;
        let passenger = new_passenger(&store).await;

        store
            .set_status(SetRideStatusDto {
                actor_id: driver,
                ride_id,
                status: "cancelled".into(),
            })
            .await
            .unwrap();

        let refused = store
            .join_ride(JoinRideDto {
                user_id: passenger,
                ride_id,
            })
            .await;
        assert!(is_rejected(&refused, RejectReason::RideNotJoinable));
    }

    #[tokio::test]
    async fn stale_pointer_does_not_block_a_fresh_join() {
        let store = MemoryStore::new();
        let driver = new_driver(&store).await;
        let finished = upcoming_ride(&store, driver, 2).await;
        let next = upcoming_ride(&store, driver, 2).await;
        let passenger = new_passenger(&store).await;

        store
            .join_ride(JoinRideDto {
                user_id: passenger,
                ride_id: finished,
            })
            .await
            .unwrap();
        // the driver completes without cascading to passenger pointers
        store
            .set_status(SetRideStatusDto {
                actor_id: driver,
                ride_id: finished,
                status: "completed".into(),
            })
            .await
            .unwrap();

        store
            .join_ride(JoinRideDto {
                user_id: passenger,
                ride_id: next,
            })
            .await
            .unwrap();
        let pointer = store
            .get_user(GetUserDto { id: passenger })
            .await
            .unwrap()
            .unwrap()
            .joined_ride;
        assert_eq!(pointer, Some(next));
    }
}
