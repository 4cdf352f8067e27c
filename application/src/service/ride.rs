use error_stack::{Report, ResultExt};
use uuid::Uuid;

use kernel::interface::query::{DependOnRideQuery, DependOnUserQuery, RideQuery, UserQuery};
use kernel::interface::store::{DependOnRecordStore, RecordStore};
use kernel::interface::update::{DependOnRideModifier, RideModifier};
use kernel::prelude::entity::{
    Destination, DocumentVersion, Origin, Ride, RideDate, RideId, RideRatings, RideStatus,
    RideTime, SeatCount, UserId, Viewer,
};
use kernel::{KernelError, RejectReason};

use crate::service::{is_transient, reject, MAX_READ_ATTEMPTS};
use crate::transfer::{CreateRideDto, GetRideDto, RideDto};

#[async_trait::async_trait]
pub trait CreateRideService<Connection: Send>:
    'static
    + Sync
    + Send
    + DependOnRecordStore<Connection>
    + DependOnUserQuery<Connection>
    + DependOnRideModifier<Connection>
{
    /// Post a new ride. Input is validated before any store interaction;
    /// only drivers may post.
    async fn create_ride(&self, dto: CreateRideDto) -> error_stack::Result<Uuid, KernelError> {
        let origin = dto.origin.trim();
        let destination = dto.destination.trim();
        if origin.is_empty() || destination.is_empty() || dto.seats < 1 {
            return Err(Report::new(KernelError::Validation));
        }
        let date = RideDate::parse(&dto.date).change_context(KernelError::Validation)?;
        let time = RideTime::parse(&dto.time).change_context(KernelError::Validation)?;

        let mut con = self.record_store().open().await?;
        let poster = self
            .user_query()
            .find_by_id(&mut con, &UserId::new(dto.driver_id))
            .await?
            .ok_or_else(|| Report::new(KernelError::NotFound))?;
        let Viewer::Driver(driver_id) = Viewer::from(&poster) else {
            return Err(reject(RejectReason::NotAuthorized));
        };

        let id = Uuid::new_v4();
        let ride = Ride::new(
            RideId::new(id),
            driver_id,
            Origin::new(origin),
            Destination::new(destination),
            date,
            time,
            SeatCount::new(dto.seats),
            Vec::new(),
            RideStatus::Upcoming,
            RideRatings::default(),
            DocumentVersion::initial(),
        );
        self.ride_modifier().create(&mut con, &ride).await?;
        Ok(id)
    }
}

impl<Connection: Send, T> CreateRideService<Connection> for T where
    T: DependOnRecordStore<Connection>
        + DependOnUserQuery<Connection>
        + DependOnRideModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait GetRideService<Connection: Send>:
    'static + Sync + Send + DependOnRecordStore<Connection> + DependOnRideQuery<Connection>
{
    async fn get_ride(
        &self,
        dto: GetRideDto,
    ) -> error_stack::Result<Option<RideDto>, KernelError> {
        let mut con = self.record_store().open().await?;
        let id = RideId::new(dto.id);
        let mut attempts = 0;
        let ride = loop {
            match self.ride_query().find_by_id(&mut con, &id).await {
                Ok(found) => break found,
                Err(report) if is_transient(&report) && attempts + 1 < MAX_READ_ATTEMPTS => {
                    attempts += 1;
                }
                Err(report) => return Err(report),
            }
        };
        Ok(ride.map(RideDto::from))
    }

    async fn get_all_rides(&self) -> error_stack::Result<Vec<RideDto>, KernelError> {
        let mut con = self.record_store().open().await?;
        let mut attempts = 0;
        let rides = loop {
            match self.ride_query().find_all(&mut con).await {
                Ok(found) => break found,
                Err(report) if is_transient(&report) && attempts + 1 < MAX_READ_ATTEMPTS => {
                    attempts += 1;
                }
                Err(report) => return Err(report),
            }
        };
        Ok(rides.into_iter().map(RideDto::from).collect())
    }
}

impl<Connection: Send, T> GetRideService<Connection> for T where
    T: DependOnRecordStore<Connection> + DependOnRideQuery<Connection>
{
}

#[cfg(test)]
mod test {
    use driver::database::MemoryStore;

    use kernel::{KernelError, RejectReason};

    use crate::service::test_support::{new_passenger, new_user};
    use crate::service::{CreateRideService, GetRideService};
    use crate::transfer::{CreateRideDto, GetRideDto};

    fn ride_details(driver_id: uuid::Uuid) -> CreateRideDto {
        CreateRideDto {
            driver_id,
            origin: "Main Gate".into(),
            destination: "CBD".into(),
            date: "2040-01-15".into(),
            time: "08:30".into(),
            seats: 3,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = MemoryStore::new();
        let driver = new_user(&store, "driver").await;

        let id = store.create_ride(ride_details(driver)).await.unwrap();
        let found = store.get_ride(GetRideDto { id }).await.unwrap().unwrap();
        assert_eq!(found.driver_id, driver);
        assert_eq!(found.status, "upcoming");
        assert_eq!(found.date, "2040-01-15");
        assert_eq!(found.time, "08:30");
        assert!(found.passengers.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_malformed_input_before_the_store() {
        let store = MemoryStore::new();
        let driver = new_user(&store, "driver").await;

        for dto in [
            CreateRideDto {
                origin: "  ".into(),
                ..ride_details(driver)
            },
            CreateRideDto {
                seats: 0,
                ..ride_details(driver)
            },
            CreateRideDto {
                date: "someday".into(),
                ..ride_details(driver)
            },
            CreateRideDto {
                time: "late".into(),
                ..ride_details(driver)
            },
        ] {
            let refused = store.create_ride(dto).await;
            assert!(matches!(
                refused.unwrap_err().current_context(),
                KernelError::Validation
            ));
        }
        assert!(store.get_all_rides().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_drivers_create_rides() {
        let store = MemoryStore::new();
        let passenger = new_passenger(&store).await;

        let refused = store.create_ride(ride_details(passenger)).await;
        assert!(matches!(
            refused.unwrap_err().current_context(),
            KernelError::Rejected(RejectReason::NotAuthorized)
        ));
    }
}
