use error_stack::Report;

use kernel::interface::query::{DependOnRideQuery, RideQuery};
use kernel::interface::store::{DependOnRecordStore, RecordStore};
use kernel::interface::update::{DependOnRideModifier, RideModifier};
use kernel::prelude::entity::{RatingScore, RideId, RideStatus, UserId};
use kernel::KernelError;

use crate::service::{is_conflict, reject, MAX_COMMIT_ATTEMPTS};
use crate::transfer::{RateRideDto, SetRideStatusDto};

#[async_trait::async_trait]
pub trait RideStatusService<Connection: Send>:
    'static
    + Sync
    + Send
    + DependOnRecordStore<Connection>
    + DependOnRideQuery<Connection>
    + DependOnRideModifier<Connection>
{
    /// Move a ride to a terminal status.
    ///
    /// Passenger pointers are deliberately left alone; the next read
    /// reconciles them against the terminal ride.
    async fn set_status(&self, dto: SetRideStatusDto) -> error_stack::Result<(), KernelError> {
        let status = dto
            .status
            .parse::<RideStatus>()
            .map_err(|()| Report::new(KernelError::Validation))?;
        if !status.is_terminal() {
            return Err(Report::new(KernelError::Validation));
        }

        let mut con = self.record_store().open().await?;
        let actor = UserId::new(dto.actor_id);
        let ride_id = RideId::new(dto.ride_id);
        let mut attempts = 0;
        loop {
            let ride = self
                .ride_query()
                .find_by_id(&mut con, &ride_id)
                .await?
                .ok_or_else(|| Report::new(KernelError::NotFound))?;
            let moved = ride.transition(&actor, status).map_err(reject)?;
            match self.ride_modifier().update(&mut con, &moved).await {
                Ok(()) => return Ok(()),
                Err(report) if is_conflict(&report) && attempts + 1 < MAX_COMMIT_ATTEMPTS => {
                    attempts += 1;
                }
                Err(report) => return Err(report),
            }
        }
    }
}

impl<Connection: Send, T> RideStatusService<Connection> for T where
    T: DependOnRecordStore<Connection>
        + DependOnRideQuery<Connection>
        + DependOnRideModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait RateRideService<Connection: Send>:
    'static
    + Sync
    + Send
    + DependOnRecordStore<Connection>
    + DependOnRideQuery<Connection>
    + DependOnRideModifier<Connection>
{
    async fn rate_ride(&self, dto: RateRideDto) -> error_stack::Result<(), KernelError> {
        let score = RatingScore::new(dto.score);
        if !score.in_range() {
            return Err(Report::new(KernelError::Validation));
        }

        let mut con = self.record_store().open().await?;
        let rater = UserId::new(dto.user_id);
        let ride_id = RideId::new(dto.ride_id);
        let mut attempts = 0;
        loop {
            let ride = self
                .ride_query()
                .find_by_id(&mut con, &ride_id)
                .await?
                .ok_or_else(|| Report::new(KernelError::NotFound))?;
            let rated = ride.rate(&rater, score).map_err(reject)?;
            match self.ride_modifier().update(&mut con, &rated).await {
                Ok(()) => return Ok(()),
                Err(report) if is_conflict(&report) && attempts + 1 < MAX_COMMIT_ATTEMPTS => {
                    attempts += 1;
                }
                Err(report) => return Err(report),
            }
        }
    }
}

impl<Connection: Send, T> RateRideService<Connection> for T where
    T: DependOnRecordStore<Connection>
        + DependOnRideQuery<Connection>
        + DependOnRideModifier<Connection>
{
}
