use uuid::Uuid;

use kernel::prelude::entity::{DestructRide, Ride};

#[derive(Debug, Clone)]
pub struct RideDto {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub date: String,
    pub time: String,
    pub seats: i32,
    pub passengers: Vec<Uuid>,
    pub status: String,
    pub average_rating: Option<f64>,
    pub rating_count: usize,
    pub version: i64,
}

impl From<Ride> for RideDto {
    fn from(value: Ride) -> Self {
        let average_rating = value.ratings().average();
        let rating_count = value.ratings().count();
        let DestructRide {
            id,
            driver_id,
            origin,
            destination,
            date,
            time,
            seats,
            passengers,
            status,
            version,
            ..
        } = value.into_destruct();
        Self {
            id: id.into(),
            driver_id: driver_id.into(),
            origin: origin.into(),
            destination: destination.into(),
            date: date.to_string(),
            time: time.to_string(),
            seats: seats.into(),
            passengers: passengers.into_iter().map(Into::into).collect(),
            status: status.to_string(),
            average_rating,
            rating_count,
            version: version.into(),
        }
    }
}

pub struct CreateRideDto {
    pub driver_id: Uuid,
    pub origin: String,
    pub destination: String,
    pub date: String,
    pub time: String,
    pub seats: i32,
}

pub struct GetRideDto {
    pub id: Uuid,
}

pub struct JoinRideDto {
    pub user_id: Uuid,
    pub ride_id: Uuid,
}

pub struct LeaveRideDto {
    pub user_id: Uuid,
    pub ride_id: Uuid,
}

pub struct SetRideStatusDto {
    pub actor_id: Uuid,
    pub ride_id: Uuid,
    pub status: String,
}

pub struct RateRideDto {
    pub user_id: Uuid,
    pub ride_id: Uuid,
    pub score: i32,
}

pub struct WatchViewDto {
    pub user_id: Uuid,
}

pub struct HistoryFilterDto {
    pub user_id: Uuid,
    pub status: Option<String>,
    pub date: Option<String>,
}
