use crate::controller::Exhaust;
use application::transfer::RideDto;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    id: Uuid,
}

impl IntoResponse for CreatedResponse {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, axum::Json(self)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct RideResponse {
    id: Uuid,
    driver_id: Uuid,
    origin: String,
    destination: String,
    date: String,
    time: String,
    seats: i32,
    seats_left: i32,
    passengers: Vec<Uuid>,
    status: String,
    average_rating: Option<f64>,
    rating_count: usize,
}

impl From<RideDto> for RideResponse {
    fn from(value: RideDto) -> Self {
        let seats_left = value.seats - value.passengers.len() as i32;
        Self {
            id: value.id,
            driver_id: value.driver_id,
            origin: value.origin,
            destination: value.destination,
            date: value.date,
            time: value.time,
            seats: value.seats,
            seats_left,
            passengers: value.passengers,
            status: value.status,
            average_rating: value.average_rating,
            rating_count: value.rating_count,
        }
    }
}

impl IntoResponse for RideResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, axum::Json(self)).into_response()
    }
}

pub struct Presenter;

impl Exhaust<Uuid> for Presenter {
    type To = CreatedResponse;
    fn emit(&self, input: Uuid) -> Self::To {
        CreatedResponse { id: input }
    }
}

impl Exhaust<Option<RideDto>> for Presenter {
    type To = Option<RideResponse>;
    fn emit(&self, input: Option<RideDto>) -> Self::To {
        input.map(RideResponse::from)
    }
}

impl Exhaust<Vec<RideDto>> for Presenter {
    type To = axum::Json<Vec<RideResponse>>;
    fn emit(&self, input: Vec<RideDto>) -> Self::To {
        axum::Json::from(
            input
                .into_iter()
                .map(RideResponse::from)
                .collect::<Vec<_>>(),
        )
    }
}

impl Exhaust<()> for Presenter {
    type To = StatusCode;
    fn emit(&self, (): ()) -> Self::To {
        StatusCode::NO_CONTENT
    }
}
