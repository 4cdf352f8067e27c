use crate::controller::Intake;
use application::transfer::{
    CreateRideDto, GetRideDto, JoinRideDto, LeaveRideDto, RateRideDto, SetRideStatusDto,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateRideRequest {
    origin: String,
    destination: String,
    date: String,
    time: String,
    seats: i32,
}

#[derive(Debug)]
pub struct GetRequest {
    id: Uuid,
}

impl GetRequest {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

#[derive(Debug)]
pub struct JoinRequest {
    actor: Uuid,
    ride: Uuid,
}

impl JoinRequest {
    pub fn new(actor: Uuid, ride: Uuid) -> Self {
        Self { actor, ride }
    }
}

#[derive(Debug)]
pub struct LeaveRequest {
    actor: Uuid,
    ride: Uuid,
}

impl LeaveRequest {
    pub fn new(actor: Uuid, ride: Uuid) -> Self {
        Self { actor, ride }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    status: String,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    score: i32,
}

pub struct Transformer;

impl Intake<(Uuid, CreateRideRequest)> for Transformer {
    type To = CreateRideDto;
    fn emit(&self, (actor, req): (Uuid, CreateRideRequest)) -> Self::To {
        CreateRideDto {
            driver_id: actor,
            origin: req.origin,
            destination: req.destination,
            date: req.date,
            time: req.time,
            seats: req.seats,
        }
    }
}

impl Intake<GetRequest> for Transformer {
    type To = GetRideDto;
    fn emit(&self, input: GetRequest) -> Self::To {
        GetRideDto { id: input.id }
    }
}

impl Intake<JoinRequest> for Transformer {
    type To = JoinRideDto;
    fn emit(&self, input: JoinRequest) -> Self::To {
        JoinRideDto {
            user_id: input.actor,
            ride_id: input.ride,
        }
    }
}

impl Intake<LeaveRequest> for Transformer {
    type To = LeaveRideDto;
    fn emit(&self, input: LeaveRequest) -> Self::To {
        LeaveRideDto {
            user_id: input.actor,
            ride_id: input.ride,
        }
    }
}

impl Intake<(Uuid, Uuid, StatusRequest)> for Transformer {
    type To = SetRideStatusDto;
    fn emit(&self, (actor, ride, req): (Uuid, Uuid, StatusRequest)) -> Self::To {
        SetRideStatusDto {
            actor_id: actor,
            ride_id: ride,
            status: req.status,
        }
    }
}

impl Intake<(Uuid, Uuid, RatingRequest)> for Transformer {
    type To = RateRideDto;
    fn emit(&self, (actor, ride, req): (Uuid, Uuid, RatingRequest)) -> Self::To {
        RateRideDto {
            user_id: actor,
            ride_id: ride,
            score: req.score,
        }
    }
}
