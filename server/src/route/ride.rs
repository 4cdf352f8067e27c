mod request;
pub(crate) mod response;

use crate::controller::Controller;
use crate::error::ErrorStatus;
use crate::extractor::Actor;
use crate::handler::AppModule;
use crate::route::ride::request::{
    CreateRideRequest, GetRequest, JoinRequest, LeaveRequest, RatingRequest, StatusRequest,
    Transformer,
};
use crate::route::ride::response::{Presenter, RideResponse};
use application::service::{
    CreateRideService, GetRideService, JoinRideService, LeaveRideService, RateRideService,
    RideStatusService,
};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use uuid::Uuid;

pub trait RideRouter {
    fn route_ride(self) -> Self;
}

impl RideRouter for Router<AppModule> {
    fn route_ride(self) -> Self {
        self.route(
            "/rides",
            get(|State(module): State<AppModule>| async move {
                Controller::new((), Presenter)
                    .bypass(|| async move { module.store().get_all_rides().await })
                    .await
                    .map_err(ErrorStatus::from)
            })
            .post(
                |State(module): State<AppModule>,
                 Actor(actor): Actor,
                 Json(req): Json<CreateRideRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake((actor, req))
                        .handle(|dto| module.store().create_ride(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/rides/:id",
            get(
                |State(module): State<AppModule>, Path(id): Path<Uuid>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(GetRequest::new(id))
                        .handle(|dto| module.store().get_ride(dto))
                        .await
                        .map_err(ErrorStatus::from)
                        .map(|res| {
                            res.map(RideResponse::into_response)
                                .unwrap_or_else(|| StatusCode::NOT_FOUND.into_response())
                        })
                },
            ),
        )
        .route(
            "/rides/:id/passengers",
            post(
                |State(module): State<AppModule>,
                 Actor(actor): Actor,
                 Path(id): Path<Uuid>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(JoinRequest::new(actor, id))
                        .handle(|dto| module.store().join_ride(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            )
            .delete(
                |State(module): State<AppModule>,
                 Actor(actor): Actor,
                 Path(id): Path<Uuid>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake(LeaveRequest::new(actor, id))
                        .handle(|dto| module.store().leave_ride(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/rides/:id/status",
            patch(
                |State(module): State<AppModule>,
                 Actor(actor): Actor,
                 Path(id): Path<Uuid>,
                 Json(req): Json<StatusRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake((actor, id, req))
                        .handle(|dto| module.store().set_status(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/rides/:id/ratings",
            put(
                |State(module): State<AppModule>,
                 Actor(actor): Actor,
                 Path(id): Path<Uuid>,
                 Json(req): Json<RatingRequest>| async move {
                    Controller::new(Transformer, Presenter)
                        .intake((actor, id, req))
                        .handle(|dto| module.store().rate_ride(dto))
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
    }
}
