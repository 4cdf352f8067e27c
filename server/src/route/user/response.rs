use crate::controller::Exhaust;
use application::transfer::UserDto;
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
pub struct UserResponse {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    hostel: Option<String>,
    joined_ride: Option<Uuid>,
}

impl From<UserDto> for UserResponse {
    fn from(value: UserDto) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            role: value.role,
            hostel: value.hostel,
            joined_ride: value.joined_ride,
        }
    }
}

impl IntoResponse for UserResponse {
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

impl Exhaust<Option<UserDto>> for Presenter {
    type To = Option<UserResponse>;
    fn emit(&self, input: Option<UserDto>) -> Self::To {
        input.map(UserResponse::from)
    }
}
