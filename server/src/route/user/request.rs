use crate::controller::Intake;
use application::transfer::{CreateUserDto, GetUserDto};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    name: String,
    email: String,
    role: String,
    hostel: Option<String>,
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

pub struct Transformer;

impl Intake<CreateUserRequest> for Transformer {
    type To = CreateUserDto;
    fn emit(&self, input: CreateUserRequest) -> Self::To {
        CreateUserDto {
            name: input.name,
            email: input.email,
            role: input.role,
            hostel: input.hostel,
        }
    }
}

impl Intake<GetRequest> for Transformer {
    type To = GetUserDto;
    fn emit(&self, input: GetRequest) -> Self::To {
        GetUserDto { id: input.id }
    }
}
