use uuid::Uuid;

use kernel::prelude::entity::{DestructUser, User};

#[derive(Debug, Clone)]
pub struct UserDto {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub hostel: Option<String>,
    pub joined_ride: Option<Uuid>,
    pub version: i64,
}

impl From<User> for UserDto {
    fn from(value: User) -> Self {
        let DestructUser {
            id,
            name,
            email,
            role,
            hostel,
            joined_ride,
            version,
        } = value.into_destruct();
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role: role.to_string(),
            hostel: hostel.map(Into::into),
            joined_ride: joined_ride.map(Into::into),
            version: version.into(),
        }
    }
}

pub struct CreateUserDto {
    pub name: String,
    pub email: String,
    pub role: String,
    pub hostel: Option<String>,
}

pub struct GetUserDto {
    pub id: Uuid,
}
