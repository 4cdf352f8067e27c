use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Driver,
    Passenger,
}

impl Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserRole::Driver => write!(f, "driver"),
            UserRole::Passenger => write!(f, "passenger"),
        }
    }
}

impl FromStr for UserRole {
    type Err = ();

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "driver" => Ok(UserRole::Driver),
            "passenger" => Ok(UserRole::Passenger),
            _ => Err(()),
        }
    }
}
