use serde::{Deserialize, Serialize};
use vodca::{AsRefln, Fromln};

/// Maximum number of passengers a ride may hold.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Fromln, AsRefln, Serialize, Deserialize)]
pub struct SeatCount(i32);

impl SeatCount {
    pub fn new(seats: impl Into<i32>) -> Self {
        Self(seats.into())
    }
}
