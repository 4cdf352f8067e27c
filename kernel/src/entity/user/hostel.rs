use serde::{Deserialize, Serialize};
use vodca::{AsRefln, Fromln};

/// Campus residence; passengers typically set it at signup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Fromln, AsRefln, Serialize, Deserialize)]
pub struct Hostel(String);

impl Hostel {
    pub fn new(hostel: impl Into<String>) -> Self {
        Self(hostel.into())
    }
}
