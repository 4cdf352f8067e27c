use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vodca::{AsRefln, Fromln};

#[derive(
    Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Default, Fromln, AsRefln, Serialize,
    Deserialize,
)]
pub struct RideId(Uuid);

impl RideId {
    pub fn new(id: impl Into<Uuid>) -> Self {
        Self(id.into())
    }
}
