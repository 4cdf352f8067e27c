mod email;
mod hostel;
mod id;
mod name;
mod role;

pub use self::{email::*, hostel::*, id::*, name::*, role::*};
use crate::entity::common::DocumentVersion;
use crate::entity::RideId;
use crate::RejectReason;
use destructure::{Destructure, Mutation};
use vodca::References;

#[derive(Debug, Clone, Eq, PartialEq, References, Destructure, Mutation)]
pub struct User {
    id: UserId,
    name: UserName,
    email: UserEmail,
    role: UserRole,
    hostel: Option<Hostel>,
    joined_ride: Option<RideId>,
    version: DocumentVersion<User>,
}

impl User {
    pub fn new(
        id: UserId,
        name: UserName,
        email: UserEmail,
        role: UserRole,
        hostel: Option<Hostel>,
        joined_ride: Option<RideId>,
        version: DocumentVersion<User>,
    ) -> Self {
        Self {
            id,
            name,
            email,
            role,
            hostel,
            joined_ride,
            version,
        }
    }

    /// Point this user at the ride they now occupy.
    ///
    /// The pointer admits at most one outstanding ride; a user already
    /// committed elsewhere is refused.
    pub fn commit_to(&self, ride_id: &RideId) -> Result<User, RejectReason> {
        if self.joined_ride.is_some() {
            return Err(RejectReason::AlreadyInRide);
        }
        let mut updated = self.clone();
        updated.substitute(|user| *user.joined_ride = Some(ride_id.clone()));
        Ok(updated)
    }

    /// Clear the outstanding ride pointer, whatever it held.
    pub fn withdraw(&self) -> User {
        let mut updated = self.clone();
        updated.substitute(|user| *user.joined_ride = None);
        updated
    }
}
