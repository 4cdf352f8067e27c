mod id;
mod rating;
mod route;
mod schedule;
mod seats;
mod status;

pub use self::{id::*, rating::*, route::*, schedule::*, seats::*, status::*};
use crate::entity::common::DocumentVersion;
use crate::entity::UserId;
use crate::RejectReason;
use destructure::{Destructure, Mutation};
use time::PrimitiveDateTime;
use vodca::References;

#[derive(Debug, Clone, PartialEq, References, Destructure, Mutation)]
pub struct Ride {
    id: RideId,
    driver_id: UserId,
    origin: Origin,
    destination: Destination,
    date: RideDate,
    time: RideTime,
    seats: SeatCount,
    passengers: Vec<UserId>,
    status: RideStatus,
    ratings: RideRatings,
    version: DocumentVersion<Ride>,
}

impl Ride {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: RideId,
        driver_id: UserId,
        origin: Origin,
        destination: Destination,
        date: RideDate,
        time: RideTime,
        seats: SeatCount,
        passengers: Vec<UserId>,
        status: RideStatus,
        ratings: RideRatings,
        version: DocumentVersion<Ride>,
    ) -> Self {
        Self {
            id,
            driver_id,
            origin,
            destination,
            date,
            time,
            seats,
            passengers,
            status,
            ratings,
            version,
        }
    }

    pub fn departs_at(&self) -> PrimitiveDateTime {
        PrimitiveDateTime::new(*self.date.as_ref(), *self.time.as_ref())
    }

    pub fn seats_left(&self) -> i32 {
        *self.seats.as_ref() - self.passengers.len() as i32
    }

    pub fn carries(&self, user_id: &UserId) -> bool {
        self.passengers.contains(user_id)
    }

    pub fn is_driven_by(&self, user_id: &UserId) -> bool {
        &self.driver_id == user_id
    }

    /// Seat a passenger.
    ///
    /// Admission requires an upcoming ride with a free seat; a user already
    /// aboard is refused so membership stays unique. The returned ride keeps
    /// the revision it was read at; committing it through a conditional
    /// write is what makes the capacity check hold at commit time.
    pub fn admit(&self, passenger: &UserId) -> Result<Ride, RejectReason> {
        if self.status != RideStatus::Upcoming {
            return Err(RejectReason::RideNotJoinable);
        }
        if self.carries(passenger) {
            return Err(RejectReason::AlreadyInRide);
        }
        if self.seats_left() <= 0 {
            return Err(RejectReason::RideFull);
        }
        let mut updated = self.clone();
        let passenger = passenger.clone();
        updated.substitute(|ride| ride.passengers.push(passenger));
        Ok(updated)
    }

    /// Free a passenger's seat.
    pub fn release(&self, passenger: &UserId) -> Result<Ride, RejectReason> {
        if !self.carries(passenger) {
            return Err(RejectReason::NotAPassenger);
        }
        let mut updated = self.clone();
        updated.substitute(|ride| ride.passengers.retain(|aboard| aboard != passenger));
        Ok(updated)
    }

    /// Move the ride to a terminal status, driver only.
    pub fn transition(&self, actor: &UserId, status: RideStatus) -> Result<Ride, RejectReason> {
        if !self.is_driven_by(actor) {
            return Err(RejectReason::NotAuthorized);
        }
        if self.status.is_terminal() || !status.is_terminal() {
            return Err(RejectReason::InvalidTransition);
        }
        let mut updated = self.clone();
        updated.substitute(|ride| *ride.status = status);
        Ok(updated)
    }

    /// Record a passenger's score for a completed ride.
    pub fn rate(&self, rater: &UserId, score: RatingScore) -> Result<Ride, RejectReason> {
        if self.status != RideStatus::Completed {
            return Err(RejectReason::RideNotRatable);
        }
        if !self.carries(rater) {
            return Err(RejectReason::NotAPassenger);
        }
        let mut updated = self.clone();
        let rater = rater.clone();
        updated.substitute(|ride| ride.ratings.put(rater, score));
        Ok(updated)
    }
}

#[cfg(test)]
mod test {
    use time::macros::{date, time};
    use uuid::Uuid;

    use super::*;

    fn ride(seats: i32, passengers: Vec<UserId>, status: RideStatus) -> Ride {
        Ride::new(
            RideId::new(Uuid::new_v4()),
            UserId::new(Uuid::new_v4()),
            Origin::new("Main Gate"),
            Destination::new("Westlands"),
            RideDate::new(date!(2024 - 06 - 01)),
            RideTime::new(time!(08:30)),
            SeatCount::new(seats),
            passengers,
            status,
            RideRatings::default(),
            DocumentVersion::initial(),
        )
    }

    #[test]
    fn admits_until_capacity() {
        let first = UserId::new(Uuid::new_v4());
        let second = UserId::new(Uuid::new_v4());
        let third = UserId::new(Uuid::new_v4());

        let ride = ride(2, Vec::new(), RideStatus::Upcoming);
        let ride = ride.admit(&first).unwrap();
        let ride = ride.admit(&second).unwrap();
        assert_eq!(ride.seats_left(), 0);
        assert_eq!(ride.admit(&third), Err(RejectReason::RideFull));
    }

    #[test]
    fn refuses_duplicate_admission() {
        let passenger = UserId::new(Uuid::new_v4());
        let ride = ride(3, vec![passenger.clone()], RideStatus::Upcoming);
        assert_eq!(ride.admit(&passenger), Err(RejectReason::AlreadyInRide));
    }

    #[test]
    fn refuses_admission_outside_upcoming() {
        let passenger = UserId::new(Uuid::new_v4());
        for status in [RideStatus::Completed, RideStatus::Cancelled] {
            let ride = ride(3, Vec::new(), status);
            assert_eq!(ride.admit(&passenger), Err(RejectReason::RideNotJoinable));
        }
    }

    #[test]
    fn release_then_admit_restores_membership() {
        let passenger = UserId::new(Uuid::new_v4());
        let ride = ride(1, vec![passenger.clone()], RideStatus::Upcoming);
        let ride = ride.release(&passenger).unwrap();
        assert!(!ride.carries(&passenger));
        let ride = ride.admit(&passenger).unwrap();
        assert!(ride.carries(&passenger));
    }

    #[test]
    fn release_requires_membership() {
        let stranger = UserId::new(Uuid::new_v4());
        let ride = ride(2, Vec::new(), RideStatus::Upcoming);
        assert_eq!(ride.release(&stranger), Err(RejectReason::NotAPassenger));
    }

    #[test]
    fn transitions_are_monotone() {
        let ride = ride(3, Vec::new(), RideStatus::Upcoming);
        let driver = ride.driver_id().clone();
        let ride = ride.transition(&driver, RideStatus::Completed).unwrap();
        assert_eq!(
            ride.transition(&driver, RideStatus::Cancelled),
            Err(RejectReason::InvalidTransition)
        );
    }

    #[test]
    fn only_the_driver_transitions() {
        let ride = ride(3, Vec::new(), RideStatus::Upcoming);
        let stranger = UserId::new(Uuid::new_v4());
        assert_eq!(
            ride.transition(&stranger, RideStatus::Cancelled),
            Err(RejectReason::NotAuthorized)
        );
        assert_eq!(*ride.status(), RideStatus::Upcoming);
    }

    #[test]
    fn rating_requires_completion_and_membership() {
        let passenger = UserId::new(Uuid::new_v4());
        let score = RatingScore::new(4);

        let upcoming = ride(3, vec![passenger.clone()], RideStatus::Upcoming);
        assert_eq!(
            upcoming.rate(&passenger, score),
            Err(RejectReason::RideNotRatable)
        );

        let completed = ride(3, vec![passenger.clone()], RideStatus::Completed);
        let stranger = UserId::new(Uuid::new_v4());
        assert_eq!(
            completed.rate(&stranger, score),
            Err(RejectReason::NotAPassenger)
        );

        let rated = completed.rate(&passenger, score).unwrap();
        assert_eq!(rated.ratings().average(), Some(4.0));
    }
}
