use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vodca::{AsRefln, Fromln};

use crate::entity::UserId;

/// 1–5 score a passenger gives a completed ride.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Fromln, AsRefln, Serialize, Deserialize)]
pub struct RatingScore(i32);

impl RatingScore {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    pub fn new(score: impl Into<i32>) -> Self {
        Self(score.into())
    }

    pub fn in_range(&self) -> bool {
        (Self::MIN..=Self::MAX).contains(&self.0)
    }
}

/// Scores keyed by the rating passenger; re-rating overwrites.
#[derive(Debug, Clone, Default, Eq, PartialEq, Fromln, AsRefln, Serialize, Deserialize)]
pub struct RideRatings(HashMap<UserId, RatingScore>);

impl RideRatings {
    pub fn new(ratings: impl Into<HashMap<UserId, RatingScore>>) -> Self {
        Self(ratings.into())
    }

    pub fn put(&mut self, rater: UserId, score: RatingScore) {
        self.0.insert(rater, score);
    }

    pub fn count(&self) -> usize {
        self.0.len()
    }

    pub fn average(&self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        let total: i32 = self.0.values().map(|score| *score.as_ref()).sum();
        Some(f64::from(total) / self.0.len() as f64)
    }
}
