use std::fmt::Display;

use error_stack::Context;
use serde::Serialize;

#[derive(Debug)]
pub enum KernelError {
    Validation,
    NotFound,
    Rejected(RejectReason),
    Concurrency,
    Timeout,
    Internal,
}

impl Display for KernelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelError::Validation => write!(f, "Invalid input"),
            KernelError::NotFound => write!(f, "Record not found"),
            KernelError::Rejected(reason) => write!(f, "Precondition failed: {reason}"),
            KernelError::Concurrency => write!(f, "Concurrency error"),
            KernelError::Timeout => write!(f, "Process timed out"),
            KernelError::Internal => write!(f, "Internal kernel error"),
        }
    }
}

impl Context for KernelError {}

/// Why an operation was refused. Every reason is surfaced to the caller
/// as-is, never collapsed into a generic failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    AlreadyInRide,
    RideFull,
    RideNotJoinable,
    NotAPassenger,
    RideNotRatable,
    InvalidTransition,
    NotAuthorized,
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::AlreadyInRide => write!(f, "user already committed to a ride"),
            RejectReason::RideFull => write!(f, "no seats left"),
            RejectReason::RideNotJoinable => write!(f, "ride cannot be joined"),
            RejectReason::NotAPassenger => write!(f, "user is not aboard this ride"),
            RejectReason::RideNotRatable => write!(f, "ride cannot be rated"),
            RejectReason::InvalidTransition => write!(f, "ride already reached a terminal status"),
            RejectReason::NotAuthorized => write!(f, "caller may not perform this operation"),
        }
    }
}
