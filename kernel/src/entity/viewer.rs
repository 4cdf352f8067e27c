use crate::entity::{User, UserId, UserRole};

/// Capability-tagged caller identity.
///
/// Operations take a `Viewer` so the permitted operation set follows from
/// the variant instead of ad hoc role flags at every call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    Driver(UserId),
    Passenger(UserId),
}

impl Viewer {
    pub fn is_driver(&self) -> bool {
        matches!(self, Viewer::Driver(_))
    }
}

impl From<&User> for Viewer {
    fn from(user: &User) -> Self {
        match user.role() {
            UserRole::Driver => Viewer::Driver(user.id().clone()),
            UserRole::Passenger => Viewer::Passenger(user.id().clone()),
        }
    }
}
