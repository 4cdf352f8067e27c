mod ride;
mod user;

pub use self::{ride::*, user::*};
