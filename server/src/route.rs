mod ride;
mod user;
mod view;

pub use self::{ride::*, user::*, view::*};
