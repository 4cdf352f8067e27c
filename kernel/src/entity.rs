mod common;
mod ride;
mod user;
mod viewer;

pub use self::{common::*, ride::*, user::*, viewer::*};
