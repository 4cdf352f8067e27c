pub mod feed;
pub mod memory;
pub mod postgres;

pub use self::{memory::*, postgres::*};
