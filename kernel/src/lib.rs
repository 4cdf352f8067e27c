pub use crate::error::*;

mod entity;
mod error;
mod feed;
mod modify;
mod query;
mod store;

#[cfg(feature = "prelude")]
pub mod prelude {
    pub mod entity {
        pub use crate::entity::*;
    }
}

#[cfg(feature = "interface")]
pub mod interface {
    pub mod store {
        pub use crate::store::*;
    }
    pub mod feed {
        pub use crate::feed::*;
    }
    pub mod query {
        pub use crate::query::*;
    }
    pub mod update {
        pub use crate::modify::*;
    }
}
