//! 领域实体

mod case;
mod user;

pub use case::*;
pub use user::*;
