//! 仓储抽象

mod case_repository;
mod user_repository;

pub use case_repository::*;
pub use user_repository::*;
