//! 持久化实现

mod memory;
mod migrations;
mod postgres_case_repository;
mod postgres_user_repository;

pub use memory::*;
pub use migrations::*;
pub use postgres_case_repository::*;
pub use postgres_user_repository::*;
