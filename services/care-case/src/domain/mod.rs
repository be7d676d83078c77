//! 领域层

pub mod entities;
pub mod repositories;
pub mod value_objects;
