//! 基础设施层

pub mod payment;
pub mod persistence;
