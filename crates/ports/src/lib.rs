//! vita-ports - 抽象 trait 层
//!
//! 定义所有基础设施的抽象接口

mod payment_gateway;

pub use payment_gateway::*;
