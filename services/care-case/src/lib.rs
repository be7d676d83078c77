//! Care Case Service Library
//!
//! 模块化架构：
//! - `domain`: 领域层（病例/用户实体、状态机、仓储抽象）
//! - `application`: 应用层（命令/查询与处理器）
//! - `infrastructure`: 基础设施层（Postgres 仓储、支付网关客户端）
//! - `api`: REST 接口层

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
