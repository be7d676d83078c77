//! 查询定义

use vita_common::UserId;
use vita_cqrs_core::Query;

use crate::domain::entities::Case;

/// 待评审病例列表（仅医生）
#[derive(Debug, Clone)]
pub struct PendingReviewQuery {
    pub actor_id: UserId,
}

impl Query for PendingReviewQuery {
    type Result = Vec<Case>;
}
