use std::sync::Arc;

use async_trait::async_trait;
use vita_cqrs_core::QueryHandler;
use vita_errors::{AppError, AppResult};

use crate::application::queries::PendingReviewQuery;
use crate::domain::entities::Case;
use crate::domain::repositories::{CaseRepository, UserRepository};

/// 待评审列表查询处理器
///
/// 病例不预先指派医生，列表按创建时间最早优先返回。
pub struct PendingReviewHandler {
    user_repo: Arc<dyn UserRepository>,
    case_repo: Arc<dyn CaseRepository>,
}

impl PendingReviewHandler {
    pub fn new(user_repo: Arc<dyn UserRepository>, case_repo: Arc<dyn CaseRepository>) -> Self {
        Self {
            user_repo,
            case_repo,
        }
    }
}

#[async_trait]
impl QueryHandler<PendingReviewQuery> for PendingReviewHandler {
    async fn handle(&self, query: PendingReviewQuery) -> AppResult<Vec<Case>> {
        let actor = self
            .user_repo
            .find_by_id(&query.actor_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", query.actor_id)))?;

        if !actor.is_doctor() {
            return Err(AppError::forbidden("only doctors can list pending cases"));
        }

        self.case_repo.list_pending_review().await
    }
}
