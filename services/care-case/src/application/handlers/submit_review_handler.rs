use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use vita_cqrs_core::CommandHandler;
use vita_errors::{AppError, AppResult};

use crate::application::commands::SubmitReviewCommand;
use crate::domain::entities::{Case, ReviewDecision};
use crate::domain::repositories::{CaseRepository, UserRepository};

/// 评审提交处理器
///
/// 读取时已不在待评审状态 → `InvalidState`；读取时通过但写入时
/// 被并发评审抢先 → 仓储层比较交换失败，返回 `Conflict`。
pub struct SubmitReviewHandler {
    user_repo: Arc<dyn UserRepository>,
    case_repo: Arc<dyn CaseRepository>,
}

impl SubmitReviewHandler {
    pub fn new(user_repo: Arc<dyn UserRepository>, case_repo: Arc<dyn CaseRepository>) -> Self {
        Self {
            user_repo,
            case_repo,
        }
    }
}

#[async_trait]
impl CommandHandler<SubmitReviewCommand> for SubmitReviewHandler {
    async fn handle(&self, command: SubmitReviewCommand) -> AppResult<Case> {
        let actor = self
            .user_repo
            .find_by_id(&command.actor_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", command.actor_id)))?;

        if !actor.is_doctor() {
            return Err(AppError::forbidden("only doctors can review cases"));
        }

        let case = self
            .case_repo
            .find_by_id(&command.case_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("case {}", command.case_id)))?;

        if !case.is_awaiting_review() {
            return Err(AppError::invalid_state(format!(
                "case {} is not awaiting review (status: {})",
                case.id,
                case.status.as_str()
            )));
        }

        if let ReviewDecision::Reject { reason } = &command.decision {
            if reason.trim().is_empty() {
                return Err(AppError::validation(
                    "rejection requires a non-empty reason",
                ));
            }
        }

        let reviewed = self
            .case_repo
            .submit_review(&command.case_id, &actor.id, &command.decision)
            .await?;

        let decision_label = match &command.decision {
            ReviewDecision::Approve => "approve",
            ReviewDecision::Reject { .. } => "reject",
        };
        info!(
            case_id = %reviewed.id,
            doctor_id = %actor.id,
            decision = decision_label,
            "Review submitted"
        );
        metrics::counter!("reviews_submitted_total", "decision" => decision_label).increment(1);

        Ok(reviewed)
    }
}
