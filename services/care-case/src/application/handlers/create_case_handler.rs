use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use vita_cqrs_core::CommandHandler;
use vita_domain_core::Money;
use vita_errors::{AppError, AppResult};

use crate::application::commands::CreateCaseCommand;
use crate::domain::entities::Case;
use crate::domain::repositories::{CaseRepository, UserRepository};

pub struct CreateCaseHandler {
    user_repo: Arc<dyn UserRepository>,
    case_repo: Arc<dyn CaseRepository>,
    /// 每个病例的固定费用（来自配置）
    case_fee: Money,
}

impl CreateCaseHandler {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        case_repo: Arc<dyn CaseRepository>,
        case_fee: Money,
    ) -> Self {
        Self {
            user_repo,
            case_repo,
            case_fee,
        }
    }
}

#[async_trait]
impl CommandHandler<CreateCaseCommand> for CreateCaseHandler {
    async fn handle(&self, command: CreateCaseCommand) -> AppResult<Case> {
        let actor = self
            .user_repo
            .find_by_id(&command.patient_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", command.patient_id)))?;

        if !actor.is_patient() {
            return Err(AppError::forbidden(
                "only patients can request a document",
            ));
        }

        if command.request_type.trim().is_empty() {
            return Err(AppError::validation("request_type must not be empty"));
        }

        let case = Case::new(actor.id, command.request_type, self.case_fee.clone());
        self.case_repo.create(&case).await?;

        info!(case_id = %case.id, patient_id = %case.patient_id, request_type = %case.request_type, "Case created");
        metrics::counter!("cases_created_total").increment(1);

        Ok(case)
    }
}
