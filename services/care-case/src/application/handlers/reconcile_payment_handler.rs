use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use vita_cqrs_core::CommandHandler;
use vita_errors::AppResult;

use crate::application::commands::ReconcilePaymentCommand;
use crate::domain::entities::Case;
use crate::domain::repositories::CaseRepository;

/// 支付对账处理器
///
/// 由异步通知触发，可能先于、后于或交错于任何用户请求到达。
/// 原子性与幂等性由仓储的单病例事务边界保证；每条通知彼此独立，
/// 一条通知的失败（如未知病例号）不影响其他通知的处理。
pub struct ReconcilePaymentHandler {
    case_repo: Arc<dyn CaseRepository>,
}

impl ReconcilePaymentHandler {
    pub fn new(case_repo: Arc<dyn CaseRepository>) -> Self {
        Self { case_repo }
    }
}

#[async_trait]
impl CommandHandler<ReconcilePaymentCommand> for ReconcilePaymentHandler {
    async fn handle(&self, command: ReconcilePaymentCommand) -> AppResult<Case> {
        let case = self
            .case_repo
            .apply_payment_outcome(&command.case_id, command.outcome)
            .await?;

        info!(
            case_id = %case.id,
            outcome = command.outcome.as_str(),
            status = case.status.as_str(),
            payment_status = case.payment_status.as_str(),
            "Payment notification reconciled"
        );
        metrics::counter!(
            "payment_notifications_total",
            "outcome" => command.outcome.as_str()
        )
        .increment(1);

        Ok(case)
    }
}
