use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use vita_cqrs_core::CommandHandler;
use vita_errors::{AppError, AppResult};
use vita_ports::{BackUrls, PaymentGateway, PreferenceRequest};

use crate::application::commands::{InitiatePaymentCommand, PaymentCheckout};
use crate::domain::repositories::{CaseRepository, UserRepository};

pub struct InitiatePaymentHandler {
    user_repo: Arc<dyn UserRepository>,
    case_repo: Arc<dyn CaseRepository>,
    gateway: Arc<dyn PaymentGateway>,
    /// 支付完成后回跳的站点地址
    return_base_url: String,
}

impl InitiatePaymentHandler {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        case_repo: Arc<dyn CaseRepository>,
        gateway: Arc<dyn PaymentGateway>,
        return_base_url: impl Into<String>,
    ) -> Self {
        Self {
            user_repo,
            case_repo,
            gateway,
            return_base_url: return_base_url.into(),
        }
    }
}

#[async_trait]
impl CommandHandler<InitiatePaymentCommand> for InitiatePaymentHandler {
    async fn handle(&self, command: InitiatePaymentCommand) -> AppResult<PaymentCheckout> {
        let actor = self
            .user_repo
            .find_by_id(&command.actor_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", command.actor_id)))?;

        let case = self
            .case_repo
            .find_by_id(&command.case_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("case {}", command.case_id)))?;

        if case.patient_id != actor.id {
            return Err(AppError::forbidden("case belongs to another patient"));
        }

        if !case.is_awaiting_payment() {
            return Err(AppError::invalid_state(format!(
                "case {} already paid or in review",
                case.id
            )));
        }

        // 网关失败必须原样上抛，且不留下任何病例变更
        let preference = self
            .gateway
            .create_preference(&PreferenceRequest {
                title: format!("Medical document request ({})", case.request_type),
                amount: case.fee.clone(),
                payer_email: actor.email.to_string(),
                external_reference: case.id.to_string(),
                back_urls: BackUrls {
                    success: self.return_base_url.clone(),
                    failure: self.return_base_url.clone(),
                    pending: self.return_base_url.clone(),
                },
            })
            .await?;

        self.case_repo
            .record_payment_reference(&case.id, &preference.id)
            .await?;

        info!(case_id = %case.id, payment_reference = %preference.id, "Payment initiated");
        metrics::counter!("payments_initiated_total").increment(1);

        Ok(PaymentCheckout {
            redirect_url: preference.redirect_url,
            payment_reference: preference.id,
        })
    }
}
