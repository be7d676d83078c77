//! 命令定义

use serde::Serialize;
use vita_common::{CaseId, UserId};
use vita_cqrs_core::Command;

use crate::domain::entities::{Case, PaymentOutcome, ReviewDecision, User};

/// 注册用户
#[derive(Debug, Clone)]
pub struct RegisterUserCommand {
    pub email: String,
    pub full_name: String,
    /// "patient" 或 "doctor"
    pub role: String,
    pub license_number: Option<String>,
    pub license_region: Option<String>,
    pub national_id: Option<String>,
    pub phone: Option<String>,
}

impl Command for RegisterUserCommand {
    type Result = User;
}

/// 患者创建病例
#[derive(Debug, Clone)]
pub struct CreateCaseCommand {
    pub patient_id: UserId,
    pub request_type: String,
}

impl Command for CreateCaseCommand {
    type Result = Case;
}

/// 发起支付
#[derive(Debug, Clone)]
pub struct InitiatePaymentCommand {
    pub actor_id: UserId,
    pub case_id: CaseId,
}

/// 发起支付的结果：跳转地址与网关支付标识
#[derive(Debug, Clone, Serialize)]
pub struct PaymentCheckout {
    pub redirect_url: String,
    pub payment_reference: String,
}

impl Command for InitiatePaymentCommand {
    type Result = PaymentCheckout;
}

/// 应用一条异步支付结果通知
#[derive(Debug, Clone)]
pub struct ReconcilePaymentCommand {
    pub case_id: CaseId,
    pub outcome: PaymentOutcome,
}

impl Command for ReconcilePaymentCommand {
    type Result = Case;
}

/// 医生提交评审
#[derive(Debug, Clone)]
pub struct SubmitReviewCommand {
    pub actor_id: UserId,
    pub case_id: CaseId,
    pub decision: ReviewDecision,
}

impl Command for SubmitReviewCommand {
    type Result = Case;
}
