//! 病例实体与生命周期状态机
//!
//! 状态图：`pending_payment → pending_review → {approved | rejected}`，
//! 支付轴独立：`pending → {paid | failed}`。只有支付确认才能进入评审，
//! 终态之后不允许任何迁移。

use serde::{Deserialize, Serialize};
use vita_common::{AuditInfo, CaseId, UserId};
use vita_domain_core::{AggregateRoot, Entity, Money};
use vita_errors::{AppError, AppResult};

/// 病例状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    PendingPayment,
    PendingReview,
    Approved,
    Rejected,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_payment" => Some(Self::PendingPayment),
            "pending_review" => Some(Self::PendingReview),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// 终态：approved / rejected 之后不再迁移
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

/// 支付状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// 网关支付结果通知
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Success,
    Failure,
    Pending,
}

impl PaymentOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Pending => "pending",
        }
    }

    /// 映射为支付状态
    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            Self::Success => PaymentStatus::Paid,
            Self::Failure => PaymentStatus::Failed,
            Self::Pending => PaymentStatus::Pending,
        }
    }
}

/// 评审决定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject { reason: String },
}

/// 病例实体：一名患者的一次文书申请
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    /// 所属患者（唯一所有者）
    pub patient_id: UserId,
    /// 认领评审的医生，一次性写入
    pub doctor_id: Option<UserId>,
    /// 申请类别，如 "prescription" / "report"
    pub request_type: String,
    pub status: CaseStatus,
    pub payment_status: PaymentStatus,
    /// 网关侧支付标识，发起支付时写入
    pub payment_reference: Option<String>,
    /// 驳回原因，仅驳回时一次性写入
    pub rejection_reason: Option<String>,
    /// 固定费用
    pub fee: Money,
    pub audit_info: AuditInfo,
}

impl Case {
    pub fn new(patient_id: UserId, request_type: impl Into<String>, fee: Money) -> Self {
        Self {
            id: CaseId::new(),
            patient_id,
            doctor_id: None,
            request_type: request_type.into(),
            status: CaseStatus::PendingPayment,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            rejection_reason: None,
            fee,
            audit_info: AuditInfo::new(),
        }
    }

    pub fn is_awaiting_payment(&self) -> bool {
        self.status == CaseStatus::PendingPayment
    }

    pub fn is_awaiting_review(&self) -> bool {
        self.status == CaseStatus::PendingReview
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 记录网关返回的支付标识
    ///
    /// 仅在待支付状态下允许。已有未决标识时允许再次发起，
    /// 新标识覆盖旧标识（孤儿偏好由网关侧过期回收）。
    pub fn record_payment_reference(&mut self, reference: impl Into<String>) -> AppResult<()> {
        if self.status != CaseStatus::PendingPayment {
            return Err(AppError::invalid_state(format!(
                "case {} already paid or in review",
                self.id
            )));
        }
        self.payment_reference = Some(reference.into());
        self.audit_info.touch();
        Ok(())
    }

    /// 应用一次异步支付结果通知
    ///
    /// 支付状态按最后一次通知写入；仅当结果为 success 且病例仍处于
    /// 待支付状态时推进到待评审。重放的 success 通知是无操作，
    /// 不报错也不重复推进。返回本次是否发生了状态推进。
    pub fn apply_payment_outcome(&mut self, outcome: PaymentOutcome) -> bool {
        self.payment_status = outcome.payment_status();

        let advanced = outcome == PaymentOutcome::Success
            && self.status == CaseStatus::PendingPayment;
        if advanced {
            self.status = CaseStatus::PendingReview;
        }

        self.audit_info.touch();
        advanced
    }

    /// 批准病例
    pub fn approve(&mut self, doctor_id: UserId) -> AppResult<()> {
        self.ensure_reviewable()?;
        self.doctor_id = Some(doctor_id);
        self.status = CaseStatus::Approved;
        self.audit_info.touch();
        Ok(())
    }

    /// 驳回病例，必须给出非空原因
    pub fn reject(&mut self, doctor_id: UserId, reason: impl Into<String>) -> AppResult<()> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(AppError::validation(
                "rejection requires a non-empty reason",
            ));
        }
        self.ensure_reviewable()?;
        if self.rejection_reason.is_some() {
            return Err(AppError::conflict(format!(
                "case {} already has a rejection reason",
                self.id
            )));
        }
        self.doctor_id = Some(doctor_id);
        self.status = CaseStatus::Rejected;
        self.rejection_reason = Some(reason);
        self.audit_info.touch();
        Ok(())
    }

    fn ensure_reviewable(&self) -> AppResult<()> {
        if self.status != CaseStatus::PendingReview {
            return Err(AppError::invalid_state(format!(
                "case {} is not awaiting review (status: {})",
                self.id,
                self.status.as_str()
            )));
        }
        if self.doctor_id.is_some() {
            return Err(AppError::conflict(format!(
                "case {} was already claimed by another doctor",
                self.id
            )));
        }
        Ok(())
    }
}

impl Entity for Case {
    type Id = CaseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for Case {
    fn audit_info(&self) -> &AuditInfo {
        &self.audit_info
    }

    fn audit_info_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit_info
    }
}
