//! 病例仓储抽象
//!
//! 对账与评审写入要求实现方提供单病例事务边界：读-改-写必须原子，
//! 两个并发的写入不得互相覆盖。

use async_trait::async_trait;
use vita_common::{CaseId, UserId};
use vita_errors::AppResult;

use crate::domain::entities::{Case, PaymentOutcome, ReviewDecision};

/// 病例仓储
#[async_trait]
pub trait CaseRepository: Send + Sync {
    async fn find_by_id(&self, id: &CaseId) -> AppResult<Option<Case>>;

    async fn create(&self, case: &Case) -> AppResult<()>;

    /// 待评审病例列表，按创建时间最早优先（医生之间先到先审）
    async fn list_pending_review(&self) -> AppResult<Vec<Case>>;

    /// 原子记录网关支付标识
    ///
    /// 仅当病例仍处于待支付状态时写入；否则返回 `InvalidState`，
    /// 未知病例返回 `NotFound`。
    async fn record_payment_reference(&self, id: &CaseId, reference: &str) -> AppResult<Case>;

    /// 原子应用支付结果通知
    ///
    /// 在同一事务边界内重新读取当前状态、应用实体迁移规则并写回，
    /// 因此同一病例的并发/重放通知不会重复推进状态。
    async fn apply_payment_outcome(&self, id: &CaseId, outcome: PaymentOutcome)
    -> AppResult<Case>;

    /// 比较并交换式评审写入，先提交者胜
    ///
    /// 写入条件：病例仍待评审且医生未被写入。条件不满足时，已存在的
    /// 病例返回 `Conflict`（输掉并发竞争），未知病例返回 `NotFound`。
    async fn submit_review(
        &self,
        id: &CaseId,
        doctor_id: &UserId,
        decision: &ReviewDecision,
    ) -> AppResult<Case>;
}
