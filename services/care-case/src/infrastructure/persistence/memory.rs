//! 内存仓储实现
//!
//! 单把互斥锁覆盖读-改-写全程，与 Postgres 实现提供同样的
//! 单病例事务边界。用于测试与本地运行。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use vita_common::{CaseId, UserId};
use vita_errors::{AppError, AppResult};

use crate::domain::entities::{Case, PaymentOutcome, ReviewDecision, User};
use crate::domain::repositories::{CaseRepository, UserRepository};
use crate::domain::value_objects::Email;

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>> {
        Ok(self.users.lock().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<User>> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|u| u.email == *email)
            .cloned())
    }

    async fn save(&self, user: &User) -> AppResult<()> {
        self.users.lock().await.insert(user.id, user.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryCaseRepository {
    cases: Mutex<HashMap<CaseId, Case>>,
}

impl InMemoryCaseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn find_by_id(&self, id: &CaseId) -> AppResult<Option<Case>> {
        Ok(self.cases.lock().await.get(id).cloned())
    }

    async fn create(&self, case: &Case) -> AppResult<()> {
        self.cases.lock().await.insert(case.id, case.clone());
        Ok(())
    }

    async fn list_pending_review(&self) -> AppResult<Vec<Case>> {
        let mut pending: Vec<Case> = self
            .cases
            .lock()
            .await
            .values()
            .filter(|c| c.is_awaiting_review())
            .cloned()
            .collect();
        pending.sort_by(|a, b| {
            a.audit_info
                .created_at
                .cmp(&b.audit_info.created_at)
                .then(a.id.0.cmp(&b.id.0))
        });
        Ok(pending)
    }

    async fn record_payment_reference(&self, id: &CaseId, reference: &str) -> AppResult<Case> {
        let mut cases = self.cases.lock().await;
        let case = cases
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("case {}", id)))?;

        case.record_payment_reference(reference)?;
        Ok(case.clone())
    }

    async fn apply_payment_outcome(
        &self,
        id: &CaseId,
        outcome: PaymentOutcome,
    ) -> AppResult<Case> {
        let mut cases = self.cases.lock().await;
        let case = cases
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("case {}", id)))?;

        case.apply_payment_outcome(outcome);
        Ok(case.clone())
    }

    async fn submit_review(
        &self,
        id: &CaseId,
        doctor_id: &UserId,
        decision: &ReviewDecision,
    ) -> AppResult<Case> {
        let mut cases = self.cases.lock().await;
        let case = cases
            .get_mut(id)
            .ok_or_else(|| AppError::not_found(format!("case {}", id)))?;

        // 与 Postgres 实现的比较交换同款条件：不满足即判输
        if !case.is_awaiting_review() || case.doctor_id.is_some() {
            return Err(AppError::conflict(format!(
                "case {} was already reviewed by another doctor",
                id
            )));
        }

        match decision {
            ReviewDecision::Approve => case.approve(*doctor_id)?,
            ReviewDecision::Reject { reason } => case.reject(*doctor_id, reason.clone())?,
        }
        Ok(case.clone())
    }
}
