//! PostgreSQL 病例 Repository 实现
//!
//! 一致性要点：
//! - 对账走事务 + `SELECT ... FOR UPDATE`，在行锁内重新应用实体迁移
//!   规则，并发/重放通知因此安全；
//! - 评审写入是单语句比较交换（`status = 'pending_review' AND
//!   doctor_id IS NULL`），先提交者胜，零行更新再回读区分
//!   `NotFound` 与 `Conflict`。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vita_common::{AuditInfo, CaseId, UserId};
use vita_domain_core::{Currency, Money};
use vita_errors::{AppError, AppResult};

use crate::domain::entities::{Case, CaseStatus, PaymentOutcome, PaymentStatus, ReviewDecision};
use crate::domain::repositories::CaseRepository;

const CASE_COLUMNS: &str = "id, patient_id, doctor_id, request_type, status, payment_status, \
                            payment_reference, rejection_reason, fee_cents, fee_currency, \
                            created_at, updated_at";

pub struct PostgresCaseRepository {
    pool: PgPool,
}

impl PostgresCaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CaseRepository for PostgresCaseRepository {
    async fn find_by_id(&self, id: &CaseId) -> AppResult<Option<Case>> {
        let sql = format!("SELECT {} FROM cases WHERE id = $1", CASE_COLUMNS);
        let row = sqlx::query_as::<_, CaseRow>(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to find case: {}", e)))?;

        match row {
            Some(r) => Ok(Some(r.into_case()?)),
            None => Ok(None),
        }
    }

    async fn create(&self, case: &Case) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cases (id, patient_id, doctor_id, request_type, status, payment_status,
                               payment_reference, rejection_reason, fee_cents, fee_currency,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(case.id.0)
        .bind(case.patient_id.0)
        .bind(case.doctor_id.map(|d| d.0))
        .bind(&case.request_type)
        .bind(case.status.as_str())
        .bind(case.payment_status.as_str())
        .bind(&case.payment_reference)
        .bind(&case.rejection_reason)
        .bind(case.fee.amount)
        .bind(case.fee.currency.as_str())
        .bind(case.audit_info.created_at)
        .bind(case.audit_info.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create case: {}", e)))?;

        Ok(())
    }

    async fn list_pending_review(&self) -> AppResult<Vec<Case>> {
        let sql = format!(
            "SELECT {} FROM cases WHERE status = 'pending_review' ORDER BY created_at ASC, id ASC",
            CASE_COLUMNS
        );
        let rows = sqlx::query_as::<_, CaseRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list cases: {}", e)))?;

        rows.into_iter().map(|r| r.into_case()).collect()
    }

    async fn record_payment_reference(&self, id: &CaseId, reference: &str) -> AppResult<Case> {
        let sql = format!(
            r#"
            UPDATE cases
            SET payment_reference = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'pending_payment'
            RETURNING {}
            "#,
            CASE_COLUMNS
        );
        let row = sqlx::query_as::<_, CaseRow>(&sql)
            .bind(id.0)
            .bind(reference)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to record payment reference: {}", e)))?;

        match row {
            Some(r) => r.into_case(),
            None => match self.find_by_id(id).await? {
                Some(case) => Err(AppError::invalid_state(format!(
                    "case {} already paid or in review (status: {})",
                    case.id,
                    case.status.as_str()
                ))),
                None => Err(AppError::not_found(format!("case {}", id))),
            },
        }
    }

    async fn apply_payment_outcome(
        &self,
        id: &CaseId,
        outcome: PaymentOutcome,
    ) -> AppResult<Case> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin tx: {}", e)))?;

        let sql = format!(
            "SELECT {} FROM cases WHERE id = $1 FOR UPDATE",
            CASE_COLUMNS
        );
        let row = sqlx::query_as::<_, CaseRow>(&sql)
            .bind(id.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to lock case: {}", e)))?;

        let mut case = match row {
            Some(r) => r.into_case()?,
            None => return Err(AppError::not_found(format!("case {}", id))),
        };

        // 行锁之下重新应用迁移规则，而非沿用调用方的旧内存状态
        case.apply_payment_outcome(outcome);

        sqlx::query(
            "UPDATE cases SET status = $2, payment_status = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(case.id.0)
        .bind(case.status.as_str())
        .bind(case.payment_status.as_str())
        .bind(case.audit_info.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to update case: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit tx: {}", e)))?;

        Ok(case)
    }

    async fn submit_review(
        &self,
        id: &CaseId,
        doctor_id: &UserId,
        decision: &ReviewDecision,
    ) -> AppResult<Case> {
        let (status, rejection_reason) = match decision {
            ReviewDecision::Approve => (CaseStatus::Approved, None),
            ReviewDecision::Reject { reason } => (CaseStatus::Rejected, Some(reason.as_str())),
        };

        let sql = format!(
            r#"
            UPDATE cases
            SET doctor_id = $2, status = $3, rejection_reason = $4, updated_at = NOW()
            WHERE id = $1 AND status = 'pending_review' AND doctor_id IS NULL
            RETURNING {}
            "#,
            CASE_COLUMNS
        );
        let row = sqlx::query_as::<_, CaseRow>(&sql)
            .bind(id.0)
            .bind(doctor_id.0)
            .bind(status.as_str())
            .bind(rejection_reason)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to submit review: {}", e)))?;

        match row {
            Some(r) => r.into_case(),
            None => match self.find_by_id(id).await? {
                Some(_) => Err(AppError::conflict(format!(
                    "case {} was already reviewed by another doctor",
                    id
                ))),
                None => Err(AppError::not_found(format!("case {}", id))),
            },
        }
    }
}

/// 病例行
#[derive(Debug, sqlx::FromRow)]
struct CaseRow {
    id: Uuid,
    patient_id: Uuid,
    doctor_id: Option<Uuid>,
    request_type: String,
    status: String,
    payment_status: String,
    payment_reference: Option<String>,
    rejection_reason: Option<String>,
    fee_cents: i64,
    fee_currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CaseRow {
    fn into_case(self) -> AppResult<Case> {
        let status = CaseStatus::parse(&self.status)
            .ok_or_else(|| AppError::database(format!("unknown status column: {}", self.status)))?;
        let payment_status = PaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            AppError::database(format!(
                "unknown payment_status column: {}",
                self.payment_status
            ))
        })?;

        Ok(Case {
            id: CaseId::from_uuid(self.id),
            patient_id: UserId::from_uuid(self.patient_id),
            doctor_id: self.doctor_id.map(UserId::from_uuid),
            request_type: self.request_type,
            status,
            payment_status,
            payment_reference: self.payment_reference,
            rejection_reason: self.rejection_reason,
            fee: Money::new(self.fee_cents, Currency::new(&self.fee_currency)),
            audit_info: AuditInfo {
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        })
    }
}
