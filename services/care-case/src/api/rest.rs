//! REST 路由与请求处理
//!
//! 身份由 `X-User-Id` 头给出：会话/Cookie 签发属于外部协作方，
//! 不在本服务内实现。

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use vita_common::{CaseId, UserId};
use vita_cqrs_core::{CommandHandler, QueryHandler};
use vita_errors::AppError;

use crate::application::commands::{
    CreateCaseCommand, InitiatePaymentCommand, PaymentCheckout, ReconcilePaymentCommand,
    RegisterUserCommand, SubmitReviewCommand,
};
use crate::application::handlers::{
    CreateCaseHandler, InitiatePaymentHandler, PendingReviewHandler, ReconcilePaymentHandler,
    RegisterUserHandler, SubmitReviewHandler,
};
use crate::application::queries::PendingReviewQuery;
use crate::domain::entities::{Case, PaymentOutcome, ReviewDecision, User};
use crate::error::ApiError;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub register_user: Arc<RegisterUserHandler>,
    pub create_case: Arc<CreateCaseHandler>,
    pub initiate_payment: Arc<InitiatePaymentHandler>,
    pub reconcile_payment: Arc<ReconcilePaymentHandler>,
    pub pending_review: Arc<PendingReviewHandler>,
    pub submit_review: Arc<SubmitReviewHandler>,
    pub metrics: PrometheusHandle,
}

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/users", post(register_user))
        .route("/cases", post(create_case))
        .route("/cases/pending-review", get(pending_review))
        .route("/cases/{id}/payment", post(initiate_payment))
        .route("/cases/{id}/review", post(submit_review))
        .route("/payments/notifications", post(payment_notification))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}

/// 从请求头解析操作者
fn actor_id(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let value = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::validation("missing X-User-Id header"))?;

    UserId::from_string(value)
        .map_err(|_| AppError::validation(format!("invalid X-User-Id header: {}", value)).into())
}

fn parse_case_id(raw: &str) -> Result<CaseId, ApiError> {
    CaseId::from_string(raw)
        .map_err(|_| AppError::validation(format!("invalid case id: {}", raw)).into())
}

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub license_number: Option<String>,
    pub license_region: Option<String>,
    pub national_id: Option<String>,
    pub phone: Option<String>,
}

async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .register_user
        .handle(RegisterUserCommand {
            email: request.email,
            full_name: request.full_name,
            role: request.role,
            license_number: request.license_number,
            license_region: request.license_region,
            national_id: request.national_id,
            phone: request.phone,
        })
        .await?;
    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct CreateCaseRequest {
    pub request_type: String,
}

async fn create_case(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateCaseRequest>,
) -> Result<Json<Case>, ApiError> {
    let patient_id = actor_id(&headers)?;
    let case = state
        .create_case
        .handle(CreateCaseCommand {
            patient_id,
            request_type: request.request_type,
        })
        .await?;
    Ok(Json(case))
}

async fn initiate_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<PaymentCheckout>, ApiError> {
    let actor = actor_id(&headers)?;
    let case_id = parse_case_id(&id)?;
    let checkout = state
        .initiate_payment
        .handle(InitiatePaymentCommand {
            actor_id: actor,
            case_id,
        })
        .await?;
    Ok(Json(checkout))
}

/// 支付结果通知（webhook 传输层之外的部分：签名校验不在本服务内）
#[derive(Debug, Deserialize)]
pub struct PaymentNotificationRequest {
    pub external_reference: String,
    pub outcome: PaymentOutcome,
}

async fn payment_notification(
    State(state): State<AppState>,
    Json(request): Json<PaymentNotificationRequest>,
) -> Result<Json<Case>, ApiError> {
    let case_id = parse_case_id(&request.external_reference)?;
    let case = state
        .reconcile_payment
        .handle(ReconcilePaymentCommand {
            case_id,
            outcome: request.outcome,
        })
        .await?;
    Ok(Json(case))
}

async fn pending_review(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Case>>, ApiError> {
    let actor = actor_id(&headers)?;
    let cases = state
        .pending_review
        .handle(PendingReviewQuery { actor_id: actor })
        .await?;
    Ok(Json(cases))
}

#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    /// "approve" 或 "reject"
    pub decision: String,
    pub rejection_reason: Option<String>,
}

async fn submit_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(request): Json<SubmitReviewRequest>,
) -> Result<Json<Case>, ApiError> {
    let actor = actor_id(&headers)?;
    let case_id = parse_case_id(&id)?;

    let decision = match request.decision.as_str() {
        "approve" => ReviewDecision::Approve,
        "reject" => ReviewDecision::Reject {
            reason: request.rejection_reason.unwrap_or_default(),
        },
        other => {
            return Err(AppError::validation(format!("unknown decision: {}", other)).into());
        }
    };

    let case = state
        .submit_review
        .handle(SubmitReviewCommand {
            actor_id: actor,
            case_id,
            decision,
        })
        .await?;
    Ok(Json(case))
}
