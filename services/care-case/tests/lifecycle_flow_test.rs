//! 病例生命周期端到端测试
//!
//! 处理器 + 内存仓储 + 脚本化网关，覆盖正常路径与各类拒绝路径。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use vita_cqrs_core::{CommandHandler, QueryHandler};
use vita_errors::{AppError, AppResult};
use vita_ports::{PaymentGateway, PreferenceRequest, PreferenceResponse};

use care_case::application::commands::{
    CreateCaseCommand, InitiatePaymentCommand, ReconcilePaymentCommand, RegisterUserCommand,
    SubmitReviewCommand,
};
use care_case::application::handlers::{
    CreateCaseHandler, InitiatePaymentHandler, PendingReviewHandler, ReconcilePaymentHandler,
    RegisterUserHandler, SubmitReviewHandler,
};
use care_case::application::queries::PendingReviewQuery;
use care_case::domain::entities::{
    Case, CaseStatus, PaymentOutcome, PaymentStatus, ReviewDecision, User,
};
use care_case::domain::repositories::CaseRepository;
use care_case::infrastructure::persistence::{InMemoryCaseRepository, InMemoryUserRepository};
use vita_domain_core::Money;

/// 脚本化支付网关
struct ScriptedGateway {
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> AppResult<PreferenceResponse> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::payment_gateway(
                "provider returned 500 Internal Server Error: {\"message\":\"boom\"}",
            ));
        }
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PreferenceResponse {
            id: format!("pref-{}-{}", request.external_reference, n),
            redirect_url: format!("https://gateway.test/checkout/{}", n),
        })
    }
}

struct TestApp {
    case_repo: Arc<InMemoryCaseRepository>,
    gateway: Arc<ScriptedGateway>,
    register_user: RegisterUserHandler,
    create_case: CreateCaseHandler,
    initiate_payment: InitiatePaymentHandler,
    reconcile_payment: ReconcilePaymentHandler,
    pending_review: PendingReviewHandler,
    submit_review: SubmitReviewHandler,
}

fn setup() -> TestApp {
    let user_repo = Arc::new(InMemoryUserRepository::new());
    let case_repo = Arc::new(InMemoryCaseRepository::new());
    let gateway = Arc::new(ScriptedGateway::new());

    TestApp {
        case_repo: case_repo.clone(),
        gateway: gateway.clone(),
        register_user: RegisterUserHandler::new(user_repo.clone()),
        create_case: CreateCaseHandler::new(user_repo.clone(), case_repo.clone(), Money::brl(5000)),
        initiate_payment: InitiatePaymentHandler::new(
            user_repo.clone(),
            case_repo.clone(),
            gateway,
            "https://vita-care.test/",
        ),
        reconcile_payment: ReconcilePaymentHandler::new(case_repo.clone()),
        pending_review: PendingReviewHandler::new(user_repo.clone(), case_repo.clone()),
        submit_review: SubmitReviewHandler::new(user_repo, case_repo),
    }
}

async fn register_patient(app: &TestApp, email: &str) -> User {
    app.register_user
        .handle(RegisterUserCommand {
            email: email.to_string(),
            full_name: "Ana Souza".to_string(),
            role: "patient".to_string(),
            license_number: None,
            license_region: None,
            national_id: Some("123.456.789-00".to_string()),
            phone: None,
        })
        .await
        .expect("patient registration")
}

async fn register_doctor(app: &TestApp, email: &str) -> User {
    app.register_user
        .handle(RegisterUserCommand {
            email: email.to_string(),
            full_name: "Dr. Carlos Lima".to_string(),
            role: "doctor".to_string(),
            license_number: Some("123456".to_string()),
            license_region: Some("SP".to_string()),
            national_id: None,
            phone: None,
        })
        .await
        .expect("doctor registration")
}

async fn paid_case(app: &TestApp, patient: &User) -> Case {
    let case = app
        .create_case
        .handle(CreateCaseCommand {
            patient_id: patient.id,
            request_type: "prescription".to_string(),
        })
        .await
        .expect("case creation");

    app.reconcile_payment
        .handle(ReconcilePaymentCommand {
            case_id: case.id,
            outcome: PaymentOutcome::Success,
        })
        .await
        .expect("reconciliation")
}

/// 正常路径：创建 → 支付 → 对账 → 评审批准
#[tokio::test]
async fn test_full_lifecycle_happy_path() {
    let app = setup();
    let patient = register_patient(&app, "ana@example.com").await;
    let doctor = register_doctor(&app, "carlos@example.com").await;

    let case = app
        .create_case
        .handle(CreateCaseCommand {
            patient_id: patient.id,
            request_type: "prescription".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(case.status, CaseStatus::PendingPayment);

    let checkout = app
        .initiate_payment
        .handle(InitiatePaymentCommand {
            actor_id: patient.id,
            case_id: case.id,
        })
        .await
        .unwrap();
    assert!(checkout.redirect_url.starts_with("https://gateway.test/"));

    let stored = app.case_repo.find_by_id(&case.id).await.unwrap().unwrap();
    assert_eq!(
        stored.payment_reference.as_deref(),
        Some(checkout.payment_reference.as_str())
    );

    let reconciled = app
        .reconcile_payment
        .handle(ReconcilePaymentCommand {
            case_id: case.id,
            outcome: PaymentOutcome::Success,
        })
        .await
        .unwrap();
    assert_eq!(reconciled.status, CaseStatus::PendingReview);
    assert_eq!(reconciled.payment_status, PaymentStatus::Paid);

    let pending = app
        .pending_review
        .handle(PendingReviewQuery {
            actor_id: doctor.id,
        })
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, case.id);

    let reviewed = app
        .submit_review
        .handle(SubmitReviewCommand {
            actor_id: doctor.id,
            case_id: case.id,
            decision: ReviewDecision::Approve,
        })
        .await
        .unwrap();
    assert_eq!(reviewed.status, CaseStatus::Approved);
    assert_eq!(reviewed.doctor_id, Some(doctor.id));
}

/// 医生注册必须携带执业许可
#[tokio::test]
async fn test_register_doctor_requires_license() {
    let app = setup();
    let err = app
        .register_user
        .handle(RegisterUserCommand {
            email: "carlos@example.com".to_string(),
            full_name: "Dr. Carlos Lima".to_string(),
            role: "doctor".to_string(),
            license_number: None,
            license_region: None,
            national_id: None,
            phone: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

/// 重复邮箱注册被拒绝
#[tokio::test]
async fn test_register_duplicate_email_conflict() {
    let app = setup();
    register_patient(&app, "ana@example.com").await;

    let err = app
        .register_user
        .handle(RegisterUserCommand {
            email: "ana@example.com".to_string(),
            full_name: "Another Ana".to_string(),
            role: "patient".to_string(),
            license_number: None,
            license_region: None,
            national_id: None,
            phone: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

/// 医生不能以患者身份开病例
#[tokio::test]
async fn test_create_case_requires_patient_role() {
    let app = setup();
    let doctor = register_doctor(&app, "carlos@example.com").await;

    let err = app
        .create_case
        .handle(CreateCaseCommand {
            patient_id: doctor.id,
            request_type: "report".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

/// 只有病例所有者能发起支付
#[tokio::test]
async fn test_initiate_payment_requires_owner() {
    let app = setup();
    let patient = register_patient(&app, "ana@example.com").await;
    let other = register_patient(&app, "bia@example.com").await;

    let case = app
        .create_case
        .handle(CreateCaseCommand {
            patient_id: patient.id,
            request_type: "prescription".to_string(),
        })
        .await
        .unwrap();

    let err = app
        .initiate_payment
        .handle(InitiatePaymentCommand {
            actor_id: other.id,
            case_id: case.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

/// 已进入评审的病例不能再发起支付
#[tokio::test]
async fn test_initiate_payment_after_success_invalid_state() {
    let app = setup();
    let patient = register_patient(&app, "ana@example.com").await;
    let case = paid_case(&app, &patient).await;

    let err = app
        .initiate_payment
        .handle(InitiatePaymentCommand {
            actor_id: patient.id,
            case_id: case.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

/// 网关失败原样上抛，且病例状态不变
#[tokio::test]
async fn test_gateway_error_leaves_case_unchanged() {
    let app = setup();
    let patient = register_patient(&app, "ana@example.com").await;

    let case = app
        .create_case
        .handle(CreateCaseCommand {
            patient_id: patient.id,
            request_type: "prescription".to_string(),
        })
        .await
        .unwrap();

    app.gateway.set_failing(true);
    let err = app
        .initiate_payment
        .handle(InitiatePaymentCommand {
            actor_id: patient.id,
            case_id: case.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PaymentGateway(_)));

    let stored = app.case_repo.find_by_id(&case.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CaseStatus::PendingPayment);
    assert_eq!(stored.payment_status, PaymentStatus::Pending);
    assert!(stored.payment_reference.is_none());
}

/// 未知病例号的通知只影响它自己：返回 NotFound
#[tokio::test]
async fn test_reconcile_unknown_case_not_found() {
    let app = setup();

    let err = app
        .reconcile_payment
        .handle(ReconcilePaymentCommand {
            case_id: vita_common::CaseId::new(),
            outcome: PaymentOutcome::Success,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

/// 重复投递的 success 通知收敛到同一状态
#[tokio::test]
async fn test_duplicate_success_notification_idempotent() {
    let app = setup();
    let patient = register_patient(&app, "ana@example.com").await;
    let case = paid_case(&app, &patient).await;

    let replayed = app
        .reconcile_payment
        .handle(ReconcilePaymentCommand {
            case_id: case.id,
            outcome: PaymentOutcome::Success,
        })
        .await
        .unwrap();

    assert_eq!(replayed.status, CaseStatus::PendingReview);
    assert_eq!(replayed.payment_status, PaymentStatus::Paid);
    assert_eq!(replayed.doctor_id, case.doctor_id);
}

/// 支付失败不回滚状态，随后仍可再次发起支付
#[tokio::test]
async fn test_failure_then_reinitiate() {
    let app = setup();
    let patient = register_patient(&app, "ana@example.com").await;

    let case = app
        .create_case
        .handle(CreateCaseCommand {
            patient_id: patient.id,
            request_type: "report".to_string(),
        })
        .await
        .unwrap();

    let failed = app
        .reconcile_payment
        .handle(ReconcilePaymentCommand {
            case_id: case.id,
            outcome: PaymentOutcome::Failure,
        })
        .await
        .unwrap();
    assert_eq!(failed.status, CaseStatus::PendingPayment);
    assert_eq!(failed.payment_status, PaymentStatus::Failed);

    let checkout = app
        .initiate_payment
        .handle(InitiatePaymentCommand {
            actor_id: patient.id,
            case_id: case.id,
        })
        .await
        .expect("retry after failed payment");
    assert!(!checkout.payment_reference.is_empty());
}

/// 患者不能提交评审，且不留下任何状态变更
#[tokio::test]
async fn test_submit_review_by_patient_forbidden() {
    let app = setup();
    let patient = register_patient(&app, "ana@example.com").await;
    let case = paid_case(&app, &patient).await;

    let err = app
        .submit_review
        .handle(SubmitReviewCommand {
            actor_id: patient.id,
            case_id: case.id,
            decision: ReviewDecision::Approve,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let stored = app.case_repo.find_by_id(&case.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CaseStatus::PendingReview);
    assert!(stored.doctor_id.is_none());
}

/// 终态病例的评审被拒，字段保持不变
#[tokio::test]
async fn test_submit_review_on_approved_invalid_state() {
    let app = setup();
    let patient = register_patient(&app, "ana@example.com").await;
    let doctor = register_doctor(&app, "carlos@example.com").await;
    let other_doctor = register_doctor(&app, "diana@example.com").await;
    let case = paid_case(&app, &patient).await;

    app.submit_review
        .handle(SubmitReviewCommand {
            actor_id: doctor.id,
            case_id: case.id,
            decision: ReviewDecision::Approve,
        })
        .await
        .unwrap();

    let err = app
        .submit_review
        .handle(SubmitReviewCommand {
            actor_id: other_doctor.id,
            case_id: case.id,
            decision: ReviewDecision::Reject {
                reason: "changed my mind".to_string(),
            },
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    let stored = app.case_repo.find_by_id(&case.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CaseStatus::Approved);
    assert_eq!(stored.doctor_id, Some(doctor.id));
    assert!(stored.rejection_reason.is_none());
}

/// 驳回必须带非空原因
#[tokio::test]
async fn test_reject_without_reason_rejected() {
    let app = setup();
    let patient = register_patient(&app, "ana@example.com").await;
    let doctor = register_doctor(&app, "carlos@example.com").await;
    let case = paid_case(&app, &patient).await;

    let err = app
        .submit_review
        .handle(SubmitReviewCommand {
            actor_id: doctor.id,
            case_id: case.id,
            decision: ReviewDecision::Reject {
                reason: "".to_string(),
            },
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

/// 待评审列表按创建时间最早优先
#[tokio::test]
async fn test_pending_review_fifo_order() {
    let app = setup();
    let patient = register_patient(&app, "ana@example.com").await;
    let doctor = register_doctor(&app, "carlos@example.com").await;

    let first = paid_case(&app, &patient).await;
    let second = paid_case(&app, &patient).await;
    let third = paid_case(&app, &patient).await;

    let pending = app
        .pending_review
        .handle(PendingReviewQuery {
            actor_id: doctor.id,
        })
        .await
        .unwrap();

    let ids: Vec<_> = pending.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![first.id, second.id, third.id]);
}

/// 患者不能读取待评审列表
#[tokio::test]
async fn test_pending_review_requires_doctor() {
    let app = setup();
    let patient = register_patient(&app, "ana@example.com").await;

    let err = app
        .pending_review
        .handle(PendingReviewQuery {
            actor_id: patient.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}
