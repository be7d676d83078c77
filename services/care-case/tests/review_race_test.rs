//! 并发竞争测试
//!
//! 重复/乱序的支付通知与并发的评审认领都必须收敛到唯一的持久化结果。

use std::sync::Arc;

use vita_common::UserId;
use vita_cqrs_core::CommandHandler;
use vita_domain_core::Money;
use vita_errors::AppError;

use care_case::application::commands::{ReconcilePaymentCommand, SubmitReviewCommand};
use care_case::application::handlers::{ReconcilePaymentHandler, SubmitReviewHandler};
use care_case::domain::entities::{
    Case, CaseStatus, MedicalLicense, PaymentOutcome, PaymentStatus, ReviewDecision, Role, User,
};
use care_case::domain::repositories::{CaseRepository, UserRepository};
use care_case::domain::value_objects::Email;
use care_case::infrastructure::persistence::{InMemoryCaseRepository, InMemoryUserRepository};

async fn seed_doctor(repo: &InMemoryUserRepository, email: &str) -> User {
    let doctor = User::new(
        Email::new(email).unwrap(),
        "Dr. Teste",
        Role::Doctor {
            license: MedicalLicense::new("654321", "RJ"),
        },
    );
    repo.save(&doctor).await.unwrap();
    doctor
}

async fn seed_pending_review_case(repo: &InMemoryCaseRepository) -> Case {
    let mut case = Case::new(UserId::new(), "prescription", Money::brl(5000));
    case.apply_payment_outcome(PaymentOutcome::Success);
    repo.create(&case).await.unwrap();
    case
}

/// 两名医生同时评审：恰好一个成功、一个 Conflict
#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_review_single_winner() {
    let user_repo = Arc::new(InMemoryUserRepository::new());
    let case_repo = Arc::new(InMemoryCaseRepository::new());
    let handler = Arc::new(SubmitReviewHandler::new(
        user_repo.clone(),
        case_repo.clone(),
    ));

    let doctor_a = seed_doctor(&user_repo, "a@example.com").await;
    let doctor_b = seed_doctor(&user_repo, "b@example.com").await;
    let case = seed_pending_review_case(&case_repo).await;

    let approve = {
        let handler = handler.clone();
        let case_id = case.id;
        tokio::spawn(async move {
            handler
                .handle(SubmitReviewCommand {
                    actor_id: doctor_a.id,
                    case_id,
                    decision: ReviewDecision::Approve,
                })
                .await
        })
    };
    let reject = {
        let handler = handler.clone();
        let case_id = case.id;
        tokio::spawn(async move {
            handler
                .handle(SubmitReviewCommand {
                    actor_id: doctor_b.id,
                    case_id,
                    decision: ReviewDecision::Reject {
                        reason: "illegible attachment".to_string(),
                    },
                })
                .await
        })
    };

    let results = vec![approve.await.unwrap(), reject.await.unwrap()];
    let ok_count = results.iter().filter(|r| r.is_ok()).count();
    let conflict_count = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::Conflict(_))))
        .count();

    assert_eq!(ok_count, 1, "exactly one reviewer must win");
    assert_eq!(conflict_count, 1, "the loser must observe a conflict");

    // 持久化结果唯一：胜者的决定完整落盘
    let stored = case_repo.find_by_id(&case.id).await.unwrap().unwrap();
    assert!(stored.status.is_terminal());
    assert!(stored.doctor_id.is_some());
    match stored.status {
        CaseStatus::Approved => assert!(stored.rejection_reason.is_none()),
        CaseStatus::Rejected => {
            assert_eq!(stored.rejection_reason.as_deref(), Some("illegible attachment"))
        }
        other => panic!("unexpected terminal status: {:?}", other),
    }
}

/// 并发重放的 success 通知只推进一次
#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_duplicate_success_notifications() {
    let case_repo = Arc::new(InMemoryCaseRepository::new());
    let handler = Arc::new(ReconcilePaymentHandler::new(case_repo.clone()));

    let case = Case::new(UserId::new(), "report", Money::brl(5000));
    case_repo.create(&case).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let handler = handler.clone();
        let case_id = case.id;
        tasks.push(tokio::spawn(async move {
            handler
                .handle(ReconcilePaymentCommand {
                    case_id,
                    outcome: PaymentOutcome::Success,
                })
                .await
        }));
    }

    for task in tasks {
        task.await.unwrap().expect("replayed success must not fail");
    }

    let stored = case_repo.find_by_id(&case.id).await.unwrap().unwrap();
    assert_eq!(stored.status, CaseStatus::PendingReview);
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
}

/// success 与乱序 pending 竞争：状态一旦推进不再回退，
/// 支付状态取最后一次落盘的通知
#[tokio::test(flavor = "multi_thread")]
async fn test_out_of_order_notifications_never_downgrade_status() {
    let case_repo = Arc::new(InMemoryCaseRepository::new());
    let handler = Arc::new(ReconcilePaymentHandler::new(case_repo.clone()));

    let case = Case::new(UserId::new(), "report", Money::brl(5000));
    case_repo.create(&case).await.unwrap();

    let mut tasks = Vec::new();
    for outcome in [
        PaymentOutcome::Success,
        PaymentOutcome::Pending,
        PaymentOutcome::Success,
        PaymentOutcome::Pending,
    ] {
        let handler = handler.clone();
        let case_id = case.id;
        tasks.push(tokio::spawn(async move {
            handler
                .handle(ReconcilePaymentCommand { case_id, outcome })
                .await
        }));
    }

    for task in tasks {
        task.await.unwrap().expect("notification must not fail");
    }

    let stored = case_repo.find_by_id(&case.id).await.unwrap().unwrap();
    // 至少应用过一次 success，状态必然已推进且不会被 pending 拉回
    assert_eq!(stored.status, CaseStatus::PendingReview);
    assert!(matches!(
        stored.payment_status,
        PaymentStatus::Paid | PaymentStatus::Pending
    ));
}
