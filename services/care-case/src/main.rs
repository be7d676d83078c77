//! Care Case Service - 病例工作流服务入口

use std::net::SocketAddr;
use std::sync::Arc;

use secrecy::ExposeSecret;
use tower_http::trace::TraceLayer;
use tracing::info;

use care_case::api::{AppState, api_routes};
use care_case::application::handlers::{
    CreateCaseHandler, InitiatePaymentHandler, PendingReviewHandler, ReconcilePaymentHandler,
    RegisterUserHandler, SubmitReviewHandler,
};
use care_case::infrastructure::payment::MercadoPagoClient;
use care_case::infrastructure::persistence::{
    PostgresCaseRepository, PostgresUserRepository, migrations,
};
use vita_adapter_postgres::{MigrationManager, PostgresConfig, create_pool};
use vita_config::AppConfig;
use vita_domain_core::{Currency, Money};
use vita_telemetry::{init_metrics, init_tracing, init_tracing_json};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load("config")?;

    if config.is_production() {
        init_tracing_json(&config.telemetry.log_level);
    } else {
        init_tracing(&config.telemetry.log_level);
    }
    let metrics_handle = init_metrics();

    info!(app = %config.app_name, env = %config.app_env, "Starting care-case service");

    // 数据库
    let pg_config = PostgresConfig::new(config.database.url.expose_secret())
        .with_max_connections(config.database.max_connections);
    let pool = create_pool(&pg_config).await?;
    MigrationManager::new(pool.clone())
        .apply(&migrations())
        .await?;

    // 仓储与网关（显式注入，无全局状态）
    let user_repo = Arc::new(PostgresUserRepository::new(pool.clone()));
    let case_repo = Arc::new(PostgresCaseRepository::new(pool));
    let gateway = Arc::new(MercadoPagoClient::new(config.payment.clone())?);

    let case_fee = Money::new(
        config.payment.case_fee_cents,
        Currency::new(&config.payment.currency),
    );

    let state = AppState {
        register_user: Arc::new(RegisterUserHandler::new(user_repo.clone())),
        create_case: Arc::new(CreateCaseHandler::new(
            user_repo.clone(),
            case_repo.clone(),
            case_fee,
        )),
        initiate_payment: Arc::new(InitiatePaymentHandler::new(
            user_repo.clone(),
            case_repo.clone(),
            gateway,
            config.payment.return_base_url.clone(),
        )),
        reconcile_payment: Arc::new(ReconcilePaymentHandler::new(case_repo.clone())),
        pending_review: Arc::new(PendingReviewHandler::new(
            user_repo.clone(),
            case_repo.clone(),
        )),
        submit_review: Arc::new(SubmitReviewHandler::new(user_repo, case_repo)),
        metrics: metrics_handle,
    };

    let app = api_routes(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Shutdown signal received");
}
