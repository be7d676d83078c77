//! 数据库迁移定义

use vita_adapter_postgres::Migration;

/// 本服务的全部迁移，按版本升序
pub fn migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "create_users",
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                full_name VARCHAR(255) NOT NULL,
                role VARCHAR(16) NOT NULL,
                license_number VARCHAR(64),
                license_region VARCHAR(16),
                national_id VARCHAR(32),
                phone VARCHAR(32),
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        ),
        Migration::new(
            2,
            "create_cases",
            r#"
            CREATE TABLE IF NOT EXISTS cases (
                id UUID PRIMARY KEY,
                patient_id UUID NOT NULL REFERENCES users(id),
                doctor_id UUID REFERENCES users(id),
                request_type VARCHAR(64) NOT NULL,
                status VARCHAR(32) NOT NULL,
                payment_status VARCHAR(16) NOT NULL,
                payment_reference VARCHAR(255),
                rejection_reason TEXT,
                fee_cents BIGINT NOT NULL,
                fee_currency VARCHAR(8) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        ),
        Migration::new(
            3,
            "index_cases_pending_review",
            "CREATE INDEX IF NOT EXISTS idx_cases_status_created ON cases (status, created_at)",
        ),
    ]
}
