//! PostgreSQL 用户 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vita_common::{AuditInfo, UserId};
use vita_errors::{AppError, AppResult};

use crate::domain::entities::{MedicalLicense, Role, User};
use crate::domain::repositories::UserRepository;
use crate::domain::value_objects::Email;

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, full_name, role, license_number, license_region,
                   national_id, phone, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find user: {}", e)))?;

        match row {
            Some(r) => Ok(Some(r.into_user()?)),
            None => Ok(None),
        }
    }

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, full_name, role, license_number, license_region,
                   national_id, phone, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to find user: {}", e)))?;

        match row {
            Some(r) => Ok(Some(r.into_user()?)),
            None => Ok(None),
        }
    }

    async fn save(&self, user: &User) -> AppResult<()> {
        let license = user.role.license();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, full_name, role, license_number, license_region,
                               national_id, phone, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                full_name = EXCLUDED.full_name,
                national_id = EXCLUDED.national_id,
                phone = EXCLUDED.phone,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(user.id.0)
        .bind(user.email.as_str())
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(license.map(|l| l.number.as_str()))
        .bind(license.map(|l| l.region.as_str()))
        .bind(&user.national_id)
        .bind(&user.phone)
        .bind(user.audit_info.created_at)
        .bind(user.audit_info.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save user: {}", e)))?;

        Ok(())
    }
}

/// 用户行
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    full_name: String,
    role: String,
    license_number: Option<String>,
    license_region: Option<String>,
    national_id: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AppResult<User> {
        let email = Email::new(&self.email)
            .map_err(|e| AppError::database(format!("Corrupt email column: {}", e)))?;

        let role = match self.role.as_str() {
            "patient" => Role::Patient,
            "doctor" => {
                let number = self.license_number.ok_or_else(|| {
                    AppError::database("doctor row without license_number".to_string())
                })?;
                let region = self.license_region.ok_or_else(|| {
                    AppError::database("doctor row without license_region".to_string())
                })?;
                Role::Doctor {
                    license: MedicalLicense::new(number, region),
                }
            }
            other => {
                return Err(AppError::database(format!("unknown role column: {}", other)));
            }
        };

        Ok(User {
            id: UserId::from_uuid(self.id),
            email,
            full_name: self.full_name,
            role,
            national_id: self.national_id,
            phone: self.phone,
            audit_info: AuditInfo {
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
        })
    }
}
