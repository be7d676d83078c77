use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;
use vita_cqrs_core::CommandHandler;
use vita_errors::{AppError, AppResult};

use crate::application::commands::RegisterUserCommand;
use crate::domain::entities::{MedicalLicense, Role, User};
use crate::domain::repositories::UserRepository;
use crate::domain::value_objects::Email;

pub struct RegisterUserHandler {
    user_repo: Arc<dyn UserRepository>,
}

impl RegisterUserHandler {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }
}

#[async_trait]
impl CommandHandler<RegisterUserCommand> for RegisterUserHandler {
    async fn handle(&self, command: RegisterUserCommand) -> AppResult<User> {
        let email = Email::new(&command.email)
            .map_err(|e| AppError::validation(e.to_string()))?;

        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict(format!(
                "email {} already registered",
                email
            )));
        }

        let role = match command.role.as_str() {
            // 许可字段对患者注册无意义，静默忽略
            "patient" => Role::Patient,
            "doctor" => {
                let number = command
                    .license_number
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::validation("doctor registration requires a license number")
                    })?;
                let region = command
                    .license_region
                    .filter(|r| !r.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::validation("doctor registration requires a license region")
                    })?;
                Role::Doctor {
                    license: MedicalLicense::new(number, region),
                }
            }
            other => {
                return Err(AppError::validation(format!("unknown role: {}", other)));
            }
        };

        let mut user = User::new(email, command.full_name, role);
        if let Some(national_id) = command.national_id {
            user = user.with_national_id(national_id);
        }
        if let Some(phone) = command.phone {
            user = user.with_phone(phone);
        }

        self.user_repo.save(&user).await?;

        info!(user_id = %user.id, role = user.role.as_str(), "User registered");
        metrics::counter!("users_registered_total").increment(1);

        Ok(user)
    }
}
