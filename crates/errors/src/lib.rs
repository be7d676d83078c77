//! vita-errors - 统一错误处理
//!
//! 基于 RFC 7807 Problem Details 规范

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn payment_gateway(msg: impl Into<String>) -> Self {
        Self::PaymentGateway(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Forbidden(_) => 403,
            Self::InvalidState(_) => 422,
            Self::Conflict(_) => 409,
            Self::PaymentGateway(_) => 502,
            Self::Database(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// 转换为 Problem Details
    pub fn to_problem_details(&self) -> ProblemDetails {
        ProblemDetails {
            r#type: self.problem_type(),
            title: self.problem_title(),
            status: self.status_code(),
            detail: self.to_string(),
            instance: None,
        }
    }

    fn problem_type(&self) -> String {
        match self {
            Self::NotFound(_) => "https://api.vita-care.com/problems/not-found".to_string(),
            Self::Validation(_) => "https://api.vita-care.com/problems/validation".to_string(),
            Self::Forbidden(_) => "https://api.vita-care.com/problems/forbidden".to_string(),
            Self::InvalidState(_) => "https://api.vita-care.com/problems/invalid-state".to_string(),
            Self::Conflict(_) => "https://api.vita-care.com/problems/conflict".to_string(),
            Self::PaymentGateway(_) => {
                "https://api.vita-care.com/problems/payment-gateway".to_string()
            }
            Self::Database(_) => "https://api.vita-care.com/problems/database".to_string(),
            Self::Internal(_) => "https://api.vita-care.com/problems/internal".to_string(),
        }
    }

    fn problem_title(&self) -> String {
        match self {
            Self::NotFound(_) => "Resource Not Found".to_string(),
            Self::Validation(_) => "Validation Error".to_string(),
            Self::Forbidden(_) => "Forbidden".to_string(),
            Self::InvalidState(_) => "Invalid State".to_string(),
            Self::Conflict(_) => "Conflict".to_string(),
            Self::PaymentGateway(_) => "Payment Gateway Error".to_string(),
            Self::Database(_) => "Database Error".to_string(),
            Self::Internal(_) => "Internal Server Error".to_string(),
        }
    }
}

/// RFC 7807 Problem Details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;
