//! Email 值对象

use serde::{Deserialize, Serialize};
use std::fmt;

/// Email 值对象
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(pub String);

impl Email {
    /// 创建新的 Email
    pub fn new(email: impl Into<String>) -> Result<Self, EmailError> {
        let email = email.into();

        // 验证邮箱格式
        if !Self::is_valid(&email) {
            return Err(EmailError::InvalidFormat(email));
        }

        Ok(Self(email.to_lowercase()))
    }

    /// 验证邮箱格式
    fn is_valid(email: &str) -> bool {
        email.contains('@')
            && email.len() >= 3
            && email.len() <= 254
            && !email.starts_with('@')
            && !email.ends_with('@')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Email 错误
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}
