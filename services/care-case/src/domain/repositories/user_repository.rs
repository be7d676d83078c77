//! 用户仓储抽象

use async_trait::async_trait;
use vita_common::UserId;
use vita_errors::AppResult;

use crate::domain::entities::User;
use crate::domain::value_objects::Email;

/// 用户仓储
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> AppResult<Option<User>>;

    async fn find_by_email(&self, email: &Email) -> AppResult<Option<User>>;

    async fn save(&self, user: &User) -> AppResult<()>;
}
