use async_trait::async_trait;

use crate::model::{id::UserId, user::User};
use shared::error::AppResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    // リクエストに紐づくユーザーを解決する
    async fn find_by_id(&self, user_id: UserId) -> AppResult<Option<User>>;
}
