use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use kernel::model::{id::UserId, user::User};
use registry::AppRegistry;
use shared::error::AppError;

// X-User-Id ヘッダからリクエストの実行ユーザーを解決する。
// 認証基盤は別レイヤの想定で、ここでは存在するユーザーかどうかのみ確認する
pub struct AuthorizedUser {
    pub user: User,
}

impl AuthorizedUser {
    pub fn id(&self) -> UserId {
        self.user.user_id
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }
}

#[async_trait]
impl FromRequestParts<AppRegistry> for AuthorizedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        registry: &AppRegistry,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<UserId>().ok())
            .ok_or(AppError::UnauthenticatedError)?;

        let user = registry
            .user_repository()
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::UnauthenticatedError)?;

        Ok(Self { user })
    }
}
