use std::str::FromStr;

use kernel::model::{role::Role, user::User};
use shared::error::AppError;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub struct UserRow {
    pub user_id: Uuid,
    pub user_name: String,
    pub email: String,
    pub role: String,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(value: UserRow) -> Result<Self, Self::Error> {
        let UserRow {
            user_id,
            user_name,
            email,
            role,
        } = value;
        Ok(User {
            user_id: user_id.into(),
            user_name,
            email,
            role: Role::from_str(&role)
                .map_err(|_| AppError::ConversionEntityError(format!("不明なロールです: {role}")))?,
        })
    }
}
