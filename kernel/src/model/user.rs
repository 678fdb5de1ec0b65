use crate::model::{id::UserId, role::Role};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// 予約に紐づくユーザーの最小限の情報
#[derive(Debug, Clone)]
pub struct BookingOwner {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct BookingAttendee {
    pub user_id: UserId,
    pub user_name: String,
}
