use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::model::{
    id::{BookingId, RoomId, SiteId},
    user::{BookingAttendee, BookingOwner},
};

pub mod event;

// 確定済みの予約。キャンセルされても行は残り、canceled_at で区別する
#[derive(Debug, Clone)]
pub struct Booking {
    pub booking_id: BookingId,
    pub owner: BookingOwner,
    pub room: BookingRoom,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub attendees: Vec<BookingAttendee>,
}

impl Booking {
    pub fn is_canceled(&self) -> bool {
        self.canceled_at.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct BookingRoom {
    pub room_id: RoomId,
    pub room_name: String,
    pub capacity: i32,
    pub site_id: SiteId,
    pub site_name: String,
    pub timezone: Tz,
}
