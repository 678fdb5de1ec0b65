use chrono::{DateTime, Utc};
use kernel::model::{
    booking::{Booking, BookingRoom},
    slot::SlotClaim,
    user::{BookingAttendee, BookingOwner},
};
use kernel::timezone;
use shared::error::AppError;
use uuid::Uuid;

// bookings / rooms / sites / users を JOIN して 1 件分の予約を
// 表示に必要な情報ごと取得する際に使う型
#[derive(sqlx::FromRow)]
pub struct BookingRow {
    pub booking_id: Uuid,
    pub room_id: Uuid,
    pub owner_id: Uuid,
    pub owner_name: String,
    pub email: String,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub room_name: String,
    pub capacity: i32,
    pub site_id: Uuid,
    pub site_name: String,
    pub timezone: String,
}

impl BookingRow {
    pub fn into_booking(self, attendees: Vec<BookingAttendeeRow>) -> Result<Booking, AppError> {
        let BookingRow {
            booking_id,
            room_id,
            owner_id,
            owner_name,
            email,
            start_utc,
            end_utc,
            canceled_at,
            notes,
            room_name,
            capacity,
            site_id,
            site_name,
            timezone,
        } = self;
        Ok(Booking {
            booking_id: booking_id.into(),
            owner: BookingOwner {
                user_id: owner_id.into(),
                user_name: owner_name,
                email,
            },
            room: BookingRoom {
                room_id: room_id.into(),
                room_name,
                capacity,
                site_id: site_id.into(),
                site_name,
                timezone: timezone::parse_timezone(&timezone)?,
            },
            start_utc,
            end_utc,
            canceled_at,
            notes,
            attendees: attendees.into_iter().map(BookingAttendee::from).collect(),
        })
    }
}

#[derive(sqlx::FromRow)]
pub struct BookingAttendeeRow {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
}

impl From<BookingAttendeeRow> for BookingAttendee {
    fn from(value: BookingAttendeeRow) -> Self {
        Self {
            user_id: value.user_id.into(),
            user_name: value.user_name,
        }
    }
}

// 空き状況グリッド用。スロット 1 行と、その予約の所有者・参加者を持つ
#[derive(sqlx::FromRow)]
pub struct SlotClaimRow {
    pub room_id: Uuid,
    pub slot_start_utc: DateTime<Utc>,
    pub owner_id: Uuid,
    pub attendee_ids: Vec<Uuid>,
}

impl From<SlotClaimRow> for SlotClaim {
    fn from(value: SlotClaimRow) -> Self {
        let SlotClaimRow {
            room_id,
            slot_start_utc,
            owner_id,
            attendee_ids,
        } = value;
        Self {
            room_id: room_id.into(),
            slot_start_utc,
            owner_id: owner_id.into(),
            attendee_ids: attendee_ids.into_iter().map(Into::into).collect(),
        }
    }
}
