use chrono::{DateTime, NaiveDateTime, Utc};
use garde::Validate;
use kernel::model::{
    booking::{event::CreateBooking, Booking, BookingRoom},
    id::{BookingId, RoomId, SiteId, UserId},
    user::{BookingAttendee, BookingOwner},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    #[garde(skip)]
    pub room_id: RoomId,
    // 部屋の拠点タイムゾーンのローカル時刻で指定する
    #[garde(skip)]
    pub start_local: NaiveDateTime,
    #[garde(skip)]
    pub end_local: NaiveDateTime,
    #[garde(length(max = 3))]
    #[serde(default)]
    pub attendee_ids: Vec<UserId>,
    #[garde(skip)]
    pub notes: Option<String>,
}

impl CreateBookingRequest {
    pub fn into_event(self, owner_id: UserId, requested_at: DateTime<Utc>) -> CreateBooking {
        let CreateBookingRequest {
            room_id,
            start_local,
            end_local,
            attendee_ids,
            notes,
        } = self;
        CreateBooking::new(
            room_id,
            owner_id,
            start_local,
            end_local,
            attendee_ids,
            notes,
            requested_at,
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingsResponse {
    pub items: Vec<BookingResponse>,
}

impl From<Vec<Booking>> for BookingsResponse {
    fn from(value: Vec<Booking>) -> Self {
        Self {
            items: value.into_iter().map(BookingResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub booking_id: BookingId,
    pub owner: BookingOwnerResponse,
    pub room: BookingRoomResponse,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub attendees: Vec<BookingAttendeeResponse>,
}

impl From<Booking> for BookingResponse {
    fn from(value: Booking) -> Self {
        let Booking {
            booking_id,
            owner,
            room,
            start_utc,
            end_utc,
            canceled_at,
            notes,
            attendees,
        } = value;
        Self {
            booking_id,
            owner: owner.into(),
            room: room.into(),
            start_utc,
            end_utc,
            canceled_at,
            notes,
            attendees: attendees.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingOwnerResponse {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
}

impl From<BookingOwner> for BookingOwnerResponse {
    fn from(value: BookingOwner) -> Self {
        let BookingOwner {
            user_id,
            user_name,
            email,
        } = value;
        Self {
            user_id,
            user_name,
            email,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRoomResponse {
    pub room_id: RoomId,
    pub room_name: String,
    pub capacity: i32,
    pub site_id: SiteId,
    pub site_name: String,
    pub timezone: String,
}

impl From<BookingRoom> for BookingRoomResponse {
    fn from(value: BookingRoom) -> Self {
        let BookingRoom {
            room_id,
            room_name,
            capacity,
            site_id,
            site_name,
            timezone,
        } = value;
        Self {
            room_id,
            room_name,
            capacity,
            site_id,
            site_name,
            timezone: timezone.name().to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingAttendeeResponse {
    pub user_id: UserId,
    pub user_name: String,
}

impl From<BookingAttendee> for BookingAttendeeResponse {
    fn from(value: BookingAttendee) -> Self {
        let BookingAttendee { user_id, user_name } = value;
        Self { user_id, user_name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attendee_limit_is_enforced_by_request_validation() {
        let req: CreateBookingRequest = serde_json::from_value(serde_json::json!({
            "roomId": "019212f0-7b21-7d52-aaa1-000000000001",
            "startLocal": "2025-10-07T14:00:00",
            "endLocal": "2025-10-07T15:00:00",
            "attendeeIds": [
                "019212f0-7b21-7d52-aaa1-000000000011",
                "019212f0-7b21-7d52-aaa1-000000000012",
                "019212f0-7b21-7d52-aaa1-000000000013",
                "019212f0-7b21-7d52-aaa1-000000000014",
            ],
        }))
        .unwrap();
        assert!(req.validate(&()).is_err());
    }

    #[test]
    fn attendees_default_to_empty() {
        let req: CreateBookingRequest = serde_json::from_value(serde_json::json!({
            "roomId": "019212f0-7b21-7d52-aaa1-000000000001",
            "startLocal": "2025-10-07T14:00:00",
            "endLocal": "2025-10-07T15:00:00",
        }))
        .unwrap();
        assert!(req.validate(&()).is_ok());
        assert!(req.attendee_ids.is_empty());
        assert!(req.notes.is_none());
    }
}
