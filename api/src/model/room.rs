use kernel::model::{
    id::{RoomId, SiteId},
    opening_hours::OpeningHours,
    room::Room,
    site::Site,
};
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomsResponse {
    pub items: Vec<RoomResponse>,
}

impl From<Vec<Room>> for RoomsResponse {
    fn from(value: Vec<Room>) -> Self {
        Self {
            items: value.into_iter().map(RoomResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub room_id: RoomId,
    pub room_name: String,
    pub capacity: i32,
    pub opening_hours: OpeningHours,
    pub site: SiteResponse,
}

impl From<Room> for RoomResponse {
    fn from(value: Room) -> Self {
        let Room {
            room_id,
            room_name,
            capacity,
            opening_hours,
            site,
        } = value;
        Self {
            room_id,
            room_name,
            capacity,
            opening_hours,
            site: site.into(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteResponse {
    pub site_id: SiteId,
    pub site_name: String,
    // IANA タイムゾーン名
    pub timezone: String,
}

impl From<Site> for SiteResponse {
    fn from(value: Site) -> Self {
        let Site {
            site_id,
            site_name,
            timezone,
        } = value;
        Self {
            site_id,
            site_name,
            timezone: timezone.name().to_string(),
        }
    }
}
