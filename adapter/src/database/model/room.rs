use kernel::model::{opening_hours::OpeningHours, room::Room, site::Site};
use kernel::timezone;
use shared::error::AppError;
use sqlx::types::Json;
use uuid::Uuid;

// rooms と sites を JOIN して取得する際に使う型。
// opening_hours は JSONB カラムで、デコード時に値の検証も行われる
#[derive(sqlx::FromRow)]
pub struct RoomWithSiteRow {
    pub room_id: Uuid,
    pub room_name: String,
    pub capacity: i32,
    pub opening_hours: Json<OpeningHours>,
    pub site_id: Uuid,
    pub site_name: String,
    pub timezone: String,
}

impl TryFrom<RoomWithSiteRow> for Room {
    type Error = AppError;

    fn try_from(value: RoomWithSiteRow) -> Result<Self, Self::Error> {
        let RoomWithSiteRow {
            room_id,
            room_name,
            capacity,
            opening_hours,
            site_id,
            site_name,
            timezone,
        } = value;
        Ok(Room {
            room_id: room_id.into(),
            room_name,
            capacity,
            opening_hours: opening_hours.0,
            site: Site {
                site_id: site_id.into(),
                site_name,
                timezone: timezone::parse_timezone(&timezone)?,
            },
        })
    }
}
