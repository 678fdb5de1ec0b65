use crate::model::{id::RoomId, opening_hours::OpeningHours, site::Site};

// 会議室。必ずひとつの拠点に属し、営業時間は拠点のローカル時刻で持つ
#[derive(Debug, Clone)]
pub struct Room {
    pub room_id: RoomId,
    pub room_name: String,
    pub capacity: i32,
    pub opening_hours: OpeningHours,
    pub site: Site,
}
