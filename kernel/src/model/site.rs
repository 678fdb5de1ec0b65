use chrono_tz::Tz;

use crate::model::id::SiteId;

// 拠点。タイムゾーンは IANA 名で保存され、読み出し時に Tz へ変換される。
// 既存予約の UTC 時刻は拠点のタイムゾーン変更に影響されない
#[derive(Debug, Clone)]
pub struct Site {
    pub site_id: SiteId,
    pub site_name: String,
    pub timezone: Tz,
}
