//! 拠点タイムゾーンと UTC の相互変換。
//!
//! ローカル時刻→UTC の変換ポリシーはこのモジュールに集約する。
//! - DST の切り戻しで同じローカル時刻が 2 回現れる場合は「早い方の UTC 時刻」を採用する
//! - DST の切り替えで存在しないローカル時刻は None を返す
//!   （グリッド生成ではスキップ、予約バリデーションでは拒否される）

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use shared::error::{AppError, AppResult};

pub fn parse_timezone(name: &str) -> AppResult<Tz> {
    name.parse::<Tz>().map_err(|_| {
        AppError::ConversionEntityError(format!("不正な IANA タイムゾーン名です: {name}"))
    })
}

pub fn local_to_utc(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        // 切り戻しの重複時間帯は早い方の時刻で確定させる
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

pub fn utc_to_local(tz: Tz, instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}
