use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use chrono_tz::Tz;
use derive_new::new;

use crate::model::{
    id::{BookingId, RoomId, UserId},
    opening_hours::OpeningHours,
    slot::{enumerate_slot_starts, is_slot_aligned},
};
use crate::timezone;
use shared::error::{AppError, AppResult};

pub const MAX_ATTENDEES: usize = 3;

#[derive(new, Debug, Clone)]
pub struct CreateBooking {
    pub room_id: RoomId,
    pub owner_id: UserId,
    // 開始・終了は部屋の拠点タイムゾーンのローカル時刻で受け取る
    pub start_local: NaiveDateTime,
    pub end_local: NaiveDateTime,
    pub attendee_ids: Vec<UserId>,
    pub notes: Option<String>,
    // 呼び出し時点の「現在時刻」。過去判定と created_at に使う
    pub requested_at: DateTime<Utc>,
}

#[derive(new, Debug, Clone)]
pub struct CancelBooking {
    pub booking_id: BookingId,
    pub requested_user: UserId,
    pub requested_at: DateTime<Utc>,
}

// バリデーション通過後の確定済み時間幅。
// slot_starts が一意制約の対象になるスロット開始時刻の全列挙
#[derive(Debug, Clone)]
pub struct BookingSpan {
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub slot_starts: Vec<DateTime<Utc>>,
}

impl CreateBooking {
    // ストレージへ触れる前の事前チェック。ここで弾かれた場合
    // トランザクションは一切開始されない
    pub fn validate(&self, opening_hours: &OpeningHours, tz: Tz) -> AppResult<BookingSpan> {
        if self.attendee_ids.len() > MAX_ATTENDEES {
            return Err(AppError::Validation {
                code: "too_many_attendees",
                message: format!("参加者は {MAX_ATTENDEES} 名まで指定できます"),
            });
        }
        let mut seen = self.attendee_ids.clone();
        seen.sort();
        seen.dedup();
        if seen.len() != self.attendee_ids.len() {
            return Err(AppError::Validation {
                code: "duplicate_attendee",
                message: "同じ参加者を複数回指定することはできません".into(),
            });
        }

        if self.end_local <= self.start_local {
            return Err(AppError::Validation {
                code: "end_not_after_start",
                message: "終了時刻は開始時刻より後を指定してください".into(),
            });
        }
        if !is_slot_aligned(self.start_local) || !is_slot_aligned(self.end_local) {
            return Err(AppError::Validation {
                code: "not_slot_aligned",
                message: "開始・終了時刻は 00 分または 30 分を指定してください".into(),
            });
        }

        // 営業時間は日をまたがない（open < close）ため、ローカル日付をまたぐ
        // 予約は必ず閉鎖時間帯を含む。丸めずに拒否する
        if self.start_local.date() != self.end_local.date() {
            return Err(AppError::Validation {
                code: "outside_opening_hours",
                message: "予約は同一日の営業時間内に収めてください".into(),
            });
        }
        let weekday = self.start_local.date().weekday();
        let within_window = opening_hours
            .day_window(weekday)
            .map(|w| w.open() <= self.start_local.time() && self.end_local.time() <= w.close())
            .unwrap_or(false);
        if !within_window {
            return Err(AppError::Validation {
                code: "outside_opening_hours",
                message: "指定の時間帯は営業時間外です".into(),
            });
        }

        let Some(start_utc) = timezone::local_to_utc(tz, self.start_local) else {
            return Err(nonexistent_local_time(self.start_local));
        };
        let Some(end_utc) = timezone::local_to_utc(tz, self.end_local) else {
            return Err(nonexistent_local_time(self.end_local));
        };

        if start_utc < self.requested_at {
            return Err(AppError::Validation {
                code: "start_in_past",
                message: "過去の時刻から始まる予約はできません".into(),
            });
        }

        let slot_starts = enumerate_slot_starts(start_utc, end_utc)?;
        Ok(BookingSpan {
            start_utc,
            end_utc,
            slot_starts,
        })
    }
}

fn nonexistent_local_time(local: NaiveDateTime) -> AppError {
    AppError::Validation {
        code: "nonexistent_local_time",
        message: format!("{local} はこの拠点のタイムゾーンに存在しない時刻です"),
    }
}
