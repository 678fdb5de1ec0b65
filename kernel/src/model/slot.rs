use chrono::{DateTime, Duration, NaiveDateTime, NaiveTime, Timelike, Utc};

use crate::model::id::{RoomId, UserId};
use shared::error::{AppError, AppResult};

// 予約の最小単位は 30 分。スロットは :00 / :30 境界に固定される
pub const SLOT_MINUTES: i64 = 30;

pub fn slot_duration() -> Duration {
    Duration::minutes(SLOT_MINUTES)
}

// 時刻が :00 / :30 境界に載っているか
pub fn is_half_hour_boundary(time: NaiveTime) -> bool {
    time.minute() % 30 == 0 && time.second() == 0 && time.nanosecond() == 0
}

pub fn is_slot_aligned(time: NaiveDateTime) -> bool {
    is_half_hour_boundary(time.time())
}

// 空き状況グリッド上の 1 スロットの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    Available,
    Past,
    OwnBooking,
    Attending,
    OtherBooking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub status: SlotStatus,
}

// ストレージから読み出した、すでに押さえられているスロット 1 件分。
// (room_id, slot_start_utc) が衝突検出の単位になる
#[derive(Debug, Clone)]
pub struct SlotClaim {
    pub room_id: RoomId,
    pub slot_start_utc: DateTime<Utc>,
    pub owner_id: UserId,
    pub attendee_ids: Vec<UserId>,
}

// 閲覧ユーザーから見た、押さえ済みスロットとの関係
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedSlotInfo {
    pub is_own_booking: bool,
    pub is_attending: bool,
}

// [start_utc, end_utc) を 30 分刻みのスロット開始時刻へ分解する。
// 区間長が 30 分の正の整数倍でない場合はエラー
pub fn enumerate_slot_starts(
    start_utc: DateTime<Utc>,
    end_utc: DateTime<Utc>,
) -> AppResult<Vec<DateTime<Utc>>> {
    if end_utc <= start_utc {
        return Err(AppError::Validation {
            code: "end_not_after_start",
            message: "終了時刻は開始時刻より後を指定してください".into(),
        });
    }
    let span = end_utc - start_utc;
    if span.num_seconds() % (SLOT_MINUTES * 60) != 0 {
        return Err(AppError::Validation {
            code: "not_slot_multiple",
            message: "予約時間は 30 分単位で指定してください".into(),
        });
    }
    let mut starts = Vec::with_capacity((span.num_minutes() / SLOT_MINUTES) as usize);
    let mut cursor = start_utc;
    while cursor < end_utc {
        starts.push(cursor);
        cursor += slot_duration();
    }
    Ok(starts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn one_hour_booking_decomposes_into_two_slots() {
        // NY 14:00-15:00（EDT）は 18:00Z と 18:30Z の 2 スロット
        let starts = enumerate_slot_starts(utc(2025, 10, 7, 18, 0), utc(2025, 10, 7, 19, 0)).unwrap();
        assert_eq!(starts, vec![utc(2025, 10, 7, 18, 0), utc(2025, 10, 7, 18, 30)]);
    }

    #[test]
    fn single_slot_booking_is_allowed() {
        let starts = enumerate_slot_starts(utc(2025, 10, 7, 9, 30), utc(2025, 10, 7, 10, 0)).unwrap();
        assert_eq!(starts.len(), 1);
    }

    #[test]
    fn end_before_or_at_start_is_rejected() {
        let at = utc(2025, 10, 7, 9, 0);
        assert!(enumerate_slot_starts(at, at).is_err());
        assert!(enumerate_slot_starts(at, utc(2025, 10, 7, 8, 0)).is_err());
    }

    #[test]
    fn non_multiple_of_thirty_minutes_is_rejected() {
        let res = enumerate_slot_starts(utc(2025, 10, 7, 9, 0), utc(2025, 10, 7, 9, 45));
        let Err(AppError::Validation { code, .. }) = res else {
            panic!("expected validation error");
        };
        assert_eq!(code, "not_slot_multiple");
    }

    #[test]
    fn alignment_checks_local_half_hour_boundaries() {
        let d = NaiveDate::from_ymd_opt(2025, 10, 7).unwrap();
        assert!(is_slot_aligned(d.and_hms_opt(14, 0, 0).unwrap()));
        assert!(is_slot_aligned(d.and_hms_opt(14, 30, 0).unwrap()));
        assert!(!is_slot_aligned(d.and_hms_opt(14, 15, 0).unwrap()));
        assert!(!is_slot_aligned(d.and_hms_opt(14, 0, 30).unwrap()));
    }
}
