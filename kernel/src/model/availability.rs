use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::model::{
    id::{RoomId, UserId},
    opening_hours::OpeningHours,
    room::Room,
    slot::{slot_duration, BookedSlotInfo, Slot, SlotClaim, SlotStatus},
};
use crate::timezone;

// ローカル日付 1 日分のスロット列。閉鎖日は slots が空になる。
// 営業時間外の時刻はスロット自体を生成しない（不在 = 閉鎖の表現）
#[derive(Debug, Clone)]
pub struct DayGrid {
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone)]
pub struct RoomAvailability {
    pub room: Room,
    pub days: Vec<DayGrid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvailabilitySummary {
    pub available_slots: usize,
    pub occupied_slots: usize,
}

// UTC の日付範囲 [from, to) が重なるローカル日付ごとにスロットグリッドを生成する。
// タイムゾーンオフセットの分だけローカル日付は UTC の範囲から前後に 1 日ずれうる
pub fn build_day_grids(
    opening_hours: &OpeningHours,
    tz: Tz,
    from_date_utc: NaiveDate,
    to_date_utc_exclusive: NaiveDate,
    now: DateTime<Utc>,
    booked: &HashMap<DateTime<Utc>, BookedSlotInfo>,
) -> Vec<DayGrid> {
    if to_date_utc_exclusive <= from_date_utc {
        return Vec::new();
    }
    let range_start = from_date_utc.and_time(NaiveTime::MIN).and_utc();
    let range_end = to_date_utc_exclusive.and_time(NaiveTime::MIN).and_utc();

    let local_first = range_start.with_timezone(&tz).date_naive();
    let local_last = (range_end - Duration::seconds(1))
        .with_timezone(&tz)
        .date_naive();

    let mut grids = Vec::new();
    let mut date = local_first;
    while date <= local_last {
        grids.push(DayGrid {
            date,
            slots: day_slots(opening_hours, tz, date, now, booked),
        });
        let Some(next) = date.succ_opt() else { break };
        date = next;
    }
    grids
}

fn day_slots(
    opening_hours: &OpeningHours,
    tz: Tz,
    date: NaiveDate,
    now: DateTime<Utc>,
    booked: &HashMap<DateTime<Utc>, BookedSlotInfo>,
) -> Vec<Slot> {
    let Some(window) = opening_hours.day_window(date.weekday()) else {
        // 閉鎖日はスロットなし
        return Vec::new();
    };
    let mut slots = Vec::new();
    let mut time = window.open();
    while time < window.close() {
        // DST の切り替えで存在しないローカル時刻はスキップする
        if let Some(start_utc) = timezone::local_to_utc(tz, date.and_time(time)) {
            let end_utc = start_utc + slot_duration();
            let status = match booked.get(&start_utc) {
                Some(info) if info.is_own_booking => SlotStatus::OwnBooking,
                Some(info) if info.is_attending => SlotStatus::Attending,
                Some(_) => SlotStatus::OtherBooking,
                None if end_utc <= now => SlotStatus::Past,
                None => SlotStatus::Available,
            };
            slots.push(Slot {
                start_utc,
                end_utc,
                status,
            });
        }
        let (next, wrapped) = time.overflowing_add_signed(slot_duration());
        if wrapped != 0 {
            break;
        }
        time = next;
    }
    slots
}

// 取得済みのスロット一覧を、閲覧ユーザーから見た関係つきの
// room_id -> slot_start_utc -> BookedSlotInfo の索引に組み替える
pub fn booked_map_for_user(
    claims: &[SlotClaim],
    viewer: Option<UserId>,
) -> HashMap<RoomId, HashMap<DateTime<Utc>, BookedSlotInfo>> {
    let mut map: HashMap<RoomId, HashMap<DateTime<Utc>, BookedSlotInfo>> = HashMap::new();
    for claim in claims {
        let info = BookedSlotInfo {
            is_own_booking: viewer.is_some_and(|u| claim.owner_id == u),
            is_attending: viewer.is_some_and(|u| claim.attendee_ids.contains(&u)),
        };
        map.entry(claim.room_id)
            .or_default()
            .insert(claim.slot_start_utc, info);
    }
    map
}

// 対象日（ローカル日付）について全部屋分の空き・使用中スロット数を集計する
pub fn summarize(rooms: &[RoomAvailability], target_date: NaiveDate) -> AvailabilitySummary {
    let mut summary = AvailabilitySummary::default();
    for room in rooms {
        for day in room.days.iter().filter(|d| d.date == target_date) {
            for slot in &day.slots {
                match slot.status {
                    SlotStatus::Available => summary.available_slots += 1,
                    SlotStatus::OwnBooking | SlotStatus::Attending | SlotStatus::OtherBooking => {
                        summary.occupied_slots += 1
                    }
                    SlotStatus::Past => {}
                }
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tz(name: &str) -> Tz {
        name.parse().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap().and_utc()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn hours_8_to_18() -> OpeningHours {
        OpeningHours::uniform(t(8, 0), t(18, 0)).unwrap()
    }

    #[test]
    fn covers_local_dates_overlapping_the_utc_range() {
        // NY はUTC-4 なので 10-07 00:00Z は前日のローカル夕方。
        // [10-07, 10-09) の UTC 範囲はローカル日付 10-06..=10-08 と重なる
        let grids = build_day_grids(
            &hours_8_to_18(),
            tz("America/New_York"),
            date(2025, 10, 7),
            date(2025, 10, 9),
            utc(2025, 10, 1, 0, 0),
            &HashMap::new(),
        );
        let dates: Vec<NaiveDate> = grids.iter().map(|g| g.date).collect();
        assert_eq!(
            dates,
            vec![date(2025, 10, 6), date(2025, 10, 7), date(2025, 10, 8)]
        );
    }

    #[test]
    fn all_slots_stay_inside_the_opening_window() {
        let hours = hours_8_to_18();
        let zone = tz("America/New_York");
        let grids = build_day_grids(
            &hours,
            zone,
            date(2025, 10, 7),
            date(2025, 10, 8),
            utc(2025, 10, 1, 0, 0),
            &HashMap::new(),
        );
        for grid in &grids {
            // 08:00-18:00 は 30 分スロット 20 個
            assert_eq!(grid.slots.len(), 20, "{}", grid.date);
            for slot in &grid.slots {
                let local = crate::timezone::utc_to_local(zone, slot.start_utc);
                assert_eq!(local.date(), grid.date);
                assert!(hours.is_open(grid.date.weekday(), local.time()));
            }
        }
        // 10-07 のローカル 08:00 は EDT で 12:00Z
        let oct7 = grids.iter().find(|g| g.date == date(2025, 10, 7)).unwrap();
        assert_eq!(oct7.slots[0].start_utc, utc(2025, 10, 7, 12, 0));
        assert_eq!(oct7.slots[19].start_utc, utc(2025, 10, 7, 21, 30));
    }

    #[test]
    fn slot_iteration_stops_at_the_closing_boundary() {
        // 営業終了が日付の終わり近くでも、スロットは close でちょうど止まる
        let hours = OpeningHours::uniform(t(23, 0), t(23, 30)).unwrap();
        let grids = build_day_grids(
            &hours,
            tz("UTC"),
            date(2025, 10, 7),
            date(2025, 10, 8),
            utc(2025, 10, 1, 0, 0),
            &HashMap::new(),
        );
        assert_eq!(grids.len(), 1);
        assert_eq!(grids[0].slots.len(), 1);
        assert_eq!(grids[0].slots[0].start_utc, utc(2025, 10, 7, 23, 0));
        assert_eq!(grids[0].slots[0].end_utc, utc(2025, 10, 7, 23, 30));
    }

    #[test]
    fn closed_day_yields_empty_slot_sequence() {
        // 日曜を閉鎖日にする
        let json = serde_json::json!({
            "monday": { "open": "08:00", "close": "18:00" },
            "tuesday": { "open": "08:00", "close": "18:00" },
            "wednesday": { "open": "08:00", "close": "18:00" },
            "thursday": { "open": "08:00", "close": "18:00" },
            "friday": { "open": "08:00", "close": "18:00" },
            "saturday": { "open": "08:00", "close": "18:00" },
            "sunday": null,
        });
        let hours: OpeningHours = serde_json::from_value(json).unwrap();
        // 2025-10-05 は日曜
        let grids = build_day_grids(
            &hours,
            tz("Asia/Shanghai"),
            date(2025, 10, 5),
            date(2025, 10, 6),
            utc(2025, 10, 1, 0, 0),
            &HashMap::new(),
        );
        let sunday = grids.iter().find(|g| g.date == date(2025, 10, 5)).unwrap();
        assert!(sunday.slots.is_empty());
    }

    #[test]
    fn past_range_yields_past_slots_never_available() {
        let grids = build_day_grids(
            &hours_8_to_18(),
            tz("Asia/Shanghai"),
            date(2025, 10, 7),
            date(2025, 10, 8),
            // 評価時点が範囲より十分あと
            utc(2025, 12, 1, 0, 0),
            &HashMap::new(),
        );
        for grid in &grids {
            for slot in &grid.slots {
                assert_eq!(slot.status, SlotStatus::Past);
            }
        }
    }

    #[test]
    fn booked_slots_report_relationship_to_viewer() {
        let me = UserId::new();
        let someone = UserId::new();
        let room_id = RoomId::new();
        let claims = vec![
            SlotClaim {
                room_id,
                slot_start_utc: utc(2025, 10, 7, 18, 0),
                owner_id: me,
                attendee_ids: vec![],
            },
            SlotClaim {
                room_id,
                slot_start_utc: utc(2025, 10, 7, 18, 30),
                owner_id: someone,
                attendee_ids: vec![me],
            },
            SlotClaim {
                room_id,
                slot_start_utc: utc(2025, 10, 7, 19, 0),
                owner_id: someone,
                attendee_ids: vec![],
            },
        ];
        let map = booked_map_for_user(&claims, Some(me));
        let booked = map.get(&room_id).unwrap();

        let grids = build_day_grids(
            &hours_8_to_18(),
            tz("America/New_York"),
            date(2025, 10, 7),
            date(2025, 10, 8),
            utc(2025, 10, 7, 12, 0),
            booked,
        );
        let oct7 = grids.iter().find(|g| g.date == date(2025, 10, 7)).unwrap();
        let status_of = |h: u32, m: u32| {
            oct7.slots
                .iter()
                .find(|s| s.start_utc == utc(2025, 10, 7, h, m))
                .unwrap()
                .status
        };
        assert_eq!(status_of(18, 0), SlotStatus::OwnBooking);
        assert_eq!(status_of(18, 30), SlotStatus::Attending);
        assert_eq!(status_of(19, 0), SlotStatus::OtherBooking);
        assert_eq!(status_of(19, 30), SlotStatus::Available);
    }

    #[test]
    fn anonymous_viewer_sees_other_booking_only() {
        let claims = vec![SlotClaim {
            room_id: RoomId::new(),
            slot_start_utc: utc(2025, 10, 7, 18, 0),
            owner_id: UserId::new(),
            attendee_ids: vec![UserId::new()],
        }];
        let map = booked_map_for_user(&claims, None);
        let info = map
            .values()
            .next()
            .unwrap()
            .get(&utc(2025, 10, 7, 18, 0))
            .unwrap();
        assert!(!info.is_own_booking);
        assert!(!info.is_attending);
    }

    #[test]
    fn dst_transition_shifts_utc_instants_by_one_hour() {
        let zone = tz("America/New_York");
        let grids = build_day_grids(
            &hours_8_to_18(),
            zone,
            date(2025, 11, 1),
            date(2025, 11, 4),
            utc(2025, 10, 1, 0, 0),
            &HashMap::new(),
        );
        let first_slot = |d: NaiveDate| {
            grids
                .iter()
                .find(|g| g.date == d)
                .unwrap()
                .slots[0]
                .start_utc
        };
        // 11-01 は EDT、11-03 は EST。同じローカル 08:00 の UTC が 1 時間ずれる
        assert_eq!(first_slot(date(2025, 11, 1)), utc(2025, 11, 1, 12, 0));
        assert_eq!(first_slot(date(2025, 11, 3)), utc(2025, 11, 3, 13, 0));
        // 切り替え日当日もスロット数は変わらない（重複時間帯は営業時間外）
        let nov2 = grids.iter().find(|g| g.date == date(2025, 11, 2)).unwrap();
        assert_eq!(nov2.slots.len(), 20);
    }

    #[test]
    fn summary_counts_target_date_only() {
        let me = UserId::new();
        let room_id = RoomId::new();
        let room = Room {
            room_id,
            room_name: "会議室A".into(),
            capacity: 4,
            opening_hours: hours_8_to_18(),
            site: crate::model::site::Site {
                site_id: crate::model::id::SiteId::new(),
                site_name: "上海".into(),
                timezone: tz("Asia/Shanghai"),
            },
        };
        let claims = vec![SlotClaim {
            room_id,
            slot_start_utc: utc(2025, 10, 7, 1, 0),
            owner_id: me,
            attendee_ids: vec![],
        }];
        let map = booked_map_for_user(&claims, Some(me));
        let days = build_day_grids(
            &room.opening_hours,
            room.site.timezone,
            date(2025, 10, 7),
            date(2025, 10, 9),
            utc(2025, 10, 1, 0, 0),
            map.get(&room_id).unwrap(),
        );
        let rooms = vec![RoomAvailability { room, days }];
        let summary = summarize(&rooms, date(2025, 10, 7));
        assert_eq!(summary.occupied_slots, 1);
        assert_eq!(summary.available_slots, 19);
    }
}
