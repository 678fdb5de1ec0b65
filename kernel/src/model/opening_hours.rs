use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::slot::is_half_hour_boundary;

#[derive(Debug, Error)]
pub enum OpeningHoursError {
    #[error("時刻の形式が不正です（HH:MM 形式で指定してください）: {0}")]
    InvalidTime(String),
    #[error("{weekday} の開店時刻 {open} は閉店時刻 {close} より前である必要があります")]
    OpenNotBeforeClose {
        weekday: String,
        open: String,
        close: String,
    },
    #[error("{weekday} の時刻 {time} は 00 分または 30 分境界に載っていません")]
    MisalignedTime { weekday: String, time: String },
}

// 1 日分の営業時間帯。open < close が常に成り立ち、
// どちらも :00 / :30 境界に載っている。
// 「終日閉鎖」は DayWindow ではなく None で表現する
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    open: NaiveTime,
    close: NaiveTime,
}

impl DayWindow {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Result<Self, OpeningHoursError> {
        if open >= close {
            return Err(OpeningHoursError::OpenNotBeforeClose {
                weekday: String::new(),
                open: open.format("%H:%M").to_string(),
                close: close.format("%H:%M").to_string(),
            });
        }
        // 境界に載っていない営業時間は、予約できないスロットを
        // グリッドへ並べてしまうため作らせない
        for time in [open, close] {
            if !is_half_hour_boundary(time) {
                return Err(OpeningHoursError::MisalignedTime {
                    weekday: String::new(),
                    time: time.format("%H:%M:%S").to_string(),
                });
            }
        }
        Ok(Self { open, close })
    }

    pub fn open(&self) -> NaiveTime {
        self.open
    }

    pub fn close(&self) -> NaiveTime {
        self.close
    }

    pub fn contains(&self, time: NaiveTime) -> bool {
        self.open <= time && time < self.close
    }
}

// 曜日ごとの営業時間。月曜始まりの 7 要素で保持する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OpeningHoursDoc", into = "OpeningHoursDoc")]
pub struct OpeningHours {
    windows: [Option<DayWindow>; 7],
}

impl OpeningHours {
    pub fn new(windows: [Option<DayWindow>; 7]) -> Self {
        Self { windows }
    }

    // 全曜日同じ時間帯で営業する設定を作る（シードやテスト用）
    pub fn uniform(open: NaiveTime, close: NaiveTime) -> Result<Self, OpeningHoursError> {
        let window = DayWindow::new(open, close)?;
        Ok(Self {
            windows: [Some(window); 7],
        })
    }

    pub fn day_window(&self, weekday: Weekday) -> Option<&DayWindow> {
        self.windows[weekday.num_days_from_monday() as usize].as_ref()
    }

    pub fn is_open(&self, weekday: Weekday, time: NaiveTime) -> bool {
        self.day_window(weekday)
            .map(|w| w.contains(time))
            .unwrap_or(false)
    }
}

// JSONB に保存する形式。曜日キーが無い日と open == close の日は閉鎖日
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpeningHoursDoc {
    monday: Option<DayWindowDoc>,
    tuesday: Option<DayWindowDoc>,
    wednesday: Option<DayWindowDoc>,
    thursday: Option<DayWindowDoc>,
    friday: Option<DayWindowDoc>,
    saturday: Option<DayWindowDoc>,
    sunday: Option<DayWindowDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DayWindowDoc {
    open: String,
    close: String,
}

const WEEKDAY_NAMES: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

fn parse_hhmm(value: &str) -> Result<NaiveTime, OpeningHoursError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| OpeningHoursError::InvalidTime(value.to_string()))
}

fn window_from_doc(
    weekday: &str,
    doc: Option<DayWindowDoc>,
) -> Result<Option<DayWindow>, OpeningHoursError> {
    let Some(doc) = doc else {
        return Ok(None);
    };
    let open = parse_hhmm(&doc.open)?;
    let close = parse_hhmm(&doc.close)?;
    // open == close は「その日は営業しない」の番兵表現
    if open == close {
        return Ok(None);
    }
    if open > close {
        return Err(OpeningHoursError::OpenNotBeforeClose {
            weekday: weekday.to_string(),
            open: doc.open,
            close: doc.close,
        });
    }
    for (time, raw) in [(open, &doc.open), (close, &doc.close)] {
        if !is_half_hour_boundary(time) {
            return Err(OpeningHoursError::MisalignedTime {
                weekday: weekday.to_string(),
                time: raw.clone(),
            });
        }
    }
    Ok(Some(DayWindow { open, close }))
}

impl TryFrom<OpeningHoursDoc> for OpeningHours {
    type Error = OpeningHoursError;

    fn try_from(value: OpeningHoursDoc) -> Result<Self, Self::Error> {
        let OpeningHoursDoc {
            monday,
            tuesday,
            wednesday,
            thursday,
            friday,
            saturday,
            sunday,
        } = value;
        let days = [
            monday, tuesday, wednesday, thursday, friday, saturday, sunday,
        ];
        let mut windows = [None; 7];
        for (i, doc) in days.into_iter().enumerate() {
            windows[i] = window_from_doc(WEEKDAY_NAMES[i], doc)?;
        }
        Ok(Self { windows })
    }
}

impl From<OpeningHours> for OpeningHoursDoc {
    fn from(value: OpeningHours) -> Self {
        let doc = |w: Option<DayWindow>| {
            w.map(|w| DayWindowDoc {
                open: w.open.format("%H:%M").to_string(),
                close: w.close.format("%H:%M").to_string(),
            })
        };
        let [monday, tuesday, wednesday, thursday, friday, saturday, sunday] = value.windows;
        Self {
            monday: doc(monday),
            tuesday: doc(tuesday),
            wednesday: doc(wednesday),
            thursday: doc(thursday),
            friday: doc(friday),
            saturday: doc(saturday),
            sunday: doc(sunday),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn open_is_inclusive_and_close_is_exclusive() {
        let hours = OpeningHours::uniform(t(8, 0), t(18, 0)).unwrap();
        assert!(hours.is_open(Weekday::Mon, t(8, 0)));
        assert!(hours.is_open(Weekday::Mon, t(17, 59)));
        assert!(!hours.is_open(Weekday::Mon, t(18, 0)));
        assert!(!hours.is_open(Weekday::Mon, t(7, 59)));
    }

    #[test]
    fn closed_day_is_represented_as_none() {
        let mut windows = [Some(DayWindow::new(t(9, 0), t(17, 0)).unwrap()); 7];
        windows[Weekday::Sun.num_days_from_monday() as usize] = None;
        let hours = OpeningHours::new(windows);
        assert!(hours.day_window(Weekday::Sun).is_none());
        assert!(!hours.is_open(Weekday::Sun, t(12, 0)));
        assert!(hours.is_open(Weekday::Sat, t(12, 0)));
    }

    #[test]
    fn equal_open_and_close_means_closed() {
        let json = serde_json::json!({
            "monday": { "open": "10:00", "close": "10:00" },
            "tuesday": { "open": "08:00", "close": "18:00" },
            "wednesday": null,
            "thursday": null,
            "friday": null,
            "saturday": null,
            "sunday": null,
        });
        let hours: OpeningHours = serde_json::from_value(json).unwrap();
        assert!(hours.day_window(Weekday::Mon).is_none());
        assert!(hours.day_window(Weekday::Tue).is_some());
    }

    #[test]
    fn open_after_close_is_rejected() {
        let json = serde_json::json!({
            "monday": { "open": "18:00", "close": "08:00" },
            "tuesday": null,
            "wednesday": null,
            "thursday": null,
            "friday": null,
            "saturday": null,
            "sunday": null,
        });
        let res: Result<OpeningHours, _> = serde_json::from_value(json);
        assert!(res.is_err());
    }

    #[test]
    fn misaligned_open_or_close_is_rejected() {
        // 30 分境界に載らない営業時間は、どのみち予約できない
        // スロットしか生まないため保存させない
        let json = serde_json::json!({
            "monday": { "open": "08:15", "close": "18:00" },
            "tuesday": null,
            "wednesday": null,
            "thursday": null,
            "friday": null,
            "saturday": null,
            "sunday": null,
        });
        let res: Result<OpeningHours, _> = serde_json::from_value(json);
        assert!(res.is_err());

        assert!(DayWindow::new(t(8, 15), t(18, 0)).is_err());
        assert!(DayWindow::new(t(8, 0), t(17, 45)).is_err());
        assert!(DayWindow::new(t(8, 30), t(18, 0)).is_ok());
    }

    #[test]
    fn malformed_time_is_rejected() {
        for bad in ["25:00", "12:60", "noon", "12", ""] {
            let json = serde_json::json!({
                "monday": { "open": bad, "close": "18:00" },
                "tuesday": null,
                "wednesday": null,
                "thursday": null,
                "friday": null,
                "saturday": null,
                "sunday": null,
            });
            let res: Result<OpeningHours, _> = serde_json::from_value(json);
            assert!(res.is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn serializes_back_to_hhmm_doc() {
        let hours = OpeningHours::uniform(t(8, 30), t(18, 0)).unwrap();
        let json = serde_json::to_value(hours.clone()).unwrap();
        assert_eq!(json["monday"]["open"], "08:30");
        assert_eq!(json["sunday"]["close"], "18:00");
        let back: OpeningHours = serde_json::from_value(json).unwrap();
        assert_eq!(back, hours);
    }
}
