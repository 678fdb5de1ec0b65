use chrono::{DateTime, NaiveDate, Utc};
use kernel::model::{
    availability::{AvailabilitySummary, DayGrid, RoomAvailability},
    id::RoomId,
    slot::{Slot, SlotStatus},
};
use serde::{Deserialize, Serialize};

use crate::model::room::RoomResponse;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    // UTC 日付の半開区間 [from, to)
    pub from: NaiveDate,
    pub to: NaiveDate,
    // 指定がなければ全部屋が対象
    pub room_id: Option<RoomId>,
    // サマリ対象のローカル日付。指定がなければ from
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub summary_date: NaiveDate,
    pub summary: SummaryResponse,
    pub rooms: Vec<RoomAvailabilityResponse>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub available_slots: usize,
    pub occupied_slots: usize,
}

impl From<AvailabilitySummary> for SummaryResponse {
    fn from(value: AvailabilitySummary) -> Self {
        let AvailabilitySummary {
            available_slots,
            occupied_slots,
        } = value;
        Self {
            available_slots,
            occupied_slots,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAvailabilityResponse {
    pub room: RoomResponse,
    pub days: Vec<DayGridResponse>,
}

impl From<RoomAvailability> for RoomAvailabilityResponse {
    fn from(value: RoomAvailability) -> Self {
        let RoomAvailability { room, days } = value;
        Self {
            room: room.into(),
            days: days.into_iter().map(DayGridResponse::from).collect(),
        }
    }
}

// 閉鎖日は slots が空のまま返す
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayGridResponse {
    pub date: NaiveDate,
    pub slots: Vec<SlotResponse>,
}

impl From<DayGrid> for DayGridResponse {
    fn from(value: DayGrid) -> Self {
        let DayGrid { date, slots } = value;
        Self {
            date,
            slots: slots.into_iter().map(SlotResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotResponse {
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub status: SlotStatusResponse,
}

impl From<Slot> for SlotResponse {
    fn from(value: Slot) -> Self {
        let Slot {
            start_utc,
            end_utc,
            status,
        } = value;
        Self {
            start_utc,
            end_utc,
            status: status.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatusResponse {
    Available,
    Past,
    OwnBooking,
    Attending,
    OtherBooking,
}

impl From<SlotStatus> for SlotStatusResponse {
    fn from(value: SlotStatus) -> Self {
        match value {
            SlotStatus::Available => Self::Available,
            SlotStatus::Past => Self::Past,
            SlotStatus::OwnBooking => Self::OwnBooking,
            SlotStatus::Attending => Self::Attending,
            SlotStatus::OtherBooking => Self::OtherBooking,
        }
    }
}
