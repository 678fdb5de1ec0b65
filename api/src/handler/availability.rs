use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, NaiveTime, Utc};
use kernel::model::{
    availability::{booked_map_for_user, build_day_grids, summarize, RoomAvailability},
    id::RoomId,
};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::availability::{AvailabilityQuery, AvailabilityResponse},
};

// 範囲クエリの上限。1 か月分を超える読み出しは拒否する
const MAX_RANGE_DAYS: i64 = 31;

// 空き状況グリッドの取得。未ログインでも閲覧でき、その場合
// すべての押さえ済みスロットは other_booking として見える
pub async fn show_availability(
    user: Option<AuthorizedUser>,
    Query(query): Query<AvailabilityQuery>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<AvailabilityResponse>> {
    if query.to <= query.from {
        return Err(AppError::Validation {
            code: "invalid_date_range",
            message: "to には from より後の日付を指定してください".into(),
        });
    }
    if (query.to - query.from).num_days() > MAX_RANGE_DAYS {
        return Err(AppError::Validation {
            code: "range_too_long",
            message: format!("取得範囲は {MAX_RANGE_DAYS} 日以内で指定してください"),
        });
    }

    let rooms = match query.room_id {
        Some(room_id) => {
            let room = registry
                .room_repository()
                .find_by_id(room_id)
                .await?
                .ok_or_else(|| AppError::EntityNotFound("指定の部屋が見つかりません".into()))?;
            vec![room]
        }
        None => registry.room_repository().find_all().await?,
    };

    // タイムゾーンオフセットでローカル日付が UTC 範囲の外へずれる分を
    // 見込み、前後 1 日広めにスロットを読み出す
    let from_utc = (query.from - Duration::days(1))
        .and_time(NaiveTime::MIN)
        .and_utc();
    let to_utc = (query.to + Duration::days(1))
        .and_time(NaiveTime::MIN)
        .and_utc();
    let room_ids: Vec<RoomId> = rooms.iter().map(|r| r.room_id).collect();
    let claims = registry
        .booking_repository()
        .find_slot_claims(&room_ids, from_utc, to_utc)
        .await?;

    let viewer = user.as_ref().map(AuthorizedUser::id);
    let booked = booked_map_for_user(&claims, viewer);
    let now = Utc::now();

    let no_claims = HashMap::new();
    let availabilities: Vec<RoomAvailability> = rooms
        .into_iter()
        .map(|room| {
            let room_booked = booked.get(&room.room_id).unwrap_or(&no_claims);
            let days = build_day_grids(
                &room.opening_hours,
                room.site.timezone,
                query.from,
                query.to,
                now,
                room_booked,
            );
            RoomAvailability { room, days }
        })
        .collect();

    let summary_date = query.date.unwrap_or(query.from);
    let summary = summarize(&availabilities, summary_date);

    Ok(Json(AvailabilityResponse {
        from: query.from,
        to: query.to,
        summary_date,
        summary: summary.into(),
        rooms: availabilities.into_iter().map(Into::into).collect(),
    }))
}
