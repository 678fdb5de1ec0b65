use axum::{
    extract::{Path, State},
    Json,
};
use kernel::model::id::RoomId;
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::{
        booking::BookingsResponse,
        room::{RoomResponse, RoomsResponse},
    },
};

pub async fn show_room_list(
    _user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<RoomsResponse>> {
    registry
        .room_repository()
        .find_all()
        .await
        .map(RoomsResponse::from)
        .map(Json)
}

pub async fn show_room(
    _user: AuthorizedUser,
    Path(room_id): Path<RoomId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<RoomResponse>> {
    registry
        .room_repository()
        .find_by_id(room_id)
        .await
        .and_then(|room| match room {
            Some(room) => Ok(Json(room.into())),
            None => Err(AppError::EntityNotFound(
                "指定の部屋が見つかりません".into(),
            )),
        })
}

pub async fn show_room_bookings(
    _user: AuthorizedUser,
    Path(room_id): Path<RoomId>,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<BookingsResponse>> {
    if registry
        .room_repository()
        .find_by_id(room_id)
        .await?
        .is_none()
    {
        return Err(AppError::EntityNotFound(
            "指定の部屋が見つかりません".into(),
        ));
    }
    registry
        .booking_repository()
        .find_active_by_room_id(room_id)
        .await
        .map(BookingsResponse::from)
        .map(Json)
}
