use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use garde::Validate;
use kernel::model::{booking::event::CancelBooking, id::BookingId};
use registry::AppRegistry;
use shared::error::{AppError, AppResult};

use crate::{
    extractor::AuthorizedUser,
    model::booking::{BookingResponse, BookingsResponse, CreateBookingRequest},
};

pub async fn create_booking(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    req.validate(&())?;

    let event = req.into_event(user.id(), Utc::now());
    let booking = registry.booking_repository().create(event).await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}

// キャンセルできるのは予約の所有者と管理者のみ
pub async fn cancel_booking(
    user: AuthorizedUser,
    Path(booking_id): Path<BookingId>,
    State(registry): State<AppRegistry>,
) -> AppResult<StatusCode> {
    let booking = registry.booking_repository().find_by_id(booking_id).await?;
    if booking.owner.user_id != user.id() && !user.is_admin() {
        return Err(AppError::ForbiddenOperation);
    }

    let event = CancelBooking::new(booking_id, user.id(), Utc::now());
    registry
        .booking_repository()
        .cancel(event)
        .await
        .map(|_| StatusCode::OK)
}

pub async fn show_my_bookings(
    user: AuthorizedUser,
    State(registry): State<AppRegistry>,
) -> AppResult<Json<BookingsResponse>> {
    registry
        .booking_repository()
        .find_active_by_user_id(user.id())
        .await
        .map(BookingsResponse::from)
        .map(Json)
}
