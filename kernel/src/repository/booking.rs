use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{
    booking::{
        event::{CancelBooking, CreateBooking},
        Booking,
    },
    id::{BookingId, RoomId, UserId},
    slot::SlotClaim,
};
use shared::error::AppResult;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    // 予約を作成する。スロット一意制約に基づく衝突検出込み。
    // 成功時は表示に必要な情報をすべて含む予約を返す
    async fn create(&self, event: CreateBooking) -> AppResult<Booking>;
    // 予約をキャンセルし、未来のスロットを解放する
    async fn cancel(&self, event: CancelBooking) -> AppResult<()>;
    async fn find_by_id(&self, booking_id: BookingId) -> AppResult<Booking>;
    // ユーザーの有効な（未キャンセルの）予約一覧を取得する
    async fn find_active_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Booking>>;
    // 部屋の有効な予約一覧を取得する
    async fn find_active_by_room_id(&self, room_id: RoomId) -> AppResult<Vec<Booking>>;
    // 空き状況グリッド生成用に、押さえ済みスロットを一括で読み出す
    async fn find_slot_claims(
        &self,
        room_ids: &[RoomId],
        from_utc: DateTime<Utc>,
        to_utc: DateTime<Utc>,
    ) -> AppResult<Vec<SlotClaim>>;
}
