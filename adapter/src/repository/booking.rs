use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_new::new;
use serde_json::json;
use uuid::Uuid;

use kernel::model::{
    booking::{
        event::{CancelBooking, CreateBooking},
        Booking,
    },
    id::{BookingId, RoomId, UserId},
    room::Room,
    slot::SlotClaim,
};
use kernel::repository::booking::BookingRepository;
use shared::error::{AppError, AppResult};

use crate::database::{
    model::{
        booking::{BookingAttendeeRow, BookingRow, SlotClaimRow},
        room::RoomWithSiteRow,
        user::UserRow,
    },
    retry::{self, classify_db_error, RetryPolicy},
    ConnectionPool,
};

// 予約 1 件分を表示用の情報ごと取得する SELECT 句。
// WHERE 句は呼び出し側で付け足す
const BOOKING_SELECT: &str = r#"
    SELECT
    b.booking_id,
    b.room_id,
    b.owner_id,
    u.user_name AS owner_name,
    u.email,
    b.start_utc,
    b.end_utc,
    b.canceled_at,
    b.notes,
    r.room_name,
    r.capacity,
    s.site_id,
    s.site_name,
    s.timezone
    FROM bookings AS b
    INNER JOIN rooms AS r ON b.room_id = r.room_id
    INNER JOIN sites AS s ON r.site_id = s.site_id
    INNER JOIN users AS u ON b.owner_id = u.user_id
"#;

#[derive(new)]
pub struct BookingRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl BookingRepository for BookingRepositoryImpl {
    // 予約操作を行う。
    // 衝突検出は slot_units の一意制約に任せ、事前の SELECT では行わない。
    // 直列化エラーはトランザクションごと再試行する
    async fn create(&self, event: CreateBooking) -> AppResult<Booking> {
        retry::run(&RetryPolicy::default(), || self.try_create(&event)).await
    }

    // 予約キャンセル操作を行う
    async fn cancel(&self, event: CancelBooking) -> AppResult<()> {
        retry::run(&RetryPolicy::default(), || self.try_cancel(&event)).await
    }

    async fn find_by_id(&self, booking_id: BookingId) -> AppResult<Booking> {
        let sql = format!("{BOOKING_SELECT} WHERE b.booking_id = $1");
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(booking_id.raw())
            .fetch_optional(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;
        let Some(row) = row else {
            return Err(AppError::EntityNotFound(format!(
                "予約（{booking_id}）が見つかりませんでした。"
            )));
        };
        let attendees = self.find_attendees(&[booking_id.raw()]).await?;
        row.into_booking(attendees)
    }

    // ユーザーの有効な予約一覧を開始時刻の昇順で取得する
    async fn find_active_by_user_id(&self, user_id: UserId) -> AppResult<Vec<Booking>> {
        let sql = format!(
            "{BOOKING_SELECT} WHERE b.owner_id = $1 AND b.canceled_at IS NULL ORDER BY b.start_utc ASC"
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(user_id.raw())
            .fetch_all(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;
        self.hydrate_all(rows).await
    }

    async fn find_active_by_room_id(&self, room_id: RoomId) -> AppResult<Vec<Booking>> {
        let sql = format!(
            "{BOOKING_SELECT} WHERE b.room_id = $1 AND b.canceled_at IS NULL ORDER BY b.start_utc ASC"
        );
        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(room_id.raw())
            .fetch_all(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;
        self.hydrate_all(rows).await
    }

    // 空き状況グリッド用の一括読み取り。
    // ここで得た情報は参考値であり、確定時の正は一意制約側にある
    async fn find_slot_claims(
        &self,
        room_ids: &[RoomId],
        from_utc: DateTime<Utc>,
        to_utc: DateTime<Utc>,
    ) -> AppResult<Vec<SlotClaim>> {
        let ids: Vec<Uuid> = room_ids.iter().map(|id| id.raw()).collect();
        let rows: Vec<SlotClaimRow> = sqlx::query_as(
            r#"
                SELECT
                su.room_id,
                su.slot_start_utc,
                b.owner_id,
                COALESCE(
                    ARRAY_AGG(ba.user_id) FILTER (WHERE ba.user_id IS NOT NULL),
                    '{}'
                ) AS attendee_ids
                FROM slot_units AS su
                INNER JOIN bookings AS b ON su.booking_id = b.booking_id
                LEFT JOIN booking_attendees AS ba ON ba.booking_id = b.booking_id
                WHERE su.room_id = ANY($1)
                  AND su.slot_start_utc >= $2
                  AND su.slot_start_utc < $3
                GROUP BY su.room_id, su.slot_start_utc, b.owner_id
            "#,
        )
        .bind(&ids)
        .bind(from_utc)
        .bind(to_utc)
        .fetch_all(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;
        Ok(rows.into_iter().map(SlotClaim::from).collect())
    }
}

impl BookingRepositoryImpl {
    // 予約作成トランザクション 1 回分の試行
    async fn try_create(&self, event: &CreateBooking) -> AppResult<Booking> {
        // ① 部屋と拠点の情報を取得する。
        //    営業時間・タイムゾーンはこの時点の値で判定する
        let room_row: Option<RoomWithSiteRow> = sqlx::query_as(
            r#"
                SELECT
                r.room_id, r.room_name, r.capacity, r.opening_hours,
                s.site_id, s.site_name, s.timezone
                FROM rooms AS r
                INNER JOIN sites AS s ON r.site_id = s.site_id
                WHERE r.room_id = $1
            "#,
        )
        .bind(event.room_id.raw())
        .fetch_optional(self.db.inner_ref())
        .await
        .map_err(AppError::SpecificOperationError)?;

        let Some(room_row) = room_row else {
            return Err(AppError::EntityNotFound(format!(
                "部屋（{}）が見つかりませんでした。",
                event.room_id
            )));
        };
        let room = Room::try_from(room_row)?;

        // ② 事前チェック。ここで弾かれた場合はトランザクションを開始しない
        let span = event.validate(&room.opening_hours, room.site.timezone)?;

        let mut tx = self.db.begin().await?;
        self.set_transaction_serializable(&mut tx).await?;

        // ③ 所有者の存在確認（表示用の情報もここで取得しておく）
        let owner: Option<UserRow> = sqlx::query_as(
            "SELECT user_id, user_name, email, role FROM users WHERE user_id = $1",
        )
        .bind(event.owner_id.raw())
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::SpecificOperationError)?;
        let Some(owner) = owner else {
            return Err(AppError::EntityNotFound(format!(
                "ユーザー（{}）が見つかりませんでした。",
                event.owner_id
            )));
        };

        // ④ 予約本体の INSERT
        let booking_id = BookingId::new();
        let res = sqlx::query(
            r#"
                INSERT INTO bookings
                (booking_id, room_id, owner_id, start_utc, end_utc, notes, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(booking_id.raw())
        .bind(event.room_id.raw())
        .bind(event.owner_id.raw())
        .bind(span.start_utc)
        .bind(span.end_utc)
        .bind(event.notes.as_deref())
        .bind(event.requested_at)
        .execute(&mut *tx)
        .await
        .map_err(classify_db_error)?;
        if res.rows_affected() < 1 {
            return Err(AppError::NoRowsAffectedError(
                "No booking record has been created".into(),
            ));
        }

        // ⑤ スロット行の INSERT。
        //    (room_id, slot_start_utc) の一意制約が衝突検出の本体で、
        //    「SELECT してから INSERT」では並行実行に負けるためやらない
        for slot_start in &span.slot_starts {
            sqlx::query(
                r#"
                    INSERT INTO slot_units (booking_id, room_id, slot_start_utc)
                    VALUES ($1, $2, $3)
                "#,
            )
            .bind(booking_id.raw())
            .bind(event.room_id.raw())
            .bind(*slot_start)
            .execute(&mut *tx)
            .await
            .map_err(classify_db_error)?;
        }

        // ⑥ 参加者の INSERT
        for attendee_id in &event.attendee_ids {
            sqlx::query(
                "INSERT INTO booking_attendees (booking_id, user_id) VALUES ($1, $2)",
            )
            .bind(booking_id.raw())
            .bind(attendee_id.raw())
            .execute(&mut *tx)
            .await
            .map_err(classify_db_error)?;
        }

        // ⑦ 監査ログ
        append_activity_log(
            &mut tx,
            event.owner_id,
            "booking.created",
            booking_id.raw(),
            json!({
                "roomId": event.room_id,
                "startUtc": span.start_utc,
                "endUtc": span.end_utc,
                "slotCount": span.slot_starts.len(),
            }),
            event.requested_at,
        )
        .await?;

        // コミット前に参加者の表示名を揃え、成功後の読み直しを不要にする
        let attendees = if event.attendee_ids.is_empty() {
            Vec::new()
        } else {
            fetch_attendee_rows(&mut *tx, &[booking_id.raw()]).await?
        };

        // SERIALIZABLE ではコミット時にも直列化エラーが起きうるため、
        // ここも分類にかけて TransientError を拾う
        tx.commit().await.map_err(classify_db_error)?;

        let row = BookingRow {
            booking_id: booking_id.raw(),
            room_id: room.room_id.raw(),
            owner_id: owner.user_id,
            owner_name: owner.user_name,
            email: owner.email,
            start_utc: span.start_utc,
            end_utc: span.end_utc,
            canceled_at: None,
            notes: event.notes.clone(),
            room_name: room.room_name,
            capacity: room.capacity,
            site_id: room.site.site_id.raw(),
            site_name: room.site.site_name,
            timezone: room.site.timezone.name().to_string(),
        };
        row.into_booking(attendees)
    }

    // キャンセルトランザクション 1 回分の試行
    async fn try_cancel(&self, event: &CancelBooking) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        self.set_transaction_serializable(&mut tx).await?;

        // ① 予約の存在と未キャンセルであることを確認する
        let row: Option<(Uuid, Option<DateTime<Utc>>)> =
            sqlx::query_as("SELECT owner_id, canceled_at FROM bookings WHERE booking_id = $1")
                .bind(event.booking_id.raw())
                .fetch_optional(&mut *tx)
                .await
                .map_err(AppError::SpecificOperationError)?;
        let Some((_, canceled_at)) = row else {
            return Err(AppError::EntityNotFound(format!(
                "予約（{}）が見つかりませんでした。",
                event.booking_id
            )));
        };
        ensure_not_canceled(event.booking_id, canceled_at)?;

        // ② canceled_at を設定する
        let res = sqlx::query(
            "UPDATE bookings SET canceled_at = $2 WHERE booking_id = $1 AND canceled_at IS NULL",
        )
        .bind(event.booking_id.raw())
        .bind(event.requested_at)
        .execute(&mut *tx)
        .await
        .map_err(classify_db_error)?;
        if res.rows_affected() < 1 {
            return Err(AppError::AlreadyCanceled(format!(
                "予約（{}）はすでにキャンセル済みです。",
                event.booking_id
            )));
        }

        // ③ まだ始まっていないスロットだけを解放する。
        //    過去のスロットは稼働実績として残す
        sqlx::query("DELETE FROM slot_units WHERE booking_id = $1 AND slot_start_utc >= $2")
            .bind(event.booking_id.raw())
            .bind(event.requested_at)
            .execute(&mut *tx)
            .await
            .map_err(classify_db_error)?;

        // ④ 監査ログ
        append_activity_log(
            &mut tx,
            event.requested_user,
            "booking.canceled",
            event.booking_id.raw(),
            json!({ "canceledAt": event.requested_at }),
            event.requested_at,
        )
        .await?;

        tx.commit().await.map_err(classify_db_error)?;
        Ok(())
    }

    // create / cancel のトランザクション分離レベルを
    // SERIALIZABLE にするために内部的に使うメソッド
    async fn set_transaction_serializable(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> AppResult<()> {
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut **tx)
            .await
            .map_err(AppError::SpecificOperationError)?;
        Ok(())
    }

    async fn find_attendees(&self, booking_ids: &[Uuid]) -> AppResult<Vec<BookingAttendeeRow>> {
        fetch_attendee_rows(self.db.inner_ref(), booking_ids).await
    }

    // 予約行の一覧に参加者をまとめて付与する
    async fn hydrate_all(&self, rows: Vec<BookingRow>) -> AppResult<Vec<Booking>> {
        let booking_ids: Vec<Uuid> = rows.iter().map(|r| r.booking_id).collect();
        let mut attendees: HashMap<Uuid, Vec<BookingAttendeeRow>> = HashMap::new();
        for row in self.find_attendees(&booking_ids).await? {
            attendees.entry(row.booking_id).or_default().push(row);
        }
        rows.into_iter()
            .map(|row| {
                let rows = attendees.remove(&row.booking_id).unwrap_or_default();
                row.into_booking(rows)
            })
            .collect()
    }
}

async fn fetch_attendee_rows<'e, E>(
    executor: E,
    booking_ids: &[Uuid],
) -> AppResult<Vec<BookingAttendeeRow>>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query_as(
        r#"
            SELECT ba.booking_id, ba.user_id, u.user_name
            FROM booking_attendees AS ba
            INNER JOIN users AS u ON ba.user_id = u.user_id
            WHERE ba.booking_id = ANY($1)
            ORDER BY u.user_name ASC
        "#,
    )
    .bind(booking_ids)
    .fetch_all(executor)
    .await
    .map_err(AppError::SpecificOperationError)
}

// 二重キャンセルはクライアント側の不具合検出を兼ねて明示的に報告する
fn ensure_not_canceled(
    booking_id: BookingId,
    canceled_at: Option<DateTime<Utc>>,
) -> AppResult<()> {
    if canceled_at.is_some() {
        return Err(AppError::AlreadyCanceled(format!(
            "予約（{booking_id}）はすでにキャンセル済みです。"
        )));
    }
    Ok(())
}

async fn append_activity_log(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    actor_id: UserId,
    action: &str,
    entity_id: Uuid,
    metadata: serde_json::Value,
    at: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query(
        r#"
            INSERT INTO activity_logs
            (actor_id, action, entity_type, entity_id, metadata, created_at)
            VALUES ($1, $2, 'booking', $3, $4, $5)
        "#,
    )
    .bind(actor_id.raw())
    .bind(action)
    .bind(entity_id)
    .bind(metadata)
    .bind(at)
    .execute(&mut **tx)
    .await
    .map_err(classify_db_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canceling_twice_is_reported_as_already_canceled() {
        let booking_id = BookingId::new();
        assert!(ensure_not_canceled(booking_id, None).is_ok());

        let res = ensure_not_canceled(booking_id, Some(Utc::now()));
        assert!(matches!(res, Err(AppError::AlreadyCanceled(_))));
    }
}
