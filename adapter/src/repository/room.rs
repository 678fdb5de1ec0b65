use async_trait::async_trait;
use derive_new::new;

use kernel::model::{id::RoomId, room::Room};
use kernel::repository::room::RoomRepository;
use shared::error::{AppError, AppResult};

use crate::database::{model::room::RoomWithSiteRow, ConnectionPool};

const ROOM_SELECT: &str = r#"
    SELECT
    r.room_id, r.room_name, r.capacity, r.opening_hours,
    s.site_id, s.site_name, s.timezone
    FROM rooms AS r
    INNER JOIN sites AS s ON r.site_id = s.site_id
"#;

#[derive(new)]
pub struct RoomRepositoryImpl {
    db: ConnectionPool,
}

#[async_trait]
impl RoomRepository for RoomRepositoryImpl {
    async fn find_all(&self) -> AppResult<Vec<Room>> {
        let sql = format!("{ROOM_SELECT} ORDER BY s.site_name ASC, r.room_name ASC");
        let rows: Vec<RoomWithSiteRow> = sqlx::query_as(&sql)
            .fetch_all(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;
        rows.into_iter().map(Room::try_from).collect()
    }

    async fn find_by_id(&self, room_id: RoomId) -> AppResult<Option<Room>> {
        let sql = format!("{ROOM_SELECT} WHERE r.room_id = $1");
        let row: Option<RoomWithSiteRow> = sqlx::query_as(&sql)
            .bind(room_id.raw())
            .fetch_optional(self.db.inner_ref())
            .await
            .map_err(AppError::SpecificOperationError)?;
        row.map(Room::try_from).transpose()
    }
}
