use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::RoomRepo,
    },
    models::{Room, RoomFilter, SaveRoom},
};

pub struct SqliteRoomRepo {
    pool: SqlitePool,
}

impl SqliteRoomRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_room(row: &SqliteRow) -> DbResult<Room> {
        Ok(Room {
            id: row.try_get("id")?,
            multichannel_room_id: row.try_get("multichannel_room_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn map_unique_violation(e: sqlx::Error, multichannel_room_id: &str) -> DbError {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Conflict(
            format!("Room '{}' is already tracked under another id", multichannel_room_id),
        ),
        _ => DbError::from(e),
    }
}

#[async_trait]
impl RoomRepo for SqliteRoomRepo {
    async fn fetch(&self) -> DbResult<Vec<Room>> {
        let rows = sqlx::query(
            r#"
            SELECT id, multichannel_room_id, created_at, updated_at
            FROM rooms
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::parse_room).collect()
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Room> {
        let row = sqlx::query(
            r#"
            SELECT id, multichannel_room_id, created_at, updated_at
            FROM rooms
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)?;

        Self::parse_room(&row)
    }

    async fn save(&self, input: SaveRoom) -> DbResult<Room> {
        let now = chrono::Utc::now();

        let row = match input.id {
            None => sqlx::query(
                r#"
                INSERT INTO rooms (multichannel_room_id, created_at, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT (multichannel_room_id) DO UPDATE SET updated_at = excluded.updated_at
                RETURNING id, multichannel_room_id, created_at, updated_at
                "#,
            )
            .bind(&input.multichannel_room_id)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::from)?,
            Some(id) => sqlx::query(
                r#"
                INSERT INTO rooms (id, multichannel_room_id, created_at, updated_at)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (id) DO UPDATE SET
                    multichannel_room_id = excluded.multichannel_room_id,
                    updated_at = excluded.updated_at
                RETURNING id, multichannel_room_id, created_at, updated_at
                "#,
            )
            .bind(id)
            .bind(&input.multichannel_room_id)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, &input.multichannel_room_id))?,
        };

        Self::parse_room(&row)
    }

    async fn delete_by(&self, filter: &RoomFilter) -> DbResult<u64> {
        if filter.is_empty() {
            return Err(DbError::Validation(
                "Refusing to delete rooms without a filter".to_string(),
            ));
        }

        let mut conditions = Vec::new();
        if filter.id.is_some() {
            conditions.push("id = ?");
        }
        if filter.multichannel_room_id.is_some() {
            conditions.push("multichannel_room_id = ?");
        }

        let sql = format!("DELETE FROM rooms WHERE {}", conditions.join(" AND "));
        let mut query = sqlx::query(&sql);
        if let Some(id) = filter.id {
            query = query.bind(id);
        }
        if let Some(mc) = &filter.multichannel_room_id {
            query = query.bind(mc);
        }

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
