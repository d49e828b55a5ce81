use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::RoomRepo,
    },
    models::{Room, RoomFilter, SaveRoom},
};

pub struct PostgresRoomRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

impl PostgresRoomRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    fn parse_room(row: &PgRow) -> DbResult<Room> {
        Ok(Room {
            id: row.try_get("id")?,
            multichannel_room_id: row.try_get("multichannel_room_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl RoomRepo for PostgresRoomRepo {
    async fn fetch(&self) -> DbResult<Vec<Room>> {
        // Listing feeds the resolver's deletes; read it from the primary.
        let rows = sqlx::query(
            r#"
            SELECT id, multichannel_room_id, created_at, updated_at
            FROM rooms
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.write_pool)
        .await?;

        rows.iter().map(Self::parse_room).collect()
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Room> {
        let row = sqlx::query(
            r#"
            SELECT id, multichannel_room_id, created_at, updated_at
            FROM rooms
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
        .await?
        .ok_or(DbError::NotFound)?;

        Self::parse_room(&row)
    }

    async fn save(&self, input: SaveRoom) -> DbResult<Room> {
        let now = chrono::Utc::now();

        let result = match input.id {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO rooms (multichannel_room_id, created_at, updated_at)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (multichannel_room_id) DO UPDATE SET updated_at = EXCLUDED.updated_at
                    RETURNING id, multichannel_room_id, created_at, updated_at
                    "#,
                )
                .bind(&input.multichannel_room_id)
                .bind(now)
                .bind(now)
                .fetch_one(&self.write_pool)
                .await
            }
            Some(id) => {
                sqlx::query(
                    r#"
                    INSERT INTO rooms (id, multichannel_room_id, created_at, updated_at)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (id) DO UPDATE SET
                        multichannel_room_id = EXCLUDED.multichannel_room_id,
                        updated_at = EXCLUDED.updated_at
                    RETURNING id, multichannel_room_id, created_at, updated_at
                    "#,
                )
                .bind(id)
                .bind(&input.multichannel_room_id)
                .bind(now)
                .bind(now)
                .fetch_one(&self.write_pool)
                .await
            }
        };

        let row = result.map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Conflict(
                format!(
                    "Room '{}' is already tracked under another id",
                    input.multichannel_room_id
                ),
            ),
            _ => DbError::from(e),
        })?;

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
            conditions.push(format!("id = ${}", conditions.len() + 1));
        }
        if filter.multichannel_room_id.is_some() {
            conditions.push(format!("multichannel_room_id = ${}", conditions.len() + 1));
        }

        let sql = format!("DELETE FROM rooms WHERE {}", conditions.join(" AND "));
        let mut query = sqlx::query(&sql);
        if let Some(id) = filter.id {
            query = query.bind(id);
        }
        if let Some(mc) = &filter.multichannel_room_id {
            query = query.bind(mc);
        }

        let result = query.execute(&self.write_pool).await?;
        Ok(result.rows_affected())
    }
}
