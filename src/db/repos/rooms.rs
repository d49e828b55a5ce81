use async_trait::async_trait;

use crate::{
    db::error::DbResult,
    models::{Room, RoomFilter, SaveRoom},
};

#[async_trait]
pub trait RoomRepo: Send + Sync {
    /// All tracked rooms, oldest first (`created_at`, then `id`).
    async fn fetch(&self) -> DbResult<Vec<Room>>;

    /// Get a room by its ID. Returns [`DbError::NotFound`](crate::db::DbError::NotFound)
    /// when it does not exist.
    async fn find_by_id(&self, id: i64) -> DbResult<Room>;

    /// Insert or update a room and return the stored row.
    ///
    /// Saving a `multichannel_room_id` that is already tracked refreshes its
    /// `updated_at` and keeps the original `created_at`.
    async fn save(&self, input: SaveRoom) -> DbResult<Room>;

    /// Delete every room matching `filter`, returning the number of rows removed.
    ///
    /// An empty filter is rejected with a validation error.
    async fn delete_by(&self, filter: &RoomFilter) -> DbResult<u64>;
}
