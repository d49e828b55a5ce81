//! Shared tests for RoomRepo implementations

use crate::{
    db::{error::DbError, repos::RoomRepo},
    models::{RoomFilter, SaveRoom},
};

// ============================================================================
// Shared Test Functions
// ============================================================================

pub async fn test_save_and_find(repo: &dyn RoomRepo) {
    let room = repo
        .save(SaveRoom::new("room-123"))
        .await
        .expect("Failed to save room");

    assert_eq!(room.multichannel_room_id, "room-123");
    assert!(room.id > 0);
    assert_eq!(room.created_at, room.updated_at);

    let found = repo.find_by_id(room.id).await.expect("Failed to find room");
    assert_eq!(found.id, room.id);
    assert_eq!(found.multichannel_room_id, "room-123");
}

pub async fn test_find_not_found(repo: &dyn RoomRepo) {
    let result = repo.find_by_id(999_999).await;
    assert!(matches!(result, Err(DbError::NotFound)));
}

pub async fn test_save_duplicate_keeps_original(repo: &dyn RoomRepo) {
    let first = repo.save(SaveRoom::new("room-dup")).await.unwrap();
    let second = repo.save(SaveRoom::new("room-dup")).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.created_at, second.created_at);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(repo.fetch().await.unwrap().len(), 1);
}

pub async fn test_save_with_id_inserts_then_updates(repo: &dyn RoomRepo) {
    let inserted = repo
        .save(SaveRoom {
            id: Some(42),
            multichannel_room_id: "room-a".into(),
        })
        .await
        .unwrap();
    assert_eq!(inserted.id, 42);

    let updated = repo
        .save(SaveRoom {
            id: Some(42),
            multichannel_room_id: "room-b".into(),
        })
        .await
        .unwrap();
    assert_eq!(updated.id, 42);
    assert_eq!(updated.multichannel_room_id, "room-b");
    assert_eq!(updated.created_at, inserted.created_at);

    let rooms = repo.fetch().await.unwrap();
    assert_eq!(rooms.len(), 1);
}

pub async fn test_save_with_id_conflicting_room_fails(repo: &dyn RoomRepo) {
    repo.save(SaveRoom::new("room-taken")).await.unwrap();
    let other = repo.save(SaveRoom::new("room-other")).await.unwrap();

    let result = repo
        .save(SaveRoom {
            id: Some(other.id),
            multichannel_room_id: "room-taken".into(),
        })
        .await;
    assert!(matches!(result, Err(DbError::Conflict(_))));
}

pub async fn test_fetch_empty(repo: &dyn RoomRepo) {
    assert!(repo.fetch().await.unwrap().is_empty());
}

pub async fn test_fetch_in_creation_order(repo: &dyn RoomRepo) {
    for id in ["room-1", "room-2", "room-3"] {
        repo.save(SaveRoom::new(id)).await.unwrap();
    }
    // Re-delivery must not move a room to the back of the queue.
    repo.save(SaveRoom::new("room-1")).await.unwrap();

    let ids: Vec<_> = repo
        .fetch()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.multichannel_room_id)
        .collect();
    assert_eq!(ids, vec!["room-1", "room-2", "room-3"]);
}

pub async fn test_delete_by_multichannel_room_id(repo: &dyn RoomRepo) {
    repo.save(SaveRoom::new("room-keep")).await.unwrap();
    repo.save(SaveRoom::new("room-gone")).await.unwrap();

    let deleted = repo
        .delete_by(&RoomFilter::by_multichannel_room_id("room-gone"))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let rooms = repo.fetch().await.unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].multichannel_room_id, "room-keep");

    let deleted_again = repo
        .delete_by(&RoomFilter::by_multichannel_room_id("room-gone"))
        .await
        .unwrap();
    assert_eq!(deleted_again, 0);
}

pub async fn test_delete_by_id_and_room_must_both_match(repo: &dyn RoomRepo) {
    let room = repo.save(SaveRoom::new("room-x")).await.unwrap();

    let mismatched = RoomFilter {
        id: Some(room.id),
        multichannel_room_id: Some("room-y".into()),
    };
    assert_eq!(repo.delete_by(&mismatched).await.unwrap(), 0);

    assert_eq!(repo.delete_by(&RoomFilter::by_id(room.id)).await.unwrap(), 1);
    assert!(matches!(
        repo.find_by_id(room.id).await,
        Err(DbError::NotFound)
    ));
}

pub async fn test_delete_with_empty_filter_rejected(repo: &dyn RoomRepo) {
    repo.save(SaveRoom::new("room-safe")).await.unwrap();

    let result = repo.delete_by(&RoomFilter::default()).await;
    assert!(matches!(result, Err(DbError::Validation(_))));
    assert_eq!(repo.fetch().await.unwrap().len(), 1);
}

// ============================================================================
// SQLite Tests
// ============================================================================

#[cfg(feature = "database-sqlite")]
mod sqlite_tests {
    use crate::db::{
        sqlite::SqliteRoomRepo,
        tests::harness::{create_sqlite_pool, run_sqlite_migrations},
    };

    macro_rules! sqlite_test {
        ($name:ident) => {
            #[tokio::test]
            async fn $name() {
                let pool = create_sqlite_pool().await;
                run_sqlite_migrations(&pool).await;
                let repo = SqliteRoomRepo::new(pool);
                super::$name(&repo).await;
            }
        };
    }

    sqlite_test!(test_save_and_find);
    sqlite_test!(test_find_not_found);
    sqlite_test!(test_save_duplicate_keeps_original);
    sqlite_test!(test_save_with_id_inserts_then_updates);
    sqlite_test!(test_save_with_id_conflicting_room_fails);
    sqlite_test!(test_fetch_empty);
    sqlite_test!(test_fetch_in_creation_order);
    sqlite_test!(test_delete_by_multichannel_room_id);
    sqlite_test!(test_delete_by_id_and_room_must_both_match);
    sqlite_test!(test_delete_with_empty_filter_rejected);
}

// ============================================================================
// PostgreSQL Tests - Require Docker, run with `cargo test -- --ignored`
// ============================================================================

#[cfg(feature = "database-postgres")]
mod postgres_tests {
    use crate::db::{
        postgres::PostgresRoomRepo,
        tests::harness::postgres::{create_isolated_postgres_pool, run_postgres_migrations},
    };

    macro_rules! postgres_test {
        ($name:ident) => {
            #[tokio::test]
            #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
            async fn $name() {
                let pool = create_isolated_postgres_pool().await;
                run_postgres_migrations(&pool).await;
                let repo = PostgresRoomRepo::new(pool, None);
                super::$name(&repo).await;
            }
        };
    }

    postgres_test!(test_save_and_find);
    postgres_test!(test_find_not_found);
    postgres_test!(test_save_duplicate_keeps_original);
    postgres_test!(test_save_with_id_inserts_then_updates);
    postgres_test!(test_save_with_id_conflicting_room_fails);
    postgres_test!(test_fetch_empty);
    postgres_test!(test_fetch_in_creation_order);
    postgres_test!(test_delete_by_multichannel_room_id);
    postgres_test!(test_delete_by_id_and_room_must_both_match);
    postgres_test!(test_delete_with_empty_filter_rejected);
}
