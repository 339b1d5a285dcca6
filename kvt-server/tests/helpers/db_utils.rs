//! Database Test Utilities

use kvt_common::config::DatabaseConfig;
use kvt_server::db::init_database_pool;
use kvt_server::executor::TaskExecutor;
use kvt_server::store::{EntityStore, SqliteEntityStore};
use std::time::Duration;
use tempfile::TempDir;

/// Create a store over a temporary database file
///
/// Returns (TempDir, store) - TempDir must be kept alive for duration of test
pub async fn create_test_store() -> (TempDir, SqliteEntityStore) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test_kvt.db");

    let pool = init_database_pool(&db_path, &DatabaseConfig::default())
        .await
        .unwrap();
    let executor = TaskExecutor::new(4, Duration::from_secs(10));

    (temp_dir, SqliteEntityStore::new(pool, executor))
}

/// Make every song insert fail with a database error
pub async fn install_song_insert_failure(store: &SqliteEntityStore) {
    sqlx::query(
        r#"
        CREATE TRIGGER fail_song_insert BEFORE INSERT ON songs
        BEGIN
            SELECT RAISE(ABORT, 'injected song insert failure');
        END
        "#,
    )
    .execute(store.pool())
    .await
    .unwrap();
}

pub async fn count_songs(store: &SqliteEntityStore) -> usize {
    store.search_songs("").await.unwrap().len()
}

pub async fn count_artists(store: &SqliteEntityStore) -> usize {
    store.search_artists("").await.unwrap().len()
}
