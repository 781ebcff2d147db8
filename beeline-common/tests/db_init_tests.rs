//! Tests for database initialization
//!
//! - Database file is created on first run
//! - Existing databases open without error and keep their rows
//! - Schema constraints reject malformed rows

use beeline_common::db::init::{init_database, SCHEMA_VERSION};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("beeline.db");

    assert!(!db_path.exists());

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("beeline.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query(
        "INSERT INTO observations (guid, scientific_name, name_key, lat, lng, created_at)
         VALUES ('obs-1', 'Zizia aurea', 'zizia aurea', 41.0, -87.0, CURRENT_TIMESTAMP)",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    // Second startup re-applies the schema without touching data
    let pool = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM observations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    let version: i64 = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[tokio::test]
async fn test_all_tables_created() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("beeline.db")).await.unwrap();

    for table in ["schema_version", "observations", "plants", "identifications"] {
        let exists: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(exists, 1, "Table {} should exist", table);
    }
}

#[tokio::test]
async fn test_foreign_keys_enforced_on_file_database() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("beeline.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO identifications (guid, plant_id, lat, lng, created_at)
         VALUES ('ident-1', 'no-such-plant', 41.0, -87.0, CURRENT_TIMESTAMP)",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Dangling plant reference should be rejected");
}

#[tokio::test]
async fn test_out_of_range_coordinates_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("beeline.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO observations (guid, scientific_name, name_key, lat, lng, created_at)
         VALUES ('obs-1', 'Zizia aurea', 'zizia aurea', 95.0, -87.0, CURRENT_TIMESTAMP)",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Latitude above 90 should be rejected");
}
