//! Database initialization
//!
//! Creates the database file on first run and applies the schema. Every
//! statement is `IF NOT EXISTS`, so initialization is safe on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Open (creating if needed) the database at `db_path` and apply the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas go on the connect options so every pooled connection gets them.
    // WAL lets map/list readers proceed while an ingestion writes.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with the schema applied
///
/// Limited to one connection: every SQLite memory connection is its own
/// database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Apply all table and index definitions
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_observations_table(pool).await?;
    create_plants_table(pool).await?;
    create_identifications_table(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the observations table
///
/// One row per user sighting. Rows are never updated.
pub async fn create_observations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS observations (
            guid TEXT PRIMARY KEY,
            common_name TEXT,
            scientific_name TEXT NOT NULL,
            name_key TEXT NOT NULL,
            image_url TEXT,
            lat REAL NOT NULL CHECK (lat >= -90 AND lat <= 90),
            lng REAL NOT NULL CHECK (lng >= -180 AND lng <= 180),
            confidence REAL CHECK (confidence IS NULL OR (confidence >= 0 AND confidence <= 1)),
            pollinator_friendly INTEGER,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_observations_name_position
         ON observations(scientific_name, lat, lng)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_observations_created_at ON observations(created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the plants table
///
/// One row per canonical name key; populated fields are never overwritten.
pub async fn create_plants_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plants (
            guid TEXT PRIMARY KEY,
            scientific_name TEXT NOT NULL,
            name_key TEXT NOT NULL UNIQUE,
            common_name TEXT,
            pollinator_friendly INTEGER,
            pollinator_notes TEXT,
            metadata TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_plants_scientific_name ON plants(scientific_name)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the identifications table (plant sighted at a point)
pub async fn create_identifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS identifications (
            guid TEXT PRIMARY KEY,
            plant_id TEXT NOT NULL REFERENCES plants(guid) ON DELETE CASCADE,
            observation_id TEXT REFERENCES observations(guid) ON DELETE SET NULL,
            lat REAL NOT NULL,
            lng REAL NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_identifications_plant ON identifications(plant_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_database_has_tables() {
        let pool = init_memory_database().await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        assert_eq!(
            tables,
            vec!["identifications", "observations", "plants", "schema_version"]
        );
    }

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let pool = init_memory_database().await.unwrap();
        create_schema(&pool).await.unwrap();
        create_schema(&pool).await.unwrap();

        let versions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[tokio::test]
    async fn test_plant_name_key_is_unique() {
        let pool = init_memory_database().await.unwrap();
        let insert = "INSERT INTO plants (guid, scientific_name, name_key, created_at, updated_at)
                      VALUES (?, ?, 'asclepias syriaca', '2026-01-01T00:00:00+00:00', '2026-01-01T00:00:00+00:00')";

        sqlx::query(insert)
            .bind("a")
            .bind("Asclepias syriaca")
            .execute(&pool)
            .await
            .unwrap();
        let second = sqlx::query(insert)
            .bind("b")
            .bind("asclepias syriaca")
            .execute(&pool)
            .await;
        assert!(second.is_err());
    }
}
