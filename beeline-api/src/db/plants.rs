//! Plant persistence
//!
//! Plants are keyed by `name_key` (normalized binomial). Repeat sightings
//! only fill fields that are still empty.

use beeline_common::db::{Plant, PLANT_COLUMNS};
use beeline_common::names::{binomial, name_key};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, QueryBuilder, Sqlite};

/// Insert a plant, or fill the empty fields of the existing row with the same key
///
/// Single statement, so two concurrent first sightings of a species cannot
/// both create a row.
pub async fn upsert_plant<'e, E>(executor: E, plant: &Plant) -> sqlx::Result<Plant>
where
    E: Executor<'e, Database = Sqlite>,
{
    let metadata = plant.metadata.as_ref().map(|value| value.to_string());

    let sql = format!(
        r#"
        INSERT INTO plants (
            guid, scientific_name, name_key, common_name, pollinator_friendly,
            pollinator_notes, metadata, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(name_key) DO UPDATE SET
            common_name = COALESCE(NULLIF(plants.common_name, ''), excluded.common_name),
            pollinator_friendly = COALESCE(plants.pollinator_friendly, excluded.pollinator_friendly),
            pollinator_notes = COALESCE(NULLIF(plants.pollinator_notes, ''), excluded.pollinator_notes),
            metadata = COALESCE(plants.metadata, excluded.metadata),
            updated_at = excluded.updated_at
        RETURNING {}
        "#,
        PLANT_COLUMNS
    );

    sqlx::query::<Sqlite>(&sql)
        .bind(&plant.id)
        .bind(&plant.scientific_name)
        .bind(&plant.name_key)
        .bind(&plant.common_name)
        .bind(plant.pollinator_friendly)
        .bind(&plant.pollinator_notes)
        .bind(metadata)
        .bind(plant.created_at)
        .bind(plant.updated_at)
        .try_map(|row: SqliteRow| Plant::from_row(&row))
        .fetch_one(executor)
        .await
}

/// Look up a plant by scientific name
///
/// Tries the name as stored, then its binomial, then the canonical key.
pub async fn find_plant_by_scientific_name<'e, E>(
    executor: E,
    name: &str,
) -> sqlx::Result<Option<Plant>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let trimmed = name.trim();
    let sql = format!(
        "SELECT {} FROM plants
         WHERE scientific_name = ? OR scientific_name = ? OR name_key = ?
         ORDER BY CASE
             WHEN scientific_name = ? THEN 0
             WHEN scientific_name = ? THEN 1
             ELSE 2
         END
         LIMIT 1",
        PLANT_COLUMNS
    );
    let truncated = binomial(trimmed);
    // NULL never compares equal, so a name without letters matches no key
    let key = Some(name_key(trimmed)).filter(|key| !key.is_empty());

    sqlx::query::<Sqlite>(&sql)
        .bind(trimmed)
        .bind(&truncated)
        .bind(&key)
        .bind(trimmed)
        .bind(&truncated)
        .try_map(|row: SqliteRow| Plant::from_row(&row))
        .fetch_optional(executor)
        .await
}

/// Batch-load plants for a set of name keys
pub async fn load_plants_by_keys<'e, E>(executor: E, keys: &[String]) -> sqlx::Result<Vec<Plant>>
where
    E: Executor<'e, Database = Sqlite>,
{
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM plants WHERE name_key IN (", PLANT_COLUMNS));
    let mut separated = builder.separated(", ");
    for key in keys {
        separated.push_bind(key);
    }
    separated.push_unseparated(")");

    builder
        .build()
        .try_map(|row: SqliteRow| Plant::from_row(&row))
        .fetch_all(executor)
        .await
}
