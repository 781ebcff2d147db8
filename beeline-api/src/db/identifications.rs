//! Identification persistence (plant sighted at a point)

use beeline_common::db::Identification;
use sqlx::{Executor, Sqlite};

/// Insert an identification row
pub async fn insert_identification<'e, E>(
    executor: E,
    identification: &Identification,
) -> sqlx::Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO identifications (guid, plant_id, observation_id, lat, lng, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&identification.id)
    .bind(&identification.plant_id)
    .bind(&identification.observation_id)
    .bind(identification.lat)
    .bind(identification.lng)
    .bind(identification.created_at)
    .execute(executor)
    .await?;

    Ok(())
}
