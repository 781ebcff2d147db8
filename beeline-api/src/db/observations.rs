//! Observation persistence

use beeline_common::db::{Observation, OBSERVATION_COLUMNS};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Sqlite};

use crate::query::{ObservationFilter, SortOrder};

/// Insert a new observation row
pub async fn insert_observation<'e, E>(executor: E, observation: &Observation) -> sqlx::Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO observations (
            guid, common_name, scientific_name, name_key, image_url,
            lat, lng, confidence, pollinator_friendly, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&observation.id)
    .bind(&observation.common_name)
    .bind(&observation.scientific_name)
    .bind(&observation.name_key)
    .bind(&observation.image_url)
    .bind(observation.lat)
    .bind(observation.lng)
    .bind(observation.confidence)
    .bind(observation.pollinator_friendly)
    .bind(observation.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Earliest observation of the same scientific name inside the tolerance box
///
/// The box is axis-aligned in raw degrees (`|Δlat| <= tol`, `|Δlng| <= tol`),
/// not a geodesic radius.
pub async fn find_nearby_duplicate<'e, E>(
    executor: E,
    scientific_name: &str,
    lat: f64,
    lng: f64,
    tolerance_deg: f64,
) -> sqlx::Result<Option<Observation>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {} FROM observations
         WHERE scientific_name = ?
           AND lat BETWEEN ? AND ?
           AND lng BETWEEN ? AND ?
         ORDER BY created_at ASC, rowid ASC
         LIMIT 1",
        OBSERVATION_COLUMNS
    );

    sqlx::query::<Sqlite>(&sql)
        .bind(scientific_name)
        .bind(lat - tolerance_deg)
        .bind(lat + tolerance_deg)
        .bind(lng - tolerance_deg)
        .bind(lng + tolerance_deg)
        .try_map(|row: SqliteRow| Observation::from_row(&row))
        .fetch_optional(executor)
        .await
}

/// Top-N observations by creation time, optionally filtered by name substring
pub async fn list_observations<'e, E>(
    executor: E,
    filter: &ObservationFilter,
) -> sqlx::Result<Vec<Observation>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let direction = match filter.sort {
        SortOrder::Newest => "DESC",
        SortOrder::Oldest => "ASC",
    };

    let pattern = filter.like_pattern();
    let where_clause = if pattern.is_some() {
        "WHERE LOWER(COALESCE(common_name, '')) LIKE ? ESCAPE '\\'
            OR LOWER(scientific_name) LIKE ? ESCAPE '\\'"
    } else {
        ""
    };

    let sql = format!(
        "SELECT {} FROM observations {} ORDER BY created_at {dir}, rowid {dir} LIMIT ?",
        OBSERVATION_COLUMNS,
        where_clause,
        dir = direction
    );

    let mut query = sqlx::query::<Sqlite>(&sql);
    if let Some(pattern) = &pattern {
        query = query.bind(pattern.clone()).bind(pattern.clone());
    }

    query
        .bind(filter.limit)
        .try_map(|row: SqliteRow| Observation::from_row(&row))
        .fetch_all(executor)
        .await
}
