//! Observation ingestion
//!
//! Validates a candidate identification, resolves pollinator metadata,
//! suppresses near-duplicates and persists Observation + Plant +
//! Identification. The duplicate check and all writes share one
//! transaction.

use beeline_common::db::{Identification, Observation, Plant};
use beeline_common::names::{binomial, name_key};
use beeline_common::{resolve, Resolution, SpeciesTable};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db;
use crate::error::ApiError;

/// Body of `POST /api/observations`
///
/// `lat`/`lng` are taken as raw JSON so numeric strings are accepted and
/// anything else gets a 400 instead of a deserialization rejection.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRequest {
    pub common_name: Option<String>,
    pub scientific_name: Option<String>,
    pub image_url: Option<String>,
    pub lat: Option<Value>,
    pub lng: Option<Value>,
    pub confidence: Option<Value>,
}

/// Validated ingestion input
#[derive(Debug, Clone, PartialEq)]
pub struct NewObservation {
    pub common_name: Option<String>,
    pub scientific_name: String,
    pub image_url: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub confidence: Option<f64>,
}

impl ObservationRequest {
    pub fn validate(self) -> Result<NewObservation, ApiError> {
        let scientific_name = self
            .scientific_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::BadRequest("scientificName is required".to_string()))?
            .to_string();
        if name_key(&scientific_name).is_empty() {
            return Err(ApiError::BadRequest(
                "scientificName must contain letters or digits".to_string(),
            ));
        }

        let lat = parse_number("lat", self.lat.as_ref())?
            .ok_or_else(|| ApiError::BadRequest("lat is required".to_string()))?;
        let lng = parse_number("lng", self.lng.as_ref())?
            .ok_or_else(|| ApiError::BadRequest("lng is required".to_string()))?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(ApiError::BadRequest(format!("lat out of range: {}", lat)));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(ApiError::BadRequest(format!("lng out of range: {}", lng)));
        }

        let confidence = parse_number("confidence", self.confidence.as_ref())?;
        if let Some(confidence) = confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(ApiError::BadRequest(format!(
                    "confidence must be between 0 and 1: {}",
                    confidence
                )));
            }
        }

        Ok(NewObservation {
            common_name: non_empty(self.common_name),
            scientific_name,
            image_url: non_empty(self.image_url),
            lat,
            lng,
            confidence,
        })
    }
}

/// Finite number from a JSON number or numeric string; `null` counts as absent
fn parse_number(field: &str, value: Option<&Value>) -> Result<Option<f64>, ApiError> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match parsed {
        Some(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(ApiError::BadRequest(format!("{} must be numeric", field))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Result of an ingestion
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// A nearby observation of the same name already exists; nothing written
    Duplicate(Observation),
    Created {
        observation: Observation,
        plant: Plant,
        identification: Identification,
    },
}

/// Response body of `POST /api/observations`
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub duplicate: bool,
    pub observation: Observation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identification: Option<Identification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plant: Option<Plant>,
}

impl From<IngestOutcome> for IngestResponse {
    fn from(outcome: IngestOutcome) -> Self {
        match outcome {
            IngestOutcome::Duplicate(observation) => Self {
                duplicate: true,
                observation,
                identification: None,
                plant: None,
            },
            IngestOutcome::Created {
                observation,
                plant,
                identification,
            } => Self {
                duplicate: false,
                observation,
                identification: Some(identification),
                plant: Some(plant),
            },
        }
    }
}

/// Resolve pollinator metadata for a submitted name: raw first, then binomial
pub fn resolve_submission<'a>(
    species: &'a SpeciesTable,
    scientific_name: &str,
    common_name: Option<&str>,
) -> Option<Resolution<'a>> {
    resolve(species, Some(scientific_name), common_name)
        .or_else(|| resolve(species, Some(&binomial(scientific_name)), common_name))
}

/// Ingest one validated observation
pub async fn ingest_observation(
    pool: &SqlitePool,
    species: &SpeciesTable,
    tolerance_deg: f64,
    new: NewObservation,
) -> Result<IngestOutcome, ApiError> {
    let resolution = resolve_submission(species, &new.scientific_name, new.common_name.as_deref());
    let entry = resolution.as_ref().map(|r| r.entry);

    // Write lock up front: a deferred transaction that reads and then writes
    // fails with SQLITE_BUSY under concurrent writers instead of waiting.
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    if let Some(existing) = db::find_nearby_duplicate(
        &mut *tx,
        &new.scientific_name,
        new.lat,
        new.lng,
        tolerance_deg,
    )
    .await?
    {
        tx.rollback().await?;
        debug!(
            observation_id = %existing.id,
            scientific_name = %new.scientific_name,
            "Duplicate observation suppressed"
        );
        return Ok(IngestOutcome::Duplicate(existing));
    }

    let now = Utc::now();
    let key = name_key(&new.scientific_name);
    let common_name = new
        .common_name
        .clone()
        .or_else(|| entry.and_then(|e| e.primary_common_name().map(String::from)));
    let pollinator_friendly = entry.map(|e| e.pollinator_friendly);

    let observation = Observation {
        id: Uuid::new_v4().to_string(),
        common_name: common_name.clone(),
        scientific_name: new.scientific_name.clone(),
        name_key: key.clone(),
        image_url: new.image_url,
        lat: new.lat,
        lng: new.lng,
        confidence: new.confidence,
        pollinator_friendly,
        created_at: now,
    };
    db::insert_observation(&mut *tx, &observation).await?;

    let metadata = entry.map(serde_json::to_value).transpose().map_err(|e| {
        ApiError::Internal(format!("Failed to snapshot species metadata: {}", e))
    })?;
    let plant = db::upsert_plant(
        &mut *tx,
        &Plant {
            id: Uuid::new_v4().to_string(),
            scientific_name: new.scientific_name.clone(),
            name_key: key,
            common_name,
            pollinator_friendly,
            pollinator_notes: entry.and_then(|e| e.notes.clone()),
            metadata,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;

    let identification = Identification {
        id: Uuid::new_v4().to_string(),
        plant_id: plant.id.clone(),
        observation_id: Some(observation.id.clone()),
        lat: new.lat,
        lng: new.lng,
        created_at: now,
    };
    db::insert_identification(&mut *tx, &identification).await?;

    tx.commit().await?;

    info!(
        observation_id = %observation.id,
        plant_id = %plant.id,
        scientific_name = %observation.scientific_name,
        pollinator_friendly = ?plant.pollinator_friendly,
        matched_by = ?resolution.as_ref().map(|r| r.matched_by),
        "Observation recorded"
    );

    Ok(IngestOutcome::Created {
        observation,
        plant,
        identification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use beeline_common::db::{init_database, init_memory_database};
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn request(value: Value) -> ObservationRequest {
        serde_json::from_value(value).unwrap()
    }

    fn valid(name: &str, lat: f64, lng: f64) -> NewObservation {
        request(json!({"scientificName": name, "lat": lat, "lng": lng}))
            .validate()
            .unwrap()
    }

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[test]
    fn test_validate_accepts_numeric_strings() {
        let new = request(json!({
            "scientificName": "  Asclepias syriaca ",
            "lat": "41.6218",
            "lng": -87.0589,
            "confidence": 0.87,
            "commonName": "  ",
        }))
        .validate()
        .unwrap();
        assert_eq!(new.scientific_name, "Asclepias syriaca");
        assert_eq!(new.lat, 41.6218);
        assert_eq!(new.confidence, Some(0.87));
        assert!(new.common_name.is_none());
    }

    #[test]
    fn test_validate_rejects_missing_or_bad_fields() {
        let cases = [
            json!({"scientificName": "Asclepias syriaca", "lng": 1.0}),
            json!({"scientificName": "Asclepias syriaca", "lat": 1.0}),
            json!({"scientificName": "   ", "lat": 1.0, "lng": 1.0}),
            json!({"lat": 1.0, "lng": 1.0}),
            json!({"scientificName": "Asclepias syriaca", "lat": "north", "lng": 1.0}),
            json!({"scientificName": "Asclepias syriaca", "lat": true, "lng": 1.0}),
            json!({"scientificName": "Asclepias syriaca", "lat": 91.0, "lng": 1.0}),
            json!({"scientificName": "Asclepias syriaca", "lat": 1.0, "lng": -181.0}),
            json!({"scientificName": "Asclepias syriaca", "lat": 1.0, "lng": 1.0, "confidence": 1.5}),
            json!({"scientificName": "???", "lat": 1.0, "lng": 1.0}),
            json!({"scientificName": "-- . --", "lat": 1.0, "lng": 1.0}),
        ];
        for case in cases {
            let result = request(case.clone()).validate();
            assert!(
                matches!(result, Err(ApiError::BadRequest(_))),
                "expected rejection for {}",
                case
            );
        }
    }

    #[tokio::test]
    async fn test_ingest_creates_three_rows() {
        let pool = init_memory_database().await.unwrap();
        let species = SpeciesTable::builtin().unwrap();

        let outcome = ingest_observation(&pool, &species, 0.0002, valid("Asclepias syriaca", 41.6218, -87.0589))
            .await
            .unwrap();

        let IngestOutcome::Created { observation, plant, identification } = outcome else {
            panic!("expected a new observation");
        };
        assert_eq!(plant.pollinator_friendly, Some(true));
        assert_eq!(observation.pollinator_friendly, Some(true));
        assert_eq!(observation.common_name.as_deref(), Some("Common milkweed"));
        assert_eq!(identification.plant_id, plant.id);
        assert_eq!(identification.observation_id.as_deref(), Some(observation.id.as_str()));
        assert!(plant.metadata.is_some());

        assert_eq!(count(&pool, "observations").await, 1);
        assert_eq!(count(&pool, "plants").await, 1);
        assert_eq!(count(&pool, "identifications").await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_writes_nothing() {
        let pool = init_memory_database().await.unwrap();
        let species = SpeciesTable::builtin().unwrap();

        let first = ingest_observation(&pool, &species, 0.0002, valid("Asclepias syriaca", 41.6218, -87.0589))
            .await
            .unwrap();
        let IngestOutcome::Created { observation: original, .. } = first else {
            panic!("expected a new observation");
        };

        let second = ingest_observation(&pool, &species, 0.0002, valid("Asclepias syriaca", 41.62185, -87.05895))
            .await
            .unwrap();
        match second {
            IngestOutcome::Duplicate(existing) => assert_eq!(existing.id, original.id),
            other => panic!("expected duplicate, got {:?}", other),
        }

        assert_eq!(count(&pool, "observations").await, 1);
        assert_eq!(count(&pool, "identifications").await, 1);
    }

    #[tokio::test]
    async fn test_far_sighting_reuses_plant() {
        let pool = init_memory_database().await.unwrap();
        let species = SpeciesTable::builtin().unwrap();

        ingest_observation(&pool, &species, 0.0002, valid("Asclepias syriaca", 41.6218, -87.0589))
            .await
            .unwrap();
        let outcome = ingest_observation(&pool, &species, 0.0002, valid("Asclepias syriaca L.", 41.70, -87.10))
            .await
            .unwrap();

        assert!(matches!(outcome, IngestOutcome::Created { .. }));
        assert_eq!(count(&pool, "observations").await, 2);
        assert_eq!(count(&pool, "plants").await, 1);
        assert_eq!(count(&pool, "identifications").await, 2);
    }

    #[tokio::test]
    async fn test_unknown_species_has_unknown_flag() {
        let pool = init_memory_database().await.unwrap();
        let species = SpeciesTable::builtin().unwrap();

        let outcome = ingest_observation(&pool, &species, 0.0002, valid("Plantus imaginarius", 10.0, 10.0))
            .await
            .unwrap();
        let IngestOutcome::Created { observation, plant, .. } = outcome else {
            panic!("expected a new observation");
        };
        assert_eq!(observation.pollinator_friendly, None);
        assert_eq!(plant.pollinator_friendly, None);
        assert!(plant.metadata.is_none());
    }

    #[tokio::test]
    async fn test_non_latin_names_get_separate_plants() {
        let pool = init_memory_database().await.unwrap();
        let species = SpeciesTable::builtin().unwrap();

        let yarrow = ingest_observation(&pool, &species, 0.0002, valid("Тысячелистник обыкновенный", 55.75, 37.61))
            .await
            .unwrap();
        let chamomile = ingest_observation(&pool, &species, 0.0002, valid("Ромашка аптечная", 55.75, 37.61))
            .await
            .unwrap();

        let (
            IngestOutcome::Created { plant: yarrow, .. },
            IngestOutcome::Created { plant: chamomile, .. },
        ) = (yarrow, chamomile)
        else {
            panic!("expected two new observations");
        };
        assert_eq!(yarrow.scientific_name, "Тысячелистник обыкновенный");
        assert_eq!(chamomile.scientific_name, "Ромашка аптечная");
        assert_ne!(yarrow.id, chamomile.id);
        assert!(!yarrow.name_key.is_empty());
        assert_eq!(count(&pool, "plants").await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ingestions_on_file_database() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("beeline.db")).await.unwrap();
        let species = Arc::new(SpeciesTable::builtin().unwrap());

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let pool = pool.clone();
                let species = Arc::clone(&species);
                tokio::spawn(async move {
                    let new = valid(&format!("Genus species{}", i), 41.0, -87.0);
                    ingest_observation(&pool, &species, 0.0002, new).await
                })
            })
            .collect();

        for handle in handles {
            let outcome = handle.await.unwrap();
            assert!(
                matches!(outcome, Ok(IngestOutcome::Created { .. })),
                "ingestion failed: {:?}",
                outcome
            );
        }

        assert_eq!(count(&pool, "observations").await, 40);
        assert_eq!(count(&pool, "plants").await, 40);
        assert_eq!(count(&pool, "identifications").await, 40);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_same_sighting_recorded_once() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("beeline.db")).await.unwrap();
        let species = Arc::new(SpeciesTable::builtin().unwrap());

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let pool = pool.clone();
                let species = Arc::clone(&species);
                tokio::spawn(async move {
                    let new = valid("Asclepias syriaca", 41.6218, -87.0589);
                    ingest_observation(&pool, &species, 0.0002, new).await
                })
            })
            .collect();

        let mut created = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(IngestOutcome::Created { .. }) => created += 1,
                Ok(IngestOutcome::Duplicate(_)) => duplicates += 1,
                Err(e) => panic!("ingestion failed: {:?}", e),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(duplicates, 9);
        assert_eq!(count(&pool, "observations").await, 1);
        assert_eq!(count(&pool, "plants").await, 1);
    }

    #[test]
    fn test_response_shape() {
        let response = IngestResponse {
            duplicate: true,
            observation: Observation {
                id: "o1".to_string(),
                common_name: None,
                scientific_name: "Zizia aurea".to_string(),
                name_key: "zizia aurea".to_string(),
                image_url: None,
                lat: 1.0,
                lng: 2.0,
                confidence: None,
                pollinator_friendly: Some(true),
                created_at: Utc::now(),
            },
            identification: None,
            plant: None,
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["duplicate"], true);
        assert_eq!(value["observation"]["id"], "o1");
        assert!(value.get("plant").is_none());
        assert!(value.get("identification").is_none());
    }
}
