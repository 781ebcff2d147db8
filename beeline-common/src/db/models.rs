//! Database models
//!
//! Serialized with camelCase field names; these structs are also the JSON
//! shapes returned by the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// A single user-submitted sighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub id: String,
    pub common_name: Option<String>,
    pub scientific_name: String,
    #[serde(skip)]
    pub name_key: String,
    pub image_url: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub confidence: Option<f64>,
    pub pollinator_friendly: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl Observation {
    /// Map a row selected with [`OBSERVATION_COLUMNS`]
    pub fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("guid")?,
            common_name: row.try_get("common_name")?,
            scientific_name: row.try_get("scientific_name")?,
            name_key: row.try_get("name_key")?,
            image_url: row.try_get("image_url")?,
            lat: row.try_get("lat")?,
            lng: row.try_get("lng")?,
            confidence: row.try_get("confidence")?,
            pollinator_friendly: row.try_get("pollinator_friendly")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Column list matching [`Observation::from_row`]
pub const OBSERVATION_COLUMNS: &str = "guid, common_name, scientific_name, name_key, image_url, \
     lat, lng, confidence, pollinator_friendly, created_at";

/// Everything known about one species across all observations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: String,
    pub scientific_name: String,
    pub name_key: String,
    pub common_name: Option<String>,
    pub pollinator_friendly: Option<bool>,
    pub pollinator_notes: Option<String>,
    /// Snapshot of the resolved species entry
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plant {
    /// Map a row selected with [`PLANT_COLUMNS`]
    pub fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        let metadata: Option<String> = row.try_get("metadata")?;
        let metadata = match metadata {
            Some(text) => Some(
                serde_json::from_str(&text).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "metadata".to_string(),
                    source: Box::new(e),
                })?,
            ),
            None => None,
        };

        Ok(Self {
            id: row.try_get("guid")?,
            scientific_name: row.try_get("scientific_name")?,
            name_key: row.try_get("name_key")?,
            common_name: row.try_get("common_name")?,
            pollinator_friendly: row.try_get("pollinator_friendly")?,
            pollinator_notes: row.try_get("pollinator_notes")?,
            metadata,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Column list matching [`Plant::from_row`]
pub const PLANT_COLUMNS: &str = "guid, scientific_name, name_key, common_name, \
     pollinator_friendly, pollinator_notes, metadata, created_at, updated_at";

/// Link between a plant and one sighting location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identification {
    pub id: String,
    pub plant_id: String,
    pub observation_id: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub created_at: DateTime<Utc>,
}

/// Observation merged with its plant's pollinator data (query results)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationView {
    #[serde(flatten)]
    pub observation: Observation,
    pub pollinator_notes: Option<String>,
    pub pollinator_data: Option<Value>,
}

impl ObservationView {
    /// Merge an observation with its plant.
    ///
    /// The observation's own pollinator flag wins when present.
    pub fn merge(mut observation: Observation, plant: Option<&Plant>) -> Self {
        if observation.pollinator_friendly.is_none() {
            observation.pollinator_friendly = plant.and_then(|p| p.pollinator_friendly);
        }
        Self {
            observation,
            pollinator_notes: plant.and_then(|p| p.pollinator_notes.clone()),
            pollinator_data: plant.and_then(|p| p.metadata.clone()),
        }
    }
}
