//! Database access layer for beeline-api
//!
//! Query functions are generic over the SQLite executor so the ingestion
//! path can run them inside one transaction.

pub mod identifications;
pub mod observations;
pub mod plants;

pub use identifications::insert_identification;
pub use observations::{find_nearby_duplicate, insert_observation, list_observations};
pub use plants::{find_plant_by_scientific_name, load_plants_by_keys, upsert_plant};
