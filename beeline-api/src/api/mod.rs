//! HTTP API handlers for beeline-api

pub mod health;
pub mod observations;
pub mod plants;
pub mod pollinator;

pub use health::health_routes;
pub use observations::{create_observation, list_observations, observation_routes};
pub use plants::{get_plant_by_scientific, plant_routes};
pub use pollinator::{pollinator_check, pollinator_routes};
