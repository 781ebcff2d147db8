//! beeline-api library - BeeLine observation service
//!
//! HTTP surface for pollinator lookups, observation ingestion and the
//! shared observation map.

use std::sync::Arc;

use axum::Router;
use beeline_common::config::{IngestConfig, QueryConfig};
use beeline_common::SpeciesTable;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod ingest;
pub mod query;

pub use crate::error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Static species lookup table
    pub species: Arc<SpeciesTable>,
    pub ingest: IngestConfig,
    pub query: QueryConfig,
}

impl AppState {
    /// Create new application state with default ingest/query settings
    pub fn new(db: SqlitePool, species: SpeciesTable) -> Self {
        Self {
            db,
            species: Arc::new(species),
            ingest: IngestConfig::default(),
            query: QueryConfig::default(),
        }
    }

    pub fn with_ingest(mut self, ingest: IngestConfig) -> Self {
        self.ingest = ingest;
        self
    }

    pub fn with_query(mut self, query: QueryConfig) -> Self {
        self.query = query;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::pollinator_routes())
        .merge(api::observation_routes())
        .merge(api::plant_routes())
        .merge(api::health_routes())
        // Browser builds of the mobile client call from another origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
