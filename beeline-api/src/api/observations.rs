//! Observation endpoints
//!
//! POST /api/observations: ingest a sighting (201 new, 200 duplicate)
//! GET  /api/observations: top-N observations merged with plant data

use std::collections::{BTreeSet, HashMap};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use beeline_common::db::ObservationView;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::ingest::{ingest_observation, IngestResponse, ObservationRequest};
use crate::query::{ObservationFilter, ObservationQueryParams};
use crate::AppState;

/// POST /api/observations
pub async fn create_observation(
    State(state): State<AppState>,
    body: Result<Json<ObservationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<IngestResponse>)> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let new = request.validate()?;

    let outcome = ingest_observation(
        &state.db,
        &state.species,
        state.ingest.duplicate_tolerance_deg,
        new,
    )
    .await?;

    let response = IngestResponse::from(outcome);
    let status = if response.duplicate {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json(response)))
}

/// GET /api/observations?limit=&sort=&q=
pub async fn list_observations(
    State(state): State<AppState>,
    params: Result<Query<ObservationQueryParams>, QueryRejection>,
) -> ApiResult<Json<Vec<ObservationView>>> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let filter = ObservationFilter::from_params(params, &state.query)?;

    let observations = db::list_observations(&state.db, &filter).await?;

    let keys: Vec<String> = observations
        .iter()
        .map(|o| o.name_key.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let plants = db::load_plants_by_keys(&state.db, &keys).await?;
    let plants_by_key: HashMap<&str, _> = plants
        .iter()
        .map(|plant| (plant.name_key.as_str(), plant))
        .collect();

    let merged = observations
        .into_iter()
        .map(|observation| {
            let plant = plants_by_key.get(observation.name_key.as_str()).copied();
            ObservationView::merge(observation, plant)
        })
        .collect();

    Ok(Json(merged))
}

/// Build observation routes
pub fn observation_routes() -> Router<AppState> {
    Router::new().route(
        "/api/observations",
        get(list_observations).post(create_observation),
    )
}
