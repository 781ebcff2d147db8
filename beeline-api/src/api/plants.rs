//! Plant lookup endpoint

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use beeline_common::db::Plant;
use serde::Deserialize;

use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ScientificNameQuery {
    pub name: Option<String>,
}

/// GET /api/plants/by-scientific?name=
///
/// Tries the exact stored name, then the binomial-truncated name.
pub async fn get_plant_by_scientific(
    State(state): State<AppState>,
    query: Result<Query<ScientificNameQuery>, QueryRejection>,
) -> ApiResult<Json<Plant>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let name = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ApiError::BadRequest("name is required".to_string()))?;

    db::find_plant_by_scientific_name(&state.db, name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("No plant named {}", name)))
}

/// Build plant routes
pub fn plant_routes() -> Router<AppState> {
    Router::new().route("/api/plants/by-scientific", get(get_plant_by_scientific))
}
