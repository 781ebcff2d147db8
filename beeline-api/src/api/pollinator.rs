//! Pollinator lookup endpoint
//!
//! Pure table lookup, nothing is persisted. An unknown species is a normal
//! response with null fields, not an error.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::ingest::resolve_submission;
use crate::AppState;

/// Body of `POST /api/pollinator-check`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollinatorCheckRequest {
    pub scientific_name: Option<String>,
    pub common_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollinatorCheckResponse {
    pub pollinator_friendly: Option<bool>,
    pub pollinator_notes: Option<String>,
    pub pollinator_data: Option<Value>,
}

/// POST /api/pollinator-check
pub async fn pollinator_check(
    State(state): State<AppState>,
    body: Result<Json<PollinatorCheckRequest>, JsonRejection>,
) -> ApiResult<Json<PollinatorCheckResponse>> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let scientific = request
        .scientific_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let common = request
        .common_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let resolution = match scientific {
        Some(name) => resolve_submission(&state.species, name, common),
        None => beeline_common::resolve(&state.species, None, common),
    };

    let response = match resolution {
        Some(resolution) => PollinatorCheckResponse {
            pollinator_friendly: Some(resolution.entry.pollinator_friendly),
            pollinator_notes: resolution.entry.notes.clone(),
            pollinator_data: Some(serde_json::to_value(resolution.entry).map_err(|e| {
                ApiError::Internal(format!("Failed to encode species entry: {}", e))
            })?),
        },
        None => PollinatorCheckResponse {
            pollinator_friendly: None,
            pollinator_notes: None,
            pollinator_data: None,
        },
    };

    Ok(Json(response))
}

/// Build pollinator routes
pub fn pollinator_routes() -> Router<AppState> {
    Router::new().route("/api/pollinator-check", post(pollinator_check))
}
