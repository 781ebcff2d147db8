//! "Pin to map": submit a confirmed identification to the BeeLine API

use std::time::Duration;

use beeline_common::db::Observation;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{check_status, IdentifyError, Result};

/// Body of `POST /api/observations`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    pub scientific_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Ingestion response; plant and identification are kept as raw JSON
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinResponse {
    pub duplicate: bool,
    pub observation: Observation,
    #[serde(default)]
    pub plant: Option<serde_json::Value>,
    #[serde(default)]
    pub identification: Option<serde_json::Value>,
}

impl PinResponse {
    /// Pollinator flag of the stored observation, if the species was known
    pub fn pollinator_friendly(&self) -> Option<bool> {
        self.observation.pollinator_friendly
    }
}

/// Client for the BeeLine API
pub struct BeelineClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl BeelineClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IdentifyError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// POST the observation; a nearby duplicate comes back with `duplicate: true`
    pub async fn pin(&self, request: &PinRequest) -> Result<PinResponse> {
        let url = format!("{}/api/observations", self.base_url);

        let response = self.http_client.post(&url).json(request).send().await?;
        let response: PinResponse = check_status(response).await?.json().await?;

        info!(
            scientific_name = %request.scientific_name,
            observation_id = %response.observation.id,
            duplicate = response.duplicate,
            "Pinned observation"
        );

        Ok(response)
    }
}
