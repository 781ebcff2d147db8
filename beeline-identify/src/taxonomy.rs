//! Taxonomy API client (iNaturalist-style `/taxa` search)

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{check_status, IdentifyError, Result};

const USER_AGENT: &str = concat!("BeeLine/", env!("CARGO_PKG_VERSION"));

/// Extra display data for a candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    pub taxon_name: String,
    pub preferred_common_name: Option<String>,
    pub photo_url: Option<String>,
    pub wikipedia_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaxaResponse {
    #[serde(default)]
    results: Vec<Taxon>,
}

#[derive(Debug, Deserialize)]
struct Taxon {
    name: String,
    #[serde(default)]
    preferred_common_name: Option<String>,
    #[serde(default)]
    default_photo: Option<TaxonPhoto>,
    #[serde(default)]
    wikipedia_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaxonPhoto {
    #[serde(default)]
    medium_url: Option<String>,
}

/// Pick the enrichment for `scientific_name` out of a `/taxa` response
///
/// Prefers a taxon whose name equals the query (case-insensitive), else the
/// first result.
pub fn parse_enrichment(body: &str, scientific_name: &str) -> Result<Option<Enrichment>> {
    let response: TaxaResponse =
        serde_json::from_str(body).map_err(|e| IdentifyError::Parse(e.to_string()))?;

    let mut results = response.results;
    if results.is_empty() {
        return Ok(None);
    }

    let wanted = scientific_name.trim();
    let index = results
        .iter()
        .position(|taxon| taxon.name.eq_ignore_ascii_case(wanted))
        .unwrap_or(0);
    let taxon = results.swap_remove(index);

    Ok(Some(Enrichment {
        taxon_name: taxon.name,
        preferred_common_name: taxon.preferred_common_name.filter(|s| !s.is_empty()),
        photo_url: taxon.default_photo.and_then(|photo| photo.medium_url),
        wikipedia_url: taxon.wikipedia_url.filter(|s| !s.is_empty()),
    }))
}

/// Taxonomy API client
pub struct TaxonomyClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl TaxonomyClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IdentifyError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Look up taxon details for a scientific name
    pub async fn enrich(&self, scientific_name: &str) -> Result<Option<Enrichment>> {
        let url = format!("{}/taxa", self.base_url);
        debug!(url = %url, scientific_name = %scientific_name, "Querying taxonomy API");

        let response = self
            .http_client
            .get(&url)
            .query(&[("q", scientific_name), ("per_page", "5")])
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;

        parse_enrichment(&body, scientific_name)
    }
}
