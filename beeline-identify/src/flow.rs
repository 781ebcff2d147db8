//! Identify flow: candidates, best-effort enrichment, pin payload

use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::pin::PinRequest;
use crate::taxonomy::{Enrichment, TaxonomyClient};
use crate::vision::Candidate;

/// Source of taxon enrichment
///
/// Implemented by [`TaxonomyClient`]; tests substitute canned lookups.
#[allow(async_fn_in_trait)]
pub trait Enricher {
    async fn enrich(&self, scientific_name: &str) -> Result<Option<Enrichment>>;
}

impl Enricher for TaxonomyClient {
    async fn enrich(&self, scientific_name: &str) -> Result<Option<Enrichment>> {
        TaxonomyClient::enrich(self, scientific_name).await
    }
}

/// A vision candidate with whatever enrichment could be fetched
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub enrichment: Option<Enrichment>,
}

impl EnrichedCandidate {
    /// Name to show the user: taxonomy common name, then vision common name
    pub fn display_common_name(&self) -> Option<&str> {
        self.enrichment
            .as_ref()
            .and_then(|e| e.preferred_common_name.as_deref())
            .or_else(|| self.candidate.primary_common_name())
    }

    /// Observation payload for pinning this candidate at a location
    pub fn to_pin_request(&self, lat: f64, lng: f64) -> PinRequest {
        PinRequest {
            common_name: self.display_common_name().map(str::to_string),
            scientific_name: self.candidate.scientific_name.clone(),
            image_url: self.enrichment.as_ref().and_then(|e| e.photo_url.clone()),
            lat,
            lng,
            confidence: Some(self.candidate.score),
        }
    }
}

/// Enrich every candidate, keeping order
///
/// A failed lookup is logged and the candidate kept without enrichment.
pub async fn enrich_all<E: Enricher>(enricher: &E, candidates: Vec<Candidate>) -> Vec<EnrichedCandidate> {
    let mut enriched = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let enrichment = match enricher.enrich(&candidate.scientific_name).await {
            Ok(enrichment) => enrichment,
            Err(e) => {
                warn!(
                    scientific_name = %candidate.scientific_name,
                    error = %e,
                    "Taxonomy enrichment failed; keeping candidate without it"
                );
                None
            }
        };
        enriched.push(EnrichedCandidate { candidate, enrichment });
    }

    enriched
}
