//! Vision API client
//!
//! Uploads a plant photo to a Pl@ntNet-style identification endpoint and
//! returns ranked species candidates.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{check_status, IdentifyError, Result};

const USER_AGENT: &str = concat!("BeeLine/", env!("CARGO_PKG_VERSION"));

/// One species suggestion for a photo
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Scientific name without authority
    pub scientific_name: String,
    pub common_names: Vec<String>,
    /// Vision score in [0, 1]
    pub score: f64,
}

impl Candidate {
    pub fn primary_common_name(&self) -> Option<&str> {
        self.common_names.first().map(String::as_str)
    }
}

#[derive(Debug, Deserialize)]
struct VisionResponse {
    #[serde(default)]
    results: Vec<VisionResult>,
}

#[derive(Debug, Deserialize)]
struct VisionResult {
    #[serde(default)]
    score: f64,
    species: VisionSpecies,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisionSpecies {
    #[serde(default)]
    scientific_name_without_author: Option<String>,
    #[serde(default)]
    scientific_name: Option<String>,
    #[serde(default)]
    common_names: Vec<String>,
}

/// Parse a vision response body into candidates, best first
///
/// Results without any usable name are skipped. Scores outside [0, 1] are
/// clamped. Ties keep the service's order.
pub fn parse_candidates(body: &str, max_candidates: usize) -> Result<Vec<Candidate>> {
    let response: VisionResponse =
        serde_json::from_str(body).map_err(|e| IdentifyError::Parse(e.to_string()))?;

    let mut candidates: Vec<Candidate> = response
        .results
        .into_iter()
        .filter_map(|result| {
            let name = result
                .species
                .scientific_name_without_author
                .or(result.species.scientific_name)?
                .trim()
                .to_string();
            if name.is_empty() {
                return None;
            }
            let score = if result.score.is_finite() {
                result.score.clamp(0.0, 1.0)
            } else {
                0.0
            };
            Some(Candidate {
                scientific_name: name,
                common_names: result.species.common_names,
                score,
            })
        })
        .collect();

    rank_candidates(&mut candidates, max_candidates);
    Ok(candidates)
}

/// Sort by descending score and keep the first `max_candidates`
pub fn rank_candidates(candidates: &mut Vec<Candidate>, max_candidates: usize) {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates.truncate(max_candidates);
}

/// Vision API client
pub struct VisionClient {
    http_client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    max_candidates: usize,
}

impl VisionClient {
    pub fn new(url: &str, api_key: Option<String>, max_candidates: usize) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| IdentifyError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.to_string(),
            api_key,
            max_candidates,
        })
    }

    /// Identify the plant in `image`
    ///
    /// Returns an empty list only when the service itself answered with no
    /// usable results.
    pub async fn identify(&self, image: Vec<u8>, file_name: &str) -> Result<Vec<Candidate>> {
        if image.is_empty() {
            return Err(IdentifyError::InvalidInput("image is empty".to_string()));
        }

        let part = Part::bytes(image)
            .file_name(file_name.to_string())
            .mime_str(mime_for(file_name))?;
        let form = Form::new().part("images", part).text("organs", "auto");

        let mut request = self.http_client.post(&self.url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api-key", key)]);
        }

        debug!(url = %self.url, file_name = %file_name, "Submitting image to vision API");

        let response = check_status(request.send().await?).await?;
        let body = response.text().await?;
        let candidates = parse_candidates(&body, self.max_candidates)?;

        info!(
            file_name = %file_name,
            candidates = candidates.len(),
            top = %candidates.first().map(|c| c.scientific_name.as_str()).unwrap_or("none"),
            "Vision identification complete"
        );

        Ok(candidates)
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "query": {"organs": ["auto"]},
        "results": [
            {
                "score": 0.12,
                "species": {
                    "scientificNameWithoutAuthor": "Asclepias tuberosa",
                    "scientificName": "Asclepias tuberosa L.",
                    "commonNames": ["Butterfly weed"]
                }
            },
            {
                "score": 0.81,
                "species": {
                    "scientificNameWithoutAuthor": "Asclepias syriaca",
                    "scientificName": "Asclepias syriaca L.",
                    "commonNames": ["Common milkweed", "Silkweed"]
                }
            },
            {
                "score": 0.05,
                "species": {
                    "scientificNameWithoutAuthor": "Apocynum cannabinum",
                    "commonNames": []
                }
            },
            {
                "score": 0.02,
                "species": {
                    "scientificName": "Asclepias incarnata L."
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_ranks_by_score() {
        let candidates = parse_candidates(SAMPLE, 10).unwrap();

        let names: Vec<_> = candidates.iter().map(|c| c.scientific_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Asclepias syriaca",
                "Asclepias tuberosa",
                "Apocynum cannabinum",
                "Asclepias incarnata L."
            ]
        );
        assert_eq!(candidates[0].primary_common_name(), Some("Common milkweed"));
        assert_eq!(candidates[2].primary_common_name(), None);
    }

    #[test]
    fn test_parse_truncates_to_max() {
        let candidates = parse_candidates(SAMPLE, 2).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].scientific_name, "Asclepias tuberosa");
    }

    #[test]
    fn test_parse_skips_nameless_results() {
        let body = r#"{"results": [
            {"score": 0.9, "species": {"scientificNameWithoutAuthor": "  "}},
            {"score": 0.4, "species": {"scientificNameWithoutAuthor": "Zizia aurea"}}
        ]}"#;
        let candidates = parse_candidates(body, 3).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].scientific_name, "Zizia aurea");
    }

    #[test]
    fn test_parse_empty_and_missing_results() {
        assert!(parse_candidates(r#"{"results": []}"#, 3).unwrap().is_empty());
        assert!(parse_candidates("{}", 3).unwrap().is_empty());
    }

    #[test]
    fn test_parse_malformed_body() {
        let result = parse_candidates("<html>bad gateway</html>", 3);
        assert!(matches!(result, Err(IdentifyError::Parse(_))));
    }

    #[test]
    fn test_rank_clamps_and_keeps_ties_stable() {
        let body = r#"{"results": [
            {"score": 1.7, "species": {"scientificNameWithoutAuthor": "A a"}},
            {"score": 0.5, "species": {"scientificNameWithoutAuthor": "B b"}},
            {"score": 0.5, "species": {"scientificNameWithoutAuthor": "C c"}},
            {"score": -2.0, "species": {"scientificNameWithoutAuthor": "D d"}}
        ]}"#;
        let candidates = parse_candidates(body, 10).unwrap();

        assert_eq!(candidates[0].score, 1.0);
        assert_eq!(candidates[1].scientific_name, "B b");
        assert_eq!(candidates[2].scientific_name, "C c");
        assert_eq!(candidates[3].score, 0.0);
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("leaf.PNG"), "image/png");
        assert_eq!(mime_for("flower.webp"), "image/webp");
        assert_eq!(mime_for("photo.jpg"), "image/jpeg");
        assert_eq!(mime_for("photo"), "image/jpeg");
    }

    #[test]
    fn test_client_creation() {
        let client = VisionClient::new("http://127.0.0.1:9/identify", None, 3);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_identify_rejects_empty_image() {
        let client = VisionClient::new("http://127.0.0.1:9/identify", None, 3).unwrap();
        let result = client.identify(Vec::new(), "empty.jpg").await;
        assert!(matches!(result, Err(IdentifyError::InvalidInput(_))));
    }
}
