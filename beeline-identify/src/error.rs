//! Error types for the identify flow

use thiserror::Error;

/// Failures talking to the vision, taxonomy or BeeLine services
#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No species candidates returned")]
    NoCandidates,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<reqwest::Error> for IdentifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            IdentifyError::Parse(err.to_string())
        } else {
            IdentifyError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, IdentifyError>;

/// Turn a non-2xx response into [`IdentifyError::Api`]
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(IdentifyError::Api(status.as_u16(), body))
}
