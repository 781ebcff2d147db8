//! beeline-identify - headless plant identification
//!
//! Sends a photo to a vision API, enriches the candidates from a taxonomy
//! API, and optionally pins the chosen species to the BeeLine map.

pub mod error;
pub mod flow;
pub mod pin;
pub mod taxonomy;
pub mod vision;

pub use error::{IdentifyError, Result};
pub use flow::{enrich_all, EnrichedCandidate, Enricher};
pub use pin::{BeelineClient, PinRequest, PinResponse};
pub use taxonomy::{Enrichment, TaxonomyClient};
pub use vision::{Candidate, VisionClient};
