//! Pollinator resolver
//!
//! Cascade of name-matching attempts against the species lookup table.
//! First match wins:
//! 1. raw scientific name, exact
//! 2. binomial-truncated scientific name, exact
//! 3. raw scientific name, normalized (then compacted)
//! 4. truncated scientific name, normalized (then compacted)
//! 5. common name against normalized table keys, then against each
//!    entry's listed common names
//!
//! No match is not an error: callers treat it as "pollinator-friendly: unknown".

use crate::names::{binomial, compact, normalize};
use crate::species::{SpeciesEntry, SpeciesTable};
use serde::Serialize;
use tracing::debug;

/// Which step of the cascade produced the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    ExactBinomial,
    Normalized,
    NormalizedBinomial,
    CommonNameKey,
    CommonName,
}

/// Successful resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    pub entry: &'a SpeciesEntry,
    pub matched_by: MatchKind,
}

/// Resolve a species entry from an optional scientific and common name
pub fn resolve<'a>(
    table: &'a SpeciesTable,
    scientific_name: Option<&str>,
    common_name: Option<&str>,
) -> Option<Resolution<'a>> {
    let found = scientific_name
        .filter(|name| !name.trim().is_empty())
        .and_then(|name| resolve_scientific(table, name))
        .or_else(|| {
            common_name
                .filter(|name| !name.trim().is_empty())
                .and_then(|name| resolve_common(table, name))
        });

    match &found {
        Some(resolution) => debug!(
            scientific_name = ?scientific_name,
            common_name = ?common_name,
            matched = %resolution.entry.scientific_name,
            matched_by = ?resolution.matched_by,
            "Resolved species"
        ),
        None => debug!(
            scientific_name = ?scientific_name,
            common_name = ?common_name,
            "No species match"
        ),
    }

    found
}

fn resolve_scientific<'a>(table: &'a SpeciesTable, raw: &str) -> Option<Resolution<'a>> {
    let truncated = binomial(raw);

    if let Some(entry) = table.get_exact(raw) {
        return Some(Resolution { entry, matched_by: MatchKind::Exact });
    }
    if let Some(entry) = table.get_exact(&truncated) {
        return Some(Resolution { entry, matched_by: MatchKind::ExactBinomial });
    }
    if let Some(entry) = loose_match(table, raw) {
        return Some(Resolution { entry, matched_by: MatchKind::Normalized });
    }
    if let Some(entry) = loose_match(table, &truncated) {
        return Some(Resolution { entry, matched_by: MatchKind::NormalizedBinomial });
    }
    None
}

fn loose_match<'a>(table: &'a SpeciesTable, name: &str) -> Option<&'a SpeciesEntry> {
    let norm = normalize(name);
    if norm.is_empty() {
        return None;
    }
    table
        .get_normalized(&norm)
        .or_else(|| table.get_compact(&compact(name)))
}

fn resolve_common<'a>(table: &'a SpeciesTable, common: &str) -> Option<Resolution<'a>> {
    let wanted = normalize(common);
    if wanted.is_empty() {
        return None;
    }

    // Keys are scientific names, so this only hits when a key happens to be
    // common-name shaped.
    if let Some(entry) = table
        .entries()
        .iter()
        .find(|entry| normalize(&entry.scientific_name) == wanted)
    {
        return Some(Resolution { entry, matched_by: MatchKind::CommonNameKey });
    }

    table
        .entries()
        .iter()
        .find(|entry| entry.common_names.iter().any(|c| normalize(c) == wanted))
        .map(|entry| Resolution { entry, matched_by: MatchKind::CommonName })
}
