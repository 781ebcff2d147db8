//! Plant name normalization
//!
//! Free-text species names arrive from vision APIs, taxonomy lookups and
//! users typing into a form. These helpers turn them into comparison keys.
//! All functions are pure and never fail; empty input yields empty output.

/// Keep only the genus and species epithet of a scientific name.
///
/// Authority suffixes and infraspecific qualifiers are dropped:
/// `"Asclepias syriaca L."` becomes `"Asclepias syriaca"`. A single-token
/// name is returned trimmed.
pub fn binomial(name: &str) -> String {
    name.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
}

/// Loose normalization used for lookup-key matching.
///
/// Lowercases, removes punctuation and symbols (letters and digits of any
/// script are kept), collapses whitespace runs to a single space and trims.
/// A name with no letters or digits normalizes to `""`.
pub fn normalize(name: &str) -> String {
    let lowered = name.to_lowercase();
    let kept: String = lowered
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized form with all whitespace removed.
///
/// Hyphenated and spaced spellings of the same binomial only meet here:
/// `"asclepias-syriaca"` and `"Asclepias syriaca"` both become
/// `"asclepiassyriaca"`.
pub fn compact(name: &str) -> String {
    normalize(name).replace(' ', "")
}

/// Canonical identity key for a plant: normalized binomial.
///
/// Used both as the `plants.name_key` unique column and as the resolver's
/// loose lookup key.
pub fn name_key(name: &str) -> String {
    normalize(&binomial(name))
}
