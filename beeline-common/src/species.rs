//! Static species lookup table
//!
//! Curated plant metadata keyed by scientific name, with a pollinator-friendly
//! flag per species. The table is read-only at runtime; the service loads it
//! once at startup and shares it behind an `Arc`.

use crate::names::{compact, normalize};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Built-in table shipped with the crate
const BUILTIN_SPECIES_JSON: &str = include_str!("../data/species.json");

/// One species metadata entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesEntry {
    /// Primary lookup key
    pub scientific_name: String,
    #[serde(default)]
    pub common_names: Vec<String>,
    pub pollinator_friendly: bool,
    #[serde(default)]
    pub habitat: Option<String>,
    #[serde(default)]
    pub bloom_time: Option<String>,
    /// Pollinator groups known to visit the species
    #[serde(default)]
    pub pollinators: Vec<String>,
    #[serde(default)]
    pub care_notes: Option<String>,
    /// Short pollinator note surfaced to users
    #[serde(default)]
    pub notes: Option<String>,
}

impl SpeciesEntry {
    /// First listed common name, if any
    pub fn primary_common_name(&self) -> Option<&str> {
        self.common_names.first().map(String::as_str)
    }
}

/// Lookup table with exact, normalized and compact key indexes
#[derive(Debug, Clone, Default)]
pub struct SpeciesTable {
    entries: Vec<SpeciesEntry>,
    exact: HashMap<String, usize>,
    normalized: HashMap<String, usize>,
    compacted: HashMap<String, usize>,
}

impl SpeciesTable {
    /// Build a table from entries. On key collisions the first entry wins.
    pub fn new(entries: Vec<SpeciesEntry>) -> Self {
        let mut exact = HashMap::new();
        let mut normalized = HashMap::new();
        let mut compacted = HashMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            let key = entry.scientific_name.as_str();
            exact.entry(key.to_string()).or_insert(idx);

            let norm = normalize(key);
            if !norm.is_empty() {
                normalized.entry(norm).or_insert(idx);
            }
            let comp = compact(key);
            if !comp.is_empty() {
                compacted.entry(comp).or_insert(idx);
            }
        }

        Self {
            entries,
            exact,
            normalized,
            compacted,
        }
    }

    /// Table bundled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_SPECIES_JSON)
    }

    /// Parse a JSON array of entries
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<SpeciesEntry> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    /// Load a JSON table from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read species table {}: {}",
                path.display(),
                e
            ))
        })?;
        let table = Self::from_json_str(&content)?;
        info!(
            "Loaded {} species entries from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Use the table at `path` when given, the built-in table otherwise
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let table = Self::builtin()?;
                debug!("Using built-in species table ({} entries)", table.len());
                Ok(table)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in table order
    pub fn entries(&self) -> &[SpeciesEntry] {
        &self.entries
    }

    /// Exact key match
    pub fn get_exact(&self, key: &str) -> Option<&SpeciesEntry> {
        self.exact.get(key).map(|&idx| &self.entries[idx])
    }

    /// Match an already-normalized key against normalized table keys
    pub fn get_normalized(&self, normalized_key: &str) -> Option<&SpeciesEntry> {
        self.normalized
            .get(normalized_key)
            .map(|&idx| &self.entries[idx])
    }

    /// Match an already-compacted key against compacted table keys
    pub fn get_compact(&self, compact_key: &str) -> Option<&SpeciesEntry> {
        self.compacted
            .get(compact_key)
            .map(|&idx| &self.entries[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_parses() {
        let table = SpeciesTable::builtin().expect("built-in table should parse");
        assert!(table.len() > 20);
        let milkweed = table
            .get_exact("Asclepias syriaca")
            .expect("common milkweed should be present");
        assert!(milkweed.pollinator_friendly);
        assert_eq!(milkweed.primary_common_name(), Some("Common milkweed"));
    }

    #[test]
    fn test_builtin_keys_are_unique() {
        let table = SpeciesTable::builtin().unwrap();
        let mut seen = std::collections::HashSet::new();
        for entry in table.entries() {
            assert!(
                seen.insert(normalize(&entry.scientific_name)),
                "duplicate species key: {}",
                entry.scientific_name
            );
        }
    }

    #[test]
    fn test_first_entry_wins_on_collision() {
        let json = r#"[
            {"scientific_name": "Monarda fistulosa", "pollinator_friendly": true},
            {"scientific_name": "monarda fistulosa", "pollinator_friendly": false}
        ]"#;
        let table = SpeciesTable::from_json_str(json).unwrap();
        let entry = table.get_normalized("monarda fistulosa").unwrap();
        assert!(entry.pollinator_friendly);
        // Exact keys differ so both are reachable exactly
        assert!(!table.get_exact("monarda fistulosa").unwrap().pollinator_friendly);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"[{"scientific_name": "Taraxacum officinale", "pollinator_friendly": true}]"#;
        let table = SpeciesTable::from_json_str(json).unwrap();
        let entry = table.get_exact("Taraxacum officinale").unwrap();
        assert!(entry.common_names.is_empty());
        assert!(entry.notes.is_none());
        assert!(entry.pollinators.is_empty());
    }

    #[test]
    fn test_invalid_json_is_error() {
        let result = SpeciesTable::from_json_str("{not json");
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let result = SpeciesTable::load(Path::new("/nonexistent/beeline/species.json"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
