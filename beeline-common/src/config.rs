//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `BEELINE_ROOT_FOLDER` environment variable
//! 3. `root_folder` key of the TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable config file never stops startup: a warning is
//! logged and compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "BEELINE_ROOT_FOLDER";

/// Environment variable pointing at an explicit config file
pub const CONFIG_FILE_ENV: &str = "BEELINE_CONFIG";

/// Compiled defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind_addr: String,
    pub database_file: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            bind_addr: default_bind_addr(),
            database_file: default_database_file(),
        }
    }
}

/// Top-level TOML configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeelineConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Database file name, relative to the root folder unless absolute
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// Replacement species table (JSON); built-in table when unset
    #[serde(default)]
    pub species_table: Option<PathBuf>,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub identify: IdentifyConfig,
}

impl Default for BeelineConfig {
    fn default() -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        Self {
            root_folder: None,
            bind_addr: defaults.bind_addr,
            database_file: defaults.database_file,
            species_table: None,
            ingest: IngestConfig::default(),
            query: QueryConfig::default(),
            identify: IdentifyConfig::default(),
        }
    }
}

/// Observation ingestion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Half-width in degrees of the duplicate-detection box (both axes)
    #[serde(default = "default_duplicate_tolerance_deg")]
    pub duplicate_tolerance_deg: f64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            duplicate_tolerance_deg: default_duplicate_tolerance_deg(),
        }
    }
}

/// Observation query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_query_limit")]
    pub default_limit: i64,

    #[serde(default = "default_max_query_limit")]
    pub max_limit: i64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_query_limit(),
            max_limit: default_max_query_limit(),
        }
    }
}

/// External identification services used by `beeline-identify`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyConfig {
    #[serde(default = "default_vision_url")]
    pub vision_url: String,

    #[serde(default)]
    pub vision_api_key: Option<String>,

    #[serde(default = "default_taxonomy_url")]
    pub taxonomy_url: String,

    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Base URL of the BeeLine API used for pinning
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

impl Default for IdentifyConfig {
    fn default() -> Self {
        Self {
            vision_url: default_vision_url(),
            vision_api_key: None,
            taxonomy_url: default_taxonomy_url(),
            max_candidates: default_max_candidates(),
            api_url: default_api_url(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:5730".to_string()
}

fn default_database_file() -> String {
    "beeline.db".to_string()
}

fn default_duplicate_tolerance_deg() -> f64 {
    // ~22 m of latitude
    0.0002
}

fn default_query_limit() -> i64 {
    100
}

fn default_max_query_limit() -> i64 {
    500
}

fn default_vision_url() -> String {
    "https://my-api.plantnet.org/v2/identify/all".to_string()
}

fn default_taxonomy_url() -> String {
    "https://api.inaturalist.org/v1".to_string()
}

fn default_max_candidates() -> usize {
    3
}

fn default_api_url() -> String {
    "http://127.0.0.1:5730".to_string()
}

impl BeelineConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load from `path`, or the first config file found, falling back to defaults
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let candidate = path.map(Path::to_path_buf).or_else(find_config_file);

        let Some(config_path) = candidate else {
            info!("No config file found, using defaults");
            return Self::default();
        };

        match Self::load(&config_path) {
            Ok(config) => {
                info!("Loaded config from {}", config_path.display());
                config
            }
            Err(e) => {
                warn!("{} - using defaults", e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.ingest.duplicate_tolerance_deg >= 0.0) {
            return Err(Error::Config(
                "ingest.duplicate_tolerance_deg must be a non-negative number".to_string(),
            ));
        }
        if self.query.max_limit < 1 {
            return Err(Error::Config("query.max_limit must be at least 1".to_string()));
        }
        if self.query.default_limit < 1 {
            return Err(Error::Config(
                "query.default_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Database path for a resolved root folder
    pub fn database_path(&self, root_folder: &Path) -> PathBuf {
        let file = Path::new(&self.database_file);
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            root_folder.join(file)
        }
    }
}

/// Locate a config file: `BEELINE_CONFIG`, then the user config dir, then `/etc`
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("beeline").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/beeline/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/beeline
        dirs::data_local_dir()
            .map(|d| d.join("beeline"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/beeline"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("beeline"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/beeline"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("beeline"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\beeline"))
    } else {
        PathBuf::from("./beeline_data")
    }
}

/// Resolves the root folder following the priority order above
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    config_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    pub fn with_config(mut self, config: &BeelineConfig) -> Self {
        self.config_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.config_root {
            return path.clone();
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Prepares the resolved root folder
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root folder if missing (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }
}
