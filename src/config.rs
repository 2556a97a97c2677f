//! Application configuration.
//!
//! Handles loading, validating, and overlaying `config.toml`. Stock defaults
//! are the base layer; a `config.toml` in the application root overrides
//! them key by key; finally the GIF search API key is taken from the process
//! environment (after `.env` has been loaded) when present.
//!
//! ## Config File Location
//!
//! ```text
//! app/
//! ├── config.toml          # optional, overrides stock defaults
//! ├── .env                 # optional, API_KEY=...
//! └── static/images/       # artifacts land here
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! images_dir = "static/images"     # relative to the app root
//! public_prefix = "static/images"  # prefix of returned references
//!
//! [images]
//! max_dimension = 500              # neither output side exceeds this
//! quality = 90                     # JPEG output quality (1-100)
//! max_input_dimension = 16384      # larger uploads are refused at decode
//!
//! [processing]
//! max_processes = 4                # Max parallel workers (omit for auto = CPU cores)
//!
//! [gif_search]
//! endpoint = "https://tenor.googleapis.com/v2/search"
//! api_key_env = "API_KEY"
//! timeout_secs = 10
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `config.toml`.
///
/// Built once at startup and passed by reference to whatever needs it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Where artifacts are written and how they are referenced.
    pub storage: StorageConfig,
    /// Bounding, encoding and decode limits.
    pub images: ImagesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// GIF search collaborator.
    pub gif_search: GifSearchConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.images_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.images_dir must not be empty".into(),
            ));
        }
        if self.images.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "images.max_dimension must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation("images.quality must be 1-100".into()));
        }
        if self.images.max_input_dimension < self.images.max_dimension {
            return Err(ConfigError::Validation(
                "images.max_input_dimension must be at least images.max_dimension".into(),
            ));
        }
        if self.gif_search.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation(
                "gif_search.endpoint must not be empty".into(),
            ));
        }
        if self.gif_search.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "gif_search.timeout_secs must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Overlay values taken from the environment.
    ///
    /// `lookup` is `std::env::var(..).ok()` in production; tests pass a map.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(&self.gif_search.api_key_env).filter(|k| !k.trim().is_empty()) {
            self.gif_search.api_key = Some(key);
        }
    }
}

/// Artifact storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory artifacts are written to, relative to the app root.
    pub images_dir: String,
    /// Prefix of the references handed back to the rendering layer.
    pub public_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            images_dir: "static/images".to_string(),
            public_prefix: "static/images".to_string(),
        }
    }
}

/// Image pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Uploads are shrunk so neither side exceeds this many pixels.
    pub max_dimension: u32,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// Uploads wider or taller than this are refused before decoding pixels.
    pub max_input_dimension: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            max_dimension: 500,
            quality: 90,
            max_input_dimension: 16_384,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// GIF search collaborator settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GifSearchConfig {
    /// Search endpoint.
    pub endpoint: String,
    /// API key. Usually left out of the file and supplied via `api_key_env`.
    pub api_key: Option<String>,
    /// Environment variable the API key is read from at startup.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GifSearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://tenor.googleapis.com/v2/search".to_string(),
            api_key: None,
            api_key_env: "API_KEY".to_string(),
            timeout_secs: 10,
        }
    }
}

// Keep the key out of debug output and logs.
impl std::fmt::Debug for GifSearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GifSearchConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_key_env", &self.api_key_env)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. Does not consult the environment; see
/// [`AppConfig::apply_env`].
pub fn load_config(root: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# filterbox configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Artifact storage
# ---------------------------------------------------------------------------
[storage]
# Directory filtered images are written to, relative to the app root.
# Files are named "{filter}-{uploaded file name}"; a second upload with the
# same name and filter replaces the first.
images_dir = "static/images"

# Prefix of the reference returned for each artifact.
public_prefix = "static/images"

# ---------------------------------------------------------------------------
# Image pipeline
# ---------------------------------------------------------------------------
[images]
# Uploads are shrunk (never enlarged) so neither side exceeds this.
max_dimension = 500

# JPEG encoding quality (1 = worst, 100 = best). Other formats are lossless.
quality = 90

# Uploads wider or taller than this are refused without being decoded.
max_input_dimension = 16384

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers when filtering several images at once.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# GIF search
# ---------------------------------------------------------------------------
[gif_search]
endpoint = "https://tenor.googleapis.com/v2/search"

# Environment variable holding the API key. A .env file in the working
# directory is loaded first, so API_KEY=... there works too.
api_key_env = "API_KEY"

# Seconds before a search request is abandoned. There are no retries.
timeout_secs = 10
"##
}
