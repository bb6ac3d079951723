//! Configuration module.
//!
//! Handles loading, validating, and merging the `config.toml` file. The user
//! file is sparse: it is merged over the stock defaults, so it only needs the
//! values it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [cache]
//! path = "cache"            # Derivative records and reduced images
//! reduced_size = 1080       # Long edge of the reduced variant
//! nano_size = 8             # Long edge of the embedded nano thumbnail
//! quality = 90              # JPEG quality of the reduced variant (1-100)
//!
//! [logging]
//! verbosity = "info"        # trace | debug | info | warn | error
//! directory = "log"         # Daily-rotated log files (omit for stdout only)
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [sources.photos]          # One table per top-level source, in order
//! type = "folder"
//! path = "/srv/photos"
//! ```
//!
//! Unknown keys are rejected to catch typos early. Keys inside
//! `[sources.*]` are checked by the source registry when the tree is built;
//! a bad source entry is skipped rather than failing the whole load.

use crate::imaging::{DerivativeSettings, Quality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

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
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Derivative cache location and sizes.
    pub cache: CacheConfig,
    /// Log verbosity and optional log directory.
    pub logging: LoggingConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Top-level sources, keyed by url_name, in declaration order.
    pub sources: toml::Table,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.quality == 0 || self.cache.quality > 100 {
            return Err(ConfigError::Validation(
                "cache.quality must be 1-100".into(),
            ));
        }
        if self.cache.reduced_size == 0 || self.cache.nano_size == 0 {
            return Err(ConfigError::Validation(
                "cache sizes must be non-zero".into(),
            ));
        }
        if self.cache.nano_size > self.cache.reduced_size {
            return Err(ConfigError::Validation(
                "cache.nano_size must not exceed cache.reduced_size".into(),
            ));
        }
        if !LEVELS.contains(&self.logging.verbosity.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.verbosity must be one of {}",
                LEVELS.join(", ")
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Derivative cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Directory holding `<hash>.json` records and `<hash>.jpg` images.
    pub path: PathBuf,
    pub reduced_size: u32,
    pub nano_size: u32,
    pub quality: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let settings = DerivativeSettings::default();
        Self {
            path: PathBuf::from("cache"),
            reduced_size: settings.reduced_edge,
            nano_size: settings.nano_edge,
            quality: settings.quality.value(),
        }
    }
}

impl CacheConfig {
    pub fn derivative_settings(&self) -> DerivativeSettings {
        DerivativeSettings {
            reduced_edge: self.reduced_size,
            nano_edge: self.nano_size,
            quality: Quality::new(self.quality),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level filter; `RUST_LOG` takes precedence when set.
    pub verbosity: String,
    /// When set, logs are also written to daily-rotated files here.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            verbosity: "info".to_string(),
            directory: None,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel cache-warming workers.
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
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(AppConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults do not serialize: {e}")))
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

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
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

/// Load config from the file at `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Vitrine Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Derivative cache
# ---------------------------------------------------------------------------
[cache]
# Directory for cached records (<hash>.json) and reduced images (<hash>.jpg).
path = "cache"

# Long edge, in pixels, of the reduced variant. Smaller originals are kept
# at their own size.
reduced_size = 1080

# Long edge, in pixels, of the nano thumbnail embedded in each record.
nano_size = 8

# JPEG quality of the reduced variant (1 = worst, 100 = best).
quality = 90

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# One of: trace, debug, info, warn, error. RUST_LOG overrides this.
verbosity = "info"

# Also write daily-rotated log files into this directory.
# directory = "log"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel cache-warming workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Sources
# ---------------------------------------------------------------------------
# Each [sources.<url_name>] table adds a top-level entry, in file order.
# Common keys: type, name (defaults to the url_name), hidden, home.
#
# type = "folder": a directory on disk.
#   path = "/srv/photos"
#   sort = "descending"          # or "ascending", by file name
#   tags = false                 # true: hidden "Tags" index; "Label": visible
#
# type = "combine": other tree paths merged under one node.
#   internal_paths = ["/photos/2019", "/photos/2020"]
#   tags = false
#
# type = "tags": one album per image tag below the given paths.
#   internal_paths = ["/photos"]
[sources]
"##
}
