//! Configuration module.
//!
//! Handles loading, validating, and merging `longstitch.toml`. Stock defaults
//! are the base layer; a user file overrides only the keys it names.
//!
//! ## Config File Location
//!
//! Looked up in this order:
//!
//! 1. the path given with `--config` (must exist)
//! 2. `longstitch.toml` in the working directory, if present
//! 3. stock defaults
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! dir = "stitched"          # Where `stitch` writes its result
//!
//! [scaling]
//! filter = "lanczos3"       # nearest | triangle | catmullrom | gaussian | lanczos3
//!
//! [metadata]
//! keep_thumbnail = true     # Carry the first image's EXIF thumbnail
//!
//! [live]
//! endpoint = ""             # Live-capture service URL (empty = disabled)
//!
//! [processing]
//! max_processes = 4         # Max parallel decoders (omit for auto = CPU cores)
//! ```
//!
//! Target width, output format and quality are not configurable: the first
//! image's width, JPEG, maximum quality.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::ResampleFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "longstitch.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `longstitch.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StitchConfig {
    pub output: OutputConfig,
    pub scaling: ScalingConfig,
    pub metadata: MetadataConfig,
    pub live: LiveConfig,
    pub processing: ProcessingConfig,
}

impl StitchConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output.dir must not be empty".into(),
            ));
        }
        let endpoint = self.live.endpoint.trim();
        if !endpoint.is_empty()
            && !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(ConfigError::Validation(format!(
                "live.endpoint must be an http(s) URL, got {endpoint:?}"
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory the stitched JPEG is written to.
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("stitched"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScalingConfig {
    pub filter: ResampleFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    /// Keep the embedded EXIF thumbnail of the first image.
    pub keep_thumbnail: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            keep_thumbnail: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LiveConfig {
    /// Live-capture service URL. Empty disables the `live` command unless
    /// `--endpoint` is given.
    pub endpoint: String,
}

impl LiveConfig {
    pub fn endpoint(&self) -> Option<&str> {
        let endpoint = self.endpoint.trim();
        (!endpoint.is_empty()).then_some(endpoint)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel decode workers.
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

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(StitchConfig::default())?)
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

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<StitchConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: StitchConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective config.
///
/// An `explicit` path must exist. Without one, `longstitch.toml` in `cwd`
/// is used when present.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<StitchConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) if !path.is_file() => return Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => Some(load_raw_config(path)?),
        None => {
            let candidate = cwd.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                log::debug!("using config {}", candidate.display());
                Some(load_raw_config(&candidate)?)
            } else {
                None
            }
        }
    };
    resolve_config(overlay)
}

/// Returns a fully-commented stock `longstitch.toml` with all keys and
/// explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# longstitch configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Put this file at ./longstitch.toml or pass it with --config.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Directory the stitched JPEG is written to. Files are named after a hash
# of their content: stitch-<hash>.jpg
dir = "stitched"

# ---------------------------------------------------------------------------
# Scaling
# ---------------------------------------------------------------------------
[scaling]
# Resampling filter used when an image is scaled to the first image's width.
# One of: nearest, triangle, catmullrom, gaussian, lanczos3
filter = "lanczos3"

# ---------------------------------------------------------------------------
# Metadata
# ---------------------------------------------------------------------------
[metadata]
# Carry the first image's embedded EXIF thumbnail into the output.
# It is dropped anyway when the EXIF segment would not fit.
keep_thumbnail = true

# ---------------------------------------------------------------------------
# Live capture
# ---------------------------------------------------------------------------
[live]
# URL of the live-capture service used by `longstitch live`.
# Empty disables it unless --endpoint is given.
endpoint = ""

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel decode workers. Omit for auto (= number of CPU cores).
# Values above the core count are clamped down.
# max_processes = 4
"##
}
