//! Intake configuration module.
//!
//! Handles loading, validating, and merging `intake.toml`. Stock defaults are
//! serialized to a TOML table and the user file is merged on top, so a config
//! file only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [pipeline]
//! cool_down_ms = 800          # Pause after a tier fails on both paths
//! fast_path_limit_mib = 15    # Inputs at or above this skip the fast path
//!
//! [store]
//! dir = ".evidence"           # Directory holding JSON snapshots
//! key = "audit"               # Snapshot name (file is <dir>/<key>.json)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::RenderSettings;
use crate::imaging::strategy::MIB;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "intake.toml";

/// Longest cool-down accepted, in milliseconds.
pub const MAX_COOL_DOWN_MS: u64 = 60_000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Intake configuration loaded from `intake.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntakeConfig {
    /// Renderer timing and fast-path settings.
    pub pipeline: PipelineConfig,
    /// Where gallery snapshots are persisted.
    pub store: StoreConfig,
}

impl IntakeConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.fast_path_limit_mib == 0 {
            return Err(ConfigError::Validation(
                "pipeline.fast_path_limit_mib must be greater than 0".into(),
            ));
        }
        if self.pipeline.cool_down_ms > MAX_COOL_DOWN_MS {
            return Err(ConfigError::Validation(format!(
                "pipeline.cool_down_ms must be at most {MAX_COOL_DOWN_MS}"
            )));
        }
        if self.store.key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "store.key must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Milliseconds to wait after both paths fail at one tier.
    pub cool_down_ms: u64,
    /// Inputs of this many MiB or more always take the safe path.
    pub fast_path_limit_mib: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cool_down_ms: 800,
            fast_path_limit_mib: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub dir: PathBuf,
    pub key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".evidence"),
            key: "audit".to_string(),
        }
    }
}

impl RenderSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            cool_down: Duration::from_millis(config.cool_down_ms),
            fast_path_limit: config.fast_path_limit_mib.saturating_mul(MIB),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(IntakeConfig::default())?)
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
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<IntakeConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: IntakeConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when it is missing.
pub fn load_config(path: &Path) -> Result<IntakeConfig, ConfigError> {
    let overlay = load_raw_config(path)?;
    if overlay.is_none() {
        log::debug!("No config at {}, using defaults", path.display());
    }
    resolve_config(overlay)
}

/// Returns a fully-commented stock `intake.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Evidence Intake Configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Image pipeline
# ---------------------------------------------------------------------------
[pipeline]
# Milliseconds to pause after a resolution tier fails on both decode paths,
# giving the decoder time to recover before the next, smaller tier.
cool_down_ms = 800

# Photos of this many MiB or more never use the fast decode path.
fast_path_limit_mib = 15

# ---------------------------------------------------------------------------
# Snapshot store
# ---------------------------------------------------------------------------
[store]
# Directory holding gallery snapshots.
dir = ".evidence"

# Snapshot name; the gallery is saved to <dir>/<key>.json.
key = "audit"
"##
}
