//! Configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user `config.toml` in the config directory overrides
//! any subset of them, and CLI flags override the merged result.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [settings]
//! rotate = 0                # 0, 90, 180 or 270 (clockwise)
//!
//! [settings.resize]
//! enabled = false
//! # width = 1920
//! # height = 1080
//! method = "high"           # high, medium, low, pixelated
//! maintain_aspect = true
//!
//! [settings.encoder]
//! format = "jpeg"           # jpeg, png, webp, avif (exact; others fall back)
//!
//! [settings.encoder.jpeg]
//! quality = 75
//! progressive = true
//! optimize = false
//!
//! [settings.encoder.webp]
//! quality = 75
//! lossless = false
//!
//! [batch]
//! format = "jpeg"
//! quality = 75
//! # max_width = 1920
//!
//! [processing]
//! use_worker = false        # Run transform + encode on a worker thread
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::settings::{BatchSettings, EncoderSpec, ResizeSpec, Settings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `config.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Single-image conversion settings.
    pub settings: Settings,
    /// Reduced settings used by batch mode.
    pub batch: BatchSettings,
    pub processing: ProcessingConfig,
}

/// Where the transform and encode stages run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Offload transform + encode to a dedicated worker thread.
    pub use_worker: bool,
}

fn validate_resize(resize: &ResizeSpec) -> Result<(), ConfigError> {
    if resize.width == Some(0) || resize.height == Some(0) {
        return Err(ConfigError::Validation(
            "settings.resize width/height must be non-zero".into(),
        ));
    }
    Ok(())
}

fn validate_encoder(encoder: &EncoderSpec) -> Result<(), ConfigError> {
    let qualities = [
        ("jpeg", encoder.jpeg.quality),
        ("png", encoder.png.quality),
        ("webp", encoder.webp.quality),
        ("avif", encoder.avif.quality),
    ];
    for (name, quality) in qualities {
        if !quality.is_valid() {
            return Err(ConfigError::Validation(format!(
                "settings.encoder.{name}.quality must be 0-100"
            )));
        }
    }
    Ok(())
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_resize(&self.settings.resize)?;
        validate_encoder(&self.settings.encoder)?;
        if !self.batch.quality.is_valid() {
            return Err(ConfigError::Validation("batch.quality must be 0-100".into()));
        }
        if self.batch.max_width == Some(0) {
            return Err(ConfigError::Validation(
                "batch.max_width must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AppConfig::default())?)
}

/// Overlay a user `config.toml` value onto the stock defaults.
///
/// Sections merge per key, so `[settings.encoder.webp] quality = 60` only
/// replaces that one quality and every other format block keeps its stock
/// values. Anything that is not a section (including arrays) is replaced
/// wholesale by the overlay.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut merged), toml::Value::Table(overrides)) => {
            for (key, value) in overrides {
                let value = match merged.remove(&key) {
                    Some(stock) => merge_toml(stock, value),
                    None => value,
                };
                merged.insert(key, value);
            }
            toml::Value::Table(merged)
        }
        (_, replacement) => replacement,
    }
}

/// Parse `<config_dir>/config.toml` without interpreting it.
///
/// A missing file means "stock defaults only" and yields `Ok(None)`.
/// Unreadable files and TOML syntax errors are errors; unknown keys are
/// only caught later, when [`resolve_config`] deserializes the merge.
pub fn load_raw_config(config_dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)?;
    Ok(Some(toml::from_str(&text)?))
}

/// Turn the stock layer plus an optional user layer into a validated
/// [`AppConfig`].
pub fn resolve_config(
    stock: toml::Value,
    user: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match user {
        Some(user) => merge_toml(stock, user),
        None => stock,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Config for one CLI invocation: stock defaults, then
/// `<config_dir>/config.toml` if present. `convert` and `batch` apply their
/// flags on top of the returned value.
pub fn load_config(config_dir: &Path) -> Result<AppConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(config_dir)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# rasterpress configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# rasterpress reads config.toml from the directory given by --config-dir
# (default: the current directory). Command-line flags override this file.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Single-image conversion (`rasterpress convert`)
# ---------------------------------------------------------------------------
[settings]
# Clockwise rotation in degrees: 0, 90, 180 or 270.
# Rotation is applied before resizing.
rotate = 0

[settings.resize]
# Resizing only happens when enabled AND at least one of width/height is set.
enabled = false
# Target size in pixels. Sizes refer to the image *after* rotation.
# width = 1920
# height = 1080
# Interpolation: "high", "medium", "low", or "pixelated" (nearest neighbour).
method = "high"
# With only one of width/height set, derive the other from the aspect ratio.
maintain_aspect = true

[settings.encoder]
# Output format: "jpeg", "png", "webp", or "avif".
# Every format keeps its own options below; switching formats keeps them all.
format = "jpeg"

[settings.encoder.jpeg]
quality = 75
# Hints; encoders that cannot honour them ignore them.
progressive = true
optimize = false

[settings.encoder.png]
# PNG is lossless; quality is kept for symmetry and ignored by the encoder.
quality = 100

[settings.encoder.webp]
quality = 75
# Lossless overrides quality.
lossless = false

[settings.encoder.avif]
quality = 50

# ---------------------------------------------------------------------------
# Batch conversion (`rasterpress batch`)
# ---------------------------------------------------------------------------
[batch]
# One format and quality for every file.
format = "jpeg"
quality = 75
# Maximum output width in pixels; the height follows the aspect ratio.
# max_width = 1920

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Run rotate/resize/encode on a dedicated worker thread instead of inline.
# Output is identical either way.
use_worker = false
"##
}
