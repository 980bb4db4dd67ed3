//! Planner configuration.
//!
//! Handles loading, validating, and merging `breakpoints.toml`. Stock
//! defaults are overridden by whatever the user file sets; tables merge key
//! by key, arrays (such as `devices`) replace wholesale.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! sizes = "100vw"                       # sizes expression to plan for
//! scaling_factor = 0.8                  # min squared ratio between kept widths (0 disables)
//! formats = ["avif", "webp", "jpeg"]    # output formats, preferred first
//! orientations = ["landscape", "portrait"]
//! url_prefix = "/images"                # where produced assets are published
//!
//! [css]
//! resolution = "media-queries"          # or "image-set"
//!
//! [processing]
//! max_threads = 4                       # batch workers (omit for auto = CPU cores)
//!
//! [[devices]]                           # replaces the stock device list
//! w = 1920
//! h = 1080
//! dppx = [1.0, 2.0]
//! flip = false
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::css::ResolutionStrategy;
use crate::device::{DeviceInput, Orientation, default_devices, parse_orientations};
use crate::planning::DEFAULT_SCALING_FACTOR;
use crate::sizes::Sizes;
use crate::types::mime_type;
use crate::units::ParseError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File looked up when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "breakpoints.toml";

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

/// Planner configuration loaded from `breakpoints.toml`.
///
/// All fields have defaults. User files need only specify the values they
/// want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlannerConfig {
    /// `sizes` expression, as in the HTML attribute plus the extended shapes.
    pub sizes: String,
    /// Minimum squared-size ratio between consecutive kept widths.
    pub scaling_factor: f64,
    /// Output formats in preference order.
    pub formats: Vec<String>,
    /// Orientations to synthesize media queries for.
    pub orientations: Vec<String>,
    /// Url prefix for produced assets.
    pub url_prefix: String,
    /// CSS rendering settings.
    pub css: CssConfig,
    /// Parallel batch settings.
    pub processing: ProcessingConfig,
    /// Device definitions or concrete devices.
    pub devices: Vec<DeviceInput>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            sizes: "100vw".to_string(),
            scaling_factor: DEFAULT_SCALING_FACTOR,
            formats: default_formats(),
            orientations: vec!["landscape".to_string(), "portrait".to_string()],
            url_prefix: "/images".to_string(),
            css: CssConfig::default(),
            processing: ProcessingConfig::default(),
            devices: default_devices(),
        }
    }
}

pub fn default_formats() -> Vec<String> {
    ["avif", "webp", "jpeg"].map(String::from).to_vec()
}

impl PlannerConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.scaling_factor) {
            return Err(ConfigError::Validation(
                "scaling_factor must be between 0 and 1".into(),
            ));
        }
        if self.formats.is_empty() {
            return Err(ConfigError::Validation("formats must not be empty".into()));
        }
        if let Some(unknown) = self.formats.iter().find(|f| mime_type(f).is_none()) {
            return Err(ConfigError::Validation(format!(
                "formats: unknown format '{unknown}'"
            )));
        }
        for device in &self.devices {
            let (w, h, densities) = match device {
                DeviceInput::Device(d) => (d.w, d.h, std::slice::from_ref(&d.dppx)),
                DeviceInput::Definition(d) => (d.w, d.h, d.dppx.as_slice()),
            };
            if w == 0 || h == 0 {
                return Err(ConfigError::Validation(format!(
                    "devices: {w}x{h} must have a non-zero width and height"
                )));
            }
            if densities.iter().any(|&dppx| !(dppx > 0.0)) {
                return Err(ConfigError::Validation(format!(
                    "devices: {w}x{h} densities must be positive"
                )));
            }
        }
        self.parsed_sizes()
            .map_err(|e| ConfigError::Validation(format!("sizes: {e}")))?;
        Ok(())
    }

    pub fn parsed_sizes(&self) -> Result<Sizes, ParseError> {
        Sizes::parse(&self.sizes)
    }

    /// Requested orientations; unknown entries are logged and skipped.
    pub fn parsed_orientations(&self) -> Vec<Orientation> {
        parse_orientations(&self.orientations)
    }
}

/// CSS rendering settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CssConfig {
    /// How density variants are expressed.
    pub resolution: ResolutionStrategy,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel batch workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_threads.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Stock defaults as a TOML value, the base layer for merging.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(PlannerConfig::default())?)
}

/// Deep-merge `overlay` onto `base`. Tables merge recursively; any other
/// value in the overlay replaces the base value.
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

/// Read the TOML file at `path` without applying defaults.
///
/// A missing file is `Ok(None)`, so a planner with no `breakpoints.toml`
/// runs on stock settings. Unreadable files and malformed TOML are errors.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(toml::from_str(&content)?))
}

/// Lay a user file over the stock values and build a validated config.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<PlannerConfig, ConfigError> {
    let merged = overlay.into_iter().fold(base, merge_toml);
    let config: PlannerConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file, falling back to stock defaults when it is absent.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<PlannerConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    if overlay.is_none() {
        log::debug!("{} not found, using stock defaults", path.display());
    }
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `breakpoints.toml` with all keys.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Breakpoint Planner Configuration
# ================================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Sizing expression, evaluated per device like the HTML `sizes` attribute.
# Beyond plain widths ("50vw", "400px") a clause may end in
#   "80vh height"          - size by height
#   "100vw 50vh cover"     - fill a box (or "contain" to fit inside it)
sizes = "100vw"

# Minimum squared ratio between two consecutive produced widths.
# Widths closer than this to a larger kept width are dropped. 0 keeps all.
scaling_factor = 0.8

# Output formats, most preferred first.
formats = ["avif", "webp", "jpeg"]

# Orientations to emit media queries for.
orientations = ["landscape", "portrait"]

# Url prefix for produced assets.
url_prefix = "/images"

# ---------------------------------------------------------------------------
# CSS output
# ---------------------------------------------------------------------------
[css]
# "media-queries": one rule per resolution band.
# "image-set": density variants inside image-set().
resolution = "media-queries"

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel batch workers. Omit to auto-detect (= number of CPU cores).
# Values larger than the core count are clamped down.
# max_threads = 4

# ---------------------------------------------------------------------------
# Devices
# ---------------------------------------------------------------------------
# Each entry is a viewport in CSS pixels. `dppx` lists the pixel densities it
# ships with (1.0 is always added). `flip = true` also plans the rotated
# viewport. A concrete device can be given as { w, h, dppx = 2.0 }.
# Setting `devices` replaces this whole list.

[[devices]]
w = 2560
h = 1440
dppx = [1.0]
flip = false

[[devices]]
w = 1920
h = 1080
dppx = [1.0, 2.0]
flip = false

[[devices]]
w = 1680
h = 1050
dppx = [1.0, 2.0]
flip = false

[[devices]]
w = 1440
h = 900
dppx = [1.0, 2.0]
flip = false

[[devices]]
w = 1366
h = 768
dppx = [1.0]
flip = false

[[devices]]
w = 1280
h = 800
dppx = [1.0, 2.0]
flip = false

[[devices]]
w = 1024
h = 768
dppx = [1.0, 2.0]
flip = true

[[devices]]
w = 834
h = 1194
dppx = [2.0]
flip = true

[[devices]]
w = 414
h = 896
dppx = [2.0, 3.0]
flip = true

[[devices]]
w = 390
h = 844
dppx = [3.0]
flip = true

[[devices]]
w = 375
h = 667
dppx = [2.0]
flip = true

[[devices]]
w = 360
h = 800
dppx = [3.0]
flip = true
"##
}
