//! Devices: concrete viewport + pixel-density measurement points.
//!
//! Authors describe devices compactly with [`DeviceDefinition`] (a rectangle,
//! the densities it ships with, and whether it rotates). [`Device::from_definitions`]
//! expands those into concrete [`Device`] values, which are what media
//! conditions are evaluated against and what sizing expressions resolve for.
//!
//! ## Canonical order
//!
//! [`Device::sort`] orders devices by descending width, then height, then
//! density. Breakpoints are emitted in this order (widest first), so it is
//! load-bearing for the query synthesizer.

use crate::media::{FeatureValue, MediaCondition, MediaFeature, Operator, RangePrefix};
use crate::sizes::{ResizeInstructions, SizeExpression, Sizes};
use crate::units::{Unit, UnitValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Tolerance for float comparisons in feature evaluation.
const EPSILON: f64 = 1e-9;

/// Errors that indicate the planner was asked something it cannot answer.
///
/// These are grammar or configuration gaps, not device-specific conditions,
/// and are always propagated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("unhandled media feature {0}")]
    UnhandledFeature(String),
    #[error("'{0}' is not a size")]
    NotASize(String),
    #[error("height-relative sizes need a known image aspect ratio")]
    HeightWithoutAspectRatio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "landscape" => Some(Orientation::Landscape),
            "portrait" => Some(Orientation::Portrait),
            _ => None,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        })
    }
}

/// Parse a requested-orientations list.
///
/// Unknown entries are logged and skipped; duplicates are dropped.
pub fn parse_orientations<S: AsRef<str>>(tokens: &[S]) -> Vec<Orientation> {
    let mut orientations = Vec::new();
    for token in tokens {
        match Orientation::parse(token.as_ref()) {
            Some(o) if !orientations.contains(&o) => orientations.push(o),
            Some(_) => {}
            None => log::warn!("ignoring unknown orientation '{}'", token.as_ref()),
        }
    }
    orientations
}

/// Compact, author-facing device description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceDefinition {
    pub w: u32,
    pub h: u32,
    /// Densities this device ships with. `1` is always added.
    #[serde(default)]
    pub dppx: Vec<f64>,
    /// Also expand the rotated rectangle.
    #[serde(default)]
    pub flip: bool,
}

/// Either a compact definition or an already expanded device.
///
/// Untagged: a numeric `dppx` is a concrete device, a list (or nothing) is a
/// definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceInput {
    Device(Device),
    Definition(DeviceDefinition),
}

impl From<Device> for DeviceInput {
    fn from(device: Device) -> Self {
        DeviceInput::Device(device)
    }
}

impl From<DeviceDefinition> for DeviceInput {
    fn from(definition: DeviceDefinition) -> Self {
        DeviceInput::Definition(definition)
    }
}

/// A concrete `(width, height, dppx)` point in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Device {
    pub w: u32,
    pub h: u32,
    pub dppx: f64,
}

impl Device {
    pub fn new(w: u32, h: u32, dppx: f64) -> Self {
        Self { w, h, dppx }
    }

    /// Square viewports count as landscape.
    pub fn orientation(&self) -> Orientation {
        if self.w >= self.h {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.w as f64 / self.h as f64
    }

    /// Expand definitions into concrete devices, in definition order.
    ///
    /// Each definition yields one device per density (with `1` appended when
    /// absent), then the same again for the rotated rectangle when `flip` is
    /// set and the rectangle is not square. Concrete devices pass through
    /// unchanged, so expanding an expanded list is a no-op.
    pub fn from_definitions(inputs: &[DeviceInput]) -> Vec<Device> {
        let mut devices = Vec::new();
        for input in inputs {
            match input {
                DeviceInput::Device(device) => devices.push(*device),
                DeviceInput::Definition(def) => {
                    let mut densities = def.dppx.clone();
                    if !densities.contains(&1.0) {
                        densities.push(1.0);
                    }
                    let mut rects = vec![(def.w, def.h)];
                    if def.flip && def.w != def.h {
                        rects.push((def.h, def.w));
                    }
                    for (w, h) in rects {
                        devices.extend(densities.iter().map(|&dppx| Device::new(w, h, dppx)));
                    }
                }
            }
        }
        devices
    }

    /// Canonical order: descending by width, height, then density.
    pub fn canonical_cmp(a: &Device, b: &Device) -> Ordering {
        b.w.cmp(&a.w)
            .then(b.h.cmp(&a.h))
            .then(b.dppx.total_cmp(&a.dppx))
    }

    /// Sort in place into canonical order.
    pub fn sort(devices: &mut [Device]) {
        devices.sort_by(Device::canonical_cmp);
    }

    /// Evaluate a media condition against this device.
    ///
    /// `or` matches when any child does. Every other operator, including a
    /// plain parenthesized group, requires all children; `not` negates that
    /// result. All children are evaluated so an unhandled feature is always
    /// reported, whatever its position.
    pub fn matches(&self, condition: &MediaCondition) -> Result<bool, ConfigurationError> {
        match condition {
            MediaCondition::All => Ok(true),
            MediaCondition::Feature(feature) => self.matches_feature(feature),
            MediaCondition::Condition { operator, children } => {
                let results = children
                    .iter()
                    .map(|child| self.matches(child))
                    .collect::<Result<Vec<bool>, _>>()?;
                Ok(match operator {
                    Some(Operator::Or) => results.iter().any(|&r| r),
                    Some(Operator::Not) => !results.iter().all(|&r| r),
                    Some(Operator::And) | None => results.iter().all(|&r| r),
                })
            }
        }
    }

    fn matches_feature(&self, feature: &MediaFeature) -> Result<bool, ConfigurationError> {
        let unhandled = || ConfigurationError::UnhandledFeature(feature.to_string());
        let (base, prefix) = feature.split_prefix();
        let value = feature.value.as_ref().ok_or_else(unhandled)?;

        match (base, value) {
            ("width", FeatureValue::Dimension(v)) if v.unit == Unit::Px => {
                Ok(compare(self.w as f64, v.value, prefix))
            }
            ("height", FeatureValue::Dimension(v)) if v.unit == Unit::Px => {
                Ok(compare(self.h as f64, v.value, prefix))
            }
            ("width", FeatureValue::Number(n)) if *n == 0.0 => {
                Ok(compare(self.w as f64, 0.0, prefix))
            }
            ("height", FeatureValue::Number(n)) if *n == 0.0 => {
                Ok(compare(self.h as f64, 0.0, prefix))
            }
            ("resolution", FeatureValue::Dimension(v)) => {
                let dppx = v.to_dppx().ok_or_else(unhandled)?;
                Ok(compare(self.dppx, dppx, prefix))
            }
            ("aspect-ratio", FeatureValue::Ratio(w, h)) if *h != 0.0 => {
                Ok(compare(self.aspect_ratio(), w / h, prefix))
            }
            ("aspect-ratio", FeatureValue::Number(n)) => {
                Ok(compare(self.aspect_ratio(), *n, prefix))
            }
            ("orientation", FeatureValue::Ident(ident)) if prefix == RangePrefix::Exact => {
                let wanted = Orientation::parse(ident).ok_or_else(unhandled)?;
                Ok(self.orientation() == wanted)
            }
            _ => Err(unhandled()),
        }
    }

    /// The resolved size of the first clause that matches this device.
    ///
    /// Falls back to `100vw` when nothing matches, as browsers do.
    pub fn get_image(&self, sizes: &Sizes) -> Result<ResizeInstructions, ConfigurationError> {
        for query in sizes.iter() {
            let hit = match &query.conditions {
                None => true,
                Some(condition) => self.matches(condition)?,
            };
            if hit {
                return self.resolve(&query.size);
            }
        }
        self.resolve(&SizeExpression::Width(UnitValue::new(100.0, Unit::Vw)))
    }

    /// Resolve each component of a size expression to device pixels,
    /// rounding up.
    pub fn resolve(
        &self,
        size: &SizeExpression<UnitValue>,
    ) -> Result<ResizeInstructions, ConfigurationError> {
        size.try_map(|value| {
            let css = value
                .to_css_pixels(self.w as f64, self.h as f64)
                .ok_or_else(|| ConfigurationError::NotASize(value.to_string()))?;
            Ok(device_pixels(css * self.dppx))
        })
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@{}x", self.w, self.h, self.dppx)
    }
}

fn compare(device: f64, feature: f64, prefix: RangePrefix) -> bool {
    match prefix {
        RangePrefix::Min => device >= feature - EPSILON,
        RangePrefix::Max => device <= feature + EPSILON,
        RangePrefix::Exact => (device - feature).abs() <= EPSILON,
    }
}

fn device_pixels(value: f64) -> u32 {
    (value - EPSILON).ceil().max(0.0) as u32
}

/// A representative spread of desktop, tablet and phone viewports.
pub fn default_devices() -> Vec<DeviceInput> {
    let def = |w, h, dppx: &[f64], flip| {
        DeviceInput::Definition(DeviceDefinition {
            w,
            h,
            dppx: dppx.to_vec(),
            flip,
        })
    };
    vec![
        def(2560, 1440, &[1.0], false),
        def(1920, 1080, &[1.0, 2.0], false),
        def(1680, 1050, &[1.0, 2.0], false),
        def(1440, 900, &[1.0, 2.0], false),
        def(1366, 768, &[1.0], false),
        def(1280, 800, &[1.0, 2.0], false),
        def(1024, 768, &[1.0, 2.0], true),
        def(834, 1194, &[2.0], true),
        def(414, 896, &[2.0, 3.0], true),
        def(390, 844, &[3.0], true),
        def(375, 667, &[2.0], true),
        def(360, 800, &[3.0], true),
    ]
}
