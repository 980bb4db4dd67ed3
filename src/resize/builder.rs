//! Plan-then-resize for one image.
//!
//! ```text
//! ResponsiveImage ──plan()──► PlannedImage ──resize()──► ResizedImage
//!   sizes, devices              widths                    metadata, mapping,
//!   formats, factor                                       queries, css, srcset
//! ```
//!
//! Each stage owns what the previous one computed, so the resizer is asked
//! for dimensions at most once and for resizing exactly once.

use super::{ImageResizer, ResizeError, ResizeRequest};
use crate::config::{PlannerConfig, default_formats};
use crate::css::{CssRule, ResolutionStrategy, consolidate};
use crate::device::{ConfigurationError, DeviceInput, Orientation, default_devices};
use crate::planning::{AssetMapping, DEFAULT_SCALING_FACTOR, DeviceSizes, Metadata};
use crate::queries::MediaQuery;
use crate::sizes::Sizes;
use crate::types::Dimensions;
use crate::units::ParseError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Resize(#[from] ResizeError),
}

/// A source image and the settings to plan it with.
pub struct ResponsiveImage<'a, R: ImageResizer + ?Sized> {
    resizer: &'a R,
    source: PathBuf,
    dimensions: Option<Dimensions>,
    sizes: Sizes,
    devices: Vec<DeviceInput>,
    scaling_factor: f64,
    formats: Vec<String>,
}

impl<'a, R: ImageResizer + ?Sized> ResponsiveImage<'a, R> {
    /// Stock settings: `100vw`, the default devices and formats.
    pub fn new(resizer: &'a R, source: impl Into<PathBuf>) -> Self {
        Self {
            resizer,
            source: source.into(),
            dimensions: None,
            sizes: Sizes::default(),
            devices: default_devices(),
            scaling_factor: DEFAULT_SCALING_FACTOR,
            formats: default_formats(),
        }
    }

    /// Settings from a loaded config.
    pub fn from_config(
        resizer: &'a R,
        source: impl Into<PathBuf>,
        config: &PlannerConfig,
    ) -> Result<Self, ParseError> {
        Ok(Self::new(resizer, source)
            .sizes(config.parsed_sizes()?)
            .devices(config.devices.clone())
            .scaling_factor(config.scaling_factor)
            .formats(config.formats.clone()))
    }

    pub fn sizes(mut self, sizes: Sizes) -> Self {
        self.sizes = sizes;
        self
    }

    pub fn devices(mut self, devices: Vec<DeviceInput>) -> Self {
        self.devices = devices;
        self
    }

    pub fn scaling_factor(mut self, factor: f64) -> Self {
        self.scaling_factor = factor;
        self
    }

    pub fn formats(mut self, formats: Vec<String>) -> Self {
        self.formats = formats;
        self
    }

    /// Known source dimensions; the resizer is then never asked.
    pub fn dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Decide which widths to produce.
    pub fn plan(self) -> Result<PlannedImage<'a, R>, PlanError> {
        let dimensions = match self.dimensions {
            Some(dimensions) => dimensions,
            None => self.resizer.stat(&self.source)?,
        };
        let device_sizes = DeviceSizes::new(self.sizes, &self.devices)?;
        let widths = device_sizes.widths(Some(dimensions), self.scaling_factor)?;
        log::debug!(
            "{}: {} → widths {:?}",
            self.source.display(),
            dimensions,
            widths
        );
        Ok(PlannedImage {
            resizer: self.resizer,
            source: self.source,
            dimensions,
            formats: self.formats,
            device_sizes,
            widths,
        })
    }
}

/// Widths decided, nothing produced yet.
pub struct PlannedImage<'a, R: ImageResizer + ?Sized> {
    resizer: &'a R,
    source: PathBuf,
    dimensions: Dimensions,
    formats: Vec<String>,
    device_sizes: DeviceSizes,
    widths: Vec<u32>,
}

impl<'a, R: ImageResizer + ?Sized> PlannedImage<'a, R> {
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Widest first.
    pub fn widths(&self) -> &[u32] {
        &self.widths
    }

    pub fn device_sizes(&self) -> &DeviceSizes {
        &self.device_sizes
    }

    /// Produce the planned widths and assign them to devices.
    pub fn resize(self) -> Result<ResizedImage, PlanError> {
        let request = ResizeRequest {
            source: self.source,
            dimensions: self.dimensions,
            widths: self.widths,
            formats: self.formats,
        };
        let metadata = self.resizer.resize(&request)?;
        let mapping = self.device_sizes.map_metadata(&metadata)?;
        Ok(ResizedImage {
            source: request.source,
            dimensions: request.dimensions,
            widths: request.widths,
            device_sizes: self.device_sizes,
            metadata,
            mapping,
        })
    }
}

/// Produced assets, ready for markup.
#[derive(Debug, Clone)]
pub struct ResizedImage {
    source: PathBuf,
    dimensions: Dimensions,
    widths: Vec<u32>,
    device_sizes: DeviceSizes,
    metadata: Metadata,
    mapping: AssetMapping,
}

impl ResizedImage {
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn widths(&self) -> &[u32] {
        &self.widths
    }

    pub fn device_sizes(&self) -> &DeviceSizes {
        &self.device_sizes
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn mapping(&self) -> &AssetMapping {
        &self.mapping
    }

    pub fn media_queries(&self, orientations: &[Orientation]) -> Vec<MediaQuery> {
        self.device_sizes
            .queries_for_mapping(&self.mapping, orientations)
    }

    pub fn css_rules(
        &self,
        orientations: &[Orientation],
        strategy: ResolutionStrategy,
    ) -> Vec<CssRule> {
        consolidate(&self.media_queries(orientations), strategy)
    }

    /// `srcset` value for one format.
    pub fn srcset(&self, format: &str) -> String {
        self.mapping.srcset(format)
    }

    /// The `sizes` attribute value, when every clause is a plain width a
    /// browser understands. `None` means media queries must be used.
    pub fn sizes_attribute(&self) -> Option<String> {
        let sizes = self.device_sizes.sizes();
        sizes.is_valid().then(|| sizes.to_string())
    }
}
