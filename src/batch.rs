//! Batch planning over a JSON manifest.
//!
//! ```json
//! { "images": [
//!     { "source": "hero.jpg", "sizes": "(min-width: 1200px) 50vw, 100vw" },
//!     { "source": "banner.png", "width": 3000, "height": 1000 }
//! ] }
//! ```
//!
//! Sources are resolved relative to the manifest's directory. `sizes`
//! overrides the configured expression for one image; `width` and `height`
//! together skip reading the file.
//!
//! Images are planned in parallel using [rayon](https://docs.rs/rayon) over
//! one shared resizer. A failing image does not stop the batch: its plan
//! carries the error text and the rest proceed. Results keep manifest order.

use crate::config::PlannerConfig;
use crate::queries::MediaQuery;
use crate::resize::{ImageResizer, PlanError, ResponsiveImage};
use crate::sizes::Sizes;
use crate::types::Dimensions;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchManifest {
    pub images: Vec<BatchImage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchImage {
    pub source: PathBuf,
    #[serde(default)]
    pub sizes: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl BatchImage {
    fn dimensions(&self) -> Option<Dimensions> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(Dimensions::new(w, h)),
            _ => None,
        }
    }
}

/// Outcome for one manifest entry.
#[derive(Debug, Clone, Serialize)]
pub struct ImagePlan {
    pub source: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
    pub widths: Vec<u32>,
    /// Plain `sizes` attribute, when the expression has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
    pub media_queries: Vec<MediaQuery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImagePlan {
    fn failed(source: PathBuf, error: impl ToString) -> Self {
        Self {
            source,
            dimensions: None,
            widths: Vec::new(),
            sizes: None,
            media_queries: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Progress events sent while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Planned { source: PathBuf, widths: Vec<u32> },
    Failed { source: PathBuf, error: String },
}

pub fn load_manifest(path: &Path) -> Result<BatchManifest, BatchError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Load a manifest and plan every image in it.
pub fn run_batch(
    resizer: &impl ImageResizer,
    manifest_path: &Path,
    config: &PlannerConfig,
    events: Option<Sender<BatchEvent>>,
) -> Result<Vec<ImagePlan>, BatchError> {
    let manifest = load_manifest(manifest_path)?;
    let base = manifest_path.parent().unwrap_or_else(|| Path::new(""));
    Ok(plan_batch(resizer, &manifest, base, config, events))
}

/// Plan every image in parallel, in manifest order.
pub fn plan_batch(
    resizer: &impl ImageResizer,
    manifest: &BatchManifest,
    base: &Path,
    config: &PlannerConfig,
    events: Option<Sender<BatchEvent>>,
) -> Vec<ImagePlan> {
    let orientations = config.parsed_orientations();
    manifest
        .images
        .par_iter()
        .map_with(events, |events, image| {
            let source = base.join(&image.source);
            let plan = match plan_image(resizer, image, &source, config, &orientations) {
                Ok(plan) => plan,
                Err(e) => {
                    log::warn!("{}: {e}", source.display());
                    ImagePlan::failed(source, e)
                }
            };
            if let Some(tx) = events {
                let event = match &plan.error {
                    Some(error) => BatchEvent::Failed {
                        source: plan.source.clone(),
                        error: error.clone(),
                    },
                    None => BatchEvent::Planned {
                        source: plan.source.clone(),
                        widths: plan.widths.clone(),
                    },
                };
                // Receiver gone means nobody is listening; keep planning.
                tx.send(event).ok();
            }
            plan
        })
        .collect()
}

fn plan_image(
    resizer: &impl ImageResizer,
    image: &BatchImage,
    source: &Path,
    config: &PlannerConfig,
    orientations: &[crate::device::Orientation],
) -> Result<ImagePlan, PlanError> {
    let mut builder = ResponsiveImage::from_config(resizer, source, config)?;
    if let Some(sizes) = &image.sizes {
        builder = builder.sizes(Sizes::parse(sizes)?);
    }
    if let Some(dimensions) = image.dimensions() {
        builder = builder.dimensions(dimensions);
    }
    let resized = builder.plan()?.resize()?;
    Ok(ImagePlan {
        source: source.to_path_buf(),
        dimensions: Some(resized.dimensions()),
        widths: resized.widths().to_vec(),
        sizes: resized.sizes_attribute(),
        media_queries: resized.media_queries(orientations),
        error: None,
    })
}
