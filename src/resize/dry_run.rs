//! A resizer that plans without producing files.
//!
//! Dimensions come from the image header via `image::image_dimensions`, so
//! only the header is read. Urls follow `{url_prefix}/{stem}-{width}.{ext}`.

use super::{ImageResizer, ResizeError, ResizeRequest};
use crate::planning::ImageAsset;
use crate::planning::Metadata;
use crate::planning::calculations::height_for_width;
use crate::types::{Dimensions, mime_type};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct DryRunResizer {
    url_prefix: String,
}

impl DryRunResizer {
    pub fn new(url_prefix: impl Into<String>) -> Self {
        Self {
            url_prefix: url_prefix.into(),
        }
    }

    /// Where an asset would be published.
    pub fn asset_url(&self, source: &Path, width: u32, format: &str) -> String {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string());
        let ext = format.to_ascii_lowercase();
        let prefix = self.url_prefix.trim_end_matches('/');
        if prefix.is_empty() && !self.url_prefix.starts_with('/') {
            format!("{stem}-{width}.{ext}")
        } else {
            format!("{prefix}/{stem}-{width}.{ext}")
        }
    }
}

impl ImageResizer for DryRunResizer {
    fn stat(&self, source: &Path) -> Result<Dimensions, ResizeError> {
        let (width, height) = image::image_dimensions(source)?;
        Ok(Dimensions::new(width, height))
    }

    fn resize(&self, request: &ResizeRequest) -> Result<Metadata, ResizeError> {
        let mut metadata = Metadata::new();
        for format in &request.formats {
            let source_type =
                mime_type(format).ok_or_else(|| ResizeError::UnknownFormat(format.clone()))?;
            let assets = request
                .widths
                .iter()
                .map(|&width| ImageAsset {
                    width,
                    height: height_for_width(request.dimensions, width),
                    url: self.asset_url(&request.source, width, format),
                    source_type: source_type.to_string(),
                    format: format.clone(),
                })
                .collect();
            metadata.insert(format, assets);
        }
        Ok(metadata)
    }
}
