//! The image resizing seam.
//!
//! The planner never touches pixels. It asks an [`ImageResizer`] for the
//! source dimensions, decides which widths to produce, then hands a
//! [`ResizeRequest`] back to the resizer and receives [`Metadata`] describing
//! what was produced and where it lives.
//!
//! | Implementation | Purpose |
//! |---|---|
//! | [`DryRunResizer`] | Reads real dimensions, invents urls, writes nothing |
//! | `MockResizer` (tests) | Records calls, returns canned dimensions |
//!
//! [`ResponsiveImage`] drives the sequence for one image.

pub mod builder;
pub mod dry_run;

pub use builder::{PlanError, PlannedImage, ResizedImage, ResponsiveImage};
pub use dry_run::DryRunResizer;

use crate::planning::Metadata;
use crate::types::Dimensions;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("unknown output format '{0}'")]
    UnknownFormat(String),
    #[error("resize failed: {0}")]
    ProcessingFailed(String),
}

/// What to produce for one source image.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeRequest {
    pub source: PathBuf,
    /// As reported by [`ImageResizer::stat`] or supplied by the caller.
    pub dimensions: Dimensions,
    /// Widest first.
    pub widths: Vec<u32>,
    /// In preference order.
    pub formats: Vec<String>,
}

/// Something that can measure and resize images.
///
/// `Sync` so batches can share one resizer across rayon workers.
pub trait ImageResizer: Sync {
    /// Pixel dimensions of the source image.
    fn stat(&self, source: &Path) -> Result<Dimensions, ResizeError>;

    /// Produce every requested width in every requested format.
    fn resize(&self, request: &ResizeRequest) -> Result<Metadata, ResizeError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::planning::ImageAsset;
    use crate::planning::calculations::height_for_width;
    use crate::types::mime_type;
    use std::sync::Mutex;

    /// Mock resizer that records calls and returns canned dimensions.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockResizer {
        pub dimensions: Mutex<Option<Dimensions>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Stat(String),
        Resize {
            source: String,
            widths: Vec<u32>,
            formats: Vec<String>,
        },
    }

    impl MockResizer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_dimensions(width: u32, height: u32) -> Self {
            Self {
                dimensions: Mutex::new(Some(Dimensions::new(width, height))),
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageResizer for MockResizer {
        fn stat(&self, source: &Path) -> Result<Dimensions, ResizeError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Stat(source.to_string_lossy().to_string()));

            self.dimensions
                .lock()
                .unwrap()
                .ok_or_else(|| ResizeError::ProcessingFailed("No mock dimensions".to_string()))
        }

        fn resize(&self, request: &ResizeRequest) -> Result<Metadata, ResizeError> {
            self.operations.lock().unwrap().push(RecordedOp::Resize {
                source: request.source.to_string_lossy().to_string(),
                widths: request.widths.clone(),
                formats: request.formats.clone(),
            });

            let mut metadata = Metadata::new();
            for format in &request.formats {
                let source_type = mime_type(format)
                    .ok_or_else(|| ResizeError::UnknownFormat(format.clone()))?;
                let assets = request
                    .widths
                    .iter()
                    .map(|&width| ImageAsset {
                        width,
                        height: height_for_width(request.dimensions, width),
                        url: format!("/mock/{width}.{format}"),
                        source_type: source_type.to_string(),
                        format: format.clone(),
                    })
                    .collect();
                metadata.insert(format, assets);
            }
            Ok(metadata)
        }
    }

    #[test]
    fn mock_records_stat() {
        let resizer = MockResizer::with_dimensions(800, 600);

        let dims = resizer.stat(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(dims, Dimensions::new(800, 600));

        let ops = resizer.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Stat(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_without_dimensions_fails_stat() {
        assert!(MockResizer::new().stat(Path::new("a.jpg")).is_err());
    }

    #[test]
    fn mock_resize_produces_every_width_and_format() {
        let resizer = MockResizer::new();
        let metadata = resizer
            .resize(&ResizeRequest {
                source: "/a.jpg".into(),
                dimensions: Dimensions::new(2000, 1000),
                widths: vec![1000, 500],
                formats: vec!["webp".into(), "jpeg".into()],
            })
            .unwrap();

        let webp = metadata.get("webp").unwrap();
        assert_eq!(webp.len(), 2);
        assert_eq!(webp[1].height, 250);
        assert_eq!(webp[1].source_type, "image/webp");
        assert!(matches!(
            &resizer.get_operations()[0],
            RecordedOp::Resize { widths, .. } if widths == &vec![1000, 500]
        ));
    }

    #[test]
    fn mock_resize_rejects_unknown_format() {
        let err = MockResizer::new()
            .resize(&ResizeRequest {
                source: "/a.jpg".into(),
                dimensions: Dimensions::new(100, 100),
                widths: vec![100],
                formats: vec!["bmp".into()],
            })
            .unwrap_err();
        assert!(matches!(err, ResizeError::UnknownFormat(f) if f == "bmp"));
    }
}
