//! Shared test utilities for the planner test suite.
//!
//! Fixture builders for device lists and resizer metadata, plus assertions
//! over synthesized media query records.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let list = devices(&[(1600, 900, 1.0), (800, 600, 2.0)]);
//! let metadata = metadata_for(&[1600, 800], &["webp", "jpeg"], 1.5);
//! ```

use crate::device::{Device, DeviceInput};
use crate::planning::{ImageAsset, Metadata};
use crate::queries::MediaQuery;
use crate::types::mime_type;

// =========================================================================
// Fixture builders
// =========================================================================

/// Concrete devices from `(w, h, dppx)` triples.
pub fn devices(list: &[(u32, u32, f64)]) -> Vec<DeviceInput> {
    list.iter()
        .map(|&(w, h, dppx)| DeviceInput::Device(Device::new(w, h, dppx)))
        .collect()
}

/// Metadata with one asset per width for each format.
///
/// Urls are `/img/photo-{width}.{format}`; heights follow `aspect`.
pub fn metadata_for(widths: &[u32], formats: &[&str], aspect: f64) -> Metadata {
    let mut metadata = Metadata::new();
    for &format in formats {
        let assets = widths
            .iter()
            .map(|&width| ImageAsset {
                width,
                height: (width as f64 / aspect).round() as u32,
                url: format!("/img/photo-{width}.{format}"),
                source_type: mime_type(format).unwrap_or("image/unknown").to_string(),
                format: format.to_string(),
            })
            .collect();
        metadata.insert(format, assets);
    }
    metadata
}

// =========================================================================
// Assertions
// =========================================================================

/// Every device is covered by records of exactly one asset width.
pub fn assert_each_device_served_once(queries: &[MediaQuery], devices: &[Device]) {
    for device in devices {
        let widths: Vec<u32> = queries
            .iter()
            .filter(|q| q.covers(device))
            .map(|q| q.asset.width)
            .collect();
        assert!(!widths.is_empty(), "{device} is not covered by any record");
        assert!(
            widths.iter().all(|&w| w == widths[0]),
            "{device} is covered by several widths: {widths:?}"
        );
    }
}
