//! Shared value types used across planning, synthesis and the resize seam.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pixel dimensions of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height. `None` for a zero height.
    pub fn aspect_ratio(self) -> Option<f64> {
        (self.height > 0).then(|| self.width as f64 / self.height as f64)
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parses `1920x1080`.
impl FromStr for Dimensions {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid width '{w}': {e}"))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid height '{h}': {e}"))?;
        if width == 0 || height == 0 {
            return Err(format!("dimensions must be non-zero, got '{s}'"));
        }
        Ok(Self { width, height })
    }
}

/// MIME type for an output format name.
pub fn mime_type(format: &str) -> Option<&'static str> {
    match format.to_ascii_lowercase().as_str() {
        "avif" => Some("image/avif"),
        "webp" => Some("image/webp"),
        "jpeg" | "jpg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
