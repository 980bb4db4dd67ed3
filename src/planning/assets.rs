//! Produced image assets and their assignment to devices.
//!
//! A resizer returns [`Metadata`]: for each output format, one [`ImageAsset`]
//! per produced width. [`group_by_width`] folds that into [`WidthGroup`]s
//! (every format of one width), which is the unit devices are matched to.

use serde::{Deserialize, Serialize};

/// One produced image file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAsset {
    pub width: u32,
    pub height: u32,
    pub url: String,
    /// MIME type, e.g. `image/avif`.
    pub source_type: String,
    pub format: String,
}

/// Assets for one output format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatAssets {
    pub format: String,
    pub assets: Vec<ImageAsset>,
}

/// Produced assets keyed by format, in format preference order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    formats: Vec<FormatAssets>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add assets for `format`, appending to any already present.
    pub fn insert(&mut self, format: &str, assets: Vec<ImageAsset>) {
        match self.formats.iter_mut().find(|f| f.format == format) {
            Some(existing) => existing.assets.extend(assets),
            None => self.formats.push(FormatAssets {
                format: format.to_string(),
                assets,
            }),
        }
    }

    pub fn get(&self, format: &str) -> Option<&[ImageAsset]> {
        self.formats
            .iter()
            .find(|f| f.format == format)
            .map(|f| f.assets.as_slice())
    }

    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.formats.iter().map(|f| f.format.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormatAssets> {
        self.formats.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.iter().all(|f| f.assets.is_empty())
    }
}

/// Every format's asset at one width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidthGroup {
    pub width: u32,
    /// In format preference order.
    pub assets: Vec<ImageAsset>,
}

impl WidthGroup {
    /// Width over height of this group's first asset.
    pub fn aspect_ratio(&self) -> Option<f64> {
        self.assets
            .first()
            .filter(|a| a.height > 0)
            .map(|a| a.width as f64 / a.height as f64)
    }
}

/// Group assets by width, widest first.
pub fn group_by_width(metadata: &Metadata) -> Vec<WidthGroup> {
    let mut groups: Vec<WidthGroup> = Vec::new();
    for asset in metadata.iter().flat_map(|f| f.assets.iter()) {
        match groups.iter_mut().find(|g| g.width == asset.width) {
            Some(group) => group.assets.push(asset.clone()),
            None => groups.push(WidthGroup {
                width: asset.width,
                assets: vec![asset.clone()],
            }),
        }
    }
    groups.sort_by(|a, b| b.width.cmp(&a.width));
    groups
}

/// Index of the smallest group at least `target` wide.
///
/// `groups` must be sorted widest first. When no group is wide enough the
/// widest one (index 0) is used.
pub fn ceiling_match(groups: &[WidthGroup], target: u32) -> usize {
    groups
        .iter()
        .rposition(|g| g.width >= target)
        .unwrap_or(0)
}

/// Width groups plus the group index serving each device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetMapping {
    pub groups: Vec<WidthGroup>,
    /// Indexed like the planner's device list.
    pub device_groups: Vec<usize>,
}

impl AssetMapping {
    pub fn group_for(&self, device: usize) -> Option<&WidthGroup> {
        self.device_groups
            .get(device)
            .and_then(|&g| self.groups.get(g))
    }

    /// A `srcset` attribute value for one format, narrowest first.
    pub fn srcset(&self, format: &str) -> String {
        self.groups
            .iter()
            .rev()
            .flat_map(|g| g.assets.iter().filter(|a| a.format == format))
            .map(|a| format!("{} {}w", a.url, a.width))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
