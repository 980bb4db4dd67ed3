//! Media query synthesis.
//!
//! Turns a planned [`DeviceSizes`] plus produced [`Metadata`] into flat
//! [`MediaQuery`] records: one per (device, format), each carrying the
//! width and resolution band that selects it.
//!
//! For each requested orientation the devices are grouped by viewport
//! rectangle, widest first. Group `i` gets the width band
//! `(width of group i+1, width of group i]`, open at the top for the first
//! group and at the bottom for the last. Inside a group the same is done
//! with densities, highest first. Together the bands partition the device
//! space, so every device is selected by exactly one band.
//!
//! Records carry raw bound values. Rendering them as CSS adds the offsets
//! that turn the inclusive lower bounds into exclusive ones:
//! `min-width: {w + 1}px`, `max-resolution: {dppx * 96}dpi` and
//! `min-resolution: {dppx * 96 + 1}dpi`.

use crate::device::{ConfigurationError, Device, Orientation};
use crate::planning::{AssetMapping, DeviceSizes, ImageAsset, Metadata};
use serde::{Deserialize, Serialize};

/// CSS pixels per inch.
pub const DPI_PER_DPPX: f64 = 96.0;

const EPSILON: f64 = 1e-9;

/// One media query record: the bands that select `asset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaQuery {
    /// `None` only for the catch-all record emitted without devices.
    pub orientation: Option<Orientation>,
    pub max_width: Option<u32>,
    pub min_width: Option<u32>,
    pub max_resolution: Option<f64>,
    pub min_resolution: Option<f64>,
    /// Density of the device this record was built for.
    pub dppx: f64,
    #[serde(flatten)]
    pub asset: ImageAsset,
}

impl MediaQuery {
    /// Whether a device falls inside this record's bands.
    pub fn covers(&self, device: &Device) -> bool {
        self.orientation.is_none_or(|o| o == device.orientation())
            && self.max_width.is_none_or(|max| device.w <= max)
            && self.min_width.is_none_or(|min| device.w > min)
            && self
                .max_resolution
                .is_none_or(|max| device.dppx <= max + EPSILON)
            && self
                .min_resolution
                .is_none_or(|min| device.dppx > min + EPSILON)
    }

    /// The CSS clauses of this record, in orientation, width, resolution
    /// order.
    pub fn clauses(&self) -> Vec<String> {
        let mut clauses = Vec::new();
        if let Some(o) = self.orientation {
            clauses.push(orientation_clause(o));
        }
        if let Some(w) = self.max_width {
            clauses.push(max_width_clause(w));
        }
        if let Some(w) = self.min_width {
            clauses.push(min_width_clause(w));
        }
        if let Some(r) = self.max_resolution {
            clauses.push(max_resolution_clause(r));
        }
        if let Some(r) = self.min_resolution {
            clauses.push(min_resolution_clause(r));
        }
        clauses
    }

    /// A media condition for a `<source media>` attribute. Empty when the
    /// record is unconstrained.
    pub fn media_condition(&self) -> String {
        self.clauses().join(" and ")
    }
}

pub(crate) fn orientation_clause(orientation: Orientation) -> String {
    format!("(orientation: {orientation})")
}

pub(crate) fn max_width_clause(width: u32) -> String {
    format!("(max-width: {width}px)")
}

pub(crate) fn min_width_clause(width: u32) -> String {
    format!("(min-width: {}px)", u64::from(width) + 1)
}

pub(crate) fn max_resolution_clause(dppx: f64) -> String {
    format!("(max-resolution: {}dpi)", format_number(dppx * DPI_PER_DPPX))
}

pub(crate) fn min_resolution_clause(dppx: f64) -> String {
    format!(
        "(min-resolution: {}dpi)",
        format_number(dppx * DPI_PER_DPPX + 1.0)
    )
}

/// Shortest rendering of a float, rounded to four decimals.
pub(crate) fn format_number(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    format!("{rounded}")
}

impl DeviceSizes {
    /// Media query records for `metadata`, restricted to `orientations`.
    ///
    /// When no device has a requested orientation, a single unconstrained
    /// record per format of the widest asset is returned instead.
    pub fn to_media_queries(
        &self,
        metadata: &Metadata,
        orientations: &[Orientation],
    ) -> Result<Vec<MediaQuery>, ConfigurationError> {
        let mapping = self.map_metadata(metadata)?;
        Ok(self.queries_for_mapping(&mapping, orientations))
    }

    /// Same as [`Self::to_media_queries`] for an existing mapping.
    pub fn queries_for_mapping(
        &self,
        mapping: &AssetMapping,
        orientations: &[Orientation],
    ) -> Vec<MediaQuery> {
        let devices = self.devices();
        if !mapping.groups.is_empty() && mapping.device_groups.len() != devices.len() {
            log::warn!(
                "asset mapping covers {} devices, planner has {}",
                mapping.device_groups.len(),
                devices.len()
            );
        }
        debug_assert!(
            mapping.groups.is_empty() || mapping.device_groups.len() == devices.len(),
            "asset mapping built for a different device list"
        );
        let mut queries = Vec::new();
        let mut any_device = false;

        for &orientation in orientations {
            let groups = self.group_by_size(self.indices(orientation));
            for (i, group) in groups.iter().enumerate() {
                any_device = true;
                let max_width = (i > 0).then(|| devices[group[0]].w);
                let min_width = groups.get(i + 1).map(|next| devices[next[0]].w);

                for (j, &index) in group.iter().enumerate() {
                    let device = &devices[index];
                    let max_resolution = (j > 0).then_some(device.dppx);
                    let min_resolution = group.get(j + 1).map(|&next| devices[next].dppx);
                    let Some(width_group) = mapping.group_for(index) else {
                        continue;
                    };
                    for asset in &width_group.assets {
                        queries.push(MediaQuery {
                            orientation: Some(orientation),
                            max_width,
                            min_width,
                            max_resolution,
                            min_resolution,
                            dppx: device.dppx,
                            asset: asset.clone(),
                        });
                    }
                }
            }
        }

        if !any_device {
            if let Some(widest) = mapping.groups.first() {
                log::debug!("no devices for {orientations:?}, emitting a catch-all record");
                queries.extend(widest.assets.iter().map(|asset| MediaQuery {
                    orientation: None,
                    max_width: None,
                    min_width: None,
                    max_resolution: None,
                    min_resolution: None,
                    dppx: 1.0,
                    asset: asset.clone(),
                }));
            }
        }
        queries
    }
}
