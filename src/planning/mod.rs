//! Breakpoint planning.
//!
//! [`DeviceSizes`] binds one `sizes` expression to a device list. On
//! construction it expands and canonically sorts the devices and resolves
//! the size each one needs; from there it can:
//!
//! - propose the widths worth producing ([`DeviceSizes::widths`]),
//! - assign produced assets to devices ([`DeviceSizes::map_metadata`]),
//! - synthesize media query records ([`DeviceSizes::to_media_queries`], in
//!   [`crate::queries`]).
//!
//! ```text
//! sizes + devices ──► targets ──► widths ──► (resizer) ──► metadata
//!                                                          │
//!                         media queries ◄── mapping ◄──────┘
//! ```

pub mod assets;
pub mod calculations;

pub use assets::{AssetMapping, ImageAsset, Metadata, WidthGroup};
pub use calculations::{
    DEFAULT_SCALING_FACTOR, filter_sizes, instructions_to_width, widths_from_instructions,
};

use crate::device::{ConfigurationError, Device, DeviceInput, Orientation};
use crate::sizes::{ResizeInstructions, Sizes};
use crate::types::Dimensions;

/// A `sizes` expression evaluated against a device list.
#[derive(Debug, Clone)]
pub struct DeviceSizes {
    sizes: Sizes,
    devices: Vec<Device>,
    targets: Vec<ResizeInstructions>,
    landscape: Vec<usize>,
    portrait: Vec<usize>,
}

impl DeviceSizes {
    /// Expand, sort and deduplicate `devices`, then resolve `sizes` for each.
    ///
    /// Fails when a media feature in `sizes` cannot be evaluated or a size
    /// does not resolve to pixels.
    pub fn new(sizes: Sizes, devices: &[DeviceInput]) -> Result<Self, ConfigurationError> {
        let mut devices = Device::from_definitions(devices);
        Device::sort(&mut devices);
        devices.dedup();

        let targets = devices
            .iter()
            .map(|d| d.get_image(&sizes))
            .collect::<Result<Vec<_>, _>>()?;

        let (landscape, portrait): (Vec<usize>, Vec<usize>) = (0..devices.len())
            .partition(|&i| devices[i].orientation() == Orientation::Landscape);

        for (device, target) in devices.iter().zip(&targets) {
            log::debug!("{device} needs {target}");
        }

        Ok(Self {
            sizes,
            devices,
            targets,
            landscape,
            portrait,
        })
    }

    pub fn sizes(&self) -> &Sizes {
        &self.sizes
    }

    /// Devices in canonical order.
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Resize instructions per device, indexed like [`Self::devices`].
    pub fn targets(&self) -> &[ResizeInstructions] {
        &self.targets
    }

    /// Device indices with the given orientation, in canonical order.
    pub fn indices(&self, orientation: Orientation) -> &[usize] {
        match orientation {
            Orientation::Landscape => &self.landscape,
            Orientation::Portrait => &self.portrait,
        }
    }

    /// Partition device indices into groups sharing a viewport rectangle.
    ///
    /// Groups appear in order of first occurrence; within a group indices
    /// keep their input order, so for canonically ordered input the groups
    /// are widest first and each group is highest density first.
    pub fn group_by_size(&self, indices: &[usize]) -> Vec<Vec<usize>> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for &index in indices {
            let device = &self.devices[index];
            let existing = groups.iter_mut().find(|group| {
                let first = &self.devices[group[0]];
                first.w == device.w && first.h == device.h
            });
            match existing {
                Some(group) => group.push(index),
                None => groups.push(vec![index]),
            }
        }
        groups
    }

    /// Widths to produce for a source image.
    ///
    /// Every device target becomes a candidate width, capped by the source
    /// width when known, then thinned with [`filter_sizes`].
    pub fn widths(
        &self,
        source: Option<Dimensions>,
        scaling_factor: f64,
    ) -> Result<Vec<u32>, ConfigurationError> {
        let candidates = widths_from_instructions(&self.targets, source)?;
        let widths = filter_sizes(&candidates, scaling_factor);
        log::debug!(
            "planned {} of {} candidate widths: {:?}",
            widths.len(),
            candidates.len(),
            widths
        );
        Ok(widths)
    }

    /// Assign each device the smallest produced width that covers its
    /// target, or the widest one when none does.
    ///
    /// Height and box targets are reduced with the aspect ratio of the
    /// widest produced asset.
    pub fn map_metadata(&self, metadata: &Metadata) -> Result<AssetMapping, ConfigurationError> {
        let groups = assets::group_by_width(metadata);
        if groups.is_empty() {
            return Ok(AssetMapping::default());
        }
        let aspect = groups[0].aspect_ratio();
        let device_groups = self
            .targets
            .iter()
            .map(|target| {
                let width = instructions_to_width(target, aspect)?;
                Ok(assets::ceiling_match(&groups, width))
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;
        Ok(AssetMapping {
            groups,
            device_groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizes::SizeExpression;
    use crate::test_helpers::{devices, metadata_for};

    fn planner(sizes: &str, list: &[(u32, u32, f64)]) -> DeviceSizes {
        DeviceSizes::new(Sizes::parse(sizes).unwrap(), &devices(list)).unwrap()
    }

    #[test]
    fn devices_sorted_and_deduplicated() {
        let ds = planner(
            "100vw",
            &[(800, 600, 1.0), (1600, 900, 1.0), (800, 600, 1.0), (800, 600, 2.0)],
        );
        let order: Vec<String> = ds.devices().iter().map(|d| d.to_string()).collect();
        assert_eq!(order, vec!["1600x900@1x", "800x600@2x", "800x600@1x"]);
    }

    #[test]
    fn targets_follow_device_order() {
        let ds = planner("(max-width: 1000px) 50vw, 100vw", &[(800, 600, 2.0), (1600, 900, 1.0)]);
        assert_eq!(
            ds.targets(),
            &[SizeExpression::Width(1600), SizeExpression::Width(800)]
        );
    }

    #[test]
    fn orientation_indices() {
        let ds = planner(
            "100vw",
            &[(1600, 900, 1.0), (900, 1600, 1.0), (500, 500, 1.0)],
        );
        assert_eq!(ds.indices(Orientation::Landscape), &[0, 2]);
        assert_eq!(ds.indices(Orientation::Portrait), &[1]);
    }

    #[test]
    fn unhandled_feature_fails_construction() {
        let result = DeviceSizes::new(
            Sizes::parse("(hover: hover) 50vw, 100vw").unwrap(),
            &devices(&[(800, 600, 1.0)]),
        );
        assert!(matches!(result, Err(ConfigurationError::UnhandledFeature(_))));
    }

    #[test]
    fn group_by_size_keeps_first_occurrence_order() {
        let ds = planner(
            "100vw",
            &[(1600, 900, 2.0), (1600, 900, 1.0), (800, 600, 3.0), (800, 600, 1.0)],
        );
        let all: Vec<usize> = (0..ds.devices().len()).collect();
        assert_eq!(ds.group_by_size(&all), vec![vec![0, 1], vec![2, 3]]);
        assert_eq!(ds.group_by_size(&[3, 0, 2]), vec![vec![3, 2], vec![0]]);
    }

    #[test]
    fn widths_capped_and_filtered() {
        let ds = planner(
            "100vw",
            &[(1920, 1080, 1.0), (1920, 1080, 2.0), (1000, 700, 1.0), (950, 700, 1.0)],
        );
        // Targets 3840, 1920, 1000, 950; source 2400 wide caps at 2400.
        let widths = ds.widths(Some(Dimensions::new(2400, 1600)), 0.8).unwrap();
        assert_eq!(widths, vec![2400, 1920, 1000]);
    }

    #[test]
    fn map_metadata_ceiling_match() {
        let ds = planner("100vw", &[(1600, 900, 1.0), (1000, 700, 1.0), (500, 400, 1.0)]);
        let mapping = ds
            .map_metadata(&metadata_for(&[1200, 800, 400], &["jpeg"], 1.5))
            .unwrap();
        // 1600 → nothing wide enough → widest; 1000 → 1200; 500 → 800
        let widths: Vec<u32> = (0..3).map(|i| mapping.group_for(i).unwrap().width).collect();
        assert_eq!(widths, vec![1200, 1200, 800]);
    }

    #[test]
    fn map_metadata_reduces_heights_with_asset_aspect() {
        let ds = planner("50vh height", &[(1000, 800, 1.0)]);
        // 400px tall at 3:2 → 600px wide
        let mapping = ds
            .map_metadata(&metadata_for(&[900, 600, 300], &["jpeg"], 1.5))
            .unwrap();
        assert_eq!(mapping.group_for(0).unwrap().width, 600);
    }

    #[test]
    fn map_empty_metadata() {
        let ds = planner("100vw", &[(1000, 800, 1.0)]);
        let mapping = ds.map_metadata(&Metadata::new()).unwrap();
        assert!(mapping.groups.is_empty());
        assert!(mapping.group_for(0).is_none());
    }
}
