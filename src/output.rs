//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Devices
//!
//! ```text
//! Devices (3)
//! 001 1920x1080@2x landscape
//! 002 1920x1080@1x landscape
//! 003 390x844@3x portrait
//! ```
//!
//! ## Plan
//!
//! ```text
//! Sizes: (min-width: 1200px) 50vw, 100vw
//! Source: hero.jpg (4000x3000)
//! Devices
//! 001 1920x1080@2x → 1920
//! 002 1920x1080@1x → 960
//! Widths
//!     1920px
//!     960px
//! ```
//!
//! ## Queries
//!
//! ```text
//! (orientation: landscape) and (min-width: 1001px)
//!     /images/hero-1920.avif 1920w image/avif
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::BatchEvent;
use crate::device::Device;
use crate::planning::DeviceSizes;
use crate::queries::MediaQuery;
use crate::types::Dimensions;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// devices
// ============================================================================

pub fn format_devices(devices: &[Device]) -> Vec<String> {
    let mut lines = vec![format!("Devices ({})", devices.len())];
    for (i, device) in devices.iter().enumerate() {
        lines.push(format!(
            "{} {} {}",
            format_index(i + 1),
            device,
            device.orientation()
        ));
    }
    lines
}

pub fn print_devices(devices: &[Device]) {
    print_lines(&format_devices(devices));
}

// ============================================================================
// plan
// ============================================================================

/// Sizes, source, per-device targets and the widths to produce.
pub fn format_plan(
    device_sizes: &DeviceSizes,
    source: Option<(&Path, Dimensions)>,
    widths: &[u32],
) -> Vec<String> {
    let mut lines = Vec::new();
    let sizes = device_sizes.sizes().to_string();
    lines.push(format!(
        "Sizes: {}",
        if sizes.is_empty() { "100vw" } else { &sizes }
    ));
    if let Some((path, dims)) = source {
        lines.push(format!("Source: {} ({})", path.display(), dims));
    }

    lines.push("Devices".to_string());
    for (i, (device, target)) in device_sizes
        .devices()
        .iter()
        .zip(device_sizes.targets())
        .enumerate()
    {
        lines.push(format!("{} {} \u{2192} {}", format_index(i + 1), device, target));
    }

    lines.push("Widths".to_string());
    if widths.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for width in widths {
        lines.push(format!("{}{}px", indent(1), width));
    }
    lines
}

pub fn print_plan(device_sizes: &DeviceSizes, source: Option<(&Path, Dimensions)>, widths: &[u32]) {
    print_lines(&format_plan(device_sizes, source, widths));
}

// ============================================================================
// queries
// ============================================================================

/// Records grouped under their media condition, in record order.
pub fn format_media_queries(queries: &[MediaQuery]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current: Option<String> = None;
    for query in queries {
        let condition = query.media_condition();
        let header = if condition.is_empty() {
            "all".to_string()
        } else {
            condition
        };
        if current.as_deref() != Some(header.as_str()) {
            lines.push(header.clone());
            current = Some(header);
        }
        lines.push(format!(
            "{}{} {}w {}",
            indent(1),
            query.asset.url,
            query.asset.width,
            query.asset.source_type
        ));
    }
    lines
}

pub fn print_media_queries(queries: &[MediaQuery]) {
    print_lines(&format_media_queries(queries));
}

// ============================================================================
// batch
// ============================================================================

pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Planned { source, widths } => {
            let widths: Vec<String> = widths.iter().map(|w| format!("{w}px")).collect();
            vec![format!("{} \u{2192} {}", source.display(), widths.join(", "))]
        }
        BatchEvent::Failed { source, error } => vec![
            format!("{} failed", source.display()),
            format!("{}{}", indent(1), error),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceInput;
    use crate::planning::ImageAsset;
    use crate::sizes::Sizes;
    use std::path::PathBuf;

    #[test]
    fn format_index_padding() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn devices_listing() {
        let devices = [Device::new(1920, 1080, 2.0), Device::new(390, 844, 3.0)];
        assert_eq!(
            format_devices(&devices),
            vec![
                "Devices (2)",
                "001 1920x1080@2x landscape",
                "002 390x844@3x portrait",
            ]
        );
    }

    #[test]
    fn plan_listing() {
        let ds = DeviceSizes::new(
            Sizes::parse("50vw").unwrap(),
            &[DeviceInput::Device(Device::new(1000, 800, 2.0))],
        )
        .unwrap();
        let lines = format_plan(
            &ds,
            Some((Path::new("hero.jpg"), Dimensions::new(4000, 3000))),
            &[1000],
        );
        assert_eq!(
            lines,
            vec![
                "Sizes: 50vw",
                "Source: hero.jpg (4000x3000)",
                "Devices",
                "001 1000x800@2x \u{2192} 1000",
                "Widths",
                "    1000px",
            ]
        );
    }

    #[test]
    fn plan_listing_without_widths() {
        let ds = DeviceSizes::new(Sizes::default(), &[]).unwrap();
        let lines = format_plan(&ds, None, &[]);
        assert_eq!(lines, vec!["Sizes: 100vw", "Devices", "Widths", "    (none)"]);
    }

    #[test]
    fn queries_grouped_by_condition() {
        let record = |format: &str, max_width: Option<u32>| MediaQuery {
            orientation: None,
            max_width,
            min_width: None,
            max_resolution: None,
            min_resolution: None,
            dppx: 1.0,
            asset: ImageAsset {
                width: 800,
                height: 600,
                url: format!("/i/a-800.{format}"),
                source_type: format!("image/{format}"),
                format: format.to_string(),
            },
        };
        let lines = format_media_queries(&[
            record("webp", None),
            record("jpeg", None),
            record("jpeg", Some(500)),
        ]);
        assert_eq!(
            lines,
            vec![
                "all",
                "    /i/a-800.webp 800w image/webp",
                "    /i/a-800.jpeg 800w image/jpeg",
                "(max-width: 500px)",
                "    /i/a-800.jpeg 800w image/jpeg",
            ]
        );
    }

    #[test]
    fn batch_events() {
        let planned = BatchEvent::Planned {
            source: PathBuf::from("a.jpg"),
            widths: vec![1600, 800],
        };
        assert_eq!(format_batch_event(&planned), vec!["a.jpg \u{2192} 1600px, 800px"]);

        let failed = BatchEvent::Failed {
            source: PathBuf::from("b.jpg"),
            error: "boom".into(),
        };
        assert_eq!(format_batch_event(&failed), vec!["b.jpg failed", "    boom"]);
    }
}
