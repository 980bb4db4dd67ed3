//! Pure width calculations.
//!
//! All functions here are pure and testable without devices, images or I/O.

use crate::device::ConfigurationError;
use crate::sizes::{Fit, ResizeInstructions, SizeExpression};
use crate::types::Dimensions;

/// Default minimum squared-size ratio between two kept widths.
pub const DEFAULT_SCALING_FACTOR: f64 = 0.8;

/// Reduce resize instructions to a single image width.
///
/// Plain widths pass through. Heights and boxes need the image aspect ratio
/// (width / height): a height becomes `ceil(height * aspect)`; a box yields
/// two candidates, its own width and the width that matches its height, and
/// `cover` takes the larger while `contain` takes the smaller.
///
/// # Examples
/// ```
/// # use breakpoint_planner::planning::instructions_to_width;
/// # use breakpoint_planner::sizes::{Fit, SizeExpression};
/// // 3:2 image into a 400x400 box
/// let boxed = SizeExpression::Fit { width: 400, height: 400, fit: Fit::Cover };
/// assert_eq!(instructions_to_width(&boxed, Some(1.5)).unwrap(), 600);
/// ```
pub fn instructions_to_width(
    instructions: &ResizeInstructions,
    aspect_ratio: Option<f64>,
) -> Result<u32, ConfigurationError> {
    match *instructions {
        SizeExpression::Width(width) => Ok(width),
        SizeExpression::Height(height) => {
            let aspect = aspect_ratio.ok_or(ConfigurationError::HeightWithoutAspectRatio)?;
            Ok(scale(height, aspect))
        }
        SizeExpression::Fit { width, height, fit } => {
            let aspect = aspect_ratio.ok_or(ConfigurationError::HeightWithoutAspectRatio)?;
            let box_aspect = width as f64 / height.max(1) as f64;
            let from_height = scale(height, aspect);
            // A wider image overflows the box horizontally when heights match.
            let image_wider = aspect > box_aspect;
            Ok(match (fit, image_wider) {
                (Fit::Cover, true) | (Fit::Contain, false) => from_height,
                (Fit::Cover, false) | (Fit::Contain, true) => width,
            })
        }
    }
}

fn scale(value: u32, factor: f64) -> u32 {
    (value as f64 * factor - 1e-9).ceil().max(0.0) as u32
}

/// Candidate widths for a set of per-device targets, largest first.
///
/// When the source is known its width joins the candidates and caps them:
/// nothing wider than `min(source width, widest target)` is kept, so the
/// source is never upscaled and no width beyond what a device needs is
/// requested.
pub fn widths_from_instructions(
    targets: &[ResizeInstructions],
    source: Option<Dimensions>,
) -> Result<Vec<u32>, ConfigurationError> {
    let aspect = source.and_then(Dimensions::aspect_ratio);
    let mut widths = targets
        .iter()
        .map(|t| instructions_to_width(t, aspect))
        .collect::<Result<Vec<_>, _>>()?;

    let widest_target = widths.iter().copied().max();
    let limit = match (widest_target, source) {
        (Some(widest), Some(src)) => widest.min(src.width),
        (Some(widest), None) => widest,
        (None, Some(src)) => src.width,
        (None, None) => return Ok(Vec::new()),
    };
    if let Some(src) = source {
        widths.push(src.width);
    }

    widths.retain(|&w| w > 0 && w <= limit);
    widths.sort_unstable_by(|a, b| b.cmp(a));
    widths.dedup();
    Ok(widths)
}

/// Drop widths that are too close to a larger kept width.
///
/// Walking down from the largest width, a candidate is kept only when
/// `candidate² / kept²` (a proxy for the pixel-count ratio) is below
/// `factor`; otherwise it is skipped and the next candidate is compared
/// against the same kept width. A factor of zero or less disables the
/// filter.
///
/// ```
/// # use breakpoint_planner::planning::filter_sizes;
/// assert_eq!(filter_sizes(&[1000, 950, 900, 850], 0.8), vec![1000, 850]);
/// ```
pub fn filter_sizes(widths: &[u32], factor: f64) -> Vec<u32> {
    let mut sorted = widths.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.dedup();
    if factor.is_nan() || factor <= 0.0 {
        return sorted;
    }

    let mut kept: Vec<u32> = Vec::with_capacity(sorted.len());
    for width in sorted {
        match kept.last() {
            None => kept.push(width),
            Some(&larger) => {
                let ratio = (width as f64 / larger as f64).powi(2);
                if ratio < factor {
                    kept.push(width);
                } else {
                    log::debug!("dropping {width}px: {ratio:.3} of {larger}px");
                }
            }
        }
    }
    kept
}

/// Height of an image scaled to `width`, preserving the source aspect ratio.
pub fn height_for_width(source: Dimensions, width: u32) -> u32 {
    if source.width == 0 {
        return 0;
    }
    (source.height as f64 * width as f64 / source.width as f64).round() as u32
}
