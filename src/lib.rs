//! # Breakpoint Planner
//!
//! Plans responsive images from a `sizes` expression and a list of devices.
//! Every device is asked which image width it needs; the planner proposes the
//! widths worth producing, then synthesizes the media queries that pick the
//! right produced image on each device.
//!
//! # Architecture: Plan, Resize, Synthesize
//!
//! ```text
//! 1. Plan        sizes + devices  →  widths            (pure)
//! 2. Resize      widths           →  metadata          (ImageResizer)
//! 3. Synthesize  metadata         →  media queries/CSS (pure)
//! ```
//!
//! Only the middle step touches images, behind the [`resize::ImageResizer`]
//! trait. Planning and synthesis are pure functions of their inputs, so unit
//! tests exercise them without files or encoders.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`units`] | CSS lengths and resolutions; `ParseError` |
//! | [`media`] | Media condition AST and parser |
//! | [`sizes`] | `sizes` expression parser, including height and box shapes |
//! | [`device`] | Device definitions, expansion, canonical order, condition evaluation |
//! | [`planning`] | `DeviceSizes`: targets, width candidates, asset mapping |
//! | [`queries`] | Media query record synthesis |
//! | [`css`] | Consolidated CSS rules with `image-set()` support |
//! | [`resize`] | Resizer trait, dry-run resizer, plan-then-resize builder |
//! | [`batch`] | Parallel planning over a JSON manifest |
//! | [`config`] | `breakpoints.toml` loading, validation, merging |
//! | [`types`] | Shared value types (`Dimensions`, MIME table) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Evaluate Like a Browser, Measure Like a Printer
//!
//! Conditions are evaluated the way a browser evaluates `sizes`: first
//! matching clause wins, unmatched devices get `100vw`. Sizes are then
//! converted to device pixels and rounded up, since an image a pixel short
//! is visibly soft while one a pixel long costs nothing.
//!
//! ## Squared-Ratio Width Filtering
//!
//! Two widths whose pixel counts are within [`planning::DEFAULT_SCALING_FACTOR`]
//! of each other are not both worth producing. Comparing squared widths
//! approximates pixel count without needing heights.
//!
//! ## Bands, Not Breakpoints
//!
//! Media queries are emitted as half-open bands between consecutive device
//! widths (and densities), so the bands partition the device space and every
//! device is selected by exactly one rule.

pub mod batch;
pub mod config;
pub mod css;
pub mod device;
pub mod media;
pub mod output;
pub mod planning;
pub mod queries;
pub mod resize;
pub mod sizes;
pub mod types;
pub mod units;

#[cfg(test)]
pub(crate) mod test_helpers;
