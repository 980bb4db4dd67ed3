//! CSS background-image rules from media query records.
//!
//! [`consolidate`] folds the flat per-(device, format) records from
//! [`crate::queries`] into as few rules as possible:
//!
//! 1. Records are grouped into cells, one per band. With
//!    [`ResolutionStrategy::MediaQueries`] a cell is a full width and
//!    resolution band; with [`ResolutionStrategy::ImageSet`] resolution
//!    bands fold into the cell's `image-set()` as density descriptors.
//! 2. Empty bands (lower bound at or above the upper bound) are dropped.
//! 3. Adjacent bands serving the same images are coalesced into one band.
//! 4. Rules whose selectors differ in exactly one slot are merged by
//!    OR-ing that slot's alternatives.
//!
//! A [`Selector`] has one slot per clause kind. Each slot holds OR
//! alternatives; [`Selector::permute`] expands the slots into the
//! comma-separated media query list.

use crate::device::Orientation;
use crate::queries::{
    MediaQuery, max_resolution_clause, max_width_clause, min_resolution_clause,
    min_width_clause, orientation_clause,
};
use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-9;
const SLOT_COUNT: usize = 5;

/// How density variants reach the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionStrategy {
    /// `min-resolution`/`max-resolution` clauses, one rule per band.
    #[default]
    MediaQueries,
    /// Density descriptors inside `image-set()`.
    ImageSet,
}

/// One `image-set()` candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct SetImage {
    pub url: String,
    pub source_type: String,
    pub dppx: f64,
}

impl SetImage {
    fn entry(&self) -> String {
        format!(
            "url(\"{}\") type(\"{}\") {}x",
            self.url,
            self.source_type,
            crate::queries::format_number(self.dppx)
        )
    }
}

/// Media query clauses in OR-able slots.
///
/// Slot order: orientation, max-width, min-width, max-resolution,
/// min-resolution. An empty slot is unconstrained.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selector {
    slots: [Vec<String>; SLOT_COUNT],
}

impl Selector {
    pub fn slots(&self) -> &[Vec<String>] {
        &self.slots
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Vec::is_empty)
    }

    /// Every combination of one alternative per non-empty slot, each
    /// joined with ` and `.
    pub fn permute(&self) -> Vec<String> {
        let mut combos: Vec<Vec<&str>> = vec![Vec::new()];
        for slot in self.slots.iter().filter(|s| !s.is_empty()) {
            combos = combos
                .into_iter()
                .flat_map(|prefix| {
                    slot.iter().map(move |alt| {
                        let mut next = prefix.clone();
                        next.push(alt.as_str());
                        next
                    })
                })
                .collect();
        }
        combos
            .into_iter()
            .filter(|c| !c.is_empty())
            .map(|c| c.join(" and "))
            .collect()
    }

    /// The media query list for an `@media` prelude.
    pub fn to_media(&self) -> String {
        self.permute().join(", ")
    }

    /// Merge with a selector that differs in at most one slot.
    fn merge(&self, other: &Selector) -> Option<Selector> {
        let differing: Vec<usize> = (0..SLOT_COUNT)
            .filter(|&i| self.slots[i] != other.slots[i])
            .collect();
        match differing.as_slice() {
            [] => Some(self.clone()),
            [slot] => {
                let mut merged = self.clone();
                merged.slots[*slot] = union(&self.slots[*slot], &other.slots[*slot]);
                Some(merged)
            }
            _ => None,
        }
    }
}

/// OR of two alternative lists. An unconstrained side absorbs the other.
fn union(a: &[String], b: &[String]) -> Vec<String> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = a.to_vec();
    for alt in b {
        if !out.contains(alt) {
            out.push(alt.clone());
        }
    }
    out
}

/// A consolidated rule: a selector and the images it serves.
#[derive(Debug, Clone, PartialEq)]
pub struct CssRule {
    pub selector: Selector,
    pub images: Vec<SetImage>,
}

impl CssRule {
    /// The image for browsers without `image-set()`: the lowest density,
    /// and among equal densities the last listed format.
    pub fn fallback(&self) -> Option<&SetImage> {
        self.images
            .iter()
            .rev()
            .min_by(|a, b| a.dppx.total_cmp(&b.dppx))
    }

    /// Render for an element selector such as `.hero`.
    pub fn to_css(&self, element: &str) -> String {
        let media = self.selector.to_media();
        let (declaration, fallback) = match self.images.as_slice() {
            [] => return String::new(),
            [only] => (format!("background-image: url(\"{}\");", only.url), None),
            images => {
                let entries: Vec<String> = images.iter().map(SetImage::entry).collect();
                (
                    format!("background-image: image-set({});", entries.join(", ")),
                    self.fallback(),
                )
            }
        };

        let mut lines = with_media(&media, style_block(element, &declaration));
        if let Some(fallback) = fallback {
            let probe = format!(
                "@supports not (background-image: image-set({}))",
                self.images[0].entry()
            );
            let plain = format!("background-image: url(\"{}\");", fallback.url);
            lines.extend(wrap(&probe, with_media(&media, style_block(element, &plain))));
        }
        let mut css = lines.join("\n");
        css.push('\n');
        css
    }
}

fn style_block(element: &str, declaration: &str) -> Vec<String> {
    wrap(element, vec![declaration.to_string()])
}

fn with_media(media: &str, body: Vec<String>) -> Vec<String> {
    if media.is_empty() {
        body
    } else {
        wrap(&format!("@media {media}"), body)
    }
}

fn wrap(header: &str, body: Vec<String>) -> Vec<String> {
    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(format!("{header} {{"));
    lines.extend(body.into_iter().map(|line| format!("  {line}")));
    lines.push("}".to_string());
    lines
}

/// Render every rule for one element selector.
pub fn render_css(rules: &[CssRule], element: &str) -> String {
    rules
        .iter()
        .map(|rule| rule.to_css(element))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone)]
struct Cell {
    orientation: Option<Orientation>,
    max_width: Option<u32>,
    min_width: Option<u32>,
    max_resolution: Option<f64>,
    min_resolution: Option<f64>,
    images: Vec<SetImage>,
}

impl Cell {
    fn from_query(query: &MediaQuery, strategy: ResolutionStrategy) -> Self {
        let (max_resolution, min_resolution) = match strategy {
            ResolutionStrategy::MediaQueries => (query.max_resolution, query.min_resolution),
            ResolutionStrategy::ImageSet => (None, None),
        };
        Self {
            orientation: query.orientation,
            max_width: query.max_width,
            min_width: query.min_width,
            max_resolution,
            min_resolution,
            images: Vec::new(),
        }
    }

    fn same_band(&self, other: &Cell) -> bool {
        self.orientation == other.orientation
            && self.max_width == other.max_width
            && self.min_width == other.min_width
            && same_bound(self.max_resolution, other.max_resolution)
            && same_bound(self.min_resolution, other.min_resolution)
    }

    fn same_resolution(&self, other: &Cell) -> bool {
        same_bound(self.max_resolution, other.max_resolution)
            && same_bound(self.min_resolution, other.min_resolution)
    }

    fn is_empty_band(&self) -> bool {
        let empty_width = matches!(
            (self.min_width, self.max_width),
            (Some(min), Some(max)) if min >= max
        );
        let empty_resolution = matches!(
            (self.min_resolution, self.max_resolution),
            (Some(min), Some(max)) if min >= max - EPSILON
        );
        empty_width || empty_resolution
    }

    /// Join with an adjacent band serving the same images.
    fn coalesce(&self, other: &Cell) -> Option<Cell> {
        if self.orientation != other.orientation || self.images != other.images {
            return None;
        }
        let widths_equal = self.max_width == other.max_width && self.min_width == other.min_width;
        let mut merged = self.clone();
        if self.same_resolution(other) {
            if touches(self.min_width, other.max_width) {
                merged.min_width = other.min_width;
                return Some(merged);
            }
            if touches(other.min_width, self.max_width) {
                merged.max_width = other.max_width;
                return Some(merged);
            }
        }
        if widths_equal {
            if touches_resolution(self.min_resolution, other.max_resolution) {
                merged.min_resolution = other.min_resolution;
                return Some(merged);
            }
            if touches_resolution(other.min_resolution, self.max_resolution) {
                merged.max_resolution = other.max_resolution;
                return Some(merged);
            }
        }
        None
    }

    fn selector(&self) -> Selector {
        let mut selector = Selector::default();
        if let Some(o) = self.orientation {
            selector.slots[0].push(orientation_clause(o));
        }
        if let Some(w) = self.max_width {
            selector.slots[1].push(max_width_clause(w));
        }
        if let Some(w) = self.min_width {
            selector.slots[2].push(min_width_clause(w));
        }
        if let Some(r) = self.max_resolution {
            selector.slots[3].push(max_resolution_clause(r));
        }
        if let Some(r) = self.min_resolution {
            selector.slots[4].push(min_resolution_clause(r));
        }
        selector
    }
}

fn same_bound(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => (a - b).abs() <= EPSILON,
        _ => false,
    }
}

fn touches(lower_of_upper_band: Option<u32>, upper_of_lower_band: Option<u32>) -> bool {
    matches!((lower_of_upper_band, upper_of_lower_band), (Some(a), Some(b)) if a == b)
}

fn touches_resolution(lower: Option<f64>, upper: Option<f64>) -> bool {
    matches!((lower, upper), (Some(a), Some(b)) if (a - b).abs() <= EPSILON)
}

/// Fold media query records into consolidated CSS rules.
pub fn consolidate(queries: &[MediaQuery], strategy: ResolutionStrategy) -> Vec<CssRule> {
    let mut cells: Vec<Cell> = Vec::new();
    for query in queries {
        let cell = Cell::from_query(query, strategy);
        if cell.is_empty_band() {
            continue;
        }
        let index = match cells.iter().position(|c| c.same_band(&cell)) {
            Some(index) => index,
            None => {
                cells.push(cell);
                cells.len() - 1
            }
        };
        let dppx = match strategy {
            ResolutionStrategy::MediaQueries => 1.0,
            ResolutionStrategy::ImageSet => query.dppx,
        };
        add_image(&mut cells[index].images, &query.asset.url, &query.asset.source_type, dppx);
    }
    for cell in &mut cells {
        cell.images.sort_by(|a, b| a.dppx.total_cmp(&b.dppx));
    }

    let cells = fixpoint(cells, |a, b| a.coalesce(b));

    let rules: Vec<CssRule> = cells
        .into_iter()
        .map(|cell| CssRule {
            selector: cell.selector(),
            images: cell.images,
        })
        .collect();
    fixpoint(rules, |a: &CssRule, b: &CssRule| {
        if a.images != b.images {
            return None;
        }
        a.selector.merge(&b.selector).map(|selector| CssRule {
            selector,
            images: a.images.clone(),
        })
    })
}

/// Keep the lowest density for a url already present.
fn add_image(images: &mut Vec<SetImage>, url: &str, source_type: &str, dppx: f64) {
    match images.iter_mut().find(|i| i.url == url) {
        Some(existing) => existing.dppx = existing.dppx.min(dppx),
        None => images.push(SetImage {
            url: url.to_string(),
            source_type: source_type.to_string(),
            dppx,
        }),
    }
}

/// Repeatedly merge the first mergeable pair until none is left.
fn fixpoint<T>(mut items: Vec<T>, merge: impl Fn(&T, &T) -> Option<T>) -> Vec<T> {
    'outer: loop {
        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                if let Some(merged) = merge(&items[i], &items[j]) {
                    items[i] = merged;
                    items.remove(j);
                    continue 'outer;
                }
            }
        }
        return items;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::ImageAsset;
    use crate::types::mime_type;

    struct Band {
        orientation: Option<Orientation>,
        width: (Option<u32>, Option<u32>),
        resolution: (Option<f64>, Option<f64>),
        dppx: f64,
    }

    fn band(orientation: Orientation, max: Option<u32>, min: Option<u32>) -> Band {
        Band {
            orientation: Some(orientation),
            width: (max, min),
            resolution: (None, None),
            dppx: 1.0,
        }
    }

    fn record(band: &Band, width: u32, format: &str) -> MediaQuery {
        MediaQuery {
            orientation: band.orientation,
            max_width: band.width.0,
            min_width: band.width.1,
            max_resolution: band.resolution.0,
            min_resolution: band.resolution.1,
            dppx: band.dppx,
            asset: ImageAsset {
                width,
                height: width / 2,
                url: format!("/img/a-{width}.{format}"),
                source_type: mime_type(format).unwrap().to_string(),
                format: format.to_string(),
            },
        }
    }

    fn media(rules: &[CssRule]) -> Vec<String> {
        rules.iter().map(|r| r.selector.to_media()).collect()
    }

    // =========================================================================
    // Selector
    // =========================================================================

    #[test]
    fn permute_is_cartesian_product() {
        let mut selector = Selector::default();
        selector.slots[0] = vec![
            "(orientation: landscape)".into(),
            "(orientation: portrait)".into(),
        ];
        selector.slots[1] = vec!["(max-width: 800px)".into()];
        assert_eq!(
            selector.to_media(),
            "(orientation: landscape) and (max-width: 800px), \
             (orientation: portrait) and (max-width: 800px)"
        );
    }

    #[test]
    fn empty_selector_permutes_to_nothing() {
        assert!(Selector::default().permute().is_empty());
        assert_eq!(Selector::default().to_media(), "");
    }

    #[test]
    fn unconstrained_slot_absorbs_alternative() {
        assert!(union(&[], &["(max-width: 800px)".to_string()]).is_empty());
    }

    // =========================================================================
    // consolidate
    // =========================================================================

    #[test]
    fn empty_band_is_dropped() {
        let empty = band(Orientation::Landscape, Some(800), Some(800));
        let rules = consolidate(&[record(&empty, 800, "jpeg")], ResolutionStrategy::MediaQueries);
        assert!(rules.is_empty());
    }

    #[test]
    fn contiguous_bands_coalesce() {
        let landscape = Orientation::Landscape;
        let queries = [
            record(&band(landscape, None, Some(1000)), 1600, "jpeg"),
            record(&band(landscape, Some(1000), Some(500)), 1600, "jpeg"),
            record(&band(landscape, Some(500), None), 500, "jpeg"),
        ];
        let rules = consolidate(&queries, ResolutionStrategy::MediaQueries);
        assert_eq!(
            media(&rules),
            vec![
                "(orientation: landscape) and (min-width: 501px)",
                "(orientation: landscape) and (max-width: 500px)",
            ]
        );
    }

    #[test]
    fn orientations_merge_into_one_rule() {
        let queries = [
            record(&band(Orientation::Landscape, Some(800), None), 800, "jpeg"),
            record(&band(Orientation::Portrait, Some(800), None), 800, "jpeg"),
        ];
        let rules = consolidate(&queries, ResolutionStrategy::MediaQueries);
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].selector.to_media(),
            "(orientation: landscape) and (max-width: 800px), \
             (orientation: portrait) and (max-width: 800px)"
        );
    }

    #[test]
    fn resolution_bands_coalesce_when_serving_same_image() {
        let mut hi = band(Orientation::Landscape, None, None);
        hi.resolution = (None, Some(2.0));
        let mut mid = band(Orientation::Landscape, None, None);
        mid.resolution = (Some(2.0), Some(1.0));
        let mut lo = band(Orientation::Landscape, None, None);
        lo.resolution = (Some(1.0), None);
        let queries = [
            record(&hi, 2000, "jpeg"),
            record(&mid, 2000, "jpeg"),
            record(&lo, 1000, "jpeg"),
        ];
        let rules = consolidate(&queries, ResolutionStrategy::MediaQueries);
        assert_eq!(
            media(&rules),
            vec![
                "(orientation: landscape) and (min-resolution: 97dpi)",
                "(orientation: landscape) and (max-resolution: 96dpi)",
            ]
        );
    }

    #[test]
    fn image_set_folds_densities() {
        let mut hi = band(Orientation::Landscape, None, None);
        hi.resolution = (None, Some(1.0));
        hi.dppx = 2.0;
        let mut lo = band(Orientation::Landscape, None, None);
        lo.resolution = (Some(1.0), None);
        let queries = [
            record(&hi, 1600, "webp"),
            record(&hi, 1600, "jpeg"),
            record(&lo, 800, "webp"),
            record(&lo, 800, "jpeg"),
        ];
        let rules = consolidate(&queries, ResolutionStrategy::ImageSet);
        assert_eq!(rules.len(), 1);
        let urls: Vec<(&str, f64)> = rules[0]
            .images
            .iter()
            .map(|i| (i.url.as_str(), i.dppx))
            .collect();
        assert_eq!(
            urls,
            vec![
                ("/img/a-800.webp", 1.0),
                ("/img/a-800.jpeg", 1.0),
                ("/img/a-1600.webp", 2.0),
                ("/img/a-1600.jpeg", 2.0),
            ]
        );
        assert_eq!(rules[0].fallback().unwrap().url, "/img/a-800.jpeg");
    }

    #[test]
    fn image_set_keeps_lowest_density_for_shared_url() {
        let mut hi = band(Orientation::Portrait, None, None);
        hi.dppx = 3.0;
        let mut lo = band(Orientation::Portrait, None, None);
        lo.dppx = 2.0;
        let queries = [record(&hi, 1200, "jpeg"), record(&lo, 1200, "jpeg")];
        let rules = consolidate(&queries, ResolutionStrategy::ImageSet);
        assert_eq!(rules[0].images.len(), 1);
        assert_eq!(rules[0].images[0].dppx, 2.0);
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn single_image_renders_plain_url() {
        let rules = consolidate(
            &[record(&band(Orientation::Landscape, Some(800), None), 800, "jpeg")],
            ResolutionStrategy::MediaQueries,
        );
        assert_eq!(
            rules[0].to_css(".hero"),
            "@media (orientation: landscape) and (max-width: 800px) {\n\
             \x20 .hero {\n\
             \x20   background-image: url(\"/img/a-800.jpeg\");\n\
             \x20 }\n\
             }\n"
        );
    }

    #[test]
    fn image_set_renders_supports_fallback() {
        let catch_all = Band {
            orientation: None,
            width: (None, None),
            resolution: (None, None),
            dppx: 1.0,
        };
        let queries = [record(&catch_all, 800, "webp"), record(&catch_all, 800, "jpeg")];
        let css = render_css(&consolidate(&queries, ResolutionStrategy::MediaQueries), "img");
        let expected = "\
img {
  background-image: image-set(url(\"/img/a-800.webp\") type(\"image/webp\") 1x, url(\"/img/a-800.jpeg\") type(\"image/jpeg\") 1x);
}
@supports not (background-image: image-set(url(\"/img/a-800.webp\") type(\"image/webp\") 1x)) {
  img {
    background-image: url(\"/img/a-800.jpeg\");
  }
}
";
        assert_eq!(css, expected);
    }

    #[test]
    fn strategy_serde_names() {
        #[derive(Deserialize)]
        struct Wrap {
            resolution: ResolutionStrategy,
        }
        let w: Wrap = toml::from_str("resolution = \"image-set\"").unwrap();
        assert_eq!(w.resolution, ResolutionStrategy::ImageSet);
        let w: Wrap = toml::from_str("resolution = \"media-queries\"").unwrap();
        assert_eq!(w.resolution, ResolutionStrategy::MediaQueries);
    }
}
