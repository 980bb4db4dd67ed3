//! Media-condition syntax trees.
//!
//! Only the slice of the CSS media-query grammar that matters for image
//! sizing is supported: `width`, `height`, `resolution`, `aspect-ratio` and
//! `orientation` features (each optionally `min-`/`max-` prefixed), the `all`
//! media type, and `and`/`or`/`not` composition with parenthesized nesting.
//!
//! ```text
//! (min-width: 680px) and (orientation: landscape)
//! ──────────┬──────── ─┬─ ────────────┬──────────
//!        Feature       │           Feature
//!                Condition { operator: And }
//! ```
//!
//! Parsing is strict about syntax and lenient about feature names: an unknown
//! feature parses fine and only fails when a device evaluates it (see
//! [`Device::matches`](crate::device::Device::matches)).

mod parser;

pub use parser::parse_media_condition;

use crate::units::UnitValue;
use std::fmt;

/// Boolean operator joining the children of a [`MediaCondition::Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
    Not,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
        })
    }
}

/// A parsed media condition.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCondition {
    /// A single `(name: value)` test.
    Feature(MediaFeature),
    /// Children joined by an operator. `operator: None` is a parenthesized
    /// group and evaluates like `and`.
    Condition {
        operator: Option<Operator>,
        children: Vec<MediaCondition>,
    },
    /// The `all` media type. Matches every device.
    All,
}

impl fmt::Display for MediaCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaCondition::Feature(feature) => write!(f, "{feature}"),
            MediaCondition::All => f.write_str("all"),
            MediaCondition::Condition { operator, children } => match operator {
                None => {
                    f.write_str("(")?;
                    write_joined(f, children, " and ")?;
                    f.write_str(")")
                }
                Some(Operator::Not) => {
                    f.write_str("not ")?;
                    write_joined(f, children, " and ")
                }
                Some(op) => write_joined(f, children, &format!(" {op} ")),
            },
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[MediaCondition], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Range prefix of a feature name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePrefix {
    Min,
    Max,
    /// No prefix: exact equality.
    Exact,
}

/// A `(name: value)` leaf. `name` is kept verbatim (lowercased) including any
/// `min-`/`max-` prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFeature {
    pub name: String,
    pub value: Option<FeatureValue>,
}

impl MediaFeature {
    /// Split `min-width` into `("width", Min)`.
    pub fn split_prefix(&self) -> (&str, RangePrefix) {
        if let Some(base) = self.name.strip_prefix("min-") {
            (base, RangePrefix::Min)
        } else if let Some(base) = self.name.strip_prefix("max-") {
            (base, RangePrefix::Max)
        } else {
            (&self.name, RangePrefix::Exact)
        }
    }
}

impl fmt::Display for MediaFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "({}: {})", self.name, value),
            None => write!(f, "({})", self.name),
        }
    }
}

/// The literal on the right-hand side of a feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Dimension(UnitValue),
    Number(f64),
    /// `16/9`
    Ratio(f64, f64),
    Ident(String),
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Dimension(v) => write!(f, "{v}"),
            FeatureValue::Number(n) => write!(f, "{n}"),
            FeatureValue::Ratio(w, h) => write!(f, "{w}/{h}"),
            FeatureValue::Ident(s) => f.write_str(s),
        }
    }
}
