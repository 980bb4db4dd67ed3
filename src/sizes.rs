//! Parser for `sizes`-attribute sizing expressions.
//!
//! A sizing expression is an ordered, comma-separated list of clauses, each a
//! media condition followed by a size:
//!
//! ```text
//! (min-width: 1200px) 50vw, (orientation: portrait) 100vw 40vh cover, 100vw
//! └──── condition ───┘ └┬─┘ └────── condition ────┘ └──── size ───────┘ └┬─┘
//!                      size                                            size
//! ```
//!
//! Clauses are tokenized from the right: trailing tokens that are a size
//! value (`px`, `vw`, `vh`), a dimension keyword (`width`, `height`) or a fit
//! keyword (`cover`, `contain`) belong to the size; the first token that is
//! none of these ends the size, and everything to its left is the condition.
//! An empty condition always matches.
//!
//! The first clause whose condition matches a device wins, exactly as a
//! browser evaluates `sizes`.
//!
//! ## Size shapes
//!
//! | Tokens | Expression | Plain `sizes`-compatible |
//! |---|---|---|
//! | `50vw` or `50vw width` | [`SizeExpression::Width`] | yes |
//! | `40vh height` | [`SizeExpression::Height`] | no |
//! | `100vw 40vh cover` | [`SizeExpression::Fit`] | no |
//!
//! Shapes that are not plain widths parse with `is_valid = false`; the
//! renderer must fall back to media-query output for them.

use crate::media::{MediaCondition, parse_media_condition};
use crate::units::{ParseError, UnitValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a width+height box is reduced to one image width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fit {
    /// The image must cover the box: pick the larger candidate.
    Cover,
    /// The image must fit inside the box: pick the smaller candidate.
    Contain,
}

impl fmt::Display for Fit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Fit::Cover => "cover",
            Fit::Contain => "contain",
        })
    }
}

/// The size half of a clause, generic over the measurement type.
///
/// `SizeExpression<UnitValue>` comes out of the parser; resolving it against
/// a device yields [`ResizeInstructions`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeExpression<T> {
    Width(T),
    Height(T),
    Fit { width: T, height: T, fit: Fit },
}

/// A size expression resolved to device pixels.
pub type ResizeInstructions = SizeExpression<u32>;

impl<T> SizeExpression<T> {
    /// Convert every component, stopping at the first error.
    pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> Result<U, E>) -> Result<SizeExpression<U>, E> {
        Ok(match self {
            SizeExpression::Width(w) => SizeExpression::Width(f(w)?),
            SizeExpression::Height(h) => SizeExpression::Height(f(h)?),
            SizeExpression::Fit { width, height, fit } => SizeExpression::Fit {
                width: f(width)?,
                height: f(height)?,
                fit,
            },
        })
    }
}

impl<T: fmt::Display> fmt::Display for SizeExpression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeExpression::Width(w) => write!(f, "{w}"),
            SizeExpression::Height(h) => write!(f, "{h} height"),
            SizeExpression::Fit { width, height, fit } => write!(f, "{width} {height} {fit}"),
        }
    }
}

/// One clause of a sizing expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SizesQuery {
    /// `None` matches every device.
    pub conditions: Option<MediaCondition>,
    pub size: SizeExpression<UnitValue>,
    /// True when `size` is a single plain width.
    pub is_valid: bool,
}

impl fmt::Display for SizesQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.conditions {
            Some(condition) => write!(f, "{} {}", condition, self.size),
            None => write!(f, "{}", self.size),
        }
    }
}

/// A parsed sizing expression: clauses in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sizes {
    pub queries: Vec<SizesQuery>,
}

impl Sizes {
    /// Parse a sizing expression.
    ///
    /// A blank expression yields no clauses; empty clauses between commas are
    /// skipped.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let queries = split_top_level(input)
            .into_iter()
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(parse_clause)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { queries })
    }

    pub fn iter(&self) -> impl Iterator<Item = &SizesQuery> {
        self.queries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// True when every clause can be emitted as a plain `sizes` attribute.
    pub fn is_valid(&self) -> bool {
        self.queries.iter().all(|q| q.is_valid)
    }
}

impl fmt::Display for Sizes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, query) in self.queries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{query}")?;
        }
        Ok(())
    }
}

/// Split on commas that are not inside parentheses.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

enum SizeToken {
    Value(UnitValue),
    Fit(Fit),
    Width,
    Height,
}

impl SizeToken {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "cover" => Some(SizeToken::Fit(Fit::Cover)),
            "contain" => Some(SizeToken::Fit(Fit::Contain)),
            "width" => Some(SizeToken::Width),
            "height" => Some(SizeToken::Height),
            _ => UnitValue::parse(token)
                .ok()
                .filter(|v| v.unit.is_size())
                .map(SizeToken::Value),
        }
    }
}

fn parse_clause(clause: &str) -> Result<SizesQuery, ParseError> {
    let mut rest = clause.trim_end();
    let mut tokens = Vec::new();

    while !rest.is_empty() {
        let start = rest
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        match SizeToken::parse(&rest[start..]) {
            Some(token) => {
                tokens.push(token);
                rest = rest[..start].trim_end();
            }
            None => break,
        }
    }
    tokens.reverse();

    let (size, is_valid) = reduce_size(clause, tokens)?;
    let conditions = if rest.is_empty() {
        None
    } else {
        Some(parse_media_condition(rest)?)
    };

    Ok(SizesQuery {
        conditions,
        size,
        is_valid,
    })
}

fn reduce_size(
    clause: &str,
    tokens: Vec<SizeToken>,
) -> Result<(SizeExpression<UnitValue>, bool), ParseError> {
    let invalid = || ParseError::InvalidSize(clause.to_string());

    let mut values = Vec::new();
    let mut fit = None;
    let mut dimension = None;
    for token in tokens {
        match token {
            // Lengths in `sizes` may not be negative.
            SizeToken::Value(v) if v.value < 0.0 => return Err(invalid()),
            SizeToken::Value(v) => values.push(v),
            SizeToken::Fit(f) if fit.is_none() => fit = Some(f),
            SizeToken::Width if dimension.is_none() => dimension = Some(SizeToken::Width),
            SizeToken::Height if dimension.is_none() => dimension = Some(SizeToken::Height),
            _ => return Err(invalid()),
        }
    }

    match (values.as_slice(), fit, dimension) {
        ([], _, _) => Err(ParseError::MissingSize(clause.to_string())),
        ([w], None, None | Some(SizeToken::Width)) => Ok((SizeExpression::Width(*w), true)),
        ([h], None, Some(SizeToken::Height)) => Ok((SizeExpression::Height(*h), false)),
        ([width, height], Some(fit), None) => Ok((
            SizeExpression::Fit {
                width: *width,
                height: *height,
                fit,
            },
            false,
        )),
        _ => Err(invalid()),
    }
}
