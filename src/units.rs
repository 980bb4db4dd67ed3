//! Numeric values with CSS units.
//!
//! Two disjoint unit families appear in sizing expressions and media
//! conditions:
//!
//! | Family | Units | Used by |
//! |---|---|---|
//! | Size | `px`, `vw`, `vh` | `sizes` lengths, `width`/`height` features |
//! | Resolution | `dpi`, `dpcm`, `dppx` (alias `x`) | `resolution` feature |
//!
//! Resolution values normalise to dppx exactly: `dpi / 96` and
//! `dpcm * 2.54 / 96`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while parsing sizing expressions and media conditions.
///
/// Always fatal: a malformed expression cannot be approximated safely.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unsupported unit in '{0}'")]
    UnsupportedUnit(String),
    #[error("invalid number in '{0}'")]
    InvalidNumber(String),
    #[error("unsupported media type '{0}' (only 'all' is allowed)")]
    UnsupportedMediaType(String),
    #[error("invalid media condition '{input}': {reason}")]
    InvalidCondition { input: String, reason: String },
    #[error("invalid value '{value}' for media feature '{feature}'")]
    InvalidFeatureValue { feature: String, value: String },
    #[error("clause '{0}' has no size")]
    MissingSize(String),
    #[error("invalid size expression '{0}'")]
    InvalidSize(String),
}

/// A CSS unit understood by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Px,
    Vw,
    Vh,
    Dpi,
    Dpcm,
    /// Also written `x`.
    Dppx,
}

impl Unit {
    /// Parse a unit suffix, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "px" => Some(Unit::Px),
            "vw" => Some(Unit::Vw),
            "vh" => Some(Unit::Vh),
            "dpi" => Some(Unit::Dpi),
            "dpcm" => Some(Unit::Dpcm),
            "dppx" | "x" => Some(Unit::Dppx),
            _ => None,
        }
    }

    pub fn is_size(self) -> bool {
        matches!(self, Unit::Px | Unit::Vw | Unit::Vh)
    }

    pub fn is_resolution(self) -> bool {
        matches!(self, Unit::Dpi | Unit::Dpcm | Unit::Dppx)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Unit::Px => "px",
            Unit::Vw => "vw",
            Unit::Vh => "vh",
            Unit::Dpi => "dpi",
            Unit::Dpcm => "dpcm",
            Unit::Dppx => "dppx",
        };
        f.write_str(s)
    }
}

/// An immutable number paired with its unit, e.g. `680px` or `2x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitValue {
    pub value: f64,
    pub unit: Unit,
}

impl UnitValue {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn px(value: f64) -> Self {
        Self::new(value, Unit::Px)
    }

    /// Parse a token such as `400px`, `33.3vw`, `192dpi` or `2x`.
    ///
    /// The numeric part may carry a sign and a decimal point. A missing or
    /// unknown unit is an error; bare numbers are handled by
    /// [`parse_number`].
    pub fn parse(token: &str) -> Result<Self, ParseError> {
        let token = token.trim();
        let split = token
            .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
            .ok_or_else(|| ParseError::UnsupportedUnit(token.to_string()))?;
        let (number, unit) = token.split_at(split);
        let unit = Unit::parse(unit).ok_or_else(|| ParseError::UnsupportedUnit(token.to_string()))?;
        let value = parse_number(number)?;
        Ok(Self { value, unit })
    }

    /// Resolve a size value against a viewport, in CSS pixels.
    ///
    /// Returns `None` for resolution units.
    pub fn to_css_pixels(self, viewport_w: f64, viewport_h: f64) -> Option<f64> {
        match self.unit {
            Unit::Px => Some(self.value),
            Unit::Vw => Some(viewport_w * self.value / 100.0),
            Unit::Vh => Some(viewport_h * self.value / 100.0),
            _ => None,
        }
    }

    /// Convert a resolution value to dppx. Returns `None` for size units.
    pub fn to_dppx(self) -> Option<f64> {
        match self.unit {
            Unit::Dppx => Some(self.value),
            Unit::Dpi => Some(self.value / 96.0),
            Unit::Dpcm => Some(self.value * 2.54 / 96.0),
            _ => None,
        }
    }
}

impl fmt::Display for UnitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

/// Parse a bare CSS number (`2`, `1.5`, `-.5`).
pub fn parse_number(s: &str) -> Result<f64, ParseError> {
    let s = s.trim();
    if s.is_empty() || s.contains(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-')) {
        return Err(ParseError::InvalidNumber(s.to_string()));
    }
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_px() {
        assert_eq!(UnitValue::parse("680px").unwrap(), UnitValue::px(680.0));
    }

    #[test]
    fn parse_viewport_units() {
        assert_eq!(UnitValue::parse("100vw").unwrap(), UnitValue::new(100.0, Unit::Vw));
        assert_eq!(UnitValue::parse("33.5vh").unwrap(), UnitValue::new(33.5, Unit::Vh));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(UnitValue::parse("50VW").unwrap().unit, Unit::Vw);
    }

    #[test]
    fn x_is_dppx() {
        assert_eq!(UnitValue::parse("2x").unwrap(), UnitValue::new(2.0, Unit::Dppx));
        assert_eq!(UnitValue::parse("2dppx").unwrap(), UnitValue::new(2.0, Unit::Dppx));
    }

    #[test]
    fn unsupported_unit_is_error() {
        assert!(matches!(
            UnitValue::parse("40em"),
            Err(ParseError::UnsupportedUnit(_))
        ));
        assert!(matches!(
            UnitValue::parse("400"),
            Err(ParseError::UnsupportedUnit(_))
        ));
    }

    #[test]
    fn garbage_number_is_error() {
        assert!(UnitValue::parse("1.2.3px").is_err());
        assert!(UnitValue::parse("px").is_err());
    }

    #[test]
    fn resolution_to_dppx() {
        assert_eq!(UnitValue::parse("192dpi").unwrap().to_dppx(), Some(2.0));
        assert_eq!(UnitValue::parse("1.5x").unwrap().to_dppx(), Some(1.5));
        let dpcm = UnitValue::new(96.0 / 2.54, Unit::Dpcm).to_dppx().unwrap();
        assert!((dpcm - 1.0).abs() < 1e-12);
        assert_eq!(UnitValue::px(10.0).to_dppx(), None);
    }

    #[test]
    fn size_to_css_pixels() {
        assert_eq!(UnitValue::px(400.0).to_css_pixels(1024.0, 768.0), Some(400.0));
        assert_eq!(
            UnitValue::new(50.0, Unit::Vw).to_css_pixels(1024.0, 768.0),
            Some(512.0)
        );
        assert_eq!(
            UnitValue::new(25.0, Unit::Vh).to_css_pixels(1024.0, 768.0),
            Some(192.0)
        );
        assert_eq!(
            UnitValue::new(2.0, Unit::Dppx).to_css_pixels(1024.0, 768.0),
            None
        );
    }

    #[test]
    fn unit_families_are_disjoint() {
        for unit in [Unit::Px, Unit::Vw, Unit::Vh, Unit::Dpi, Unit::Dpcm, Unit::Dppx] {
            assert_ne!(unit.is_size(), unit.is_resolution());
        }
    }

    #[test]
    fn parse_number_rejects_units() {
        assert_eq!(parse_number("1.5").unwrap(), 1.5);
        assert!(parse_number("1.5px").is_err());
        assert!(parse_number("").is_err());
    }
}
