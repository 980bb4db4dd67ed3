//! Recursive-descent parser for media conditions.
//!
//! ```text
//! query      := ["not" | "only"] "all" ["and" condition] | condition
//! condition  := "not" in_parens
//!             | in_parens ("and" in_parens)*
//!             | in_parens ("or" in_parens)*
//! in_parens  := "(" condition ")" | "(" name [":" value] ")"
//! ```
//!
//! Mixing `and` and `or` at one level without parentheses is rejected, as in
//! CSS.

use super::{FeatureValue, MediaCondition, MediaFeature, Operator};
use crate::units::{ParseError, UnitValue, parse_number};

/// Parse a media condition such as `(min-width: 680px) and (max-resolution: 2x)`.
pub fn parse_media_condition(input: &str) -> Result<MediaCondition, ParseError> {
    let mut parser = ConditionParser::new(input);
    let condition = parser.parse_query()?;
    parser.skip_whitespace();
    if !parser.is_eof() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(condition)
}

struct ConditionParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> ConditionParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_query(&mut self) -> Result<MediaCondition, ParseError> {
        self.skip_whitespace();
        if self.peek() == Some('(') {
            return self.parse_condition();
        }

        let negated = if self.eat_keyword("not") {
            true
        } else {
            self.eat_keyword("only");
            false
        };
        self.skip_whitespace();

        if self.peek() == Some('(') {
            if !negated {
                return Err(self.error("expected a media type after 'only'"));
            }
            let inner = self.parse_in_parens()?;
            return Ok(MediaCondition::Condition {
                operator: Some(Operator::Not),
                children: vec![inner],
            });
        }

        let media_type = self
            .parse_ident()
            .ok_or_else(|| self.error("expected a media type or '('"))?;
        if matches!(media_type.as_str(), "and" | "or" | "not" | "only") {
            return Err(self.error("misplaced keyword"));
        }
        if media_type != "all" {
            return Err(ParseError::UnsupportedMediaType(media_type));
        }

        self.skip_whitespace();
        let query = if self.eat_keyword("and") {
            let rest = self.parse_condition()?;
            if matches!(
                rest,
                MediaCondition::Condition {
                    operator: Some(Operator::Or),
                    ..
                }
            ) {
                return Err(self.error("'or' must be parenthesized after a media type"));
            }
            MediaCondition::Condition {
                operator: Some(Operator::And),
                children: vec![MediaCondition::All, rest],
            }
        } else {
            MediaCondition::All
        };

        Ok(if negated {
            MediaCondition::Condition {
                operator: Some(Operator::Not),
                children: vec![query],
            }
        } else {
            query
        })
    }

    fn parse_condition(&mut self) -> Result<MediaCondition, ParseError> {
        self.skip_whitespace();
        if self.eat_keyword("not") {
            let inner = self.parse_in_parens()?;
            return Ok(MediaCondition::Condition {
                operator: Some(Operator::Not),
                children: vec![inner],
            });
        }

        let mut children = vec![self.parse_in_parens()?];
        let mut operator = None;
        loop {
            self.skip_whitespace();
            let next = if self.eat_keyword("and") {
                Operator::And
            } else if self.eat_keyword("or") {
                Operator::Or
            } else {
                break;
            };
            if operator.is_some_and(|op| op != next) {
                return Err(self.error("cannot mix 'and' and 'or' without parentheses"));
            }
            operator = Some(next);
            children.push(self.parse_in_parens()?);
        }

        if children.len() == 1 {
            Ok(children.remove(0))
        } else {
            Ok(MediaCondition::Condition { operator, children })
        }
    }

    fn parse_in_parens(&mut self) -> Result<MediaCondition, ParseError> {
        self.skip_whitespace();
        if self.peek() != Some('(') {
            return Err(self.error("expected '('"));
        }
        self.advance();
        self.skip_whitespace();

        if self.peek() == Some('(') || self.peek_keyword("not") {
            let inner = self.parse_condition()?;
            self.expect_close()?;
            return Ok(MediaCondition::Condition {
                operator: None,
                children: vec![inner],
            });
        }

        let name = self
            .parse_ident()
            .ok_or_else(|| self.error("expected a feature name"))?;
        self.skip_whitespace();

        let value = if self.peek() == Some(':') {
            self.advance();
            let start = self.pos;
            while !matches!(self.peek(), Some(')') | Some('(') | None) {
                self.advance();
            }
            let raw = self.input[start..self.pos].trim();
            Some(parse_feature_value(&name, raw)?)
        } else {
            None
        };

        self.expect_close()?;
        Ok(MediaCondition::Feature(MediaFeature { name, value }))
    }

    fn expect_close(&mut self) -> Result<(), ParseError> {
        self.skip_whitespace();
        if self.peek() != Some(')') {
            return Err(self.error("expected ')'"));
        }
        self.advance();
        Ok(())
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn peek_ident(&self) -> Option<&'a str> {
        let input: &'a str = self.input;
        let rest = &input[self.pos..];
        let len = rest
            .find(|c: char| !is_ident_char(c))
            .unwrap_or(rest.len());
        (len > 0).then(|| &rest[..len])
    }

    fn parse_ident(&mut self) -> Option<String> {
        let ident = self.peek_ident()?;
        self.pos += ident.len();
        Some(ident.to_ascii_lowercase())
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        self.peek_ident()
            .is_some_and(|ident| ident.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn error(&self, reason: &str) -> ParseError {
        ParseError::InvalidCondition {
            input: self.input.to_string(),
            reason: format!("{reason} at offset {}", self.pos),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_feature_value(feature: &str, raw: &str) -> Result<FeatureValue, ParseError> {
    let invalid = || ParseError::InvalidFeatureValue {
        feature: feature.to_string(),
        value: raw.to_string(),
    };

    if raw.is_empty() {
        return Err(invalid());
    }
    if let Some((w, h)) = raw.split_once('/') {
        let w = parse_number(w).map_err(|_| invalid())?;
        let h = parse_number(h).map_err(|_| invalid())?;
        return Ok(FeatureValue::Ratio(w, h));
    }
    if let Ok(n) = parse_number(raw) {
        return Ok(FeatureValue::Number(n));
    }
    let first = raw.chars().next().ok_or_else(invalid)?;
    if first.is_ascii_digit() || matches!(first, '.' | '+' | '-') {
        return UnitValue::parse(raw).map(FeatureValue::Dimension);
    }
    if raw.chars().all(is_ident_char) {
        return Ok(FeatureValue::Ident(raw.to_ascii_lowercase()));
    }
    Err(invalid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;

    fn feature(name: &str, value: FeatureValue) -> MediaCondition {
        MediaCondition::Feature(MediaFeature {
            name: name.to_string(),
            value: Some(value),
        })
    }

    fn px(v: f64) -> FeatureValue {
        FeatureValue::Dimension(UnitValue::px(v))
    }

    // =========================================================================
    // Features
    // =========================================================================

    #[test]
    fn single_feature() {
        assert_eq!(
            parse_media_condition("(min-width: 680px)").unwrap(),
            feature("min-width", px(680.0))
        );
    }

    #[test]
    fn feature_names_are_lowercased() {
        assert_eq!(
            parse_media_condition("(MAX-Width:100PX)").unwrap(),
            feature("max-width", px(100.0))
        );
    }

    #[test]
    fn resolution_feature() {
        assert_eq!(
            parse_media_condition("(min-resolution: 2x)").unwrap(),
            feature(
                "min-resolution",
                FeatureValue::Dimension(UnitValue::new(2.0, Unit::Dppx))
            )
        );
    }

    #[test]
    fn aspect_ratio_as_ratio_and_number() {
        assert_eq!(
            parse_media_condition("(min-aspect-ratio: 16/9)").unwrap(),
            feature("min-aspect-ratio", FeatureValue::Ratio(16.0, 9.0))
        );
        assert_eq!(
            parse_media_condition("(aspect-ratio: 1.5)").unwrap(),
            feature("aspect-ratio", FeatureValue::Number(1.5))
        );
    }

    #[test]
    fn orientation_ident() {
        assert_eq!(
            parse_media_condition("(orientation: Portrait)").unwrap(),
            feature("orientation", FeatureValue::Ident("portrait".into()))
        );
    }

    #[test]
    fn valueless_feature_parses() {
        assert_eq!(
            parse_media_condition("(color)").unwrap(),
            MediaCondition::Feature(MediaFeature {
                name: "color".into(),
                value: None,
            })
        );
    }

    #[test]
    fn unsupported_unit_is_parse_error() {
        assert!(matches!(
            parse_media_condition("(min-width: 40em)"),
            Err(ParseError::UnsupportedUnit(_))
        ));
    }

    #[test]
    fn bad_ratio_is_parse_error() {
        assert!(matches!(
            parse_media_condition("(aspect-ratio: 16/x)"),
            Err(ParseError::InvalidFeatureValue { .. })
        ));
    }

    // =========================================================================
    // Composition
    // =========================================================================

    #[test]
    fn and_chain() {
        let parsed = parse_media_condition("(min-width: 100px) and (max-width: 200px)").unwrap();
        assert_eq!(
            parsed,
            MediaCondition::Condition {
                operator: Some(Operator::And),
                children: vec![feature("min-width", px(100.0)), feature("max-width", px(200.0))],
            }
        );
    }

    #[test]
    fn or_chain() {
        let parsed =
            parse_media_condition("(orientation: portrait) or (max-width: 500px)").unwrap();
        assert!(matches!(
            parsed,
            MediaCondition::Condition {
                operator: Some(Operator::Or),
                ref children,
            } if children.len() == 2
        ));
    }

    #[test]
    fn mixed_and_or_rejected() {
        assert!(parse_media_condition("(a: 1) and (b: 2) or (c: 3)").is_err());
    }

    #[test]
    fn nested_group_keeps_null_operator() {
        let parsed = parse_media_condition("((min-width: 1px) or (max-width: 2px))").unwrap();
        match parsed {
            MediaCondition::Condition {
                operator: None,
                children,
            } => {
                assert_eq!(children.len(), 1);
                assert!(matches!(
                    children[0],
                    MediaCondition::Condition {
                        operator: Some(Operator::Or),
                        ..
                    }
                ));
            }
            other => panic!("expected a group, got {other:?}"),
        }
    }

    #[test]
    fn not_wraps_single_child() {
        let parsed = parse_media_condition("not (orientation: portrait)").unwrap();
        assert_eq!(
            parsed,
            MediaCondition::Condition {
                operator: Some(Operator::Not),
                children: vec![feature("orientation", FeatureValue::Ident("portrait".into()))],
            }
        );
    }

    // =========================================================================
    // Media types
    // =========================================================================

    #[test]
    fn all_media_type() {
        assert_eq!(parse_media_condition("all").unwrap(), MediaCondition::All);
        assert_eq!(parse_media_condition("only all").unwrap(), MediaCondition::All);
    }

    #[test]
    fn not_all() {
        assert_eq!(
            parse_media_condition("not all").unwrap(),
            MediaCondition::Condition {
                operator: Some(Operator::Not),
                children: vec![MediaCondition::All],
            }
        );
    }

    #[test]
    fn all_and_condition() {
        let parsed = parse_media_condition("all and (max-width: 500px)").unwrap();
        assert_eq!(
            parsed,
            MediaCondition::Condition {
                operator: Some(Operator::And),
                children: vec![MediaCondition::All, feature("max-width", px(500.0))],
            }
        );
    }

    #[test]
    fn other_media_types_rejected() {
        assert_eq!(
            parse_media_condition("screen and (max-width: 500px)"),
            Err(ParseError::UnsupportedMediaType("screen".into()))
        );
        assert!(matches!(
            parse_media_condition("print"),
            Err(ParseError::UnsupportedMediaType(_))
        ));
    }

    // =========================================================================
    // Syntax errors
    // =========================================================================

    #[test]
    fn unbalanced_parens_rejected() {
        assert!(parse_media_condition("(min-width: 100px").is_err());
        assert!(parse_media_condition("(min-width: 100px))").is_err());
    }

    #[test]
    fn garbage_rejected() {
        assert!(parse_media_condition("??").is_err());
        assert!(parse_media_condition("and (min-width: 1px)").is_err());
    }

    #[test]
    fn display_round_trips_structure() {
        let input = "(min-width: 100px) and (orientation: landscape)";
        let parsed = parse_media_condition(input).unwrap();
        assert_eq!(parsed.to_string(), input);
        assert_eq!(parse_media_condition(&parsed.to_string()).unwrap(), parsed);
    }
}
