//! Value coercion
//!
//! Turns raw property text into a [`CoercedValue`] using the declared editor
//! kind of the property as a hint. Coercion is total: malformed input falls
//! back to `String` or `Absent` and never produces an error.

pub mod xml;

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::QueryConfig;
use crate::models::{CoercedValue, PropertyValue, XmlValue};
use crate::storage::EditorKind;

static INTEGER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").unwrap());

/// Converts raw property text into typed values
#[derive(Debug, Clone)]
pub struct ValueCoercer {
    decimal_separator: char,
    date_formats: Vec<String>,
    not_dynamic_xml_elements: Vec<String>,
}

impl Default for ValueCoercer {
    fn default() -> Self {
        Self::from_config(&QueryConfig::default())
    }
}

impl ValueCoercer {
    pub fn from_config(config: &QueryConfig) -> Self {
        Self {
            decimal_separator: config.decimal_separator,
            date_formats: config.date_formats.clone(),
            not_dynamic_xml_elements: config.not_dynamic_xml_elements.clone(),
        }
    }

    /// Coerce a property value; a null raw value is `Absent`
    pub fn coerce_property(&self, value: &PropertyValue, kind: EditorKind) -> CoercedValue {
        match value.raw_value.as_deref() {
            Some(raw) => self.coerce(raw, kind),
            None => CoercedValue::Absent,
        }
    }

    /// Coerce raw text given the editor kind of its property
    pub fn coerce(&self, raw: &str, kind: EditorKind) -> CoercedValue {
        let trimmed = raw.trim();

        if kind == EditorKind::TrueFalse {
            if trimmed.is_empty() {
                return CoercedValue::Bool(false);
            }
            if let Some(b) = parse_bool_flag(trimmed) {
                return CoercedValue::Bool(b);
            }
        }

        if trimmed.contains(self.decimal_separator) {
            if let Some(d) = self.parse_decimal(trimmed) {
                return CoercedValue::Decimal(d);
            }
        }

        if kind.is_date() {
            return match self.parse_date(trimmed) {
                Some(dt) => CoercedValue::DateTime(dt),
                None => {
                    debug!("Date value '{}' did not match any format", trimmed);
                    CoercedValue::Absent
                }
            };
        }

        if kind == EditorKind::RichText {
            return CoercedValue::RichText(raw.to_string());
        }

        if kind == EditorKind::Integer || INTEGER_REGEX.is_match(trimmed) {
            if let Ok(i) = trimmed.parse::<i64>() {
                return CoercedValue::Int(i);
            }
        }

        if trimmed.eq_ignore_ascii_case("true") {
            return CoercedValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CoercedValue::Bool(false);
        }

        if let Some(xml) = self.sniff_xml(trimmed) {
            return CoercedValue::Xml(xml);
        }

        CoercedValue::String(raw.to_string())
    }

    fn parse_decimal(&self, text: &str) -> Option<f64> {
        let normalized = if self.decimal_separator == '.' {
            text.to_string()
        } else {
            text.replace(self.decimal_separator, ".")
        };
        let valid = normalized
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
        if !valid {
            return None;
        }
        normalized.parse::<f64>().ok().filter(|d| d.is_finite())
    }

    /// Parse a date with the configured formats, then as a bare date
    pub fn parse_date(&self, text: &str) -> Option<NaiveDateTime> {
        if text.is_empty() {
            return None;
        }
        for format in &self.date_formats {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                return Some(dt);
            }
        }
        for format in self.date_formats.iter().map(String::as_str).chain(["%Y-%m-%d"]) {
            if let Ok(date) = NaiveDate::parse_from_str(text, format) {
                return date.and_hms_opt(0, 0, 0);
            }
        }
        None
    }

    fn sniff_xml(&self, trimmed: &str) -> Option<XmlValue> {
        if !(trimmed.starts_with('<') && trimmed.ends_with('>')) {
            return None;
        }
        let root = xml::parse_single_root(trimmed)?;
        let disallowed = self
            .not_dynamic_xml_elements
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(&root.name));
        if disallowed {
            return None;
        }
        Some(XmlValue {
            root,
            source: trimmed.to_string(),
        })
    }
}

fn parse_bool_flag(text: &str) -> Option<bool> {
    match text {
        "1" => Some(true),
        "0" => Some(false),
        t if t.eq_ignore_ascii_case("true") => Some(true),
        t if t.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeId;

    fn coercer() -> ValueCoercer {
        ValueCoercer::default()
    }

    #[test]
    fn test_true_false_editor() {
        let c = coercer();
        assert_eq!(c.coerce("", EditorKind::TrueFalse), CoercedValue::Bool(false));
        assert_eq!(c.coerce("1", EditorKind::TrueFalse), CoercedValue::Bool(true));
        assert_eq!(c.coerce("0", EditorKind::TrueFalse), CoercedValue::Bool(false));
        assert_eq!(
            c.coerce("maybe", EditorKind::TrueFalse),
            CoercedValue::String("maybe".into())
        );
    }

    #[test]
    fn test_decimal_uses_configured_separator() {
        assert_eq!(coercer().coerce("5.5", EditorKind::Unknown), CoercedValue::Decimal(5.5));
        let comma = ValueCoercer::from_config(&QueryConfig::builder().decimal_separator(',').build());
        assert_eq!(comma.coerce("5,5", EditorKind::Unknown), CoercedValue::Decimal(5.5));
        assert_eq!(
            comma.coerce("a,b", EditorKind::Unknown),
            CoercedValue::String("a,b".into())
        );
    }

    #[test]
    fn test_date_editor() {
        let c = coercer();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        assert_eq!(
            c.coerce("2024-03-01T09:30:00", EditorKind::DateTime),
            CoercedValue::DateTime(expected)
        );
        assert_eq!(
            c.coerce("2024-03-01", EditorKind::Date),
            CoercedValue::DateTime(expected.date().and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(c.coerce("not a date", EditorKind::Date), CoercedValue::Absent);
        assert_eq!(c.coerce("", EditorKind::DateTime), CoercedValue::Absent);
    }

    #[test]
    fn test_rich_text_is_untouched() {
        let raw = "<p>Hello &amp; welcome</p>";
        assert_eq!(
            coercer().coerce(raw, EditorKind::RichText),
            CoercedValue::RichText(raw.to_string())
        );
    }

    #[test]
    fn test_generic_rules() {
        let c = coercer();
        assert_eq!(c.coerce("42", EditorKind::Unknown), CoercedValue::Int(42));
        assert_eq!(c.coerce("-7", EditorKind::Unknown), CoercedValue::Int(-7));
        assert_eq!(c.coerce("TRUE", EditorKind::Unknown), CoercedValue::Bool(true));
        assert_eq!(c.coerce("x", EditorKind::Unknown), CoercedValue::String("x".into()));
        assert_eq!(c.coerce("", EditorKind::Unknown), CoercedValue::String(String::new()));
        assert_eq!(
            c.coerce("99999999999999999999", EditorKind::Unknown),
            CoercedValue::String("99999999999999999999".into())
        );
    }

    #[test]
    fn test_xml_sniff_respects_disallow_list() {
        let c = coercer();
        match c.coerce("<links><link id=\"1\"/></links>", EditorKind::Unknown) {
            CoercedValue::Xml(xml) => assert_eq!(xml.root.children.len(), 1),
            other => panic!("expected xml, got {:?}", other),
        }
        assert_eq!(
            c.coerce("<p>para</p>", EditorKind::Unknown),
            CoercedValue::String("<p>para</p>".into())
        );
        assert_eq!(
            c.coerce("<broken>", EditorKind::Unknown),
            CoercedValue::String("<broken>".into())
        );
    }

    #[test]
    fn test_null_property_is_absent() {
        let value = PropertyValue::new("title", None, "page", NodeId(1));
        assert_eq!(coercer().coerce_property(&value, EditorKind::Unknown), CoercedValue::Absent);
    }
}
