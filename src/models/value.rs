//! Coerced runtime values
//!
//! Raw property text is turned into one of a closed set of value kinds by the
//! coercion layer. Everything downstream (predicates, sort keys, aggregates)
//! works on [`CoercedValue`] and pattern-matches on [`CoercedValue::Absent`]
//! instead of relying on a null object with implicit conversions.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::item::RECORD_DATE_FORMAT;

/// Closed classification of [`CoercedValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueKind {
    Bool,
    Int,
    Decimal,
    DateTime,
    RichText,
    Xml,
    String,
    Absent,
}

impl ValueKind {
    /// Preference order used to break ties when picking a dominant kind
    pub const PRECEDENCE: [ValueKind; 7] = [
        ValueKind::Int,
        ValueKind::Decimal,
        ValueKind::DateTime,
        ValueKind::String,
        ValueKind::Bool,
        ValueKind::RichText,
        ValueKind::Xml,
    ];

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::Decimal)
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, ValueKind::String | ValueKind::RichText)
    }

    /// The value an absent operand stands in for when compared against this kind
    pub fn low_value(&self) -> CoercedValue {
        match self {
            ValueKind::Bool => CoercedValue::Bool(false),
            ValueKind::Int => CoercedValue::Int(0),
            ValueKind::Decimal => CoercedValue::Decimal(0.0),
            ValueKind::DateTime => CoercedValue::DateTime(NaiveDateTime::MIN),
            ValueKind::RichText | ValueKind::Xml | ValueKind::String => {
                CoercedValue::String(String::new())
            }
            ValueKind::Absent => CoercedValue::Absent,
        }
    }

    /// Coarse ordering between unrelated kinds; numeric kinds share a rank
    fn rank(&self) -> u8 {
        match self {
            ValueKind::Absent => 0,
            ValueKind::Bool => 1,
            ValueKind::Int | ValueKind::Decimal => 2,
            ValueKind::DateTime => 3,
            ValueKind::String | ValueKind::RichText => 4,
            ValueKind::Xml => 5,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Decimal => "decimal",
            ValueKind::DateTime => "datetime",
            ValueKind::RichText => "richtext",
            ValueKind::Xml => "xml",
            ValueKind::String => "string",
            ValueKind::Absent => "absent",
        };
        write!(f, "{}", name)
    }
}

/// A property value after coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CoercedValue {
    Bool(bool),
    Int(i64),
    Decimal(f64),
    DateTime(NaiveDateTime),
    /// Markup from a rich text editor, never re-encoded
    RichText(String),
    Xml(XmlValue),
    String(String),
    Absent,
}

impl CoercedValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            CoercedValue::Bool(_) => ValueKind::Bool,
            CoercedValue::Int(_) => ValueKind::Int,
            CoercedValue::Decimal(_) => ValueKind::Decimal,
            CoercedValue::DateTime(_) => ValueKind::DateTime,
            CoercedValue::RichText(_) => ValueKind::RichText,
            CoercedValue::Xml(_) => ValueKind::Xml,
            CoercedValue::String(_) => ValueKind::String,
            CoercedValue::Absent => ValueKind::Absent,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, CoercedValue::Absent)
    }

    /// Boolean reading used in predicate context; absent reads as false
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CoercedValue::Bool(b) => Some(*b),
            CoercedValue::Absent => Some(false),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CoercedValue::Int(i) => Some(*i),
            CoercedValue::Decimal(d) => Some(d.trunc() as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CoercedValue::Int(i) => Some(*i as f64),
            CoercedValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CoercedValue::String(s) | CoercedValue::RichText(s) => Some(s),
            _ => None,
        }
    }

    /// Replace an absent value with the low value of `kind`
    pub fn or_low(self, kind: ValueKind) -> CoercedValue {
        match self {
            CoercedValue::Absent => kind.low_value(),
            other => other,
        }
    }

    /// Convert into `kind` when that is a lossless or truncating numeric move
    pub fn convert_numeric(&self, kind: ValueKind) -> Option<CoercedValue> {
        match (self, kind) {
            (CoercedValue::Int(_), ValueKind::Int) | (CoercedValue::Decimal(_), ValueKind::Decimal) => {
                Some(self.clone())
            }
            (CoercedValue::Int(i), ValueKind::Decimal) => Some(CoercedValue::Decimal(*i as f64)),
            (CoercedValue::Decimal(d), ValueKind::Int) => Some(CoercedValue::Int(d.trunc() as i64)),
            _ => None,
        }
    }

    /// Comparison behind `<`, `>` and friends in expressions
    ///
    /// Absent compares as the low value of the other operand's kind and
    /// numeric kinds compare numerically. Unrelated kinds order by a fixed
    /// kind rank and then by display text. Because of the absent rule this
    /// is not transitive across kinds; sorting uses
    /// [`compare_total`](Self::compare_total).
    pub fn compare_loose(&self, other: &CoercedValue) -> Ordering {
        use CoercedValue::*;
        match (self, other) {
            (Absent, Absent) => Ordering::Equal,
            (Absent, o) => o.kind().low_value().compare_loose(o),
            (s, Absent) => s.compare_loose(&s.kind().low_value()),
            (Bool(a), Bool(b)) => a.cmp(b),
            (Int(a), Int(b)) => a.cmp(b),
            (Int(a), Decimal(b)) => (*a as f64).total_cmp(b),
            (Decimal(a), Int(b)) => a.total_cmp(&(*b as f64)),
            (Decimal(a), Decimal(b)) => a.total_cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (String(a) | RichText(a), String(b) | RichText(b)) => a.cmp(b),
            (a, b) => a
                .kind()
                .rank()
                .cmp(&b.kind().rank())
                .then_with(|| a.to_string().cmp(&b.to_string())),
        }
    }

    /// Total order for sort keys whose kinds are only known at run time
    ///
    /// Absent is its own lowest rank here rather than borrowing the other
    /// side's low value, which would not be transitive across kinds. Within
    /// a rank values compare as in [`compare_loose`](Self::compare_loose).
    pub fn compare_total(&self, other: &CoercedValue) -> Ordering {
        use CoercedValue::*;
        match (self, other) {
            (Absent, Absent) => Ordering::Equal,
            (Absent, _) => Ordering::Less,
            (_, Absent) => Ordering::Greater,
            (a, b) => a.compare_loose(b),
        }
    }

    /// Key identity used when grouping
    ///
    /// Absent only matches absent and numeric kinds match numerically.
    /// Otherwise both sides must be of the same kind.
    pub fn same_key(&self, other: &CoercedValue) -> bool {
        use CoercedValue::*;
        match (self, other) {
            (Absent, Absent) => true,
            (Int(a), Int(b)) => a == b,
            (a, b) if a.kind().is_numeric() && b.kind().is_numeric() => {
                a.compare_loose(b).is_eq()
            }
            (Bool(a), Bool(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (String(a), String(b)) | (RichText(a), RichText(b)) => a == b,
            (Xml(a), Xml(b)) => a.source == b.source,
            _ => false,
        }
    }

    /// Equality used by `==` in expressions
    ///
    /// Absent equals the low value of the other side. Numeric kinds compare
    /// numerically; any other mix of kinds compares display text.
    pub fn loose_eq(&self, other: &CoercedValue) -> bool {
        use CoercedValue::*;
        match (self, other) {
            (Absent, Absent) => true,
            (Absent, o) => o.kind().low_value().loose_eq(o),
            (s, Absent) => s.loose_eq(&s.kind().low_value()),
            (Int(a), Int(b)) => a == b,
            (a, b) if a.kind().is_numeric() && b.kind().is_numeric() => {
                a.as_f64() == b.as_f64()
            }
            (Bool(a), Bool(b)) => a == b,
            (DateTime(a), DateTime(b)) => a == b,
            (a, b) => a.to_string() == b.to_string(),
        }
    }
}

impl fmt::Display for CoercedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoercedValue::Bool(b) => write!(f, "{}", b),
            CoercedValue::Int(i) => write!(f, "{}", i),
            CoercedValue::Decimal(d) => write!(f, "{}", d),
            CoercedValue::DateTime(dt) => write!(f, "{}", dt.format(RECORD_DATE_FORMAT)),
            CoercedValue::RichText(s) | CoercedValue::String(s) => write!(f, "{}", s),
            CoercedValue::Xml(xml) => write!(f, "{}", xml.source),
            CoercedValue::Absent => Ok(()),
        }
    }
}

impl From<bool> for CoercedValue {
    fn from(b: bool) -> Self {
        CoercedValue::Bool(b)
    }
}

impl From<i64> for CoercedValue {
    fn from(i: i64) -> Self {
        CoercedValue::Int(i)
    }
}

impl From<i32> for CoercedValue {
    fn from(i: i32) -> Self {
        CoercedValue::Int(i as i64)
    }
}

impl From<f64> for CoercedValue {
    fn from(d: f64) -> Self {
        CoercedValue::Decimal(d)
    }
}

impl From<&str> for CoercedValue {
    fn from(s: &str) -> Self {
        CoercedValue::String(s.to_string())
    }
}

impl From<String> for CoercedValue {
    fn from(s: String) -> Self {
        CoercedValue::String(s)
    }
}

impl From<NaiveDateTime> for CoercedValue {
    fn from(dt: NaiveDateTime) -> Self {
        CoercedValue::DateTime(dt)
    }
}

/// Structured XML property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlValue {
    pub root: XmlElement,
    /// The trimmed text the value was parsed from
    pub source: String,
}

/// One element of an [`XmlValue`]
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct XmlElement {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
    #[serde(default)]
    pub children: Vec<XmlElement>,
    /// Concatenated direct text and CDATA content
    #[serde(default)]
    pub text: String,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// First child element with the given name, compared case-insensitively
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// All child elements with the given name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children
            .iter()
            .filter(move |c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Text of this element and all descendants, in document order
    pub fn inner_text(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.children {
            out.push_str(&child.inner_text());
        }
        out
    }
}
