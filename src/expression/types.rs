//! Static expression types and runtime values

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::collection::NodeCollection;
use crate::models::{CoercedValue, ValueKind};
use crate::node::TreeNode;

/// Type of a bound sub-expression, known at compile time
///
/// `Dynamic` marks property lookups whose kind is only known per node;
/// `Null` is the type of the `null` literal and of absent parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExprType {
    Bool,
    Int,
    Decimal,
    String,
    DateTime,
    Node,
    Nodes,
    Dynamic,
    Null,
}

impl ExprType {
    pub fn of_value(value: &EvalValue) -> Self {
        match value {
            EvalValue::Node(_) => ExprType::Node,
            EvalValue::Nodes(_) => ExprType::Nodes,
            EvalValue::Scalar(v) => match v.kind() {
                ValueKind::Bool => ExprType::Bool,
                ValueKind::Int => ExprType::Int,
                ValueKind::Decimal => ExprType::Decimal,
                ValueKind::DateTime => ExprType::DateTime,
                ValueKind::String | ValueKind::RichText => ExprType::String,
                ValueKind::Xml => ExprType::Dynamic,
                ValueKind::Absent => ExprType::Null,
            },
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ExprType::Int | ExprType::Decimal)
    }

    /// Only known at runtime
    pub fn is_open(&self) -> bool {
        matches!(self, ExprType::Dynamic | ExprType::Null)
    }

    /// Usable where a boolean is expected
    pub fn is_boolish(&self) -> bool {
        matches!(self, ExprType::Bool | ExprType::Dynamic | ExprType::Null)
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, ExprType::Node | ExprType::Nodes)
    }

    /// Value kind the typed comparer works in; `None` for the object comparer
    pub fn value_kind(&self) -> Option<ValueKind> {
        match self {
            ExprType::Bool => Some(ValueKind::Bool),
            ExprType::Int => Some(ValueKind::Int),
            ExprType::Decimal => Some(ValueKind::Decimal),
            ExprType::String => Some(ValueKind::String),
            ExprType::DateTime => Some(ValueKind::DateTime),
            _ => None,
        }
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExprType::Bool => "bool",
            ExprType::Int => "int",
            ExprType::Decimal => "decimal",
            ExprType::String => "string",
            ExprType::DateTime => "datetime",
            ExprType::Node => "node",
            ExprType::Nodes => "nodes",
            ExprType::Dynamic => "dynamic",
            ExprType::Null => "null",
        };
        write!(f, "{}", name)
    }
}

/// Runtime value of an evaluated expression
#[derive(Debug, Clone)]
pub enum EvalValue {
    Scalar(CoercedValue),
    Node(TreeNode),
    Nodes(NodeCollection),
}

impl EvalValue {
    pub const ABSENT: EvalValue = EvalValue::Scalar(CoercedValue::Absent);

    pub fn is_absent(&self) -> bool {
        matches!(self, EvalValue::Scalar(CoercedValue::Absent))
    }

    pub fn as_scalar(&self) -> Option<&CoercedValue> {
        match self {
            EvalValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Boolean reading in predicate context
    ///
    /// Absent is false. Numbers are true when non-zero, text when it reads
    /// "true" or "1", nodes when they exist, collections when non-empty.
    pub fn truthy(&self) -> bool {
        match self {
            EvalValue::Scalar(v) => match v {
                CoercedValue::Bool(b) => *b,
                CoercedValue::Absent => false,
                CoercedValue::Int(i) => *i != 0,
                CoercedValue::Decimal(d) => *d != 0.0,
                CoercedValue::String(s) | CoercedValue::RichText(s) => {
                    let s = s.trim();
                    s == "1" || s.eq_ignore_ascii_case("true")
                }
                CoercedValue::DateTime(_) | CoercedValue::Xml(_) => true,
            },
            EvalValue::Node(node) => !node.is_null(),
            EvalValue::Nodes(nodes) => !nodes.is_empty(),
        }
    }

    /// Scalar reading used by sort keys, group keys and projections
    ///
    /// A node reads as its id and a collection as its count.
    pub fn into_scalar(self) -> CoercedValue {
        match self {
            EvalValue::Scalar(v) => v,
            EvalValue::Node(node) => CoercedValue::Int(node.id().get() as i64),
            EvalValue::Nodes(nodes) => CoercedValue::Int(nodes.count() as i64),
        }
    }

    /// Display text; absent and collections render empty
    pub fn to_text(&self) -> String {
        match self {
            EvalValue::Scalar(v) => v.to_string(),
            EvalValue::Node(node) => node.name().to_string(),
            EvalValue::Nodes(_) => String::new(),
        }
    }
}

impl PartialEq for EvalValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EvalValue::Scalar(a), EvalValue::Scalar(b)) => a == b,
            (EvalValue::Node(a), EvalValue::Node(b)) => a == b,
            (EvalValue::Nodes(a), EvalValue::Nodes(b)) => a.ids() == b.ids(),
            _ => false,
        }
    }
}

impl From<CoercedValue> for EvalValue {
    fn from(value: CoercedValue) -> Self {
        EvalValue::Scalar(value)
    }
}

impl From<bool> for EvalValue {
    fn from(value: bool) -> Self {
        EvalValue::Scalar(value.into())
    }
}

impl From<i32> for EvalValue {
    fn from(value: i32) -> Self {
        EvalValue::Scalar(value.into())
    }
}

impl From<i64> for EvalValue {
    fn from(value: i64) -> Self {
        EvalValue::Scalar(value.into())
    }
}

impl From<f64> for EvalValue {
    fn from(value: f64) -> Self {
        EvalValue::Scalar(value.into())
    }
}

impl From<&str> for EvalValue {
    fn from(value: &str) -> Self {
        EvalValue::Scalar(value.into())
    }
}

impl From<String> for EvalValue {
    fn from(value: String) -> Self {
        EvalValue::Scalar(value.into())
    }
}

impl From<NaiveDateTime> for EvalValue {
    fn from(value: NaiveDateTime) -> Self {
        EvalValue::Scalar(value.into())
    }
}

impl From<TreeNode> for EvalValue {
    fn from(value: TreeNode) -> Self {
        EvalValue::Node(value)
    }
}

impl From<Option<TreeNode>> for EvalValue {
    fn from(value: Option<TreeNode>) -> Self {
        match value {
            Some(node) => EvalValue::Node(node),
            None => EvalValue::ABSENT,
        }
    }
}

impl From<NodeCollection> for EvalValue {
    fn from(value: NodeCollection) -> Self {
        EvalValue::Nodes(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_types() {
        assert_eq!(ExprType::of_value(&EvalValue::from(3i64)), ExprType::Int);
        assert_eq!(ExprType::of_value(&EvalValue::from("a")), ExprType::String);
        assert_eq!(ExprType::of_value(&EvalValue::ABSENT), ExprType::Null);
    }

    #[test]
    fn test_truthy() {
        assert!(!EvalValue::ABSENT.truthy());
        assert!(EvalValue::from(true).truthy());
        assert!(EvalValue::from("1").truthy());
        assert!(!EvalValue::from("yes").truthy());
        assert!(!EvalValue::from(0i64).truthy());
    }
}
