//! Interpreter over the bound expression tree
//!
//! Absent values flow through evaluation instead of raising: comparisons
//! reduce them to the low value of the other operand's kind, boolean
//! context reads them as false and arithmetic on non-numeric values yields
//! absent. Errors are reserved for internally inconsistent queries
//! (division by zero, positional tests on orphaned nodes).

use std::cmp::Ordering;

use super::ast::{BinaryOp, UnaryOp};
use super::compiler::{Bound, Op};
use super::members::{CollectionMethod, NodeMember, NodeMethod, StringMethod};
use super::types::{EvalValue, ExprType};
use crate::coercion::xml::to_xml_string;
use crate::collection::NodeCollection;
use crate::error::{QueryError, QueryResult};
use crate::models::{CoercedValue, ValueKind, XmlElement, XmlValue};
use crate::node::{PositionTest, TreeNode};

/// A compiled expression, evaluable against any node of its session
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: String,
    root: Bound,
}

impl CompiledExpression {
    pub(crate) fn new(source: &str, root: Bound) -> Self {
        Self {
            source: source.to_string(),
            root,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Static type of the expression
    pub fn result_type(&self) -> ExprType {
        self.root.ty
    }

    pub(crate) fn root(&self) -> &Bound {
        &self.root
    }

    pub fn evaluate(&self, node: &TreeNode) -> QueryResult<EvalValue> {
        evaluate(&self.root, node)
    }

    /// Evaluate and read the result as a scalar (nodes read as their id)
    pub fn evaluate_scalar(&self, node: &TreeNode) -> QueryResult<CoercedValue> {
        Ok(self.evaluate(node)?.into_scalar())
    }
}

/// A compiled boolean expression
#[derive(Debug, Clone)]
pub struct Predicate {
    expr: CompiledExpression,
}

impl Predicate {
    pub(crate) fn new(expr: CompiledExpression) -> Self {
        Self { expr }
    }

    pub fn source(&self) -> &str {
        self.expr.source()
    }

    /// Test one node; an absent result is false
    ///
    /// Any scalar result is read through [`EvalValue::truthy`], so property
    /// data of an unexpected kind never fails the query.
    pub fn test(&self, node: &TreeNode) -> QueryResult<bool> {
        let value = self.expr.evaluate(node)?;
        match &value {
            EvalValue::Scalar(_) => Ok(value.truthy()),
            other => Err(QueryError::Evaluation(format!(
                "predicate '{}' produced a non-boolean {} value",
                self.source(),
                ExprType::of_value(other)
            ))),
        }
    }
}

/// One key of an ordering list
#[derive(Debug, Clone)]
pub struct CompiledOrdering {
    pub expr: CompiledExpression,
    pub descending: bool,
}

impl CompiledOrdering {
    /// Kind the typed comparer works in; `None` selects the object comparer
    pub fn key_kind(&self) -> Option<ValueKind> {
        self.expr.result_type().value_kind()
    }

    /// Evaluate the sort key of one node
    pub fn key(&self, node: &TreeNode) -> QueryResult<CoercedValue> {
        self.expr.evaluate_scalar(node)
    }

    /// Compare two evaluated keys, honouring the direction
    pub fn compare(&self, a: &CoercedValue, b: &CoercedValue) -> Ordering {
        let ordering = match self.key_kind() {
            Some(kind) => {
                let a = typed_key(a, kind);
                let b = typed_key(b, kind);
                a.compare_total(&b)
            }
            None => a.compare_total(b),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Reduce a key to the comparer's kind; absent becomes the low value
fn typed_key(value: &CoercedValue, kind: ValueKind) -> CoercedValue {
    match value {
        CoercedValue::Absent => kind.low_value(),
        v if kind.is_numeric() => v.convert_numeric(kind).unwrap_or_else(|| v.clone()),
        v => v.clone(),
    }
}

pub(crate) fn evaluate(bound: &Bound, it: &TreeNode) -> QueryResult<EvalValue> {
    match &bound.op {
        Op::Const(value) => Ok(value.clone()),
        Op::It => Ok(EvalValue::Node(it.clone())),
        Op::NodeMember { target, member } => match evaluate(target, it)? {
            EvalValue::Node(node) => node_member(&node, *member),
            _ => Ok(EvalValue::ABSENT),
        },
        Op::Property { target, alias } => match evaluate(target, it)? {
            EvalValue::Node(node) => Ok(node.property_member(alias)),
            _ => Ok(EvalValue::ABSENT),
        },
        Op::DynamicMember { target, name } => dynamic_member(evaluate(target, it)?, name),
        Op::NodeMethod {
            target,
            method,
            args,
        } => match evaluate(target, it)? {
            EvalValue::Node(node) => {
                let args = evaluate_all(args, it)?;
                call_node_method(&node, *method, &args)
            }
            _ => Ok(EvalValue::ABSENT),
        },
        Op::CollectionMethod { target, method } => match evaluate(target, it)? {
            EvalValue::Nodes(nodes) => Ok(call_collection_method(&nodes, *method)),
            _ => Ok(EvalValue::ABSENT),
        },
        Op::StringMethod {
            target,
            method,
            args,
        } => {
            let text = evaluate(target, it)?.to_text();
            let args = evaluate_all(args, it)?;
            call_string_method(&text, *method, &args)
        }
        Op::DynamicCall {
            target,
            node,
            collection,
            string,
            args,
        } => {
            let receiver = evaluate(target, it)?;
            let args = evaluate_all(args, it)?;
            match (&receiver, node, collection, string) {
                (EvalValue::Node(n), Some(method), _, _) => call_node_method(n, *method, &args),
                (EvalValue::Nodes(c), _, Some(method), _) => Ok(call_collection_method(c, *method)),
                (EvalValue::Scalar(CoercedValue::Absent), _, _, _) => Ok(EvalValue::ABSENT),
                (EvalValue::Scalar(v), _, _, Some(method)) => {
                    call_string_method(&v.to_string(), *method, &args)
                }
                (other, _, _, _) => Err(QueryError::Evaluation(format!(
                    "method not applicable to a {} value",
                    ExprType::of_value(other)
                ))),
            }
        }
        Op::Function { function, args } => {
            let args = evaluate_all(args, it)?;
            function.call(&args)
        }
        Op::IsAbsent { operand, negate } => {
            let absent = match evaluate(operand, it)? {
                EvalValue::Scalar(CoercedValue::Absent) => true,
                EvalValue::Node(node) => node.is_null(),
                _ => false,
            };
            Ok(EvalValue::from(absent != *negate))
        }
        Op::Unary { op, operand } => {
            let value = evaluate(operand, it)?;
            match op {
                UnaryOp::Not => Ok(EvalValue::from(!value.truthy())),
                UnaryOp::Neg => negate(value.into_scalar()).map(EvalValue::Scalar),
            }
        }
        Op::Binary { op, left, right } => evaluate_binary(*op, left, right, it),
        Op::Conditional {
            test,
            if_true,
            if_false,
        } => {
            if evaluate(test, it)?.truthy() {
                evaluate(if_true, it)
            } else {
                evaluate(if_false, it)
            }
        }
    }
}

fn evaluate_all(args: &[Bound], it: &TreeNode) -> QueryResult<Vec<EvalValue>> {
    args.iter().map(|a| evaluate(a, it)).collect()
}

fn node_member(node: &TreeNode, member: NodeMember) -> QueryResult<EvalValue> {
    if node.is_null() {
        return Ok(EvalValue::ABSENT);
    }
    Ok(node.member_value(member))
}

fn dynamic_member(receiver: EvalValue, name: &str) -> QueryResult<EvalValue> {
    match receiver {
        EvalValue::Node(node) => {
            if let Some(member) = NodeMember::from_name(name) {
                return node_member(&node, member);
            }
            Ok(node.property_member(name))
        }
        EvalValue::Nodes(nodes) if name.eq_ignore_ascii_case("count") => {
            Ok(EvalValue::from(nodes.count() as i64))
        }
        EvalValue::Scalar(CoercedValue::Xml(xml)) => Ok(xml_member(&xml.root, name)),
        EvalValue::Scalar(CoercedValue::String(s) | CoercedValue::RichText(s))
            if name.eq_ignore_ascii_case("length") =>
        {
            Ok(EvalValue::from(s.chars().count() as i64))
        }
        _ => Ok(EvalValue::ABSENT),
    }
}

/// Child element, then attribute, then `Count` of child elements
fn xml_member(element: &XmlElement, name: &str) -> EvalValue {
    if let Some(child) = element.child(name) {
        if child.children.is_empty() {
            return EvalValue::from(child.text.clone());
        }
        return match to_xml_string(child) {
            Some(source) => EvalValue::Scalar(CoercedValue::Xml(XmlValue {
                root: child.clone(),
                source,
            })),
            None => EvalValue::from(child.inner_text()),
        };
    }
    if let Some(value) = element.attribute(name) {
        return EvalValue::from(value);
    }
    if name.eq_ignore_ascii_case("count") {
        return EvalValue::from(element.children.len() as i64);
    }
    EvalValue::ABSENT
}

fn text_arg(args: &[EvalValue], index: usize) -> String {
    args.get(index).map(|a| a.to_text()).unwrap_or_default()
}

fn int_arg(args: &[EvalValue], index: usize, method: &str) -> QueryResult<i64> {
    let parsed = args
        .get(index)
        .and_then(|a| a.as_scalar())
        .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())));
    parsed.ok_or_else(|| QueryError::Evaluation(format!("{} expects an integer argument", method)))
}

fn count_arg(args: &[EvalValue], index: usize, method: &str) -> QueryResult<usize> {
    to_count(int_arg(args, index, method)?, method)
}

fn bool_arg(args: &[EvalValue], index: usize) -> bool {
    args.get(index).is_some_and(|a| a.truthy())
}

fn node_arg(args: &[EvalValue], index: usize) -> Option<&TreeNode> {
    match args.get(index) {
        Some(EvalValue::Node(node)) if !node.is_null() => Some(node),
        _ => None,
    }
}

/// How a traversal method's optional argument is to be read
enum TraversalArg {
    Default,
    Count(i64),
    Alias(String),
}

fn traversal_arg(args: &[EvalValue]) -> TraversalArg {
    match args.first() {
        None | Some(EvalValue::Scalar(CoercedValue::Absent)) => TraversalArg::Default,
        Some(EvalValue::Scalar(v)) => match v.as_i64() {
            Some(n) => TraversalArg::Count(n),
            None => TraversalArg::Alias(v.to_string()),
        },
        Some(other) => TraversalArg::Alias(other.to_text()),
    }
}

fn to_count(n: i64, method: &str) -> QueryResult<usize> {
    usize::try_from(n).map_err(|_| {
        QueryError::Evaluation(format!("{} expects a non-negative count, found {}", method, n))
    })
}

fn level_arg(n: i64) -> i32 {
    i32::try_from(n).unwrap_or(if n < 0 { i32::MIN } else { i32::MAX })
}

pub(crate) fn call_node_method(
    node: &TreeNode,
    method: NodeMethod,
    args: &[EvalValue],
) -> QueryResult<EvalValue> {
    use NodeMethod as M;

    let value = match method {
        M::Index => return Ok(EvalValue::from(node.index()? as i64)),
        M::HasProperty => return Ok(EvalValue::from(node.has_property(&text_arg(args, 0)))),
        M::GetPropertyValue => {
            let alias = text_arg(args, 0);
            let value = match args.get(1) {
                Some(EvalValue::Scalar(CoercedValue::Bool(recursive))) => {
                    node.get_property_value(&alias, *recursive, None)
                }
                Some(fallback) => node.get_property_value(&alias, false, Some(&fallback.to_text())),
                None => node.get_property_value(&alias, false, None),
            };
            return Ok(value.map(EvalValue::from).unwrap_or(EvalValue::ABSENT));
        }
        M::Up => {
            return Ok(match traversal_arg(args) {
                TraversalArg::Default => node.up(0),
                TraversalArg::Count(n) => node.up(to_count(n, "Up")?),
                TraversalArg::Alias(alias) => node.up_to(&alias),
            }
            .into());
        }
        M::Down => {
            return Ok(match traversal_arg(args) {
                TraversalArg::Default => node.down(0),
                TraversalArg::Count(n) => node.down(to_count(n, "Down")?),
                TraversalArg::Alias(alias) => node.down_to(&alias),
            }
            .into());
        }
        M::Next => {
            return Ok(match traversal_arg(args) {
                TraversalArg::Default => node.next(0)?,
                TraversalArg::Count(n) => node.next(to_count(n, "Next")?)?,
                TraversalArg::Alias(alias) => node.next_of(&alias)?,
            }
            .into());
        }
        M::Previous => {
            return Ok(match traversal_arg(args) {
                TraversalArg::Default => node.previous(0)?,
                TraversalArg::Count(n) => node.previous(to_count(n, "Previous")?)?,
                TraversalArg::Alias(alias) => node.previous_of(&alias)?,
            }
            .into());
        }
        M::Sibling => {
            return Ok(match traversal_arg(args) {
                TraversalArg::Default => node.sibling(0)?,
                TraversalArg::Count(n) => node.sibling(n)?,
                TraversalArg::Alias(alias) => node.sibling_of(&alias)?,
            }
            .into());
        }
        M::AncestorOrSelf => {
            return Ok(match traversal_arg(args) {
                TraversalArg::Default => node.ancestor_or_self(),
                TraversalArg::Count(n) => node.ancestor_or_self_at_level(level_arg(n)),
                TraversalArg::Alias(alias) => node.ancestor_or_self_of_type(&alias),
            }
            .into());
        }
        M::AncestorsOrSelf => {
            return Ok(match traversal_arg(args) {
                TraversalArg::Default => node.ancestors_or_self(),
                TraversalArg::Count(n) => node.ancestors_or_self_at_level(level_arg(n)),
                TraversalArg::Alias(alias) => node.ancestors_or_self_of_type(&alias),
            }
            .into());
        }
        M::Ancestors => {
            return Ok(match traversal_arg(args) {
                TraversalArg::Default => node.ancestors(),
                TraversalArg::Count(n) => node.ancestors_at_level(level_arg(n)),
                TraversalArg::Alias(alias) => node.ancestors_of_type(&alias),
            }
            .into());
        }
        M::Descendants => {
            return Ok(match traversal_arg(args) {
                TraversalArg::Default => node.descendants(),
                TraversalArg::Count(n) => node.descendants_at_level(level_arg(n)),
                TraversalArg::Alias(alias) => node.descendants_of_type(&alias),
            }
            .into());
        }
        M::DescendantsOrSelf => {
            return Ok(match traversal_arg(args) {
                TraversalArg::Default => node.descendants_or_self(),
                TraversalArg::Count(n) => node.descendants_or_self_at_level(level_arg(n)),
                TraversalArg::Alias(alias) => node.descendants_or_self_of_type(&alias),
            }
            .into());
        }
        M::IsFirst => node.is(PositionTest::First)?,
        M::IsNotFirst => node.is(PositionTest::NotFirst)?,
        M::IsLast => node.is(PositionTest::Last)?,
        M::IsNotLast => node.is(PositionTest::NotLast)?,
        M::IsEven => node.is(PositionTest::Even)?,
        M::IsNotEven => node.is(PositionTest::NotEven)?,
        M::IsOdd => node.is(PositionTest::Odd)?,
        M::IsNotOdd => node.is(PositionTest::NotOdd)?,
        M::IsPosition => node.is(PositionTest::Position(count_arg(args, 0, "IsPosition")?))?,
        M::IsNotPosition => {
            node.is(PositionTest::NotPosition(count_arg(args, 0, "IsNotPosition")?))?
        }
        M::IsModZero => node.is(PositionTest::ModZero(count_arg(args, 0, "IsModZero")?))?,
        M::IsNotModZero => {
            node.is(PositionTest::NotModZero(count_arg(args, 0, "IsNotModZero")?))?
        }
        M::HasValue => {
            let recursive = matches!(args.get(1), Some(EvalValue::Scalar(CoercedValue::Bool(_))))
                && bool_arg(args, 1);
            node.has_value(&text_arg(args, 0), recursive)
        }
        M::IsEqual => node_arg(args, 0).is_some_and(|other| node.is_equal(other)),
        M::IsNotEqual => !node_arg(args, 0).is_some_and(|other| node.is_equal(other)),
        M::IsDescendant => node_arg(args, 0).is_some_and(|other| node.is_descendant(other)),
        M::IsDescendantOrSelf => {
            node_arg(args, 0).is_some_and(|other| node.is_descendant_or_self(other))
        }
        M::IsAncestor => node_arg(args, 0).is_some_and(|other| node.is_ancestor(other)),
        M::IsAncestorOrSelf => {
            node_arg(args, 0).is_some_and(|other| node.is_ancestor_or_self(other))
        }
    };

    let leading = method.leading_args(args.len(), |i| {
        matches!(args[i], EvalValue::Scalar(CoercedValue::Bool(_)))
    });
    if args.len() > leading {
        let chosen = if value {
            text_arg(args, leading)
        } else {
            text_arg(args, leading + 1)
        };
        return Ok(EvalValue::from(chosen));
    }
    Ok(EvalValue::from(value))
}

fn call_collection_method(nodes: &NodeCollection, method: CollectionMethod) -> EvalValue {
    match method {
        CollectionMethod::Count => EvalValue::from(nodes.count() as i64),
        CollectionMethod::Any => EvalValue::from(!nodes.is_empty()),
        CollectionMethod::First => nodes.get(0).into(),
        CollectionMethod::Last => nodes.count().checked_sub(1).and_then(|i| nodes.get(i)).into(),
    }
}

fn call_string_method(text: &str, method: StringMethod, args: &[EvalValue]) -> QueryResult<EvalValue> {
    let value = match method {
        StringMethod::Contains => EvalValue::from(text.contains(text_arg(args, 0).as_str())),
        StringMethod::StartsWith => EvalValue::from(text.starts_with(text_arg(args, 0).as_str())),
        StringMethod::EndsWith => EvalValue::from(text.ends_with(text_arg(args, 0).as_str())),
        StringMethod::ToLower => EvalValue::from(text.to_lowercase()),
        StringMethod::ToUpper => EvalValue::from(text.to_uppercase()),
        StringMethod::Trim => EvalValue::from(text.trim()),
        StringMethod::Length => EvalValue::from(text.chars().count() as i64),
        StringMethod::IsEmpty => EvalValue::from(text.is_empty()),
        StringMethod::Substring => {
            let start = count_arg(args, 0, "Substring")?;
            let rest = text.chars().skip(start);
            let taken: String = if args.len() > 1 {
                rest.take(count_arg(args, 1, "Substring")?).collect()
            } else {
                rest.collect()
            };
            EvalValue::from(taken)
        }
        StringMethod::Replace => {
            let from = text_arg(args, 0);
            if from.is_empty() {
                EvalValue::from(text)
            } else {
                EvalValue::from(text.replace(&from, &text_arg(args, 1)))
            }
        }
    };
    Ok(value)
}

fn negate(value: CoercedValue) -> QueryResult<CoercedValue> {
    match value {
        CoercedValue::Int(i) => i
            .checked_neg()
            .map(CoercedValue::Int)
            .ok_or_else(|| QueryError::Evaluation("integer overflow".to_string())),
        CoercedValue::Decimal(d) => Ok(CoercedValue::Decimal(-d)),
        _ => Ok(CoercedValue::Absent),
    }
}

fn evaluate_binary(op: BinaryOp, left: &Bound, right: &Bound, it: &TreeNode) -> QueryResult<EvalValue> {
    match op {
        BinaryOp::Or => {
            if evaluate(left, it)?.truthy() {
                return Ok(EvalValue::from(true));
            }
            return Ok(EvalValue::from(evaluate(right, it)?.truthy()));
        }
        BinaryOp::And => {
            if !evaluate(left, it)?.truthy() {
                return Ok(EvalValue::from(false));
            }
            return Ok(EvalValue::from(evaluate(right, it)?.truthy()));
        }
        _ => {}
    }

    let l = evaluate(left, it)?;
    let r = evaluate(right, it)?;
    match op {
        BinaryOp::Eq => Ok(EvalValue::from(values_equal(&l, &r, it))),
        BinaryOp::NotEq => Ok(EvalValue::from(!values_equal(&l, &r, it))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare_scalars(&l.into_scalar(), &r.into_scalar(), it);
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(EvalValue::from(result))
        }
        BinaryOp::Concat => Ok(EvalValue::from(l.to_text() + &r.to_text())),
        BinaryOp::Add => {
            let (l, r) = (l.into_scalar(), r.into_scalar());
            let textual = l.kind().is_textual() || r.kind().is_textual();
            if textual && !(numeric_or_absent(&l) && numeric_or_absent(&r)) {
                return Ok(EvalValue::from(l.to_string() + &r.to_string()));
            }
            arithmetic(op, &l, &r).map(EvalValue::Scalar)
        }
        _ => arithmetic(op, &l.into_scalar(), &r.into_scalar()).map(EvalValue::Scalar),
    }
}

fn numeric_or_absent(value: &CoercedValue) -> bool {
    value.is_absent() || value.kind().is_numeric()
}

/// Parse text as a number when the other side is numeric
fn numeric_text(value: &CoercedValue) -> Option<f64> {
    match value {
        CoercedValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read text as the other operand's kind where that is meaningful
fn align(value: &CoercedValue, other: &CoercedValue, it: &TreeNode) -> Option<CoercedValue> {
    match (value, other) {
        (CoercedValue::String(_), o) if o.kind().is_numeric() => {
            numeric_text(value).map(CoercedValue::Decimal)
        }
        (CoercedValue::String(s), CoercedValue::DateTime(_)) => {
            it.session().coercer().parse_date(s).map(CoercedValue::DateTime)
        }
        (CoercedValue::String(s), CoercedValue::Bool(_)) => match s.trim() {
            t if t.eq_ignore_ascii_case("true") || t == "1" => Some(CoercedValue::Bool(true)),
            t if t.eq_ignore_ascii_case("false") || t == "0" => Some(CoercedValue::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn aligned<'a>(
    l: &'a CoercedValue,
    r: &'a CoercedValue,
    it: &TreeNode,
) -> (std::borrow::Cow<'a, CoercedValue>, std::borrow::Cow<'a, CoercedValue>) {
    use std::borrow::Cow;
    if let Some(l2) = align(l, r, it) {
        return (Cow::Owned(l2), Cow::Borrowed(r));
    }
    if let Some(r2) = align(r, l, it) {
        return (Cow::Borrowed(l), Cow::Owned(r2));
    }
    (Cow::Borrowed(l), Cow::Borrowed(r))
}

pub(crate) fn values_equal(l: &EvalValue, r: &EvalValue, it: &TreeNode) -> bool {
    match (l, r) {
        (EvalValue::Node(a), EvalValue::Node(b)) => a == b,
        (EvalValue::Nodes(a), EvalValue::Nodes(b)) => a.ids() == b.ids(),
        (EvalValue::Scalar(a), EvalValue::Scalar(b)) => {
            let (a, b) = aligned(a, b, it);
            a.loose_eq(&b)
        }
        _ => false,
    }
}

pub(crate) fn compare_scalars(l: &CoercedValue, r: &CoercedValue, it: &TreeNode) -> Ordering {
    let (a, b) = aligned(l, r, it);
    a.compare_loose(&b)
}

fn arithmetic(op: BinaryOp, l: &CoercedValue, r: &CoercedValue) -> QueryResult<CoercedValue> {
    let (l, r) = match (l, r) {
        (CoercedValue::Absent, CoercedValue::Absent) => return Ok(CoercedValue::Absent),
        (CoercedValue::Absent, o) if o.kind().is_numeric() => (o.kind().low_value(), o.clone()),
        (s, CoercedValue::Absent) if s.kind().is_numeric() => (s.clone(), s.kind().low_value()),
        (a, b) if a.kind().is_numeric() && b.kind().is_numeric() => (a.clone(), b.clone()),
        _ => return Ok(CoercedValue::Absent),
    };

    let overflow = || QueryError::Evaluation(format!("integer overflow in {}", op));
    let by_zero = || QueryError::Evaluation("division by zero".to_string());

    if let (CoercedValue::Int(a), CoercedValue::Int(b)) = (&l, &r) {
        let (a, b) = (*a, *b);
        let result = match op {
            BinaryOp::Add => a.checked_add(b).ok_or_else(overflow)?,
            BinaryOp::Sub => a.checked_sub(b).ok_or_else(overflow)?,
            BinaryOp::Mul => a.checked_mul(b).ok_or_else(overflow)?,
            BinaryOp::Div if b == 0 => return Err(by_zero()),
            BinaryOp::Div => a.checked_div(b).ok_or_else(overflow)?,
            BinaryOp::Mod if b == 0 => return Err(by_zero()),
            BinaryOp::Mod => a.checked_rem(b).ok_or_else(overflow)?,
            _ => return Ok(CoercedValue::Absent),
        };
        return Ok(CoercedValue::Int(result));
    }

    let (a, b) = match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Ok(CoercedValue::Absent),
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Mod if b == 0.0 => return Err(by_zero()),
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => return Ok(CoercedValue::Absent),
    };
    Ok(CoercedValue::Decimal(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_arithmetic() {
        let r = arithmetic(BinaryOp::Add, &CoercedValue::Int(2), &CoercedValue::Int(3)).unwrap();
        assert_eq!(r, CoercedValue::Int(5));
        let r = arithmetic(BinaryOp::Div, &CoercedValue::Int(7), &CoercedValue::Int(2)).unwrap();
        assert_eq!(r, CoercedValue::Int(3));
        let r = arithmetic(BinaryOp::Mul, &CoercedValue::Int(2), &CoercedValue::Decimal(1.5)).unwrap();
        assert_eq!(r, CoercedValue::Decimal(3.0));
    }

    #[test]
    fn test_absent_and_text_operands() {
        let r = arithmetic(BinaryOp::Add, &CoercedValue::Absent, &CoercedValue::Int(4)).unwrap();
        assert_eq!(r, CoercedValue::Int(4));
        let r = arithmetic(BinaryOp::Sub, &CoercedValue::from("x"), &CoercedValue::Int(4)).unwrap();
        assert_eq!(r, CoercedValue::Absent);
    }

    #[test]
    fn test_division_by_zero_is_error() {
        assert!(matches!(
            arithmetic(BinaryOp::Div, &CoercedValue::Int(1), &CoercedValue::Int(0)),
            Err(QueryError::Evaluation(_))
        ));
        assert!(matches!(
            arithmetic(BinaryOp::Mod, &CoercedValue::Decimal(1.0), &CoercedValue::Int(0)),
            Err(QueryError::Evaluation(_))
        ));
    }

    #[test]
    fn test_overflow_is_error() {
        assert!(arithmetic(BinaryOp::Add, &CoercedValue::Int(i64::MAX), &CoercedValue::Int(1)).is_err());
        assert!(negate(CoercedValue::Int(i64::MIN)).is_err());
    }

    #[test]
    fn test_string_methods() {
        let r = call_string_method("Hello world", StringMethod::Substring, &[EvalValue::from(6i64)]).unwrap();
        assert_eq!(r, EvalValue::from("world"));
        let r = call_string_method(
            "Hello",
            StringMethod::Substring,
            &[EvalValue::from(1i64), EvalValue::from(100i64)],
        )
        .unwrap();
        assert_eq!(r, EvalValue::from("ello"));
        let r = call_string_method("a-b", StringMethod::Replace, &[EvalValue::from("-"), EvalValue::from("+")]).unwrap();
        assert_eq!(r, EvalValue::from("a+b"));
        let r = call_string_method("Hi", StringMethod::Length, &[]).unwrap();
        assert_eq!(r, EvalValue::from(2i64));
    }

    #[test]
    fn test_xml_member_lookup() {
        let mut root = XmlElement::new("link");
        root.attributes.push(("target".into(), "_blank".into()));
        let mut url = XmlElement::new("url");
        url.text = "/about".into();
        root.children.push(url);

        assert_eq!(xml_member(&root, "url"), EvalValue::from("/about"));
        assert_eq!(xml_member(&root, "Target"), EvalValue::from("_blank"));
        assert_eq!(xml_member(&root, "count"), EvalValue::from(1i64));
        assert!(xml_member(&root, "missing").is_absent());
    }

    #[test]
    fn test_typed_key_reduces_absent() {
        assert_eq!(typed_key(&CoercedValue::Absent, ValueKind::String), CoercedValue::from(""));
        assert_eq!(typed_key(&CoercedValue::Decimal(2.7), ValueKind::Int), CoercedValue::Int(2));
    }
}
