//! Binder: syntax tree → typed evaluation tree
//!
//! Binding resolves every identifier, member and call once, up front, so
//! that malformed query text fails at compile time and evaluation only
//! dispatches on values.

use std::collections::BTreeSet;
use tracing::debug;

use super::ast::{BinaryOp, Expr, Literal, UnaryOp};
use super::functions::{FunctionRegistry, RegisteredFunction};
use super::members::{CollectionMethod, NodeMember, NodeMethod, StringMethod};
use super::parser::{parse_expression, parse_orderings};
use super::types::{EvalValue, ExprType};
use super::{CompiledExpression, CompiledOrdering, Predicate};
use crate::backing::lower_first;
use crate::error::{QueryError, QueryResult};
use crate::models::CoercedValue;
use crate::resolver::split_recursive;

/// Operation of a bound expression
#[derive(Debug, Clone)]
pub(crate) enum Op {
    Const(EvalValue),
    It,
    NodeMember {
        target: Box<Bound>,
        member: NodeMember,
    },
    Property {
        target: Box<Bound>,
        alias: String,
    },
    /// Member of a value whose type is only known at runtime (xml child, node property)
    DynamicMember {
        target: Box<Bound>,
        name: String,
    },
    NodeMethod {
        target: Box<Bound>,
        method: NodeMethod,
        args: Vec<Bound>,
    },
    CollectionMethod {
        target: Box<Bound>,
        method: CollectionMethod,
    },
    StringMethod {
        target: Box<Bound>,
        method: StringMethod,
        args: Vec<Bound>,
    },
    /// Call on a dynamic receiver; the candidate matching the runtime value runs
    DynamicCall {
        target: Box<Bound>,
        node: Option<NodeMethod>,
        collection: Option<CollectionMethod>,
        string: Option<StringMethod>,
        args: Vec<Bound>,
    },
    Function {
        function: RegisteredFunction,
        args: Vec<Bound>,
    },
    /// `x == null` / `x != null`
    IsAbsent {
        operand: Box<Bound>,
        negate: bool,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Bound>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Bound>,
        right: Box<Bound>,
    },
    Conditional {
        test: Box<Bound>,
        if_true: Box<Bound>,
        if_false: Box<Bound>,
    },
}

/// A bound sub-expression with its static type
#[derive(Debug, Clone)]
pub(crate) struct Bound {
    pub op: Op,
    pub ty: ExprType,
}

impl Bound {
    fn new(op: Op, ty: ExprType) -> Self {
        Self { op, ty }
    }

    fn it() -> Self {
        Self::new(Op::It, ExprType::Node)
    }
}

fn arity_error(name: &str, (min, max): (usize, usize), found: usize) -> QueryError {
    QueryError::ArgumentCount {
        name: name.to_string(),
        expected: if found > max { max } else { min },
        found,
    }
}

fn check_arity(name: &str, arity: (usize, usize), found: usize) -> QueryResult<()> {
    if found < arity.0 || found > arity.1 {
        return Err(arity_error(name, arity, found));
    }
    Ok(())
}

/// Two static types can meet in a comparison
fn comparable(a: ExprType, b: ExprType) -> bool {
    a == b || (a.is_numeric() && b.is_numeric()) || a.is_open() || b.is_open()
}

fn numeric_result(a: ExprType, b: ExprType) -> Option<ExprType> {
    match (a, b) {
        (ExprType::Int, ExprType::Int) => Some(ExprType::Int),
        (x, y) if x.is_numeric() && y.is_numeric() => Some(ExprType::Decimal),
        (x, y) if (x.is_numeric() || x.is_open()) && (y.is_numeric() || y.is_open()) => {
            Some(ExprType::Dynamic)
        }
        _ => None,
    }
}

fn unify(a: ExprType, b: ExprType) -> ExprType {
    match (a, b) {
        (x, y) if x == y => x,
        (ExprType::Null, y) => y,
        (x, ExprType::Null) => x,
        (x, y) if x.is_numeric() && y.is_numeric() => ExprType::Decimal,
        _ => ExprType::Dynamic,
    }
}

/// Compiles expression text against the node model
///
/// Identifiers bind to built-in node members first and to properties
/// otherwise. With a known-alias set, or in strict mode, identifiers that
/// are neither are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpressionCompiler<'a> {
    functions: Option<&'a FunctionRegistry>,
    known_aliases: Option<&'a BTreeSet<String>>,
    strict: bool,
}

impl<'a> ExpressionCompiler<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_functions(mut self, functions: &'a FunctionRegistry) -> Self {
        self.functions = Some(functions);
        self
    }

    pub fn with_known_aliases(mut self, aliases: &'a BTreeSet<String>) -> Self {
        self.known_aliases = Some(aliases);
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Compile an expression producing any value
    pub fn compile(&self, text: &str, params: &[EvalValue]) -> QueryResult<CompiledExpression> {
        let expr = parse_expression(text)?;
        let root = self.bind(&expr, params)?;
        debug!("Compiled expression '{}' as {}", text, root.ty);
        Ok(CompiledExpression::new(text, root))
    }

    /// Compile a predicate; the expression must be boolean or dynamic
    pub fn compile_predicate(&self, text: &str, params: &[EvalValue]) -> QueryResult<Predicate> {
        let compiled = self.compile(text, params)?;
        if !compiled.result_type().is_boolish() {
            return Err(QueryError::TypeMismatch(format!(
                "predicate '{}' is {}, expected bool",
                text,
                compiled.result_type()
            )));
        }
        Ok(Predicate::new(compiled))
    }

    /// Compile an ordering list such as `"Level desc, Name"`
    pub fn compile_orderings(
        &self,
        text: &str,
        params: &[EvalValue],
    ) -> QueryResult<Vec<CompiledOrdering>> {
        parse_orderings(text)?
            .into_iter()
            .map(|clause| {
                let root = self.bind(&clause.expr, params)?;
                if !root.ty.is_scalar() {
                    return Err(QueryError::TypeMismatch(format!(
                        "cannot order by a {} key in '{}'",
                        root.ty, text
                    )));
                }
                Ok(CompiledOrdering {
                    expr: CompiledExpression::new(text, root),
                    descending: clause.descending,
                })
            })
            .collect()
    }

    fn check_alias(&self, name: &str, position: usize) -> QueryResult<()> {
        let (alias, _) = split_recursive(name);
        let known = match self.known_aliases {
            Some(set) => {
                set.contains(alias) || lower_first(alias).is_some_and(|camel| set.contains(&camel))
            }
            None => !self.strict,
        };
        if known {
            Ok(())
        } else {
            Err(QueryError::UnknownIdentifier {
                name: name.to_string(),
                position,
            })
        }
    }

    fn function(&self, name: &str) -> Option<&'a RegisteredFunction> {
        self.functions.and_then(|f| f.get(name))
    }

    fn bind_function(
        &self,
        name: &str,
        args: Vec<Bound>,
        position: usize,
    ) -> QueryResult<Bound> {
        let function = self.function(name).ok_or_else(|| QueryError::UnknownMethod {
            name: name.to_string(),
            position,
        })?;
        if !function.accepts(args.len()) {
            return Err(QueryError::ArgumentCount {
                name: function.name.clone(),
                expected: function.min_args,
                found: args.len(),
            });
        }
        Ok(Bound::new(
            Op::Function {
                function: function.clone(),
                args,
            },
            function.returns,
        ))
    }

    pub(crate) fn bind(&self, expr: &Expr, params: &[EvalValue]) -> QueryResult<Bound> {
        match expr {
            Expr::Literal { value, .. } => {
                let (value, ty) = match value {
                    Literal::Bool(b) => (CoercedValue::Bool(*b), ExprType::Bool),
                    Literal::Int(i) => (CoercedValue::Int(*i), ExprType::Int),
                    Literal::Decimal(d) => (CoercedValue::Decimal(*d), ExprType::Decimal),
                    Literal::String(s) => (CoercedValue::String(s.clone()), ExprType::String),
                    Literal::Null => (CoercedValue::Absent, ExprType::Null),
                };
                Ok(Bound::new(Op::Const(EvalValue::Scalar(value)), ty))
            }
            Expr::Parameter { index, position } => {
                let value = params.get(*index).ok_or_else(|| QueryError::UnknownIdentifier {
                    name: format!("@{}", index),
                    position: *position,
                })?;
                Ok(Bound::new(Op::Const(value.clone()), ExprType::of_value(value)))
            }
            Expr::It { .. } => Ok(Bound::it()),
            Expr::Identifier { name, position } => self.bind_member(Bound::it(), name, *position),
            Expr::Member {
                target,
                name,
                position,
            } => {
                let target = self.bind(target, params)?;
                self.bind_member(target, name, *position)
            }
            Expr::Call {
                target,
                name,
                args,
                position,
            } => {
                let target = match target {
                    Some(t) => Some(self.bind(t, params)?),
                    None => None,
                };
                let args = args
                    .iter()
                    .map(|a| self.bind(a, params))
                    .collect::<QueryResult<Vec<_>>>()?;
                self.bind_call(target, name, args, *position)
            }
            Expr::Unary { op, operand, .. } => {
                let operand = self.bind(operand, params)?;
                let ty = match op {
                    UnaryOp::Neg if operand.ty.is_numeric() => operand.ty,
                    UnaryOp::Neg if operand.ty.is_open() => ExprType::Dynamic,
                    UnaryOp::Not if operand.ty.is_boolish() => ExprType::Bool,
                    _ => {
                        return Err(QueryError::TypeMismatch(format!(
                            "operator {} cannot be applied to {}",
                            if *op == UnaryOp::Neg { "-" } else { "!" },
                            operand.ty
                        )));
                    }
                };
                Ok(Bound::new(
                    Op::Unary {
                        op: *op,
                        operand: Box::new(operand),
                    },
                    ty,
                ))
            }
            Expr::Binary {
                op, left, right, ..
            } => self.bind_binary(*op, left, right, params),
            Expr::Conditional {
                test,
                if_true,
                if_false,
                ..
            } => {
                let test = self.bind(test, params)?;
                if !test.ty.is_boolish() {
                    return Err(QueryError::TypeMismatch(format!(
                        "conditional test is {}, expected bool",
                        test.ty
                    )));
                }
                let if_true = self.bind(if_true, params)?;
                let if_false = self.bind(if_false, params)?;
                let ty = unify(if_true.ty, if_false.ty);
                Ok(Bound::new(
                    Op::Conditional {
                        test: Box::new(test),
                        if_true: Box::new(if_true),
                        if_false: Box::new(if_false),
                    },
                    ty,
                ))
            }
        }
    }

    fn bind_binary(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        params: &[EvalValue],
    ) -> QueryResult<Bound> {
        if op.is_equality() && (left.is_null_literal() || right.is_null_literal()) {
            let negate = op == BinaryOp::NotEq;
            let operand = if left.is_null_literal() { right } else { left };
            let operand = self.bind(operand, params)?;
            return Ok(Bound::new(
                Op::IsAbsent {
                    operand: Box::new(operand),
                    negate,
                },
                ExprType::Bool,
            ));
        }

        let left = self.bind(left, params)?;
        let right = self.bind(right, params)?;
        let mismatch = || {
            QueryError::TypeMismatch(format!(
                "operator {} cannot be applied to {} and {}",
                op, left.ty, right.ty
            ))
        };

        let ty = match op {
            BinaryOp::Or | BinaryOp::And => {
                if !(left.ty.is_boolish() && right.ty.is_boolish()) {
                    return Err(mismatch());
                }
                ExprType::Bool
            }
            BinaryOp::Eq | BinaryOp::NotEq => {
                let nodes = left.ty == ExprType::Node && right.ty == ExprType::Node;
                let scalars = left.ty.is_scalar() && right.ty.is_scalar();
                if !(nodes || (scalars && comparable(left.ty, right.ty))) {
                    return Err(mismatch());
                }
                ExprType::Bool
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let scalars = left.ty.is_scalar() && right.ty.is_scalar();
                if !(scalars && comparable(left.ty, right.ty)) {
                    return Err(mismatch());
                }
                ExprType::Bool
            }
            BinaryOp::Add if left.ty == ExprType::String || right.ty == ExprType::String => {
                if !(left.ty.is_scalar() && right.ty.is_scalar()) {
                    return Err(mismatch());
                }
                ExprType::String
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                numeric_result(left.ty, right.ty).ok_or_else(mismatch)?
            }
            BinaryOp::Concat => {
                if !(left.ty.is_scalar() && right.ty.is_scalar()) {
                    return Err(mismatch());
                }
                ExprType::String
            }
        };

        Ok(Bound::new(
            Op::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            ty,
        ))
    }

    fn bind_member(&self, target: Bound, name: &str, position: usize) -> QueryResult<Bound> {
        let unknown = || QueryError::UnknownIdentifier {
            name: name.to_string(),
            position,
        };
        match target.ty {
            ExprType::Node => {
                if let Some(member) = NodeMember::from_name(name) {
                    let ty = member.result_type();
                    return Ok(Bound::new(
                        Op::NodeMember {
                            target: Box::new(target),
                            member,
                        },
                        ty,
                    ));
                }
                self.check_alias(name, position)?;
                Ok(Bound::new(
                    Op::Property {
                        target: Box::new(target),
                        alias: name.to_string(),
                    },
                    ExprType::Dynamic,
                ))
            }
            ExprType::Nodes => match CollectionMethod::from_name(name) {
                Some(CollectionMethod::Count) => Ok(Bound::new(
                    Op::CollectionMethod {
                        target: Box::new(target),
                        method: CollectionMethod::Count,
                    },
                    ExprType::Int,
                )),
                _ => Err(unknown()),
            },
            ExprType::String if name.eq_ignore_ascii_case("length") => Ok(Bound::new(
                Op::StringMethod {
                    target: Box::new(target),
                    method: StringMethod::Length,
                    args: Vec::new(),
                },
                ExprType::Int,
            )),
            ExprType::Dynamic | ExprType::Null => Ok(Bound::new(
                Op::DynamicMember {
                    target: Box::new(target),
                    name: name.to_string(),
                },
                ExprType::Dynamic,
            )),
            _ => Err(unknown()),
        }
    }

    fn bind_call(
        &self,
        target: Option<Bound>,
        name: &str,
        args: Vec<Bound>,
        position: usize,
    ) -> QueryResult<Bound> {
        let target = match target {
            Some(t) => t,
            None => {
                if let Some(method) = NodeMethod::from_name(name) {
                    return self.bind_node_method(Bound::it(), method, name, args);
                }
                return self.bind_function(name, args, position);
            }
        };

        let with_receiver = |target: Bound, args: Vec<Bound>| {
            let mut all = Vec::with_capacity(args.len() + 1);
            all.push(target);
            all.extend(args);
            self.bind_function(name, all, position)
        };

        match target.ty {
            ExprType::Node => match NodeMethod::from_name(name) {
                Some(method) => self.bind_node_method(target, method, name, args),
                None => with_receiver(target, args),
            },
            ExprType::Nodes => match CollectionMethod::from_name(name) {
                Some(method) => {
                    check_arity(name, (0, 0), args.len())?;
                    Ok(Bound::new(
                        Op::CollectionMethod {
                            target: Box::new(target),
                            method,
                        },
                        method.result_type(),
                    ))
                }
                None => with_receiver(target, args),
            },
            ExprType::Dynamic | ExprType::Null => {
                let node = NodeMethod::from_name(name);
                let collection = CollectionMethod::from_name(name);
                let string = StringMethod::from_name(name);
                if node.is_none() && collection.is_none() && string.is_none() {
                    return with_receiver(target, args);
                }
                let found = args.len();
                let fits = node.is_some_and(|m| found >= m.arity().0 && found <= m.arity().1)
                    || (collection.is_some() && found == 0)
                    || string.is_some_and(|m| found >= m.arity().0 && found <= m.arity().1);
                if !fits {
                    let arity = node
                        .map(|m| m.arity())
                        .or_else(|| string.map(|m| m.arity()))
                        .unwrap_or((0, 0));
                    return Err(arity_error(name, arity, found));
                }
                Ok(Bound::new(
                    Op::DynamicCall {
                        target: Box::new(target),
                        node,
                        collection,
                        string,
                        args,
                    },
                    ExprType::Dynamic,
                ))
            }
            _ => match StringMethod::from_name(name) {
                Some(method) => {
                    check_arity(name, method.arity(), args.len())?;
                    Ok(Bound::new(
                        Op::StringMethod {
                            target: Box::new(target),
                            method,
                            args,
                        },
                        method.result_type(),
                    ))
                }
                None => with_receiver(target, args),
            },
        }
    }

    fn bind_node_method(
        &self,
        target: Bound,
        method: NodeMethod,
        name: &str,
        args: Vec<Bound>,
    ) -> QueryResult<Bound> {
        check_arity(name, method.arity(), args.len())?;
        if method.takes_node() {
            let ty = args[0].ty;
            if !(ty == ExprType::Node || ty.is_open()) {
                return Err(QueryError::TypeMismatch(format!(
                    "{} expects a node argument, found {}",
                    name, ty
                )));
            }
        } else if let Some(arg) = args.iter().find(|a| !a.ty.is_scalar()) {
            return Err(QueryError::TypeMismatch(format!(
                "{} expects scalar arguments, found {}",
                name, arg.ty
            )));
        }
        let arg_types: Vec<ExprType> = args.iter().map(|a| a.ty).collect();
        let ty = method.result_type_for(&arg_types);
        Ok(Bound::new(
            Op::NodeMethod {
                target: Box::new(target),
                method,
                args,
            },
            ty,
        ))
    }
}
