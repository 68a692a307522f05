//! Expression language
//!
//! Textual predicates, sort keys and selectors are processed in three
//! decoupled stages:
//!
//! - `lexer` / `parser`: text to a tagged syntax tree ([`Expr`]), with no
//!   knowledge of nodes
//! - `compiler`: binds identifiers, methods and functions against the node
//!   model and assigns every sub-expression a static [`ExprType`]
//! - `eval`: interprets the bound tree against a [`TreeNode`](crate::node::TreeNode)

pub mod ast;
pub mod compiler;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod members;
pub mod parser;
pub mod types;

pub use ast::{BinaryOp, Expr, Literal, OrderingClause, UnaryOp};
pub use compiler::ExpressionCompiler;
pub use error::ParseError;
pub use eval::{CompiledExpression, CompiledOrdering, Predicate};
pub use functions::{FunctionRegistry, NativeFunction, RegisteredFunction};
pub use members::{CollectionMethod, NodeMember, NodeMethod, StringMethod};
pub use parser::{parse_expression, parse_orderings};
pub use types::{EvalValue, ExprType};
