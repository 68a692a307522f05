//! Syntax tree of expression text

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Decimal(f64),
    String(String),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    /// `&` string concatenation
    Concat,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::Or | BinaryOp::And)
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::NotEq)
    }

    pub fn is_relational(&self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Concat => "&",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        };
        write!(f, "{}", symbol)
    }
}

/// Expression node; `position` is the byte offset of the construct in the text
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        value: Literal,
        position: usize,
    },
    Parameter {
        index: usize,
        position: usize,
    },
    /// The implicit node being evaluated
    It {
        position: usize,
    },
    Identifier {
        name: String,
        position: usize,
    },
    Member {
        target: Box<Expr>,
        name: String,
        position: usize,
    },
    /// Method call; `target` is `None` for calls on the implicit node or free functions
    Call {
        target: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
        position: usize,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        position: usize,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        position: usize,
    },
    Conditional {
        test: Box<Expr>,
        if_true: Box<Expr>,
        if_false: Box<Expr>,
        position: usize,
    },
}

impl Expr {
    pub fn position(&self) -> usize {
        match self {
            Expr::Literal { position, .. }
            | Expr::Parameter { position, .. }
            | Expr::It { position }
            | Expr::Identifier { position, .. }
            | Expr::Member { position, .. }
            | Expr::Call { position, .. }
            | Expr::Unary { position, .. }
            | Expr::Binary { position, .. }
            | Expr::Conditional { position, .. } => *position,
        }
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(
            self,
            Expr::Literal {
                value: Literal::Null,
                ..
            }
        )
    }
}

/// One key of an ordering list such as `"Level, Name desc"`
#[derive(Debug, Clone, PartialEq)]
pub struct OrderingClause {
    pub expr: Expr,
    pub descending: bool,
}
