//! Registered extension functions
//!
//! Functions are callable as `f(x, y)` or, with the first argument as
//! receiver, `x.f(y)`. Names are matched case-insensitively.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::types::{EvalValue, ExprType};
use crate::error::QueryResult;
use crate::models::CoercedValue;

pub type NativeFunction = Rc<dyn Fn(&[EvalValue]) -> QueryResult<EvalValue>>;

/// A function the binder can call
#[derive(Clone)]
pub struct RegisteredFunction {
    pub name: String,
    pub min_args: usize,
    /// `None` for variadic functions
    pub max_args: Option<usize>,
    pub returns: ExprType,
    pub(crate) func: NativeFunction,
}

impl RegisteredFunction {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.is_none_or(|max| count <= max)
    }

    pub fn call(&self, args: &[EvalValue]) -> QueryResult<EvalValue> {
        (self.func)(args)
    }
}

impl fmt::Debug for RegisteredFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredFunction")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("returns", &self.returns)
            .finish()
    }
}

/// Name → function table consulted after built-in methods
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, RegisteredFunction>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with `IsNullOrEmpty(x)` and `ContainsAny(text, a, b, ...)`
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("IsNullOrEmpty", 1, ExprType::Bool, |args| {
            let empty = match &args[0] {
                EvalValue::Scalar(CoercedValue::Absent) => true,
                EvalValue::Scalar(v) => v.to_string().is_empty(),
                EvalValue::Node(n) => n.is_null(),
                EvalValue::Nodes(n) => n.is_empty(),
            };
            Ok(empty.into())
        });
        registry.register_variadic("ContainsAny", 2, ExprType::Bool, |args| {
            let haystack = args[0].to_text();
            let found = args[1..]
                .iter()
                .map(EvalValue::to_text)
                .any(|needle| !needle.is_empty() && haystack.contains(&needle));
            Ok(found.into())
        });
        registry
    }

    /// Register a function taking exactly `arity` arguments
    pub fn register<F>(&mut self, name: &str, arity: usize, returns: ExprType, func: F) -> &mut Self
    where
        F: Fn(&[EvalValue]) -> QueryResult<EvalValue> + 'static,
    {
        self.insert(name, arity, Some(arity), returns, Rc::new(func))
    }

    /// Register a function taking at least `min_args` arguments
    pub fn register_variadic<F>(
        &mut self,
        name: &str,
        min_args: usize,
        returns: ExprType,
        func: F,
    ) -> &mut Self
    where
        F: Fn(&[EvalValue]) -> QueryResult<EvalValue> + 'static,
    {
        self.insert(name, min_args, None, returns, Rc::new(func))
    }

    fn insert(
        &mut self,
        name: &str,
        min_args: usize,
        max_args: Option<usize>,
        returns: ExprType,
        func: NativeFunction,
    ) -> &mut Self {
        self.functions.insert(
            name.to_ascii_lowercase(),
            RegisteredFunction {
                name: name.to_string(),
                min_args,
                max_args,
                returns,
                func,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredFunction> {
        self.functions.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
