//! Syntax errors in expression text

use thiserror::Error;

/// Expression text could not be tokenized or parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at position {position})")]
pub struct ParseError {
    pub message: String,
    /// Byte offset into the expression text
    pub position: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}
