//! Error types for the query engine
//!
//! Missing properties, children and parents are not errors: they travel as
//! [`CoercedValue::Absent`](crate::models::CoercedValue::Absent) or `None`.
//! What remains here is malformed query text, mis-sequenced API use and
//! collaborator failures surfaced at session level.

use thiserror::Error;

use crate::expression::ParseError;
use crate::models::{NodeId, ValueKind};
use crate::storage::RepositoryError;

/// Errors raised by compilation, traversal and collection operators
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Expression text could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Identifier is neither a built-in member nor a known property alias
    #[error("Unknown identifier '{name}' at position {position}")]
    UnknownIdentifier { name: String, position: usize },

    /// Method or registered function does not exist for the receiver
    #[error("No method '{name}' at position {position}")]
    UnknownMethod { name: String, position: usize },

    /// Method called with the wrong number of arguments
    #[error("'{name}' expects {expected} argument(s), found {found}")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    /// Operand types cannot be combined
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Positional or sibling query on a node with neither owner list nor parent
    #[error("Node {0} has been orphaned and doesn't belong to a collection")]
    OrphanedNode(NodeId),

    /// Owner list exists but no longer contains the node
    #[error("Node {0} belongs to a collection but its position could not be found")]
    NotInOwnerList(NodeId),

    /// `parent_id` asked of a node without parent
    #[error("The node {0} does not have a parent")]
    NoParent(NodeId),

    /// Aggregate over a dominant kind it cannot handle
    #[error("Cannot {operation} non-numeric property values (dominant type: {kind})")]
    AggregateTypeMismatch {
        operation: &'static str,
        kind: ValueKind,
    },

    /// Aggregate over a sequence with no usable values
    #[error("Sequence contains no elements for {operation}")]
    EmptySequence { operation: &'static str },

    /// First/Last/Single found nothing
    #[error("{operation}: sequence contains no matching element")]
    NoMatch { operation: &'static str },

    /// Single found more than one element
    #[error("{operation}: sequence contains {count} matching elements")]
    MultipleMatches {
        operation: &'static str,
        count: usize,
    },

    /// Runtime failure of an internally inconsistent query
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Collaborator failure surfaced from a session-level lookup
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result alias used across the crate
pub type QueryResult<T> = Result<T, QueryError>;
