//! Content Query SDK - dynamic query and traversal engine for CMS content trees
//!
//! Provides:
//! - Uniform handles over document and media records (via repository collaborators)
//! - Property resolution with Pascal/camel alias folding and recursive lookup
//! - Value coercion of raw property text guided by editor kinds
//! - A small expression language compiled once and evaluated per node
//! - Tree traversal, positional predicates and collection operators
//!   (filter, ordering, grouping, set operators, aggregates)

pub mod backing;
pub mod coercion;
pub mod collection;
pub mod config;
pub mod error;
pub mod expression;
pub mod models;
pub mod node;
pub mod resolver;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use backing::{BackingItem, PropertyCache};
pub use coercion::ValueCoercer;
pub use collection::{Aggregate, Grouping, Groupings, NodeCollection, OrderedCollection, Projection};
pub use config::QueryConfig;
pub use error::{QueryError, QueryResult};
pub use expression::{
    CompiledExpression, CompiledOrdering, EvalValue, ExprType, ExpressionCompiler, FunctionRegistry,
    Predicate,
};
pub use node::{PositionTest, TreeNode};
pub use resolver::{PropertyResolver, Resolution};
pub use session::{QuerySession, QuerySessionBuilder};
pub use storage::{
    ContentRepository, EditorKind, EditorKindProvider, MemoryRepository, MemorySearch, RepositoryError,
    SearchHit, SearchProvider,
};

// Re-export models
pub use models::{CoercedValue, ContentKind, ItemRecord, NodeId, PropertyValue, ValueKind};
