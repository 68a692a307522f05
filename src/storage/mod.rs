//! Collaborator abstraction
//!
//! Defines the read-only interfaces the query engine consumes:
//! - ContentRepository: node records, ordered children and raw property text
//! - SearchProvider: tree-scoped text search returning ranked node ids
//! - EditorKindProvider: declared editor type of a property, used by coercion
//!
//! The engine never writes through any of them. `MemoryRepository` and
//! `MemorySearch` are in-process implementations for tests and embedding.

use serde::{Deserialize, Serialize};

use crate::models::{ContentKind, ItemRecord, NodeId};

pub mod editor;
pub mod memory;
pub mod search;

pub use editor::{CachedEditorKinds, EditorKind, EditorKindProvider, NoEditorKinds, StaticEditorKinds};
pub use memory::MemoryRepository;
pub use search::MemorySearch;

/// Error type for collaborator operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Content store unavailable: {0}")]
    Unavailable(String),
    #[error("Corrupt record for node {id}: {message}")]
    CorruptRecord { id: NodeId, message: String },
    #[error("Search error: {0}")]
    Search(String),
    #[error("Repository backend error: {0}")]
    BackendError(String),
}

/// Trait for content repositories
///
/// Given a node id, returns its record, its children and its named property
/// values. Implementations decide where the data comes from; the query
/// engine treats every call as a synchronous read.
pub trait ContentRepository {
    /// Fetch a node record; `Ok(None)` when the id is unknown for `kind`
    fn get_by_id(&self, id: NodeId, kind: ContentKind) -> Result<Option<ItemRecord>, RepositoryError>;

    /// Children of a node, ordered by sort order
    fn get_children(&self, id: NodeId, kind: ContentKind) -> Result<Vec<ItemRecord>, RepositoryError>;

    /// Raw text of a named property; `Ok(None)` when the node has no such property
    fn get_property(&self, id: NodeId, alias: &str) -> Result<Option<String>, RepositoryError>;
}

/// One ranked search result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: NodeId,
    pub score: f32,
}

/// Trait for search-index providers
pub trait SearchProvider {
    /// Search below `scope_path_prefix`; results ordered by descending score
    fn search(
        &self,
        query: &str,
        scope_path_prefix: &str,
        use_wildcards: bool,
    ) -> Result<Vec<SearchHit>, RepositoryError>;
}
