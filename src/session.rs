//! Query sessions
//!
//! A [`QuerySession`] is the request-scoped entry point: it holds the
//! collaborators, configuration and function registry every node and
//! collection of one logical request shares. Cloning is cheap.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::backing::{BackingItem, PropertyCache};
use crate::coercion::ValueCoercer;
use crate::collection::NodeCollection;
use crate::config::QueryConfig;
use crate::error::{QueryError, QueryResult};
use crate::expression::{
    CompiledExpression, CompiledOrdering, EvalValue, ExpressionCompiler, FunctionRegistry, Predicate,
};
use crate::models::{CoercedValue, ContentKind, NodeId, PropertyValue};
use crate::node::TreeNode;
use crate::storage::{
    CachedEditorKinds, ContentRepository, EditorKindProvider, MemoryRepository, MemorySearch,
    NoEditorKinds, RepositoryError, SearchProvider,
};

struct SessionInner {
    repository: Rc<dyn ContentRepository>,
    search: Option<Rc<dyn SearchProvider>>,
    editors: Rc<dyn EditorKindProvider>,
    config: QueryConfig,
    coercer: ValueCoercer,
    functions: FunctionRegistry,
    known_aliases: Option<BTreeSet<String>>,
    cache: Option<PropertyCache>,
}

/// Request-scoped handle over repositories, search and configuration
#[derive(Clone)]
pub struct QuerySession {
    inner: Rc<SessionInner>,
}

impl fmt::Debug for QuerySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySession")
            .field("config", &self.inner.config)
            .field("search", &self.inner.search.is_some())
            .field("functions", &self.inner.functions.len())
            .field("cached", &self.inner.cache.is_some())
            .finish()
    }
}

/// Builder for [`QuerySession`]
pub struct QuerySessionBuilder {
    repository: Rc<dyn ContentRepository>,
    search: Option<Rc<dyn SearchProvider>>,
    editors: Option<Rc<dyn EditorKindProvider>>,
    config: QueryConfig,
    functions: Option<FunctionRegistry>,
    known_aliases: Option<BTreeSet<String>>,
    cache: Option<PropertyCache>,
}

impl QuerySessionBuilder {
    pub fn search(mut self, provider: Rc<dyn SearchProvider>) -> Self {
        self.search = Some(provider);
        self
    }

    pub fn editor_kinds(mut self, provider: Rc<dyn EditorKindProvider>) -> Self {
        self.editors = Some(provider);
        self
    }

    pub fn config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default function registry
    pub fn functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = Some(functions);
        self
    }

    /// Restrict identifiers in expressions to these property aliases
    pub fn known_aliases(mut self, aliases: BTreeSet<String>) -> Self {
        self.known_aliases = Some(aliases);
        self
    }

    /// Share a property cache with other sessions
    pub fn property_cache(mut self, cache: PropertyCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> QuerySession {
        let cache = match self.cache {
            Some(cache) => Some(cache),
            None if self.config.use_property_cache => Some(PropertyCache::new()),
            None => None,
        };
        QuerySession {
            inner: Rc::new(SessionInner {
                repository: self.repository,
                search: self.search,
                editors: self.editors.unwrap_or_else(|| Rc::new(NoEditorKinds)),
                coercer: ValueCoercer::from_config(&self.config),
                config: self.config,
                functions: self.functions.unwrap_or_else(FunctionRegistry::with_defaults),
                known_aliases: self.known_aliases,
                cache,
            }),
        }
    }
}

impl QuerySession {
    pub fn builder(repository: Rc<dyn ContentRepository>) -> QuerySessionBuilder {
        QuerySessionBuilder {
            repository,
            search: None,
            editors: None,
            config: QueryConfig::default(),
            functions: None,
            known_aliases: None,
            cache: None,
        }
    }

    /// Builder wired to an in-memory repository, its search index and its editor kinds
    pub fn from_memory(repository: MemoryRepository) -> QuerySessionBuilder {
        let search = MemorySearch::index(&repository);
        let repository = Rc::new(repository);
        let editors = CachedEditorKinds::new(Rc::clone(&repository));
        Self::builder(repository)
            .search(Rc::new(search))
            .editor_kinds(Rc::new(editors))
    }

    pub fn config(&self) -> &QueryConfig {
        &self.inner.config
    }

    pub fn coercer(&self) -> &ValueCoercer {
        &self.inner.coercer
    }

    pub fn repository(&self) -> &Rc<dyn ContentRepository> {
        &self.inner.repository
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.inner.functions
    }

    pub fn property_cache(&self) -> Option<&PropertyCache> {
        self.inner.cache.as_ref()
    }

    /// Coerce a resolved property using the editor kind declared for it
    pub fn coerce(&self, value: &PropertyValue) -> CoercedValue {
        let kind = self
            .inner
            .editors
            .editor_kind_for(&value.context_type_alias, &value.alias);
        self.inner.coercer.coerce_property(value, kind)
    }

    pub(crate) fn wrap(&self, item: BackingItem) -> TreeNode {
        TreeNode::new(item, self.clone())
    }

    pub(crate) fn load(&self, id: NodeId, kind: ContentKind) -> TreeNode {
        let item = BackingItem::load(id, kind, Rc::clone(&self.inner.repository))
            .with_cache(self.inner.cache.clone());
        self.wrap(item)
    }

    /// Document by id; unknown ids give a null node
    pub fn node_by_id(&self, id: impl Into<NodeId>) -> TreeNode {
        self.load(id.into(), ContentKind::Document)
    }

    /// Media item by id; unknown ids give a null node
    pub fn media_by_id(&self, id: impl Into<NodeId>) -> TreeNode {
        self.load(id.into(), ContentKind::Media)
    }

    /// Documents by id, skipping ids that resolve to nothing
    pub fn nodes_by_id<I>(&self, ids: I) -> NodeCollection
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        self.load_all(ids, ContentKind::Document)
    }

    pub fn media_by_ids<I>(&self, ids: I) -> NodeCollection
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        self.load_all(ids, ContentKind::Media)
    }

    fn load_all<I>(&self, ids: I, kind: ContentKind) -> NodeCollection
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        let nodes = ids
            .into_iter()
            .map(|id| self.load(id.into(), kind))
            .filter(|node| !node.is_null());
        NodeCollection::with_session(self.clone(), nodes)
    }

    /// Lookup that surfaces repository failures instead of reading them as absent
    pub fn try_node_by_id(&self, id: impl Into<NodeId>, kind: ContentKind) -> QueryResult<Option<TreeNode>> {
        let id = id.into();
        if id.is_root() {
            return Ok(Some(self.load(id, kind)));
        }
        let record = self.inner.repository.get_by_id(id, kind)?;
        Ok(record.filter(|r| r.kind == kind).map(|record| {
            let item = BackingItem::from_record(record, Rc::clone(&self.inner.repository))
                .with_cache(self.inner.cache.clone());
            self.wrap(item)
        }))
    }

    /// The synthetic document root (`-1`)
    pub fn root(&self) -> TreeNode {
        self.load(NodeId::ROOT, ContentKind::Document)
    }

    /// The synthetic media root (`-1`)
    pub fn media_root(&self) -> TreeNode {
        self.load(NodeId::ROOT, ContentKind::Media)
    }

    /// Compiler configured with this session's functions and identifier policy
    pub fn compiler(&self) -> ExpressionCompiler<'_> {
        let compiler = ExpressionCompiler::new()
            .with_functions(&self.inner.functions)
            .strict(self.inner.config.strict_identifiers);
        match &self.inner.known_aliases {
            Some(aliases) => compiler.with_known_aliases(aliases),
            None => compiler,
        }
    }

    pub fn compile(&self, text: &str, params: &[EvalValue]) -> QueryResult<CompiledExpression> {
        self.compiler().compile(text, params)
    }

    pub fn compile_predicate(&self, text: &str, params: &[EvalValue]) -> QueryResult<Predicate> {
        self.compiler().compile_predicate(text, params)
    }

    pub fn compile_orderings(&self, text: &str, params: &[EvalValue]) -> QueryResult<Vec<CompiledOrdering>> {
        self.compiler().compile_orderings(text, params)
    }

    /// Search the whole document tree with the configured wildcard default
    pub fn search(&self, term: &str) -> QueryResult<NodeCollection> {
        self.search_within(term, "", self.inner.config.use_wildcards)
    }

    /// Search below a path prefix; each result carries its relevance score
    /// as a synthetic property named by `search_score_alias`
    pub fn search_within(
        &self,
        term: &str,
        scope_path_prefix: &str,
        use_wildcards: bool,
    ) -> QueryResult<NodeCollection> {
        let provider = self.inner.search.as_ref().ok_or_else(|| {
            QueryError::Repository(RepositoryError::Unavailable(
                "no search provider configured".to_string(),
            ))
        })?;
        let hits = provider.search(term, scope_path_prefix, use_wildcards)?;
        debug!(
            "Search '{}' under '{}' returned {} hits",
            term,
            scope_path_prefix,
            hits.len()
        );

        let score_alias = &self.inner.config.search_score_alias;
        let nodes = hits.into_iter().filter_map(|hit| {
            let item = BackingItem::load(hit.id, ContentKind::Document, Rc::clone(&self.inner.repository));
            if item.is_null() {
                warn!("Search hit {} no longer resolves to a document", hit.id);
                return None;
            }
            let item = item
                .with_cache(self.inner.cache.clone())
                .with_synthetic_property(score_alias.clone(), hit.score.to_string());
            Some(self.wrap(item))
        });
        Ok(NodeCollection::with_session(self.clone(), nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> QuerySession {
        let repo = MemoryRepository::from_yaml_str(
            r#"
documents:
  - id: 1
    name: Home
    type: home
    children:
      - id: 2
        name: Summer news
        type: article
      - id: 3
        name: Winter news
        type: article
media:
  - id: 100
    name: Logo
    type: Image
"#,
        )
        .unwrap();
        QuerySession::from_memory(repo).build()
    }

    #[test]
    fn test_lookup_by_kind() {
        let session = session();
        assert_eq!(session.node_by_id(2).name(), "Summer news");
        assert!(session.node_by_id(100).is_null());
        assert_eq!(session.media_by_id(100).name(), "Logo");
        assert!(session.root().is_root());
        assert_eq!(session.nodes_by_id([3, 999, 2]).ids(), vec![NodeId(3), NodeId(2)]);
    }

    #[test]
    fn test_try_node_by_id() {
        let session = session();
        assert!(session.try_node_by_id(1, ContentKind::Document).unwrap().is_some());
        assert!(session.try_node_by_id(100, ContentKind::Document).unwrap().is_none());
    }

    #[test]
    fn test_search_injects_score() {
        let session = session();
        let hits = session.search("summer").unwrap();
        assert_eq!(hits.ids(), vec![NodeId(2)]);
        let node = hits.get(0).unwrap();
        assert!(matches!(node.get("searchScore"), CoercedValue::Int(_) | CoercedValue::Decimal(_)));
    }

    #[test]
    fn test_search_without_provider() {
        let repo: Rc<dyn ContentRepository> = Rc::new(MemoryRepository::new());
        let session = QuerySession::builder(repo).build();
        assert!(matches!(
            session.search("x"),
            Err(QueryError::Repository(RepositoryError::Unavailable(_)))
        ));
    }

    #[test]
    fn test_property_cache_from_config() {
        let repo = MemoryRepository::new();
        let config = QueryConfig::builder().use_property_cache(true).build();
        let session = QuerySession::from_memory(repo).config(config).build();
        assert!(session.property_cache().is_some());
    }
}
