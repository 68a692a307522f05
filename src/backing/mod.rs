//! Backing items
//!
//! A [`BackingItem`] is the uniform handle over a document or media record.
//! It answers identity, hierarchy and named-property questions by reading
//! through to the [`ContentRepository`] that owns the record. Repository
//! failures are logged and read as "absent"; nothing here returns an error.

pub mod cache;

pub use cache::PropertyCache;

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use tracing::warn;
use uuid::Uuid;

use crate::models::{ContentKind, ItemRecord, NodeId, PropertyValue};
use crate::storage::ContentRepository;

/// Which record, if any, a backing item stands for
#[derive(Debug, Clone, PartialEq)]
pub enum ItemHandle {
    Document(ItemRecord),
    Media(ItemRecord),
    /// The synthetic root above the level-1 nodes of one store
    Root { kind: ContentKind, record: ItemRecord },
    /// Lookup found nothing, or found a record of the other kind
    Null,
}

/// Kind-transparent handle over one content node
#[derive(Clone)]
pub struct BackingItem {
    handle: ItemHandle,
    repository: Rc<dyn ContentRepository>,
    cache: Option<PropertyCache>,
    synthetic: HashMap<String, String>,
}

impl fmt::Debug for BackingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackingItem")
            .field("handle", &self.handle)
            .field("cached", &self.cache.is_some())
            .field("synthetic", &self.synthetic)
            .finish()
    }
}

impl BackingItem {
    /// Wrap a record delivered by `repository`
    pub fn from_record(record: ItemRecord, repository: Rc<dyn ContentRepository>) -> Self {
        let handle = match record.kind {
            ContentKind::Document => ItemHandle::Document(record),
            ContentKind::Media => ItemHandle::Media(record),
        };
        Self::with_handle(handle, repository)
    }

    pub fn root(kind: ContentKind, repository: Rc<dyn ContentRepository>) -> Self {
        let mut record = ItemRecord::synthetic_root();
        record.kind = kind;
        Self::with_handle(ItemHandle::Root { kind, record }, repository)
    }

    pub fn null(repository: Rc<dyn ContentRepository>) -> Self {
        Self::with_handle(ItemHandle::Null, repository)
    }

    fn with_handle(handle: ItemHandle, repository: Rc<dyn ContentRepository>) -> Self {
        Self {
            handle,
            repository,
            cache: None,
            synthetic: HashMap::new(),
        }
    }

    /// Look an id up in `repository`
    ///
    /// `-1` gives the synthetic root. Unknown ids, ids of the other kind and
    /// repository failures give a null item.
    pub fn load(id: NodeId, kind: ContentKind, repository: Rc<dyn ContentRepository>) -> Self {
        if id.is_root() {
            return Self::root(kind, repository);
        }
        match repository.get_by_id(id, kind) {
            Ok(Some(record)) if record.kind == kind => Self::from_record(record, repository),
            Ok(_) => Self::null(repository),
            Err(e) => {
                warn!("Failed to load {} {}: {}", kind, id, e);
                Self::null(repository)
            }
        }
    }

    /// Attach a shared property cache; children and parents inherit it
    pub fn with_cache(mut self, cache: Option<PropertyCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Add a property that exists only on this handle (e.g. a search score)
    pub fn with_synthetic_property(mut self, alias: impl Into<String>, value: impl Into<String>) -> Self {
        self.synthetic.insert(alias.into(), value.into());
        self
    }

    fn related(&self, handle: ItemHandle) -> Self {
        Self {
            handle,
            repository: Rc::clone(&self.repository),
            cache: self.cache.clone(),
            synthetic: HashMap::new(),
        }
    }

    pub fn handle(&self) -> &ItemHandle {
        &self.handle
    }

    pub fn repository(&self) -> &Rc<dyn ContentRepository> {
        &self.repository
    }

    pub fn cache(&self) -> Option<&PropertyCache> {
        self.cache.as_ref()
    }

    pub fn record(&self) -> Option<&ItemRecord> {
        match &self.handle {
            ItemHandle::Document(r) | ItemHandle::Media(r) => Some(r),
            ItemHandle::Root { record, .. } => Some(record),
            ItemHandle::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.handle, ItemHandle::Null)
    }

    pub fn is_root(&self) -> bool {
        matches!(self.handle, ItemHandle::Root { .. })
    }

    /// Store the item lives in; `None` for a null item
    pub fn kind(&self) -> Option<ContentKind> {
        match &self.handle {
            ItemHandle::Document(_) => Some(ContentKind::Document),
            ItemHandle::Media(_) => Some(ContentKind::Media),
            ItemHandle::Root { kind, .. } => Some(*kind),
            ItemHandle::Null => None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.record().map(|r| r.id).unwrap_or(NodeId::NONE)
    }

    pub fn parent_id(&self) -> NodeId {
        self.record().map(|r| r.parent_id).unwrap_or(NodeId::NONE)
    }

    pub fn name(&self) -> &str {
        self.record().map(|r| r.name.as_str()).unwrap_or_default()
    }

    pub fn node_type_alias(&self) -> &str {
        self.record().map(|r| r.node_type_alias.as_str()).unwrap_or_default()
    }

    pub fn level(&self) -> i32 {
        self.record().map(|r| r.level).unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.record().map(|r| r.path.as_str()).unwrap_or_default()
    }

    pub fn sort_order(&self) -> i32 {
        self.record().map(|r| r.sort_order).unwrap_or_default()
    }

    pub fn create_date(&self) -> NaiveDateTime {
        self.record().map(|r| r.create_date).unwrap_or_default()
    }

    pub fn update_date(&self) -> NaiveDateTime {
        self.record().map(|r| r.update_date).unwrap_or_default()
    }

    pub fn version(&self) -> Uuid {
        self.record().map(|r| r.version).unwrap_or_else(Uuid::nil)
    }

    fn stored_property(&self, alias: &str) -> Option<String> {
        let id = match &self.handle {
            ItemHandle::Document(r) | ItemHandle::Media(r) => r.id,
            ItemHandle::Root { .. } | ItemHandle::Null => return None,
        };
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(id, alias) {
                return hit;
            }
        }
        let raw = match self.repository.get_property(id, alias) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Property '{}' of node {} unavailable: {}", alias, id, e);
                return None;
            }
        };
        if let Some(cache) = &self.cache {
            cache.insert(id, alias, raw.clone());
        }
        raw
    }

    fn property_value(&self, alias: &str, raw: Option<String>) -> PropertyValue {
        PropertyValue::new(alias, raw, self.node_type_alias(), self.id())
    }

    /// Exact-alias lookup of a stored or synthetic property
    pub fn exact_property(&self, alias: &str) -> Option<PropertyValue> {
        if let Some(value) = self.synthetic.get(alias) {
            return Some(self.property_value(alias, Some(value.clone())));
        }
        self.stored_property(alias)
            .map(|raw| self.property_value(alias, Some(raw)))
    }

    /// Reflection-style probe of the record's well-known members
    pub fn member_property(&self, name: &str) -> Option<PropertyValue> {
        let text = self.record()?.member_text(name)?;
        Some(self.property_value(name, Some(text)))
    }

    /// Property lookup: exact alias, then first letter lowercased, then members
    pub fn get_property(&self, alias: &str) -> Option<PropertyValue> {
        self.exact_property(alias)
            .or_else(|| lower_first(alias).and_then(|camel| self.exact_property(&camel)))
            .or_else(|| self.member_property(alias))
    }

    /// Walk up the parent chain until a value with content is found
    pub fn get_property_recursive(&self, alias: &str) -> Option<PropertyValue> {
        let mut current = Some(self.clone());
        while let Some(item) = current {
            if let Some(value) = item.get_property(alias) {
                if value.has_value() {
                    return Some(value);
                }
            }
            current = item.parent();
        }
        None
    }

    pub fn get_property_with(&self, alias: &str, recursive: bool) -> Option<PropertyValue> {
        if recursive {
            self.get_property_recursive(alias)
        } else {
            self.get_property(alias)
        }
    }

    /// Children ordered by sort order
    pub fn children(&self) -> Vec<BackingItem> {
        let (id, kind) = match &self.handle {
            ItemHandle::Document(r) => (r.id, ContentKind::Document),
            ItemHandle::Media(r) => (r.id, ContentKind::Media),
            ItemHandle::Root { kind, .. } => (NodeId::ROOT, *kind),
            ItemHandle::Null => return Vec::new(),
        };
        match self.repository.get_children(id, kind) {
            Ok(records) => records
                .into_iter()
                .filter(|r| r.kind == kind)
                .map(|r| self.related(handle_for(r)))
                .collect(),
            Err(e) => {
                warn!("Children of {} {} unavailable: {}", kind, id, e);
                Vec::new()
            }
        }
    }

    /// Parent item, fetched on every call; the synthetic root has none
    pub fn parent(&self) -> Option<BackingItem> {
        let (parent_id, kind) = match &self.handle {
            ItemHandle::Document(r) => (r.parent_id, ContentKind::Document),
            ItemHandle::Media(r) => (r.parent_id, ContentKind::Media),
            ItemHandle::Root { .. } | ItemHandle::Null => return None,
        };
        if parent_id.is_root() {
            let mut record = ItemRecord::synthetic_root();
            record.kind = kind;
            return Some(self.related(ItemHandle::Root { kind, record }));
        }
        if parent_id.is_none() {
            return None;
        }
        let parent = Self::load(parent_id, kind, Rc::clone(&self.repository));
        if parent.is_null() {
            None
        } else {
            Some(parent.with_cache(self.cache.clone()))
        }
    }
}

fn handle_for(record: ItemRecord) -> ItemHandle {
    match record.kind {
        ContentKind::Document => ItemHandle::Document(record),
        ContentKind::Media => ItemHandle::Media(record),
    }
}

/// `"BodyText"` -> `Some("bodyText")`; `None` when the first letter is not uppercase
pub fn lower_first(alias: &str) -> Option<String> {
    let mut chars = alias.chars();
    let first = chars.next()?;
    if !first.is_uppercase() {
        return None;
    }
    Some(first.to_lowercase().chain(chars).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryRepository, RepositoryError};

    fn repo() -> Rc<dyn ContentRepository> {
        Rc::new(
            MemoryRepository::from_yaml_str(
                r#"
documents:
  - id: 1
    name: Home
    type: home
    properties:
      siteTitle: Example
      footer: "Home footer"
    children:
      - id: 2
        name: Blog
        type: blog
        properties:
          footer: "  "
        children:
          - id: 3
            name: Post
            type: post
media:
  - id: 100
    name: Photo
    type: Image
"#,
            )
            .unwrap(),
        )
    }

    struct FailingRepository;

    impl ContentRepository for FailingRepository {
        fn get_by_id(&self, _: NodeId, _: ContentKind) -> Result<Option<ItemRecord>, RepositoryError> {
            Err(RepositoryError::Unavailable("down".into()))
        }
        fn get_children(&self, _: NodeId, _: ContentKind) -> Result<Vec<ItemRecord>, RepositoryError> {
            Err(RepositoryError::Unavailable("down".into()))
        }
        fn get_property(&self, _: NodeId, _: &str) -> Result<Option<String>, RepositoryError> {
            Err(RepositoryError::Unavailable("down".into()))
        }
    }

    #[test]
    fn test_lower_first() {
        assert_eq!(lower_first("SiteTitle").as_deref(), Some("siteTitle"));
        assert_eq!(lower_first("siteTitle"), None);
        assert_eq!(lower_first(""), None);
    }

    #[test]
    fn test_property_lookup_order() {
        let home = BackingItem::load(NodeId(1), ContentKind::Document, repo());
        assert_eq!(home.get_property("siteTitle").unwrap().value(), "Example");
        assert_eq!(home.get_property("SiteTitle").unwrap().value(), "Example");
        assert_eq!(home.get_property("NodeTypeAlias").unwrap().value(), "home");
        assert!(home.get_property("sitetitle").is_none());
    }

    #[test]
    fn test_recursive_skips_blank_values() {
        let post = BackingItem::load(NodeId(3), ContentKind::Document, repo());
        let footer = post.get_property_recursive("footer").unwrap();
        assert_eq!(footer.value(), "Home footer");
        assert_eq!(footer.context_id, NodeId(1));
        assert_eq!(footer.context_type_alias, "home");
        assert!(post.get_property_recursive("nowhere").is_none());
    }

    #[test]
    fn test_kind_mismatch_is_null() {
        let item = BackingItem::load(NodeId(100), ContentKind::Document, repo());
        assert!(item.is_null());
        assert_eq!(item.id(), NodeId::NONE);
        assert!(item.children().is_empty());
        let media = BackingItem::load(NodeId(100), ContentKind::Media, repo());
        assert_eq!(media.kind(), Some(ContentKind::Media));
    }

    #[test]
    fn test_root_has_children_but_no_properties() {
        let root = BackingItem::load(NodeId::ROOT, ContentKind::Document, repo());
        assert!(root.is_root());
        assert_eq!(root.level(), 0);
        assert!(root.exact_property("siteTitle").is_none());
        assert_eq!(root.children().len(), 1);
        assert!(root.parent().is_none());

        let home = &root.children()[0];
        assert!(home.parent().unwrap().is_root());
    }

    #[test]
    fn test_synthetic_property_wins() {
        let home = BackingItem::load(NodeId(1), ContentKind::Document, repo())
            .with_synthetic_property("searchScore", "0.5");
        assert_eq!(home.get_property("searchScore").unwrap().value(), "0.5");
        assert!(home.children()[0].exact_property("searchScore").is_none());
    }

    #[test]
    fn test_cache_serves_repeat_lookups() {
        let cache = PropertyCache::new();
        let home = BackingItem::load(NodeId(1), ContentKind::Document, repo())
            .with_cache(Some(cache.clone()));
        home.get_property("siteTitle");
        home.get_property("missing");
        assert_eq!(cache.get(NodeId(1), "siteTitle"), Some(Some("Example".to_string())));
        assert_eq!(cache.get(NodeId(1), "missing"), Some(None));
    }

    #[test]
    fn test_repository_failures_read_as_absent() {
        let failing: Rc<dyn ContentRepository> = Rc::new(FailingRepository);
        let item = BackingItem::load(NodeId(1), ContentKind::Document, Rc::clone(&failing));
        assert!(item.is_null());

        let record = ItemRecord::new(NodeId(5), NodeId(4), "Orphan", "page");
        let item = BackingItem::from_record(record, failing);
        assert!(item.exact_property("title").is_none());
        assert!(item.children().is_empty());
        assert!(item.parent().is_none());
        assert_eq!(item.get_property("Name").unwrap().value(), "Orphan");
    }
}
