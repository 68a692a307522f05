//! Declared editor kinds of properties

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::{Uuid, uuid};

/// Well-known editor ids
pub const TRUE_FALSE_EDITOR_ID: Uuid = uuid!("38b352c1-e9f8-4fd8-9324-9a2eab06d97a");
pub const RICH_TEXT_EDITOR_ID: Uuid = uuid!("5e9b75ae-face-41c8-b47e-5f4b0fd82f83");
pub const DATE_TIME_EDITOR_ID: Uuid = uuid!("b6fb1622-afa5-4bbf-a3cc-d9672a442222");
pub const DATE_EDITOR_ID: Uuid = uuid!("23e93522-3200-44e2-9f29-e61a6fcbb79a");
pub const INTEGER_EDITOR_ID: Uuid = uuid!("1413afcb-d19a-4173-8e9a-68288d2a73b8");

/// Editor type hint consulted by value coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EditorKind {
    TrueFalse,
    RichText,
    DateTime,
    Date,
    Integer,
    /// Any other editor; coercion applies its generic rules
    #[default]
    Unknown,
}

impl EditorKind {
    /// Map an editor id to its kind
    pub fn from_editor_id(id: Uuid) -> Self {
        match id {
            TRUE_FALSE_EDITOR_ID => EditorKind::TrueFalse,
            RICH_TEXT_EDITOR_ID => EditorKind::RichText,
            DATE_TIME_EDITOR_ID => EditorKind::DateTime,
            DATE_EDITOR_ID => EditorKind::Date,
            INTEGER_EDITOR_ID => EditorKind::Integer,
            _ => EditorKind::Unknown,
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, EditorKind::Date | EditorKind::DateTime)
    }
}

/// Trait for editor-type-hint providers
pub trait EditorKindProvider {
    fn editor_kind_for(&self, content_type_alias: &str, property_alias: &str) -> EditorKind;
}

impl<T: EditorKindProvider + ?Sized> EditorKindProvider for std::rc::Rc<T> {
    fn editor_kind_for(&self, content_type_alias: &str, property_alias: &str) -> EditorKind {
        (**self).editor_kind_for(content_type_alias, property_alias)
    }
}

impl<T: EditorKindProvider + ?Sized> EditorKindProvider for std::sync::Arc<T> {
    fn editor_kind_for(&self, content_type_alias: &str, property_alias: &str) -> EditorKind {
        (**self).editor_kind_for(content_type_alias, property_alias)
    }
}

/// Provider that knows no editors; every property gets the generic rules
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEditorKinds;

impl EditorKindProvider for NoEditorKinds {
    fn editor_kind_for(&self, _content_type_alias: &str, _property_alias: &str) -> EditorKind {
        EditorKind::Unknown
    }
}

/// Provider backed by a fixed table
///
/// Entries registered for content type `"*"` apply to every content type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticEditorKinds {
    entries: HashMap<String, HashMap<String, EditorKind>>,
}

impl StaticEditorKinds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        content_type_alias: impl Into<String>,
        property_alias: impl Into<String>,
        kind: EditorKind,
    ) -> Self {
        self.insert(content_type_alias, property_alias, kind);
        self
    }

    pub fn insert(
        &mut self,
        content_type_alias: impl Into<String>,
        property_alias: impl Into<String>,
        kind: EditorKind,
    ) {
        self.entries
            .entry(content_type_alias.into())
            .or_default()
            .insert(property_alias.into(), kind);
    }
}

impl EditorKindProvider for StaticEditorKinds {
    fn editor_kind_for(&self, content_type_alias: &str, property_alias: &str) -> EditorKind {
        self.entries
            .get(content_type_alias)
            .and_then(|props| props.get(property_alias))
            .or_else(|| self.entries.get("*").and_then(|props| props.get(property_alias)))
            .copied()
            .unwrap_or_default()
    }
}

/// Process-wide memoization of any provider
///
/// Coercion asks once per property per node, so the wrapped provider is
/// consulted at most once per (content type, property alias) pair.
#[derive(Debug, Default)]
pub struct CachedEditorKinds<P> {
    inner: P,
    cache: RwLock<HashMap<(String, String), EditorKind>>,
}

impl<P: EditorKindProvider> CachedEditorKinds<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Number of memoized pairs
    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<P: EditorKindProvider> EditorKindProvider for CachedEditorKinds<P> {
    fn editor_kind_for(&self, content_type_alias: &str, property_alias: &str) -> EditorKind {
        let key = (content_type_alias.to_string(), property_alias.to_string());
        if let Ok(cache) = self.cache.read() {
            if let Some(kind) = cache.get(&key) {
                return *kind;
            }
        }
        let kind = self.inner.editor_kind_for(content_type_alias, property_alias);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, kind);
        }
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingProvider {
        calls: Cell<usize>,
    }

    impl EditorKindProvider for CountingProvider {
        fn editor_kind_for(&self, _content_type_alias: &str, _property_alias: &str) -> EditorKind {
            self.calls.set(self.calls.get() + 1);
            EditorKind::TrueFalse
        }
    }

    #[test]
    fn test_from_editor_id() {
        assert_eq!(EditorKind::from_editor_id(TRUE_FALSE_EDITOR_ID), EditorKind::TrueFalse);
        assert_eq!(EditorKind::from_editor_id(DATE_EDITOR_ID), EditorKind::Date);
        assert_eq!(EditorKind::from_editor_id(Uuid::nil()), EditorKind::Unknown);
    }

    #[test]
    fn test_static_wildcard_content_type() {
        let kinds = StaticEditorKinds::new()
            .with("*", "umbracoNaviHide", EditorKind::TrueFalse)
            .with("newsItem", "publishDate", EditorKind::Date);
        assert_eq!(kinds.editor_kind_for("page", "umbracoNaviHide"), EditorKind::TrueFalse);
        assert_eq!(kinds.editor_kind_for("newsItem", "publishDate"), EditorKind::Date);
        assert_eq!(kinds.editor_kind_for("page", "publishDate"), EditorKind::Unknown);
    }

    #[test]
    fn test_cache_consults_provider_once() {
        let cached = CachedEditorKinds::new(CountingProvider { calls: Cell::new(0) });
        for _ in 0..3 {
            assert_eq!(cached.editor_kind_for("page", "hide"), EditorKind::TrueFalse);
        }
        assert_eq!(cached.inner.calls.get(), 1);
        assert_eq!(cached.len(), 1);
    }
}
