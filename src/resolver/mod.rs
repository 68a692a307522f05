//! Layered property resolution
//!
//! Each tier is a separate method so it can be exercised on its own:
//!
//! 1. [`PropertyResolver::exact`]: the alias as given
//! 2. [`PropertyResolver::case_swapped`]: `BodyText` retried as `bodyText`
//! 3. [`PropertyResolver::reflected`]: well-known record members (`Name`, `SortOrder`, ...)
//! 4. [`PropertyResolver::recursive`]: tiers 1-3 up the ancestor chain until a
//!    non-blank value turns up
//!
//! [`PropertyResolver::resolve`] runs tiers 1-3, or tier 4 when the alias
//! carries the `_` prefix (`_footer` means "footer, inherited").

use serde::Serialize;

use crate::backing::{BackingItem, lower_first};
use crate::models::PropertyValue;

/// Prefix marking an alias for recursive lookup
pub const RECURSIVE_PREFIX: char = '_';

/// Outcome of a property lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Resolution {
    Found(PropertyValue),
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    pub fn value(&self) -> Option<&PropertyValue> {
        match self {
            Resolution::Found(v) => Some(v),
            Resolution::NotFound => None,
        }
    }

    pub fn into_option(self) -> Option<PropertyValue> {
        match self {
            Resolution::Found(v) => Some(v),
            Resolution::NotFound => None,
        }
    }

    /// Keep the first hit, otherwise run `next`
    pub fn or_else(self, next: impl FnOnce() -> Resolution) -> Resolution {
        match self {
            Resolution::NotFound => next(),
            found => found,
        }
    }
}

impl From<Option<PropertyValue>> for Resolution {
    fn from(value: Option<PropertyValue>) -> Self {
        match value {
            Some(v) => Resolution::Found(v),
            None => Resolution::NotFound,
        }
    }
}

/// Split `_alias` into (`alias`, true); anything else is returned unchanged
pub fn split_recursive(alias: &str) -> (&str, bool) {
    match alias.strip_prefix(RECURSIVE_PREFIX) {
        Some(rest) if !rest.is_empty() => (rest, true),
        _ => (alias, false),
    }
}

/// Stateless resolver over [`BackingItem`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyResolver;

impl PropertyResolver {
    pub fn new() -> Self {
        PropertyResolver
    }

    pub fn exact(&self, item: &BackingItem, alias: &str) -> Resolution {
        item.exact_property(alias).into()
    }

    pub fn case_swapped(&self, item: &BackingItem, alias: &str) -> Resolution {
        match lower_first(alias) {
            Some(camel) => item.exact_property(&camel).into(),
            None => Resolution::NotFound,
        }
    }

    pub fn reflected(&self, item: &BackingItem, alias: &str) -> Resolution {
        item.member_property(alias).into()
    }

    pub fn recursive(&self, item: &BackingItem, alias: &str) -> Resolution {
        item.get_property_recursive(alias).into()
    }

    /// Full chain, honouring the `_alias` convention
    pub fn resolve(&self, item: &BackingItem, alias: &str) -> Resolution {
        let (alias, recursive) = split_recursive(alias);
        if recursive {
            return self.recursive(item, alias);
        }
        self.exact(item, alias)
            .or_else(|| self.case_swapped(item, alias))
            .or_else(|| self.reflected(item, alias))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentKind, NodeId};
    use crate::storage::{ContentRepository, MemoryRepository};
    use std::rc::Rc;

    fn items() -> (BackingItem, BackingItem) {
        let repo: Rc<dyn ContentRepository> = Rc::new(
            MemoryRepository::from_yaml_str(
                r#"
documents:
  - id: 1
    name: Home
    type: home
    properties:
      bodyText: Welcome
      metaTitle: Site
    children:
      - id: 2
        name: Child
        type: page
        properties:
          Name: Stored name
"#,
            )
            .unwrap(),
        );
        (
            BackingItem::load(NodeId(1), ContentKind::Document, Rc::clone(&repo)),
            BackingItem::load(NodeId(2), ContentKind::Document, repo),
        )
    }

    #[test]
    fn test_tiers_in_isolation() {
        let (home, _) = items();
        let resolver = PropertyResolver::new();
        assert!(resolver.exact(&home, "bodyText").is_found());
        assert!(!resolver.exact(&home, "BodyText").is_found());
        assert!(resolver.case_swapped(&home, "BodyText").is_found());
        assert!(!resolver.case_swapped(&home, "bodyText").is_found());
        assert!(resolver.reflected(&home, "SortOrder").is_found());
        assert!(!resolver.reflected(&home, "bodyText").is_found());
    }

    #[test]
    fn test_pascal_and_camel_resolve_identically() {
        let (home, _) = items();
        let resolver = PropertyResolver::new();
        assert_eq!(
            resolver.resolve(&home, "BodyText"),
            resolver.resolve(&home, "bodyText")
        );
    }

    #[test]
    fn test_stored_property_shadows_member() {
        let (_, child) = items();
        let resolved = PropertyResolver::new().resolve(&child, "Name");
        assert_eq!(resolved.value().unwrap().value(), "Stored name");
    }

    #[test]
    fn test_underscore_prefix_is_recursive() {
        let (_, child) = items();
        let resolver = PropertyResolver::new();
        assert!(!resolver.resolve(&child, "metaTitle").is_found());
        let inherited = resolver.resolve(&child, "_metaTitle").into_option().unwrap();
        assert_eq!(inherited.value(), "Site");
        assert_eq!(inherited.context_id, NodeId(1));
        assert_eq!(split_recursive("_"), ("_", false));
    }
}
