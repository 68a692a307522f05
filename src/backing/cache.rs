//! Opt-in process-wide property cache

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::models::NodeId;

type CacheKey = (NodeId, String);

/// Raw property text keyed by (node id, alias)
///
/// Clones share the same map, so one cache can serve many sessions. Misses
/// are cached too (`None`), which keeps repeated lookups of unset aliases
/// off the repository.
#[derive(Debug, Clone, Default)]
pub struct PropertyCache {
    entries: Arc<RwLock<HashMap<CacheKey, Option<String>>>>,
}

impl PropertyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached lookup result; the outer `None` means "not cached yet"
    pub fn get(&self, id: NodeId, alias: &str) -> Option<Option<String>> {
        let entries = self.entries.read().ok()?;
        entries.get(&(id, alias.to_string())).cloned()
    }

    pub fn insert(&self, id: NodeId, alias: &str, raw: Option<String>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert((id, alias.to_string()), raw);
        }
    }

    /// Drop every entry of one node
    pub fn invalidate(&self, id: NodeId) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|(node, _), _| *node != id);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_entries() {
        let cache = PropertyCache::new();
        let other = cache.clone();
        cache.insert(NodeId(1), "title", Some("Hi".into()));
        cache.insert(NodeId(1), "missing", None);
        cache.insert(NodeId(2), "title", Some("Yo".into()));
        assert_eq!(other.get(NodeId(1), "title"), Some(Some("Hi".to_string())));
        assert_eq!(other.get(NodeId(1), "missing"), Some(None));
        assert_eq!(other.get(NodeId(1), "other"), None);

        other.invalidate(NodeId(1));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(other.is_empty());
    }
}
