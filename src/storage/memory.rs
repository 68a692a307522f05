//! In-memory content repository
//!
//! Holds item records, raw property text and editor kinds in plain maps.
//! Trees are usually loaded from a nested YAML or JSON fixture:
//!
//! ```yaml
//! documents:
//!   - id: 1050
//!     name: Home
//!     type: homePage
//!     properties:
//!       siteTitle: Example
//!     children:
//!       - id: 1060
//!         name: News
//!         type: newsList
//! media: []
//! editors:
//!   "*":
//!     umbracoNaviHide: trueFalse
//! ```
//!
//! Level, path and parent id are computed from the nesting.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use tracing::info;

use super::editor::{EditorKind, EditorKindProvider, StaticEditorKinds};
use super::{ContentRepository, RepositoryError};
use crate::models::{ContentKind, ItemRecord, NodeId};

/// Content repository backed by in-process maps
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    records: HashMap<NodeId, ItemRecord>,
    children: HashMap<(NodeId, ContentKind), Vec<NodeId>>,
    properties: HashMap<NodeId, HashMap<String, Option<String>>>,
    editors: StaticEditorKinds,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TreeFixture {
    #[serde(default)]
    documents: Vec<FixtureNode>,
    #[serde(default)]
    media: Vec<FixtureNode>,
    #[serde(default)]
    editors: BTreeMap<String, BTreeMap<String, EditorKind>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureNode {
    id: i32,
    name: String,
    #[serde(alias = "type")]
    node_type_alias: String,
    sort_order: Option<i32>,
    create_date: Option<NaiveDateTime>,
    update_date: Option<NaiveDateTime>,
    #[serde(default)]
    creator_name: String,
    #[serde(default)]
    writer_name: String,
    #[serde(default)]
    creator_id: i32,
    #[serde(default)]
    writer_id: i32,
    url_name: Option<String>,
    url: Option<String>,
    #[serde(default)]
    template: i32,
    #[serde(default)]
    properties: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    children: Vec<FixtureNode>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a nested tree fixture from YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let fixture: TreeFixture =
            serde_yaml::from_str(yaml).context("Failed to parse YAML content tree")?;
        Self::from_fixture(fixture)
    }

    /// Load a nested tree fixture from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let fixture: TreeFixture =
            serde_json::from_str(json).context("Failed to parse JSON content tree")?;
        Self::from_fixture(fixture)
    }

    /// Load a fixture file; `.json` files are read as JSON, everything else as YAML
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read content tree {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let loaded = if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        };
        loaded.with_context(|| format!("Invalid content tree {}", path.display()))
    }

    fn from_fixture(fixture: TreeFixture) -> Result<Self> {
        let mut repo = Self::new();
        let root = ItemRecord::synthetic_root();
        for node in fixture.documents {
            repo.load_node(node, &root, ContentKind::Document)?;
        }
        for node in fixture.media {
            repo.load_node(node, &root, ContentKind::Media)?;
        }
        for (type_alias, props) in fixture.editors {
            for (alias, kind) in props {
                repo.editors.insert(type_alias.clone(), alias, kind);
            }
        }
        info!(
            "Loaded content tree with {} items and {} property values",
            repo.records.len(),
            repo.properties.values().map(|p| p.len()).sum::<usize>()
        );
        Ok(repo)
    }

    fn load_node(&mut self, node: FixtureNode, parent: &ItemRecord, kind: ContentKind) -> Result<()> {
        let id = NodeId(node.id);
        if id.is_root() || id.is_none() {
            anyhow::bail!("Node '{}' uses reserved id {}", node.name, id);
        }
        if self.records.contains_key(&id) {
            anyhow::bail!("Duplicate node id {} ('{}')", id, node.name);
        }

        let sibling_count = self
            .children
            .get(&(parent.id, kind))
            .map(|c| c.len())
            .unwrap_or(0);
        let mut record = ItemRecord::new(id, parent.id, node.name, node.node_type_alias);
        record.kind = kind;
        record.level = parent.level + 1;
        record.path = format!("{},{}", parent.path, id);
        record.sort_order = node.sort_order.unwrap_or(sibling_count as i32);
        record.create_date = node.create_date.unwrap_or_default();
        record.update_date = node.update_date.unwrap_or(record.create_date);
        record.creator_name = node.creator_name;
        record.writer_name = node.writer_name;
        record.creator_id = node.creator_id;
        record.writer_id = node.writer_id;
        record.url_name = node
            .url_name
            .unwrap_or_else(|| record.name.to_lowercase().replace(' ', "-"));
        record.url = node.url;
        record.template = node.template;

        for (alias, value) in node.properties {
            let raw = raw_text(&value);
            self.set_property(id, alias, raw);
        }

        let children = node.children;
        self.insert(record.clone());
        for child in children {
            self.load_node(child, &record, kind)
                .with_context(|| format!("In children of node {}", id))?;
        }
        Ok(())
    }

    /// Add or replace a record and link it under its parent, keeping sort order
    pub fn insert(&mut self, record: ItemRecord) -> &mut Self {
        let id = record.id;
        let key = (record.parent_id, record.kind);
        if let Some(previous) = self.records.insert(id, record) {
            if let Some(siblings) = self.children.get_mut(&(previous.parent_id, previous.kind)) {
                siblings.retain(|s| *s != id);
            }
        }
        let siblings = self.children.entry(key).or_default();
        siblings.push(id);
        let records = &self.records;
        siblings.sort_by_key(|s| records.get(s).map(|r| r.sort_order).unwrap_or_default());
        self
    }

    /// Set the raw text of a property; `None` stores an explicit null
    pub fn set_property(
        &mut self,
        id: NodeId,
        alias: impl Into<String>,
        raw: Option<String>,
    ) -> &mut Self {
        self.properties
            .entry(id)
            .or_default()
            .insert(alias.into(), raw);
        self
    }

    /// Declare the editor kind of a property (content type `"*"` matches all)
    pub fn set_editor(
        &mut self,
        content_type_alias: impl Into<String>,
        property_alias: impl Into<String>,
        kind: EditorKind,
    ) -> &mut Self {
        self.editors.insert(content_type_alias, property_alias, kind);
        self
    }

    pub fn record(&self, id: NodeId) -> Option<&ItemRecord> {
        self.records.get(&id)
    }

    /// All records of one kind, in no particular order
    pub fn records(&self, kind: ContentKind) -> impl Iterator<Item = &ItemRecord> {
        self.records.values().filter(move |r| r.kind == kind)
    }

    /// Raw property map of a node
    pub fn properties_of(&self, id: NodeId) -> Option<&HashMap<String, Option<String>>> {
        self.properties.get(&id)
    }

    /// Every property alias used anywhere in the tree
    pub fn known_aliases(&self) -> BTreeSet<String> {
        self.properties
            .values()
            .flat_map(|props| props.keys().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Fixture scalars are written naturally in YAML; store them as text
fn raw_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

impl ContentRepository for MemoryRepository {
    fn get_by_id(&self, id: NodeId, kind: ContentKind) -> Result<Option<ItemRecord>, RepositoryError> {
        Ok(self.records.get(&id).filter(|r| r.kind == kind).cloned())
    }

    fn get_children(&self, id: NodeId, kind: ContentKind) -> Result<Vec<ItemRecord>, RepositoryError> {
        let ids = match self.children.get(&(id, kind)) {
            Some(ids) => ids,
            None => return Ok(Vec::new()),
        };
        ids.iter()
            .map(|child| {
                self.records
                    .get(child)
                    .cloned()
                    .ok_or_else(|| RepositoryError::CorruptRecord {
                        id: *child,
                        message: format!("listed under {} but not stored", id),
                    })
            })
            .collect()
    }

    fn get_property(&self, id: NodeId, alias: &str) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .properties
            .get(&id)
            .and_then(|props| props.get(alias))
            .cloned()
            .flatten())
    }
}

impl EditorKindProvider for MemoryRepository {
    fn editor_kind_for(&self, content_type_alias: &str, property_alias: &str) -> EditorKind {
        self.editors.editor_kind_for(content_type_alias, property_alias)
    }
}
