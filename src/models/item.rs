//! Item record delivered by the content repository

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::identity::{ContentKind, NodeId};

/// Format used when a timestamp member is rendered as raw property text
pub const RECORD_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Attributes of a single document or media node
///
/// This is the "handle" the repository hands out. It carries the node's
/// identity and hierarchy but none of its named properties, which are
/// fetched per alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub id: NodeId,
    pub parent_id: NodeId,
    #[serde(default)]
    pub kind: ContentKind,
    pub name: String,
    pub node_type_alias: String,
    /// Depth in the tree; level-1 nodes sit directly under the root
    pub level: i32,
    /// Comma-joined ancestor-id chain ending with this node's id
    pub path: String,
    #[serde(default)]
    pub sort_order: i32,
    pub create_date: NaiveDateTime,
    pub update_date: NaiveDateTime,
    #[serde(default)]
    pub creator_name: String,
    #[serde(default)]
    pub writer_name: String,
    #[serde(default)]
    pub creator_id: i32,
    #[serde(default)]
    pub writer_id: i32,
    #[serde(default)]
    pub url_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub template: i32,
    #[serde(default = "Uuid::nil")]
    pub version: Uuid,
}

impl ItemRecord {
    /// Create a record with the identity fields set and everything else defaulted
    pub fn new(
        id: NodeId,
        parent_id: NodeId,
        name: impl Into<String>,
        node_type_alias: impl Into<String>,
    ) -> Self {
        let epoch = NaiveDateTime::default();
        Self {
            id,
            parent_id,
            kind: ContentKind::Document,
            name: name.into(),
            node_type_alias: node_type_alias.into(),
            level: 1,
            path: format!("{},{}", NodeId::ROOT, id),
            sort_order: 0,
            create_date: epoch,
            update_date: epoch,
            creator_name: String::new(),
            writer_name: String::new(),
            creator_id: 0,
            writer_id: 0,
            url_name: String::new(),
            url: None,
            template: 0,
            version: Uuid::nil(),
        }
    }

    /// The record standing in for the synthetic root (`-1`)
    pub fn synthetic_root() -> Self {
        Self {
            parent_id: NodeId::NONE,
            level: 0,
            path: NodeId::ROOT.to_string(),
            ..Self::new(NodeId::ROOT, NodeId::NONE, "", "")
        }
    }

    /// Ancestor ids parsed from the path, root first, excluding this node
    pub fn ancestor_ids(&self) -> Vec<NodeId> {
        self.path
            .split(',')
            .filter_map(NodeId::parse)
            .filter(|id| *id != self.id)
            .collect()
    }

    /// Text of a well-known member, matched case-insensitively
    ///
    /// This is the last tier of property lookup: a template asking for
    /// `"createDate"` or `"SortOrder"` gets the record attribute when no
    /// content property of that alias exists.
    pub fn member_text(&self, name: &str) -> Option<String> {
        let value = match name.to_ascii_lowercase().as_str() {
            "id" => self.id.to_string(),
            "parentid" => self.parent_id.to_string(),
            "name" | "nodename" => self.name.clone(),
            "nodetypealias" | "documenttypealias" => self.node_type_alias.clone(),
            "level" => self.level.to_string(),
            "path" => self.path.clone(),
            "sortorder" => self.sort_order.to_string(),
            "createdate" => self.create_date.format(RECORD_DATE_FORMAT).to_string(),
            "updatedate" => self.update_date.format(RECORD_DATE_FORMAT).to_string(),
            "creatorname" => self.creator_name.clone(),
            "writername" => self.writer_name.clone(),
            "creatorid" => self.creator_id.to_string(),
            "writerid" => self.writer_id.to_string(),
            "urlname" => self.url_name.clone(),
            "url" | "niceurl" => self.url.clone()?,
            "template" => self.template.to_string(),
            "version" => self.version.to_string(),
            _ => return None,
        };
        Some(value)
    }
}
