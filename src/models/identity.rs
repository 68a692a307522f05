//! Node identity and content kind

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque integer identifier of a content node
///
/// `-1` is the synthetic root (no properties, real children) and `0` means
/// "absent / not found". Both are distinguishable from every genuine id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i32);

impl NodeId {
    /// The synthetic root above all level-1 nodes
    pub const ROOT: NodeId = NodeId(-1);

    /// The "not found" identifier
    pub const NONE: NodeId = NodeId(0);

    pub fn new(id: i32) -> Self {
        NodeId(id)
    }

    pub fn get(&self) -> i32 {
        self.0
    }

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Parse an id from text, as found in media-picker property values
    pub fn parse(text: &str) -> Option<Self> {
        text.trim().parse::<i32>().ok().map(NodeId)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for NodeId {
    fn from(id: i32) -> Self {
        NodeId(id)
    }
}

/// Which content store a node lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentKind {
    #[default]
    Document,
    Media,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Document => write!(f, "document"),
            ContentKind::Media => write!(f, "media"),
        }
    }
}
