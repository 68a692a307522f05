//! Id-based set operators

use std::collections::HashSet;

use super::NodeCollection;
use crate::models::{ContentKind, NodeId};
use crate::node::TreeNode;

type Identity = (NodeId, Option<ContentKind>);

fn identity(node: &TreeNode) -> Identity {
    (node.id(), node.kind())
}

impl NodeCollection {
    fn identities(&self) -> HashSet<Identity> {
        self.iter().map(|n| identity(&n)).collect()
    }

    /// First occurrence of every node, in order
    pub fn distinct(&self) -> NodeCollection {
        let mut seen = HashSet::new();
        self.filter_by(|n| seen.insert(identity(n)))
    }

    /// Distinct nodes of this collection followed by those of `other` not yet seen
    pub fn union(&self, other: &NodeCollection) -> NodeCollection {
        let mut seen = HashSet::new();
        let nodes: Vec<TreeNode> = self
            .iter()
            .chain(other.iter())
            .filter(|n| seen.insert(identity(n)))
            .collect();
        self.derive(nodes)
    }

    /// Distinct nodes of this collection that are not in `other`
    pub fn except(&self, other: &NodeCollection) -> NodeCollection {
        let mut seen = other.identities();
        self.filter_by(|n| seen.insert(identity(n)))
    }

    /// Distinct nodes of this collection that are also in `other`
    pub fn intersect(&self, other: &NodeCollection) -> NodeCollection {
        let mut wanted = other.identities();
        self.filter_by(|n| wanted.remove(&identity(n)))
    }
}

#[cfg(test)]
mod tests {
    use crate::models::NodeId;
    use crate::session::QuerySession;
    use crate::storage::MemoryRepository;

    fn session() -> QuerySession {
        let repo = MemoryRepository::from_yaml_str(
            r#"
documents:
  - { id: 1, name: A, type: page }
  - { id: 2, name: B, type: page }
  - { id: 3, name: C, type: page }
  - { id: 4, name: D, type: page }
"#,
        )
        .unwrap();
        QuerySession::from_memory(repo).build()
    }

    #[test]
    fn test_set_operators() {
        let session = session();
        let left = session.nodes_by_id([1, 2, 2, 3]);
        let right = session.nodes_by_id([3, 4]);
        assert_eq!(left.distinct().ids(), vec![NodeId(1), NodeId(2), NodeId(3)]);
        assert_eq!(
            left.union(&right).ids(),
            vec![NodeId(1), NodeId(2), NodeId(3), NodeId(4)]
        );
        assert_eq!(left.except(&right).ids(), vec![NodeId(1), NodeId(2)]);
        assert_eq!(left.intersect(&right).ids(), vec![NodeId(3)]);
    }
}
