//! Positional predicates and node relationships

use tracing::debug;

use super::TreeNode;
use crate::collection::NodeCollection;
use crate::error::{QueryError, QueryResult};

/// Position test evaluated against a node's index in its owner list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionTest {
    First,
    NotFirst,
    Last,
    NotLast,
    Even,
    NotEven,
    Odd,
    NotOdd,
    Position(usize),
    NotPosition(usize),
    ModZero(usize),
    NotModZero(usize),
}

impl PositionTest {
    fn holds(self, index: usize, count: usize) -> QueryResult<bool> {
        use PositionTest::*;

        let result = match self {
            First => index == 0,
            NotFirst => index != 0,
            Last => index + 1 == count,
            NotLast => index + 1 != count,
            Even => index % 2 == 0,
            NotEven => index % 2 != 0,
            Odd => index % 2 == 1,
            NotOdd => index % 2 != 1,
            Position(k) => index == k,
            NotPosition(k) => index != k,
            ModZero(0) | NotModZero(0) => {
                return Err(QueryError::Evaluation(
                    "modulus of a position test must be positive".to_string(),
                ));
            }
            ModZero(k) => index % k == 0,
            NotModZero(k) => index % k != 0,
        };
        Ok(result)
    }
}

/// Pick one of two caller-supplied strings
pub fn choose(test: bool, if_true: &str, if_false: &str) -> String {
    if test { if_true } else { if_false }.to_string()
}

impl TreeNode {
    /// Collection positions are read against: the owner, else the parent's children
    pub fn owner_list(&self) -> QueryResult<NodeCollection> {
        if let Some(owner) = self.owner() {
            return Ok(owner);
        }
        let siblings = self.inner.siblings.get_or_init(|| {
            let parent = self.parent()?;
            debug!(
                "Derived owner list of node {} from parent {}",
                self.id(),
                parent.id()
            );
            Some(parent.children())
        });
        siblings.clone().ok_or(QueryError::OrphanedNode(self.id()))
    }

    /// Owner list together with this node's index in it
    pub(crate) fn placement(&self) -> QueryResult<(NodeCollection, usize)> {
        let list = self.owner_list()?;
        let index = list
            .position_of(self)
            .ok_or(QueryError::NotInOwnerList(self.id()))?;
        Ok((list, index))
    }

    /// Zero-based position in the owner list
    pub fn index(&self) -> QueryResult<usize> {
        self.placement().map(|(_, index)| index)
    }

    pub fn is(&self, test: PositionTest) -> QueryResult<bool> {
        let (list, index) = self.placement()?;
        test.holds(index, list.count())
    }

    /// String form of [`is`](Self::is)
    pub fn is_or(&self, test: PositionTest, if_true: &str, if_false: &str) -> QueryResult<String> {
        Ok(choose(self.is(test)?, if_true, if_false))
    }

    pub fn is_first(&self) -> QueryResult<bool> {
        self.is(PositionTest::First)
    }

    pub fn is_last(&self) -> QueryResult<bool> {
        self.is(PositionTest::Last)
    }

    pub fn is_even(&self) -> QueryResult<bool> {
        self.is(PositionTest::Even)
    }

    pub fn is_odd(&self) -> QueryResult<bool> {
        self.is(PositionTest::Odd)
    }

    pub fn is_position(&self, position: usize) -> QueryResult<bool> {
        self.is(PositionTest::Position(position))
    }

    pub fn is_mod_zero(&self, modulus: usize) -> QueryResult<bool> {
        self.is(PositionTest::ModZero(modulus))
    }

    pub fn is_equal(&self, other: &TreeNode) -> bool {
        self == other
    }

    /// Whether `other` lies on this node's path; the synthetic root is an
    /// ancestor of every node of its store
    pub fn is_descendant(&self, other: &TreeNode) -> bool {
        if self.is_null() || other.is_null() || self.kind() != other.kind() {
            return false;
        }
        self.record()
            .is_some_and(|record| record.ancestor_ids().contains(&other.id()))
    }

    pub fn is_descendant_or_self(&self, other: &TreeNode) -> bool {
        self.is_equal(other) || self.is_descendant(other)
    }

    pub fn is_ancestor(&self, other: &TreeNode) -> bool {
        other.is_descendant(self)
    }

    pub fn is_ancestor_or_self(&self, other: &TreeNode) -> bool {
        self.is_equal(other) || self.is_ancestor(other)
    }

    pub fn is_equal_or(&self, other: &TreeNode, if_true: &str, if_false: &str) -> String {
        choose(self.is_equal(other), if_true, if_false)
    }

    pub fn is_descendant_or(&self, other: &TreeNode, if_true: &str, if_false: &str) -> String {
        choose(self.is_descendant(other), if_true, if_false)
    }

    pub fn is_ancestor_or(&self, other: &TreeNode, if_true: &str, if_false: &str) -> String {
        choose(self.is_ancestor(other), if_true, if_false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NodeId;
    use crate::session::QuerySession;
    use crate::storage::MemoryRepository;

    fn session() -> QuerySession {
        let repo = MemoryRepository::from_yaml_str(
            r#"
documents:
  - id: 1
    name: Home
    type: home
    children:
      - id: 2
        name: A
        type: page
      - id: 3
        name: B
        type: page
        children:
          - id: 30
            name: B1
            type: page
      - id: 4
        name: C
        type: page
"#,
        )
        .unwrap();
        QuerySession::from_memory(repo).build()
    }

    #[test]
    fn test_holds() {
        assert!(PositionTest::Last.holds(2, 3).unwrap());
        assert!(PositionTest::Even.holds(0, 3).unwrap());
        assert!(PositionTest::Odd.holds(1, 3).unwrap());
        assert!(PositionTest::NotModZero(3).holds(2, 5).unwrap());
        assert!(PositionTest::ModZero(0).holds(2, 5).is_err());
    }

    #[test]
    fn test_index_from_derived_siblings() {
        let session = session();
        let b = session.node_by_id(3);
        assert!(b.owner().is_none());
        assert_eq!(b.index().unwrap(), 1);
        assert!(!b.is_first().unwrap());
        assert_eq!(b.is_or(PositionTest::Odd, "odd", "even").unwrap(), "odd");
        assert!(session.node_by_id(4).is_last().unwrap());
    }

    #[test]
    fn test_index_follows_owner_collection() {
        let session = session();
        let nodes = session.nodes_by_id([4, 2]);
        let c = nodes.get(0).unwrap();
        assert!(c.is_first().unwrap());
        assert_eq!(c.owner().unwrap().ids(), vec![NodeId(4), NodeId(2)]);
    }

    #[test]
    fn test_orphaned_root() {
        let root = session().root();
        assert!(matches!(root.index(), Err(QueryError::OrphanedNode(_))));
    }

    #[test]
    fn test_relations() {
        let session = session();
        let home = session.node_by_id(1);
        let b1 = session.node_by_id(30);
        let a = session.node_by_id(2);
        assert!(b1.is_descendant(&home));
        assert!(home.is_ancestor(&b1));
        assert!(!a.is_descendant(&home.children().get(1).unwrap()));
        assert!(b1.is_descendant(&session.root()));
        assert!(a.is_descendant_or_self(&session.node_by_id(2)));
        assert_eq!(a.is_ancestor_or(&b1, "yes", "no"), "no");
        assert!(!home.is_descendant(&session.media_root()));
    }
}
