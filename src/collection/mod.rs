//! Node collections
//!
//! A [`NodeCollection`] is an ordered, owner-linked sequence of
//! [`TreeNode`]s. Query operators take expression text, compile it once
//! through the session's [`ExpressionCompiler`] and evaluate it per node.
//! Operators that produce a sequence build a new collection, which becomes
//! the owner of the nodes it holds (the last collection a node was added
//! to wins).

pub mod aggregate;
pub mod grouping;
pub mod ordering;
pub mod sets;

pub use aggregate::{Aggregate, Projection};
pub use grouping::{Grouping, Groupings};
pub use ordering::OrderedCollection;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::expression::{CompiledExpression, EvalValue, ExpressionCompiler, Predicate};
use crate::models::NodeId;
use crate::node::TreeNode;
use crate::session::QuerySession;

/// Shared storage behind a collection; nodes point back at it weakly
pub(crate) struct OwnerList {
    items: RefCell<Vec<TreeNode>>,
    session: Option<QuerySession>,
}

/// Ordered sequence of nodes
#[derive(Clone)]
pub struct NodeCollection {
    list: Rc<OwnerList>,
}

impl fmt::Debug for NodeCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.list.items.borrow().iter()).finish()
    }
}

impl Default for NodeCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeCollection {
    pub fn new() -> Self {
        Self::build(None, Vec::new())
    }

    /// Collection over `nodes`; the session is taken from the first node
    pub fn from_nodes(nodes: impl IntoIterator<Item = TreeNode>) -> Self {
        let nodes: Vec<TreeNode> = nodes.into_iter().collect();
        let session = nodes.first().map(|n| n.session().clone());
        Self::build(session, nodes)
    }

    pub fn with_session(session: QuerySession, nodes: impl IntoIterator<Item = TreeNode>) -> Self {
        Self::build(Some(session), nodes.into_iter().collect())
    }

    fn build(session: Option<QuerySession>, nodes: Vec<TreeNode>) -> Self {
        let list = Rc::new(OwnerList {
            items: RefCell::new(nodes),
            session,
        });
        for node in list.items.borrow().iter() {
            node.set_owner(&list);
        }
        Self { list }
    }

    pub(crate) fn from_list(list: Rc<OwnerList>) -> Self {
        Self { list }
    }

    /// New collection over some of this one's nodes, in the given order
    pub(crate) fn derive(&self, nodes: impl IntoIterator<Item = TreeNode>) -> Self {
        Self::build(self.session(), nodes.into_iter().collect())
    }

    pub fn session(&self) -> Option<QuerySession> {
        self.list.session.clone().or_else(|| {
            self.list
                .items
                .borrow()
                .first()
                .map(|n| n.session().clone())
        })
    }

    pub fn len(&self) -> usize {
        self.list.items.borrow().len()
    }

    pub fn count(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<TreeNode> {
        self.list.items.borrow().get(index).cloned()
    }

    /// Snapshot of the current items
    pub fn to_vec(&self) -> Vec<TreeNode> {
        self.list.items.borrow().clone()
    }

    pub fn iter(&self) -> std::vec::IntoIter<TreeNode> {
        self.to_vec().into_iter()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.list.items.borrow().iter().map(TreeNode::id).collect()
    }

    /// Index of `node`: the same handle if present, else the first node of the same record
    pub fn position_of(&self, node: &TreeNode) -> Option<usize> {
        let items = self.list.items.borrow();
        items
            .iter()
            .position(|n| n.same_instance(node))
            .or_else(|| items.iter().position(|n| n == node))
    }

    pub fn contains(&self, node: &TreeNode) -> bool {
        self.list.items.borrow().iter().any(|n| n == node)
    }

    /// Append a node and make this collection its owner
    pub fn push(&self, node: TreeNode) {
        node.set_owner(&self.list);
        self.list.items.borrow_mut().push(node);
    }

    /// Remove the first occurrence of `node`; its owner link is cleared if it points here
    pub fn remove(&self, node: &TreeNode) -> Option<TreeNode> {
        let index = self.position_of(node)?;
        let removed = self.list.items.borrow_mut().remove(index);
        removed.clear_owner_if(&self.list);
        Some(removed)
    }

    fn compiler_result<T>(
        &self,
        with_session: impl FnOnce(&QuerySession) -> QueryResult<T>,
        standalone: impl FnOnce(ExpressionCompiler<'_>) -> QueryResult<T>,
    ) -> QueryResult<T> {
        match self.session() {
            Some(session) => with_session(&session),
            None => standalone(ExpressionCompiler::new()),
        }
    }

    pub fn compile(&self, text: &str, params: &[EvalValue]) -> QueryResult<CompiledExpression> {
        self.compiler_result(
            |s| s.compile(text, params),
            |c| c.compile(text, params),
        )
    }

    pub fn compile_predicate(&self, text: &str, params: &[EvalValue]) -> QueryResult<Predicate> {
        self.compiler_result(
            |s| s.compile_predicate(text, params),
            |c| c.compile_predicate(text, params),
        )
    }

    /// Predicate from text; empty text accepts every node
    fn optional_predicate(&self, text: &str, params: &[EvalValue]) -> QueryResult<Option<Predicate>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.compile_predicate(text, params).map(Some)
    }

    fn matching(&self, predicate: Option<&Predicate>) -> QueryResult<Vec<TreeNode>> {
        let mut kept = Vec::new();
        for node in self.iter() {
            let keep = match predicate {
                Some(predicate) => predicate.test(&node)?,
                None => true,
            };
            if keep {
                kept.push(node);
            }
        }
        Ok(kept)
    }

    /// Nodes passing a predicate, in their current order (the `where` operator)
    pub fn filter(&self, text: &str, params: &[EvalValue]) -> QueryResult<NodeCollection> {
        let predicate = self.compile_predicate(text, params)?;
        let filtered = self.filter_with(&predicate)?;
        debug!(
            "Filtered {} nodes to {} with '{}'",
            self.len(),
            filtered.len(),
            text
        );
        Ok(filtered)
    }

    pub fn filter_with(&self, predicate: &Predicate) -> QueryResult<NodeCollection> {
        Ok(self.derive(self.matching(Some(predicate))?))
    }

    pub fn filter_by(&self, mut keep: impl FnMut(&TreeNode) -> bool) -> NodeCollection {
        self.derive(self.iter().filter(|n| keep(n)))
    }

    pub fn take(&self, n: usize) -> NodeCollection {
        self.derive(self.iter().take(n))
    }

    pub fn skip(&self, n: usize) -> NodeCollection {
        self.derive(self.iter().skip(n))
    }

    pub fn reverse(&self) -> NodeCollection {
        self.derive(self.iter().rev())
    }

    pub fn first(&self, text: &str, params: &[EvalValue]) -> QueryResult<TreeNode> {
        self.first_or_default(text, params)?
            .ok_or(QueryError::NoMatch { operation: "First" })
    }

    pub fn first_or_default(&self, text: &str, params: &[EvalValue]) -> QueryResult<Option<TreeNode>> {
        let predicate = self.optional_predicate(text, params)?;
        for node in self.iter() {
            let hit = match &predicate {
                Some(predicate) => predicate.test(&node)?,
                None => true,
            };
            if hit {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    pub fn last(&self, text: &str, params: &[EvalValue]) -> QueryResult<TreeNode> {
        self.last_or_default(text, params)?
            .ok_or(QueryError::NoMatch { operation: "Last" })
    }

    pub fn last_or_default(&self, text: &str, params: &[EvalValue]) -> QueryResult<Option<TreeNode>> {
        let predicate = self.optional_predicate(text, params)?;
        Ok(self.matching(predicate.as_ref())?.pop())
    }

    /// The only matching node; zero or several matches are errors
    pub fn single(&self, text: &str, params: &[EvalValue]) -> QueryResult<TreeNode> {
        self.single_or_default(text, params)?
            .ok_or(QueryError::NoMatch { operation: "Single" })
    }

    /// Like [`single`](Self::single) but zero matches give `None`
    pub fn single_or_default(&self, text: &str, params: &[EvalValue]) -> QueryResult<Option<TreeNode>> {
        let predicate = self.optional_predicate(text, params)?;
        let mut matches = self.matching(predicate.as_ref())?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            count => Err(QueryError::MultipleMatches {
                operation: "Single",
                count,
            }),
        }
    }

    pub fn count_where(&self, text: &str, params: &[EvalValue]) -> QueryResult<usize> {
        let predicate = self.optional_predicate(text, params)?;
        Ok(self.matching(predicate.as_ref())?.len())
    }

    pub fn any(&self) -> bool {
        !self.is_empty()
    }

    pub fn any_where(&self, text: &str, params: &[EvalValue]) -> QueryResult<bool> {
        let predicate = self.compile_predicate(text, params)?;
        for node in self.iter() {
            if predicate.test(&node)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl IntoIterator for NodeCollection {
    type Item = TreeNode;
    type IntoIter = std::vec::IntoIter<TreeNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for &NodeCollection {
    type Item = TreeNode;
    type IntoIter = std::vec::IntoIter<TreeNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<TreeNode> for NodeCollection {
    fn from_iter<I: IntoIterator<Item = TreeNode>>(iter: I) -> Self {
        Self::from_nodes(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
        name: Alpha
        type: page
        properties:
          rating: "3"
      - id: 3
        name: Beta
        type: post
        properties:
          rating: "5"
      - id: 4
        name: Gamma
        type: page
"#,
        )
        .unwrap();
        QuerySession::from_memory(repo).build()
    }

    #[test]
    fn test_push_and_remove_manage_owner() {
        let session = session();
        let nodes = NodeCollection::new();
        let beta = session.node_by_id(3);
        nodes.push(beta.clone());
        assert_eq!(beta.index().unwrap(), 0);
        assert_eq!(beta.owner().unwrap().ids(), vec![NodeId(3)]);

        let other = NodeCollection::new();
        other.push(session.node_by_id(2));
        other.push(beta.clone());
        assert_eq!(beta.index().unwrap(), 1);

        nodes.remove(&beta);
        assert_eq!(beta.owner().unwrap().len(), 2);
        other.remove(&beta);
        assert!(beta.owner().is_none());
        assert_eq!(beta.index().unwrap(), 1);
    }

    #[test]
    fn test_filter_and_first() {
        let children = session().node_by_id(1).children();
        let pages = children.filter("NodeTypeAlias == \"page\"", &[]).unwrap();
        assert_eq!(pages.ids(), vec![NodeId(2), NodeId(4)]);
        assert_eq!(pages.get(1).unwrap().index().unwrap(), 1);

        assert_eq!(children.first("", &[]).unwrap().id(), NodeId(2));
        assert_eq!(children.last("rating > 1", &[]).unwrap().id(), NodeId(3));
        assert!(children.first_or_default("rating > 10", &[]).unwrap().is_none());
        assert!(matches!(
            children.first("rating > 10", &[]),
            Err(QueryError::NoMatch { .. })
        ));
    }

    #[test]
    fn test_single() {
        let children = session().node_by_id(1).children();
        assert_eq!(children.single("Name == @0", &[EvalValue::from("Beta")]).unwrap().id(), NodeId(3));
        assert!(matches!(
            children.single("", &[]),
            Err(QueryError::MultipleMatches { count: 3, .. })
        ));
        assert!(children.single_or_default("Id == 99", &[]).unwrap().is_none());
    }

    #[test]
    fn test_take_skip_reverse_count() {
        let children = session().node_by_id(1).children();
        assert_eq!(children.take(2).ids(), vec![NodeId(2), NodeId(3)]);
        assert_eq!(children.skip(2).ids(), vec![NodeId(4)]);
        assert_eq!(children.reverse().ids(), vec![NodeId(4), NodeId(3), NodeId(2)]);
        assert_eq!(children.count_where("rating >= 3", &[]).unwrap(), 2);
        assert!(children.any_where("Name.StartsWith(\"G\")", &[]).unwrap());
        assert!(NodeCollection::new().first_or_default("", &[]).unwrap().is_none());
    }

    #[test]
    fn test_invalid_predicate_surfaces() {
        let children = session().node_by_id(1).children();
        assert!(children.filter("Name ==", &[]).is_err());
    }
}
