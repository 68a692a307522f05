//! Relative traversal: up/down, siblings, ancestors and descendants

use std::convert::Infallible;

use super::TreeNode;
use crate::backing::BackingItem;
use crate::collection::NodeCollection;
use crate::error::QueryResult;
use crate::expression::EvalValue;

fn infallible<F>(mut keep: F) -> impl FnMut(&TreeNode) -> Result<bool, Infallible>
where
    F: FnMut(&TreeNode) -> bool,
{
    move |node| Ok(keep(node))
}

impl TreeNode {
    /// `up(0)` is the parent; every further step climbs one more level
    pub fn up(&self, steps: usize) -> Option<TreeNode> {
        let mut current = self.parent()?;
        for _ in 0..steps {
            current = current.parent()?;
        }
        Some(current)
    }

    /// Nearest ancestor of the given type; an empty alias means the parent
    pub fn up_to(&self, node_type_alias: &str) -> Option<TreeNode> {
        if node_type_alias.is_empty() {
            return self.parent();
        }
        let mut current = self.parent();
        while let Some(node) = current {
            if node.node_type_alias() == node_type_alias {
                return Some(node);
            }
            current = node.parent();
        }
        None
    }

    /// `down(0)` is the first child; every further step descends through first children
    pub fn down(&self, steps: usize) -> Option<TreeNode> {
        let mut current = self.children().get(0)?;
        for _ in 0..steps {
            current = current.children().get(0)?;
        }
        Some(current)
    }

    /// First descendant of the given type; an empty alias means the first child
    pub fn down_to(&self, node_type_alias: &str) -> Option<TreeNode> {
        if node_type_alias.is_empty() {
            return self.children().get(0);
        }
        self.descendants_of_type(node_type_alias).get(0)
    }

    /// `next(0)` is the node right after this one in its owner list
    pub fn next(&self, skip: usize) -> QueryResult<Option<TreeNode>> {
        let (list, index) = self.placement()?;
        Ok(list.get(index.saturating_add(skip).saturating_add(1)))
    }

    pub fn next_of(&self, node_type_alias: &str) -> QueryResult<Option<TreeNode>> {
        let (list, index) = self.placement()?;
        Ok(list
            .iter()
            .skip(index + 1)
            .find(|node| node.node_type_alias() == node_type_alias))
    }

    /// `previous(0)` is the node right before this one in its owner list
    pub fn previous(&self, skip: usize) -> QueryResult<Option<TreeNode>> {
        let (list, index) = self.placement()?;
        Ok(index
            .checked_sub(skip.saturating_add(1))
            .and_then(|i| list.get(i)))
    }

    pub fn previous_of(&self, node_type_alias: &str) -> QueryResult<Option<TreeNode>> {
        let (list, index) = self.placement()?;
        Ok(list
            .iter()
            .take(index)
            .filter(|node| node.node_type_alias() == node_type_alias)
            .last())
    }

    /// Node at `offset` from this one; `sibling(0)` is the node itself
    pub fn sibling(&self, offset: i64) -> QueryResult<Option<TreeNode>> {
        let (list, index) = self.placement()?;
        let target = i64::try_from(index)
            .ok()
            .and_then(|i| i.checked_add(offset))
            .and_then(|i| usize::try_from(i).ok());
        Ok(target.and_then(|i| list.get(i)))
    }

    pub fn sibling_of(&self, node_type_alias: &str) -> QueryResult<Option<TreeNode>> {
        let (list, index) = self.placement()?;
        Ok(list
            .iter()
            .enumerate()
            .find(|(i, node)| *i != index && node.node_type_alias() == node_type_alias)
            .map(|(_, node)| node))
    }

    /// Chain from the level-1 ancestor down to this node, excluding the synthetic root
    fn upward_chain(&self, include_self: bool) -> Vec<TreeNode> {
        let mut chain = Vec::new();
        if include_self {
            chain.push(self.clone());
        }
        let mut current = self.clone();
        while current.level() > 1 {
            match current.parent() {
                Some(parent) => {
                    chain.push(parent.clone());
                    current = parent;
                }
                None => break,
            }
        }
        chain.reverse();
        chain
    }

    /// Nearest node, starting with this one, that passes `test`
    pub fn try_ancestor_or_self<E>(
        &self,
        mut test: impl FnMut(&TreeNode) -> Result<bool, E>,
    ) -> Result<Option<TreeNode>, E> {
        for node in self.upward_chain(true).into_iter().rev() {
            if test(&node)? {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }

    fn try_upward<E>(
        &self,
        include_self: bool,
        mut keep: impl FnMut(&TreeNode) -> Result<bool, E>,
    ) -> Result<NodeCollection, E> {
        let mut kept = Vec::new();
        for node in self.upward_chain(include_self) {
            if keep(&node)? {
                kept.push(node);
            }
        }
        Ok(NodeCollection::with_session(self.session().clone(), kept))
    }

    /// Pre-order walk over the subtree; nodes are fresh handles so the
    /// owner links of memoized children stay untouched
    fn try_downward<E>(
        &self,
        include_self: bool,
        mut keep: impl FnMut(&TreeNode) -> Result<bool, E>,
    ) -> Result<NodeCollection, E> {
        let session = self.session();
        let mut kept = Vec::new();
        if self.is_null() {
            return Ok(NodeCollection::with_session(session.clone(), kept));
        }
        if include_self {
            let node = session.wrap(self.item().clone());
            if keep(&node)? {
                kept.push(node);
            }
        }
        let mut pending: Vec<BackingItem> = self.item().children().into_iter().rev().collect();
        while let Some(item) = pending.pop() {
            let node = session.wrap(item);
            pending.extend(node.item().children().into_iter().rev());
            if keep(&node)? {
                kept.push(node);
            }
        }
        Ok(NodeCollection::with_session(session.clone(), kept))
    }

    pub fn ancestor_or_self_by(&self, test: impl FnMut(&TreeNode) -> bool) -> Option<TreeNode> {
        let Ok(found) = self.try_ancestor_or_self(infallible(test));
        found
    }

    /// The level-1 ancestor (or this node at level 1)
    pub fn ancestor_or_self(&self) -> Option<TreeNode> {
        self.ancestor_or_self_by(|n| n.level() == 1)
    }

    pub fn ancestor_or_self_at_level(&self, level: i32) -> Option<TreeNode> {
        self.ancestor_or_self_by(|n| n.level() == level)
    }

    pub fn ancestor_or_self_of_type(&self, node_type_alias: &str) -> Option<TreeNode> {
        self.ancestor_or_self_by(|n| n.node_type_alias() == node_type_alias)
    }

    pub fn ancestor_or_self_where(&self, text: &str, params: &[EvalValue]) -> QueryResult<Option<TreeNode>> {
        let predicate = self.session().compile_predicate(text, params)?;
        self.try_ancestor_or_self(|n| predicate.test(n))
    }

    pub fn ancestors_or_self_by(&self, keep: impl FnMut(&TreeNode) -> bool) -> NodeCollection {
        let Ok(found) = self.try_upward(true, infallible(keep));
        found
    }

    pub fn ancestors_or_self(&self) -> NodeCollection {
        self.ancestors_or_self_by(|_| true)
    }

    /// Ancestors-or-self at or above `level`
    pub fn ancestors_or_self_at_level(&self, level: i32) -> NodeCollection {
        self.ancestors_or_self_by(|n| n.level() <= level)
    }

    pub fn ancestors_or_self_of_type(&self, node_type_alias: &str) -> NodeCollection {
        self.ancestors_or_self_by(|n| n.node_type_alias() == node_type_alias)
    }

    pub fn ancestors_or_self_where(&self, text: &str, params: &[EvalValue]) -> QueryResult<NodeCollection> {
        let predicate = self.session().compile_predicate(text, params)?;
        self.try_upward(true, |n| predicate.test(n))
    }

    pub fn ancestors_by(&self, keep: impl FnMut(&TreeNode) -> bool) -> NodeCollection {
        let Ok(found) = self.try_upward(false, infallible(keep));
        found
    }

    pub fn ancestors(&self) -> NodeCollection {
        self.ancestors_by(|_| true)
    }

    pub fn ancestors_at_level(&self, level: i32) -> NodeCollection {
        self.ancestors_by(|n| n.level() <= level)
    }

    pub fn ancestors_of_type(&self, node_type_alias: &str) -> NodeCollection {
        self.ancestors_by(|n| n.node_type_alias() == node_type_alias)
    }

    pub fn ancestors_where(&self, text: &str, params: &[EvalValue]) -> QueryResult<NodeCollection> {
        let predicate = self.session().compile_predicate(text, params)?;
        self.try_upward(false, |n| predicate.test(n))
    }

    pub fn descendants_by(&self, keep: impl FnMut(&TreeNode) -> bool) -> NodeCollection {
        let Ok(found) = self.try_downward(false, infallible(keep));
        found
    }

    pub fn descendants(&self) -> NodeCollection {
        self.descendants_by(|_| true)
    }

    /// Descendants at or below `level`
    pub fn descendants_at_level(&self, level: i32) -> NodeCollection {
        self.descendants_by(|n| n.level() >= level)
    }

    pub fn descendants_of_type(&self, node_type_alias: &str) -> NodeCollection {
        self.descendants_by(|n| n.node_type_alias() == node_type_alias)
    }

    pub fn descendants_where(&self, text: &str, params: &[EvalValue]) -> QueryResult<NodeCollection> {
        let predicate = self.session().compile_predicate(text, params)?;
        self.try_downward(false, |n| predicate.test(n))
    }

    pub fn descendants_or_self_by(&self, keep: impl FnMut(&TreeNode) -> bool) -> NodeCollection {
        let Ok(found) = self.try_downward(true, infallible(keep));
        found
    }

    pub fn descendants_or_self(&self) -> NodeCollection {
        self.descendants_or_self_by(|_| true)
    }

    pub fn descendants_or_self_at_level(&self, level: i32) -> NodeCollection {
        self.descendants_or_self_by(|n| n.level() >= level)
    }

    pub fn descendants_or_self_of_type(&self, node_type_alias: &str) -> NodeCollection {
        self.descendants_or_self_by(|n| n.node_type_alias() == node_type_alias)
    }

    pub fn descendants_or_self_where(&self, text: &str, params: &[EvalValue]) -> QueryResult<NodeCollection> {
        let predicate = self.session().compile_predicate(text, params)?;
        self.try_downward(true, |n| predicate.test(n))
    }
}
