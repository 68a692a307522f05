//! Grouping results

use std::cmp::Ordering;
use tracing::debug;

use super::NodeCollection;
use crate::error::{QueryError, QueryResult};
use crate::expression::EvalValue;
use crate::models::CoercedValue;
use crate::node::TreeNode;

/// One key with the nodes that produced it, in their original relative order
#[derive(Debug, Clone)]
pub struct Grouping {
    pub key: CoercedValue,
    pub elements: NodeCollection,
}

impl Grouping {
    pub fn count(&self) -> usize {
        self.elements.count()
    }
}

/// Groups in first-appearance order of their keys
#[derive(Debug, Clone, Default)]
pub struct Groupings {
    groups: Vec<Grouping>,
}

#[derive(Debug, Clone, Copy)]
enum GroupKey {
    Key,
    Count,
}

impl Groupings {
    fn from_buckets(source: &NodeCollection, buckets: Vec<(CoercedValue, Vec<TreeNode>)>) -> Self {
        let groups = buckets
            .into_iter()
            .map(|(key, nodes)| Grouping {
                key,
                elements: source.derive(nodes),
            })
            .collect();
        Self { groups }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Grouping> {
        self.groups.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Grouping> {
        self.groups.iter()
    }

    pub fn keys(&self) -> Vec<CoercedValue> {
        self.groups.iter().map(|g| g.key.clone()).collect()
    }

    /// Group whose key is `key`
    pub fn find(&self, key: impl Into<CoercedValue>) -> Option<&Grouping> {
        let key = key.into();
        self.groups.iter().find(|g| g.key.same_key(&key))
    }

    /// Re-sort the groups by `"Key"` or `"Count"`, each optionally followed by `desc`
    pub fn order_by(mut self, ordering: &str) -> QueryResult<Self> {
        let mut clauses = Vec::new();
        let mut offset = 0;
        for clause in ordering.split(',') {
            let mut words = clause.split_whitespace();
            let field = match words.next() {
                Some(w) if w.eq_ignore_ascii_case("key") => GroupKey::Key,
                Some(w) if w.eq_ignore_ascii_case("count") => GroupKey::Count,
                other => {
                    return Err(QueryError::UnknownIdentifier {
                        name: other.unwrap_or_default().to_string(),
                        position: offset,
                    });
                }
            };
            let descending = words.next().is_some_and(|w| w.eq_ignore_ascii_case("desc"));
            clauses.push((field, descending));
            offset += clause.len() + 1;
        }
        self.groups.sort_by(|a, b| {
            clauses
                .iter()
                .map(|(field, descending)| {
                    let ordering = match field {
                        GroupKey::Key => a.key.compare_total(&b.key),
                        GroupKey::Count => a.count().cmp(&b.count()),
                    };
                    if *descending { ordering.reverse() } else { ordering }
                })
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        Ok(self)
    }
}

impl IntoIterator for Groupings {
    type Item = Grouping;
    type IntoIter = std::vec::IntoIter<Grouping>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

impl<'a> IntoIterator for &'a Groupings {
    type Item = &'a Grouping;
    type IntoIter = std::slice::Iter<'a, Grouping>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

fn bucket_count(n: usize, operation: &str) -> QueryResult<usize> {
    if n == 0 {
        return Err(QueryError::Evaluation(format!(
            "{} needs a positive group count",
            operation
        )));
    }
    Ok(n)
}

impl NodeCollection {
    /// Group nodes by the value of a key expression
    ///
    /// Absent keys form their own group; see [`CoercedValue::same_key`].
    pub fn group_by(&self, text: &str, params: &[EvalValue]) -> QueryResult<Groupings> {
        let selector = self.compile(text, params)?;
        let mut buckets: Vec<(CoercedValue, Vec<TreeNode>)> = Vec::new();
        for node in self.iter() {
            let key = selector.evaluate_scalar(&node)?;
            match buckets.iter_mut().find(|(k, _)| k.same_key(&key)) {
                Some((_, nodes)) => nodes.push(node),
                None => buckets.push((key, vec![node])),
            }
        }
        debug!("Grouped {} nodes into {} groups by '{}'", self.len(), buckets.len(), text);
        Ok(Groupings::from_buckets(self, buckets))
    }

    /// Split into `n` buckets of near-equal size by position
    pub fn grouped_into(&self, n: usize) -> QueryResult<Groupings> {
        let n = bucket_count(n, "GroupedInto")?;
        let size = self.len().div_ceil(n).max(1);
        Ok(self.chunked(size))
    }

    /// Split into buckets of `n` nodes; the last may be shorter
    pub fn in_groups_of(&self, n: usize) -> QueryResult<Groupings> {
        let size = bucket_count(n, "InGroupsOf")?;
        Ok(self.chunked(size))
    }

    fn chunked(&self, size: usize) -> Groupings {
        let buckets = self
            .to_vec()
            .chunks(size)
            .enumerate()
            .map(|(i, chunk)| (CoercedValue::Int(i as i64), chunk.to_vec()))
            .collect();
        Groupings::from_buckets(self, buckets)
    }
}
