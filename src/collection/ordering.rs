//! Multi-key ordering (`order_by` / `then_by`)

use std::cmp::Ordering;
use tracing::debug;

use super::NodeCollection;
use crate::error::QueryResult;
use crate::expression::{CompiledOrdering, EvalValue};
use crate::models::CoercedValue;

/// A collection waiting to be sorted by one or more keys
///
/// Keys are evaluated once per node when the collection is materialized;
/// the sort is stable, so nodes with equal keys keep their relative order.
#[derive(Debug, Clone)]
pub struct OrderedCollection {
    source: NodeCollection,
    orderings: Vec<CompiledOrdering>,
}

impl NodeCollection {
    /// Sort by an ordering list such as `"Level, Name desc"`
    pub fn order_by(&self, text: &str, params: &[EvalValue]) -> QueryResult<OrderedCollection> {
        let orderings = self.compile_orderings(text, params)?;
        Ok(OrderedCollection {
            source: self.clone(),
            orderings,
        })
    }

    /// Like [`order_by`](Self::order_by) with every key's direction flipped
    pub fn order_by_descending(&self, text: &str, params: &[EvalValue]) -> QueryResult<OrderedCollection> {
        let mut ordered = self.order_by(text, params)?;
        for ordering in &mut ordered.orderings {
            ordering.descending = !ordering.descending;
        }
        Ok(ordered)
    }

    pub fn compile_orderings(&self, text: &str, params: &[EvalValue]) -> QueryResult<Vec<CompiledOrdering>> {
        self.compiler_result(
            |s| s.compile_orderings(text, params),
            |c| c.compile_orderings(text, params),
        )
    }

    /// Sort with already compiled keys
    pub fn sort_with(&self, orderings: &[CompiledOrdering]) -> QueryResult<NodeCollection> {
        let mut keyed = Vec::with_capacity(self.len());
        for node in self.iter() {
            let keys = orderings
                .iter()
                .map(|o| o.key(&node))
                .collect::<QueryResult<Vec<CoercedValue>>>()?;
            keyed.push((keys, node));
        }
        keyed.sort_by(|(a, _), (b, _)| compare_keys(orderings, a, b));
        debug!("Sorted {} nodes by {} key(s)", keyed.len(), orderings.len());
        Ok(self.derive(keyed.into_iter().map(|(_, node)| node)))
    }
}

fn compare_keys(orderings: &[CompiledOrdering], a: &[CoercedValue], b: &[CoercedValue]) -> Ordering {
    orderings
        .iter()
        .zip(a.iter().zip(b))
        .map(|(ordering, (a, b))| ordering.compare(a, b))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl OrderedCollection {
    pub fn then_by(mut self, text: &str, params: &[EvalValue]) -> QueryResult<Self> {
        let more = self.source.compile_orderings(text, params)?;
        self.orderings.extend(more);
        Ok(self)
    }

    pub fn then_by_descending(mut self, text: &str, params: &[EvalValue]) -> QueryResult<Self> {
        let more = self.source.compile_orderings(text, params)?;
        self.orderings.extend(more.into_iter().map(|mut o| {
            o.descending = !o.descending;
            o
        }));
        Ok(self)
    }

    pub fn orderings(&self) -> &[CompiledOrdering] {
        &self.orderings
    }

    /// Evaluate the keys and produce the sorted collection
    pub fn into_collection(self) -> QueryResult<NodeCollection> {
        self.source.sort_with(&self.orderings)
    }
}
