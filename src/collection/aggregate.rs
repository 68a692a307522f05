//! Projections and aggregates over heterogeneous property values
//!
//! Values produced by a selector are classified by kind. Absent values are
//! dropped, the most frequent remaining kind wins (ties go to the kind listed
//! first in [`ValueKind::PRECEDENCE`]) and values of other kinds are dropped,
//! except numbers of the other numeric kind, which are converted.

use std::collections::HashMap;

use super::NodeCollection;
use crate::error::{QueryError, QueryResult};
use crate::expression::EvalValue;
use crate::models::{CoercedValue, ValueKind};

/// Aggregate operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Min,
    Max,
    Sum,
    Average,
}

impl Aggregate {
    pub fn name(&self) -> &'static str {
        match self {
            Aggregate::Min => "Min",
            Aggregate::Max => "Max",
            Aggregate::Sum => "Sum",
            Aggregate::Average => "Average",
        }
    }

    fn accepts(&self, kind: ValueKind) -> bool {
        match self {
            Aggregate::Sum | Aggregate::Average => kind.is_numeric(),
            Aggregate::Min | Aggregate::Max => kind.is_numeric() || kind == ValueKind::DateTime,
        }
    }
}

/// Most frequent non-absent kind
pub fn dominant_kind<'a>(values: impl IntoIterator<Item = &'a CoercedValue>) -> Option<ValueKind> {
    let mut counts: HashMap<ValueKind, usize> = HashMap::new();
    for value in values {
        if !value.is_absent() {
            *counts.entry(value.kind()).or_default() += 1;
        }
    }
    ValueKind::PRECEDENCE
        .iter()
        .filter_map(|kind| counts.get(kind).map(|count| (*kind, *count)))
        .fold(None, |best: Option<(ValueKind, usize)>, (kind, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((kind, count)),
        })
        .map(|(kind, _)| kind)
}

/// Values of one dominant kind
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    kind: Option<ValueKind>,
    values: Vec<CoercedValue>,
}

impl Projection {
    pub fn from_values(values: Vec<CoercedValue>) -> Self {
        let Some(kind) = dominant_kind(&values) else {
            return Self::default();
        };
        let values = values
            .into_iter()
            .filter_map(|value| {
                if value.kind() == kind {
                    Some(value)
                } else if kind.is_numeric() {
                    value.convert_numeric(kind)
                } else {
                    None
                }
            })
            .collect();
        Self {
            kind: Some(kind),
            values,
        }
    }

    /// Dominant kind; `None` when every value was absent
    pub fn kind(&self) -> Option<ValueKind> {
        self.kind
    }

    pub fn values(&self) -> &[CoercedValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<CoercedValue> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn aggregate(&self, op: Aggregate) -> QueryResult<CoercedValue> {
        let Some(kind) = self.kind else {
            return match op {
                Aggregate::Sum => Ok(CoercedValue::Int(0)),
                _ => Err(QueryError::EmptySequence {
                    operation: op.name(),
                }),
            };
        };
        if !op.accepts(kind) {
            return Err(QueryError::AggregateTypeMismatch {
                operation: op.name(),
                kind,
            });
        }
        match op {
            Aggregate::Sum => self.sum(kind),
            Aggregate::Average => {
                let total = self.sum(kind)?.as_f64().unwrap_or_default();
                Ok(CoercedValue::Decimal(total / self.values.len() as f64))
            }
            Aggregate::Min => self.extreme(op, |a, b| a.compare_loose(b).is_lt()),
            Aggregate::Max => self.extreme(op, |a, b| a.compare_loose(b).is_gt()),
        }
    }

    fn sum(&self, kind: ValueKind) -> QueryResult<CoercedValue> {
        if kind == ValueKind::Int {
            let mut total: i64 = 0;
            for value in &self.values {
                let i = value.as_i64().unwrap_or_default();
                total = total
                    .checked_add(i)
                    .ok_or_else(|| QueryError::Evaluation("integer overflow in Sum".to_string()))?;
            }
            return Ok(CoercedValue::Int(total));
        }
        Ok(CoercedValue::Decimal(
            self.values.iter().filter_map(CoercedValue::as_f64).sum(),
        ))
    }

    fn extreme(
        &self,
        op: Aggregate,
        better: impl Fn(&CoercedValue, &CoercedValue) -> bool,
    ) -> QueryResult<CoercedValue> {
        let mut values = self.values.iter();
        let first = values.next().ok_or(QueryError::EmptySequence {
            operation: op.name(),
        })?;
        let best = values.fold(first, |best, v| if better(v, best) { v } else { best });
        Ok(best.clone())
    }
}

impl NodeCollection {
    /// Evaluate a selector for every node and keep the dominant-kind results
    pub fn select(&self, text: &str, params: &[EvalValue]) -> QueryResult<Projection> {
        let selector = self.compile(text, params)?;
        let values = self
            .iter()
            .map(|node| selector.evaluate_scalar(&node))
            .collect::<QueryResult<Vec<_>>>()?;
        Ok(Projection::from_values(values))
    }

    /// Alias of [`select`](Self::select)
    pub fn pluck(&self, text: &str, params: &[EvalValue]) -> QueryResult<Projection> {
        self.select(text, params)
    }

    pub fn aggregate(&self, op: Aggregate, text: &str, params: &[EvalValue]) -> QueryResult<CoercedValue> {
        self.select(text, params)?.aggregate(op)
    }

    pub fn min(&self, text: &str, params: &[EvalValue]) -> QueryResult<CoercedValue> {
        self.aggregate(Aggregate::Min, text, params)
    }

    pub fn max(&self, text: &str, params: &[EvalValue]) -> QueryResult<CoercedValue> {
        self.aggregate(Aggregate::Max, text, params)
    }

    pub fn sum(&self, text: &str, params: &[EvalValue]) -> QueryResult<CoercedValue> {
        self.aggregate(Aggregate::Sum, text, params)
    }

    pub fn average(&self, text: &str, params: &[EvalValue]) -> QueryResult<CoercedValue> {
        self.aggregate(Aggregate::Average, text, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn values(raw: &[CoercedValue]) -> Projection {
        Projection::from_values(raw.to_vec())
    }

    #[test]
    fn test_dominant_kind_with_noise() {
        let projection = values(&[
            CoercedValue::Int(3),
            CoercedValue::Int(4),
            CoercedValue::from("x"),
            CoercedValue::Decimal(5.5),
        ]);
        assert_eq!(projection.kind(), Some(ValueKind::Int));
        assert_eq!(projection.len(), 3);
        assert_eq!(projection.aggregate(Aggregate::Sum).unwrap(), CoercedValue::Int(12));
        assert_eq!(projection.aggregate(Aggregate::Max).unwrap(), CoercedValue::Int(5));
        assert_eq!(projection.aggregate(Aggregate::Average).unwrap(), CoercedValue::Decimal(4.0));
    }

    #[test]
    fn test_ties_follow_precedence() {
        let projection = values(&[CoercedValue::from("a"), CoercedValue::Decimal(1.5), CoercedValue::Absent]);
        assert_eq!(projection.kind(), Some(ValueKind::Decimal));
    }

    #[test]
    fn test_non_numeric_dominant_kind() {
        let projection = values(&[CoercedValue::from("a"), CoercedValue::from("b"), CoercedValue::Int(1)]);
        assert!(matches!(
            projection.aggregate(Aggregate::Sum),
            Err(QueryError::AggregateTypeMismatch { kind: ValueKind::String, .. })
        ));
    }

    #[test]
    fn test_dates_support_min_max_only() {
        let early = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let late = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let projection = values(&[CoercedValue::DateTime(late), CoercedValue::DateTime(early)]);
        assert_eq!(projection.aggregate(Aggregate::Min).unwrap(), CoercedValue::DateTime(early));
        assert!(projection.aggregate(Aggregate::Average).is_err());
    }

    #[test]
    fn test_empty_sequences() {
        let projection = values(&[CoercedValue::Absent]);
        assert_eq!(projection.aggregate(Aggregate::Sum).unwrap(), CoercedValue::Int(0));
        assert!(matches!(
            projection.aggregate(Aggregate::Min),
            Err(QueryError::EmptySequence { operation: "Min" })
        ));
    }
}
