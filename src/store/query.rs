//! Backend-agnostic query description.
//!
//! A [`QuerySpec`] carries an optional filter, sort key, and page window.
//! The relational adapter turns it into bound SQL predicates, the document
//! adapter into a match document, and the mock adapter evaluates it in
//! process with [`QuerySpec::apply`]. All three agree on these rules:
//!
//! - `Eq(null)` matches a missing field or an explicit null.
//! - `Eq` on a number matches any number with the same value (`5 == 5.0`).
//! - Range bounds are numbers or strings and only match values of the same
//!   kind; a string bound never matches a number.
//! - Conditions never match array or object values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::record::{validate_field_path, Record, RESERVED_FIELDS};
use super::traits::{StoreError, StoreResult};

/// Comparison against a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// Inclusive/exclusive bounds
    Range(Range),
    /// Equality with a scalar value
    Eq(Value),
}

/// Range bounds; at least one must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Range {
    /// Exclusive lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    /// Inclusive lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    /// Exclusive upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    /// Inclusive upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
}

impl Range {
    /// Bounds as (operator, value) pairs, in a fixed order.
    pub fn bounds(&self) -> Vec<(RangeOp, &Value)> {
        let mut out = Vec::with_capacity(4);
        if let Some(v) = &self.gt {
            out.push((RangeOp::Gt, v));
        }
        if let Some(v) = &self.gte {
            out.push((RangeOp::Gte, v));
        }
        if let Some(v) = &self.lt {
            out.push((RangeOp::Lt, v));
        }
        if let Some(v) = &self.lte {
            out.push((RangeOp::Lte, v));
        }
        out
    }
}

/// Range comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

impl RangeOp {
    /// SQL operator
    pub fn sql(&self) -> &'static str {
        match self {
            RangeOp::Gt => ">",
            RangeOp::Gte => ">=",
            RangeOp::Lt => "<",
            RangeOp::Lte => "<=",
        }
    }

    /// MongoDB operator
    pub fn mongo(&self) -> &'static str {
        match self {
            RangeOp::Gt => "$gt",
            RangeOp::Gte => "$gte",
            RangeOp::Lt => "$lt",
            RangeOp::Lte => "$lte",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            RangeOp::Gt => ordering == Ordering::Greater,
            RangeOp::Gte => ordering != Ordering::Less,
            RangeOp::Lt => ordering == Ordering::Less,
            RangeOp::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

/// Sort key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    /// Field path to sort on
    pub field: String,
    /// Sort direction
    #[serde(default)]
    pub direction: SortDirection,
}

/// Backend-agnostic description of a read request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Field path → condition; all must hold
    #[serde(default)]
    pub filter: BTreeMap<String, Condition>,
    /// Sort key; insertion order when absent
    #[serde(default)]
    pub sort: Option<SortKey>,
    /// Records to skip
    #[serde(default)]
    pub offset: Option<usize>,
    /// Maximum records to return
    #[serde(default)]
    pub limit: Option<usize>,
}

impl QuerySpec {
    /// Match everything, unsorted, unpaged
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field == value`
    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(field.into(), Condition::Eq(value.into()));
        self
    }

    /// Require `field` within `range`
    pub fn filter_range(mut self, field: impl Into<String>, range: Range) -> Self {
        self.filter.insert(field.into(), Condition::Range(range));
        self
    }

    /// Sort by `field`
    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(SortKey {
            field: field.into(),
            direction,
        });
        self
    }

    /// Skip the first `offset` matches
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Return at most `limit` records
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check field paths and filter values before any backend sees them.
    pub fn validate(&self) -> StoreResult<()> {
        for (field, condition) in &self.filter {
            validate_query_field(field)?;
            match condition {
                Condition::Eq(value) => {
                    if value.is_array() || value.is_object() {
                        return Err(StoreError::validation(format!(
                            "filter on '{}' must compare against a scalar",
                            field
                        )));
                    }
                }
                Condition::Range(range) => {
                    let bounds = range.bounds();
                    if bounds.is_empty() {
                        return Err(StoreError::validation(format!(
                            "range filter on '{}' has no bounds",
                            field
                        )));
                    }
                    let first = BoundKind::of(bounds[0].1).ok_or_else(|| {
                        StoreError::validation(format!(
                            "range bounds on '{}' must be numbers or strings",
                            field
                        ))
                    })?;
                    if bounds.iter().any(|(_, v)| BoundKind::of(v) != Some(first)) {
                        return Err(StoreError::validation(format!(
                            "range bounds on '{}' must all be of the same kind",
                            field
                        )));
                    }
                }
            }
        }
        if let Some(sort) = &self.sort {
            validate_query_field(&sort.field)?;
        }
        Ok(())
    }

    /// Whether `record` satisfies every filter condition.
    pub fn matches(&self, record: &Record) -> bool {
        self.filter
            .iter()
            .all(|(field, condition)| condition_matches(condition, record.lookup(field).as_ref()))
    }

    /// Filter, sort, and page an in-memory sequence. Sorting is stable, so
    /// ties keep their original order.
    pub fn apply(&self, records: impl IntoIterator<Item = Record>) -> Vec<Record> {
        let mut selected: Vec<Record> = records.into_iter().filter(|r| self.matches(r)).collect();

        if let Some(sort) = &self.sort {
            selected.sort_by(|a, b| {
                let ordering = compare_for_sort(
                    a.lookup(&sort.field).as_ref(),
                    b.lookup(&sort.field).as_ref(),
                );
                match sort.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }

        let offset = self.offset.unwrap_or(0);
        let limit = self.limit.unwrap_or(usize::MAX);
        selected.into_iter().skip(offset).take(limit).collect()
    }
}

fn validate_query_field(field: &str) -> StoreResult<()> {
    validate_field_path(field)?;
    if RESERVED_FIELDS.contains(&field) {
        return Err(StoreError::validation(format!(
            "'{}' cannot be used in filters or sorts",
            field
        )));
    }
    Ok(())
}

/// Number or string: the only comparable bound kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    /// JSON number
    Number,
    /// JSON string
    String,
}

impl BoundKind {
    /// Bound kind of `value`, if comparable
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Number(_) => Some(BoundKind::Number),
            Value::String(_) => Some(BoundKind::String),
            _ => None,
        }
    }
}

fn condition_matches(condition: &Condition, actual: Option<&Value>) -> bool {
    match condition {
        Condition::Eq(Value::Null) => matches!(actual, None | Some(Value::Null)),
        Condition::Eq(expected) => match actual {
            Some(actual) => scalar_eq(expected, actual),
            None => false,
        },
        Condition::Range(range) => match actual {
            Some(actual) => range.bounds().into_iter().all(|(op, bound)| {
                compare_same_kind(actual, bound).is_some_and(|ordering| op.holds(ordering))
            }),
            None => false,
        },
    }
}

fn scalar_eq(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => false,
    }
}

fn compare_same_kind(actual: &Value, bound: &Value) -> Option<Ordering> {
    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Rank used to order values of different kinds: missing/null, numbers,
/// strings, objects, arrays, booleans.
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// Total order over optional JSON values for sorting.
pub fn compare_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
