//! Criteria: filter expressions over (possibly relationship-traversing) fields.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::source::QueryField;
use crate::value::Value;

/// Comparison operator of a criteria leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    /// `=`
    Equals,
    /// `<>`
    NotEquals,
    /// `>`
    GreaterThan,
    /// `<`
    LessThan,
    /// `>=`
    GreaterThanEqual,
    /// `<=`
    LessThanEqual,
    /// `LIKE` with `%` and `_` wildcards.
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `IS` (only meaningful with `NULL`).
    Is,
    /// `IS NOT` (only meaningful with `NULL`).
    IsNot,
    /// `IN (...)`
    In,
    /// `NOT IN (...)`
    NotIn,
}

impl ComparisonOp {
    /// SQL spelling of the operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            ComparisonOp::Equals => "=",
            ComparisonOp::NotEquals => "<>",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::LessThan => "<",
            ComparisonOp::GreaterThanEqual => ">=",
            ComparisonOp::LessThanEqual => "<=",
            ComparisonOp::Like => "LIKE",
            ComparisonOp::NotLike => "NOT LIKE",
            ComparisonOp::Is => "IS",
            ComparisonOp::IsNot => "IS NOT",
            ComparisonOp::In => "IN",
            ComparisonOp::NotIn => "NOT IN",
        }
    }

    /// Normalise `= NULL` / `<> NULL` into `IS NULL` / `IS NOT NULL`.
    pub fn normalise_for(self, value: &CriterionValue) -> ComparisonOp {
        match (self, value) {
            (ComparisonOp::Equals, CriterionValue::Literal(Value::Null)) => ComparisonOp::Is,
            (ComparisonOp::NotEquals, CriterionValue::Literal(Value::Null)) => ComparisonOp::IsNot,
            _ => self,
        }
    }
}

/// Boolean combinator of two criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    /// Both sides must match.
    And,
    /// Either side must match.
    Or,
}

impl LogicalOp {
    /// SQL spelling of the combinator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

/// The right-hand side of a criteria leaf.
///
/// `Today` and `Now` stay symbolic until the query is executed, so a
/// long-lived select query compares against the date of each execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CriterionValue {
    /// A literal value.
    Literal(Value),
    /// A list of literals, for `IN` / `NOT IN`.
    List(Vec<Value>),
    /// Midnight of the current date.
    Today,
    /// The current date and time.
    Now,
}

impl CriterionValue {
    /// Replace symbolic tokens with concrete values using `now` as the clock.
    pub fn resolve(&self, now: NaiveDateTime) -> CriterionValue {
        match self {
            CriterionValue::Today => {
                let midnight = now.date().and_hms_opt(0, 0, 0).unwrap_or(now);
                CriterionValue::Literal(Value::DateTime(midnight))
            }
            CriterionValue::Now => CriterionValue::Literal(Value::DateTime(now)),
            other => other.clone(),
        }
    }

    /// Check whether this is a literal null.
    pub fn is_null(&self) -> bool {
        matches!(self, CriterionValue::Literal(Value::Null))
    }
}

impl From<Value> for CriterionValue {
    fn from(value: Value) -> Self {
        CriterionValue::Literal(value)
    }
}

/// A filter expression.
///
/// Criteria form a binary tree: leaves compare one field against a value and
/// inner nodes combine two criteria with `AND` / `OR`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Criteria {
    /// Leaf comparison.
    Comparison {
        /// Field being compared.
        field: QueryField,
        /// Operator.
        op: ComparisonOp,
        /// Right-hand side.
        value: CriterionValue,
    },
    /// Logical combination of two criteria.
    Composite {
        /// Left operand.
        left: Box<Criteria>,
        /// Combinator.
        op: LogicalOp,
        /// Right operand.
        right: Box<Criteria>,
    },
    /// Negation.
    Not(Box<Criteria>),
}

impl Criteria {
    /// Create a leaf comparison on a dotted field path.
    pub fn compare(path: &str, op: ComparisonOp, value: impl Into<CriterionValue>) -> Self {
        let value = value.into();
        Criteria::Comparison {
            field: QueryField::from_path(path),
            op: op.normalise_for(&value),
            value,
        }
    }

    /// Create an equality comparison.
    pub fn eq(path: &str, value: impl Into<Value>) -> Self {
        Self::compare(path, ComparisonOp::Equals, CriterionValue::Literal(value.into()))
    }

    /// Create an `IS NULL` comparison.
    pub fn is_null(path: &str) -> Self {
        Self::compare(path, ComparisonOp::Is, CriterionValue::Literal(Value::Null))
    }

    /// Combine with another criteria using `AND`.
    pub fn and(self, other: Criteria) -> Self {
        Criteria::Composite {
            left: Box::new(self),
            op: LogicalOp::And,
            right: Box::new(other),
        }
    }

    /// Combine with another criteria using `OR`.
    pub fn or(self, other: Criteria) -> Self {
        Criteria::Composite {
            left: Box::new(self),
            op: LogicalOp::Or,
            right: Box::new(other),
        }
    }

    /// Negate this criteria.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Criteria::Not(Box::new(self))
    }

    /// `AND` two optional criteria together.
    pub fn merge(left: Option<Criteria>, right: Option<Criteria>) -> Option<Criteria> {
        match (left, right) {
            (Some(l), Some(r)) => Some(l.and(r)),
            (Some(l), None) => Some(l),
            (None, r) => r,
        }
    }

    /// All fields referenced by this criteria, left to right.
    pub fn fields(&self) -> Vec<&QueryField> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, fields: &mut Vec<&'a QueryField>) {
        match self {
            Criteria::Comparison { field, .. } => fields.push(field),
            Criteria::Composite { left, right, .. } => {
                left.collect_fields(fields);
                right.collect_fields(fields);
            }
            Criteria::Not(inner) => inner.collect_fields(fields),
        }
    }

    /// Visit every leaf mutably, stopping at the first error.
    pub fn try_for_each_leaf<E, F>(&mut self, f: &mut F) -> Result<(), E>
    where
        F: FnMut(&mut QueryField, ComparisonOp, &mut CriterionValue) -> Result<(), E>,
    {
        match self {
            Criteria::Comparison { field, op, value } => f(field, *op, value),
            Criteria::Composite { left, right, .. } => {
                left.try_for_each_leaf(f)?;
                right.try_for_each_leaf(f)
            }
            Criteria::Not(inner) => inner.try_for_each_leaf(f),
        }
    }
}

fn write_literal(f: &mut std::fmt::Formatter<'_>, value: &Value) -> std::fmt::Result {
    match value {
        Value::Null => write!(f, "NULL"),
        Value::Bool(_) | Value::Int32(_) | Value::Int64(_) | Value::Float64(_) => {
            write!(f, "{}", value)
        }
        other => write!(f, "'{}'", other.to_string().replace('\'', "''")),
    }
}

impl std::fmt::Display for CriterionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CriterionValue::Literal(v) => write_literal(f, v),
            CriterionValue::List(values) => {
                write!(f, "(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_literal(f, v)?;
                }
                write!(f, ")")
            }
            CriterionValue::Today => write!(f, "Today"),
            CriterionValue::Now => write!(f, "Now"),
        }
    }
}

impl std::fmt::Display for Criteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Criteria::Comparison { field, op, value } => {
                write!(f, "{} {} {}", field, op.as_sql(), value)
            }
            Criteria::Composite { left, op, right } => {
                write!(f, "({}) {} ({})", left, op.as_sql(), right)
            }
            Criteria::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}
