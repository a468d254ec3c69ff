//! Order criteria.

use serde::{Deserialize, Serialize};

use crate::source::QueryField;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Ascending,
    /// Descending order.
    Descending,
}

impl SortDirection {
    /// SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// One ordering field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCriteriaField {
    /// Field to order by.
    pub field: QueryField,
    /// Sort direction.
    pub direction: SortDirection,
}

/// An ordered list of (field, direction) pairs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderCriteria {
    fields: Vec<OrderCriteriaField>,
}

impl OrderCriteria {
    /// Create empty order criteria.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field by dotted path.
    pub fn add(mut self, path: &str, direction: SortDirection) -> Self {
        self.push(QueryField::from_path(path), direction);
        self
    }

    /// Append a field.
    pub fn push(&mut self, field: QueryField, direction: SortDirection) {
        self.fields.push(OrderCriteriaField { field, direction });
    }

    /// Ordering fields.
    pub fn fields(&self) -> &[OrderCriteriaField] {
        &self.fields
    }

    /// Ordering fields, mutably (used when resolving against a source tree).
    pub fn fields_mut(&mut self) -> &mut [OrderCriteriaField] {
        &mut self.fields
    }

    /// Check whether there is nothing to order by.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of ordering fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

impl std::fmt::Display for OrderCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {}", field.field, field.direction.as_sql())?;
        }
        Ok(())
    }
}
