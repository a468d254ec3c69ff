//! Select query: the resolved, executable form of a load request.

use serde::{Deserialize, Serialize};

use crate::criteria::Criteria;
use crate::error::QueryError;
use crate::order::OrderCriteria;
use crate::source::{QueryField, Source};

/// A select query.
///
/// Aggregates a root source (with its join tree), criteria, order criteria,
/// a field projection and a page window. Once built it is shared by
/// reference (`Arc<SelectQuery>`) and treated as an immutable value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectQuery {
    class_name: String,
    source: Option<Source>,
    criteria: Option<Criteria>,
    discriminator: Option<Criteria>,
    order_criteria: OrderCriteria,
    fields: Vec<QueryField>,
    first_record_to_load: usize,
    limit: Option<usize>,
}

impl SelectQuery {
    /// Create an empty query for a class.
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Default::default()
        }
    }

    /// Name of the class this query loads.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Root source, if set.
    pub fn source(&self) -> Option<&Source> {
        self.source.as_ref()
    }

    /// Root source, mutably (join discovery attaches sources here).
    pub fn source_mut(&mut self) -> Option<&mut Source> {
        self.source.as_mut()
    }

    /// Set the root source.
    pub fn set_source(&mut self, source: Source) {
        self.source = Some(source);
    }

    /// Caller-supplied criteria.
    pub fn criteria(&self) -> Option<&Criteria> {
        self.criteria.as_ref()
    }

    /// Replace the caller-supplied criteria.
    pub fn set_criteria(&mut self, criteria: Option<Criteria>) {
        self.criteria = criteria;
    }

    /// Criteria restricting rows to the queried class in a shared table.
    pub fn discriminator(&self) -> Option<&Criteria> {
        self.discriminator.as_ref()
    }

    /// Set the discriminator criteria.
    pub fn set_discriminator(&mut self, discriminator: Option<Criteria>) {
        self.discriminator = discriminator;
    }

    /// Criteria and discriminator combined, as executed by a store.
    pub fn effective_criteria(&self) -> Option<Criteria> {
        Criteria::merge(self.criteria.clone(), self.discriminator.clone())
    }

    /// Order criteria.
    pub fn order_criteria(&self) -> &OrderCriteria {
        &self.order_criteria
    }

    /// Set the order criteria.
    ///
    /// Ordering fields resolve against the join graph, so the source must be
    /// set first.
    pub fn set_order_criteria(&mut self, order_criteria: OrderCriteria) -> Result<(), QueryError> {
        if self.source.is_none() {
            return Err(QueryError::OrderCriteriaWithoutSource);
        }
        self.order_criteria = order_criteria;
        Ok(())
    }

    /// Projected fields.
    pub fn fields(&self) -> &[QueryField] {
        &self.fields
    }

    /// Add a projected field.
    pub fn add_field(&mut self, field: QueryField) {
        self.fields.push(field);
    }

    /// Index of the first record of the page.
    pub fn first_record_to_load(&self) -> usize {
        self.first_record_to_load
    }

    /// Set the index of the first record of the page.
    pub fn set_first_record_to_load(&mut self, first: i64) -> Result<(), QueryError> {
        if first < 0 {
            return Err(QueryError::NegativeFirstRecord(first));
        }
        self.first_record_to_load = first as usize;
        Ok(())
    }

    /// Page size; `None` means unbounded.
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Set the page size. A negative limit means unbounded.
    pub fn set_limit(&mut self, limit: i64) {
        self.limit = if limit < 0 { None } else { Some(limit as usize) };
    }

    /// Check whether this query selects a window rather than every match.
    pub fn is_paged(&self) -> bool {
        self.limit.is_some() || self.first_record_to_load > 0
    }
}
