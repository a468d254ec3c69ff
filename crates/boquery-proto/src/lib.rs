//! boquery query IR.
//!
//! This crate defines the values, criteria, order criteria, sources, joins and
//! select queries shared by the criteria language, the query builder and the
//! data-store backends. It performs no I/O.

pub mod criteria;
pub mod error;
pub mod order;
pub mod select_query;
pub mod source;
pub mod value;

pub use criteria::{ComparisonOp, Criteria, CriterionValue, LogicalOp};
pub use error::QueryError;
pub use order::{OrderCriteria, OrderCriteriaField, SortDirection};
pub use select_query::SelectQuery;
pub use source::{Join, JoinField, JoinType, QueryField, Source, PATH_SEPARATOR};
pub use value::{Value, DATE_FORMAT, DATE_TIME_FORMAT};
