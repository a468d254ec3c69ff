//! Query construction and evaluation.

pub mod builder;
pub mod context;
pub mod filter;
pub mod input;
pub mod sql;

pub use builder::QueryBuilder;
pub use context::QueryContext;
pub use filter::{CriteriaEvaluator, FieldSource};
pub use input::{IntoCriteria, IntoOrderCriteria};
pub use sql::SqlStatement;
