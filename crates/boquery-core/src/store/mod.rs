//! Data-store backends.
//!
//! A [`DataStore`] executes select queries and applies row writes. Two
//! backends exist: [`MemoryStore`] evaluates queries in process, and
//! [`SqliteStore`] renders them to SQL.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use boquery_proto::{SelectQuery, Value};

use crate::error::Result;
use crate::query::QueryContext;

/// A row of named values.
///
/// Rows returned by [`DataStore::execute`] are keyed by property name;
/// rows passed to writes are keyed by column name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Value of a named column.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Set a column, replacing an existing value.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.values.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((name.to_string(), value)),
        }
    }

    /// Append a column without checking for an existing one.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.values.push((name.into(), value));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<(String, Value)>> for Row {
    fn from(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }
}

/// A backend that can execute select queries and store rows.
pub trait DataStore: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Rows of the query's page window, in query order.
    fn execute(&self, query: &SelectQuery, ctx: &QueryContext) -> Result<Vec<Row>>;

    /// Number of rows the query matches, ignoring the page window.
    fn count(&self, query: &SelectQuery, ctx: &QueryContext) -> Result<usize>;

    /// Page rows and total match count read from one snapshot of the store.
    ///
    /// The default runs [`execute`](Self::execute) and
    /// [`count`](Self::count) back to back; backends that can read both
    /// under one lock or transaction override it.
    fn execute_page(&self, query: &SelectQuery, ctx: &QueryContext) -> Result<(Vec<Row>, usize)> {
        let rows = self.execute(query, ctx)?;
        let total = if query.is_paged() {
            self.count(query, ctx)?
        } else {
            rows.len()
        };
        Ok((rows, total))
    }

    /// Insert a row into a table.
    fn insert(&self, table: &str, values: &[(String, Value)]) -> Result<()>;

    /// Set `values` on every row of `table` whose columns equal `key`.
    /// Returns the number of rows changed.
    fn update(&self, table: &str, key: &[(String, Value)], values: &[(String, Value)]) -> Result<usize>;

    /// Delete every row of `table` whose columns equal `key`.
    /// Returns the number of rows removed.
    fn delete(&self, table: &str, key: &[(String, Value)]) -> Result<usize>;
}
