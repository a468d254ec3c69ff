//! In-memory data store.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use boquery_proto::{JoinField, JoinType, QueryField, SelectQuery, SortDirection, Value};
use parking_lot::RwLock;
use tracing::{debug, instrument};

use super::{DataStore, Row};
use crate::error::Result;
use crate::query::filter::{sort_order, values_equal};
use crate::query::{CriteriaEvaluator, FieldSource, QueryContext};

/// Records scanned between deadline checks.
const DEADLINE_CHECK_INTERVAL: usize = 256;

type Tables = HashMap<String, Vec<Row>>;

/// Data store holding tables of rows in memory.
///
/// Joins are evaluated by nested loop, criteria by [`CriteriaEvaluator`],
/// and ordering by a stable sort, so rows that tie on every order field
/// keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in a table.
    pub fn table_len(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, Vec::len)
    }

    fn matching_records<'a>(
        tables: &'a Tables,
        query: &'a SelectQuery,
        ctx: &QueryContext,
    ) -> Result<Vec<JoinedRecord<'a>>> {
        let Some(source) = query.source() else {
            return Ok(Vec::new());
        };

        let mut records: Vec<JoinedRecord<'a>> = tables
            .get(&source.entity_name)
            .map(|rows| {
                rows.iter()
                    .enumerate()
                    .map(|(root, row)| JoinedRecord {
                        root,
                        rows: vec![(source.name.as_str(), Some(row))],
                    })
                    .collect()
            })
            .unwrap_or_default();

        for (parent, join) in source.flatten_joins() {
            let targets: &[Row] = tables
                .get(&join.to_source.entity_name)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let name = join.to_source.name.as_str();
            let mut joined = Vec::with_capacity(records.len());

            for (n, record) in records.into_iter().enumerate() {
                if n % DEADLINE_CHECK_INTERVAL == 0 {
                    ctx.check_deadline()?;
                }
                let matches: Vec<&Row> = match record.row(parent) {
                    Some(parent_row) => targets
                        .iter()
                        .filter(|target| join_matches(parent_row, target, &join.join_fields))
                        .collect(),
                    None => Vec::new(),
                };
                if matches.is_empty() {
                    if join.join_type == JoinType::LeftOuterJoin {
                        let mut record = record;
                        record.rows.push((name, None));
                        joined.push(record);
                    }
                } else {
                    for target in matches {
                        let mut extended = record.clone();
                        extended.rows.push((name, Some(target)));
                        joined.push(extended);
                    }
                }
            }
            records = joined;
        }

        if let Some(criteria) = query.effective_criteria() {
            let mut filtered = Vec::with_capacity(records.len());
            for (n, record) in records.into_iter().enumerate() {
                if n % DEADLINE_CHECK_INTERVAL == 0 {
                    ctx.check_deadline()?;
                }
                if CriteriaEvaluator::matches(&criteria, &record, ctx.now()) {
                    filtered.push(record);
                }
            }
            records = filtered;
        }

        let order = query.order_criteria();
        if !order.is_empty() {
            records.sort_by(|a, b| {
                for order_field in order.fields() {
                    let left = a.field_value(&order_field.field).unwrap_or(&Value::Null);
                    let right = b.field_value(&order_field.field).unwrap_or(&Value::Null);
                    let ordering = match order_field.direction {
                        SortDirection::Ascending => sort_order(left, right),
                        SortDirection::Descending => sort_order(right, left),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        // One result per root row, as SELECT DISTINCT over the root's
        // properties gives.
        let mut seen = HashSet::new();
        records.retain(|r| seen.insert(r.root));
        Ok(records)
    }
}

/// Root row with the rows joined to it, by source name.
#[derive(Debug, Clone)]
struct JoinedRecord<'a> {
    root: usize,
    rows: Vec<(&'a str, Option<&'a Row>)>,
}

impl<'a> JoinedRecord<'a> {
    fn row(&self, source_name: &str) -> Option<&'a Row> {
        self.rows
            .iter()
            .find(|(name, _)| *name == source_name)
            .and_then(|(_, row)| *row)
    }
}

impl FieldSource for JoinedRecord<'_> {
    fn field_value(&self, field: &QueryField) -> Option<&Value> {
        let row = match &field.source_name {
            Some(source_name) => self.row(source_name),
            None => self.rows.first().and_then(|(_, row)| *row),
        }?;
        row.get(&field.field_name)
    }
}

fn join_matches(parent: &Row, target: &Row, join_fields: &[JoinField]) -> bool {
    join_fields.iter().all(|jf| {
        match (parent.get(&jf.from_field), target.get(&jf.to_field)) {
            (Some(a), Some(b)) if !a.is_null() && !b.is_null() => values_equal(a, b),
            _ => false,
        }
    })
}

fn key_matches(row: &Row, key: &[(String, Value)]) -> bool {
    key.iter()
        .all(|(column, value)| values_equal(row.get(column).unwrap_or(&Value::Null), value))
}

impl DataStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn execute(&self, query: &SelectQuery, ctx: &QueryContext) -> Result<Vec<Row>> {
        self.execute_page(query, ctx).map(|(rows, _)| rows)
    }

    fn count(&self, query: &SelectQuery, ctx: &QueryContext) -> Result<usize> {
        ctx.check_deadline()?;
        let tables = self.tables.read();
        let count = Self::matching_records(&tables, query, ctx)?.len();
        ctx.check_deadline()?;
        Ok(count)
    }

    /// Rows and count come from one scan under one read lock.
    #[instrument(skip(self, query, ctx), fields(class = %query.class_name()))]
    fn execute_page(&self, query: &SelectQuery, ctx: &QueryContext) -> Result<(Vec<Row>, usize)> {
        ctx.check_deadline()?;
        let tables = self.tables.read();
        let records = Self::matching_records(&tables, query, ctx)?;

        let rows: Vec<Row> = records
            .iter()
            .skip(query.first_record_to_load())
            .take(query.limit().unwrap_or(usize::MAX))
            .map(|record| {
                let mut row = Row::with_capacity(query.fields().len());
                for field in query.fields() {
                    let value = record.field_value(field).cloned().unwrap_or(Value::Null);
                    row.push(field.property_name.clone(), value);
                }
                row
            })
            .collect();

        ctx.check_deadline()?;
        debug!(matched = records.len(), returned = rows.len(), "executed query");
        Ok((rows, records.len()))
    }

    fn insert(&self, table: &str, values: &[(String, Value)]) -> Result<()> {
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .push(Row::from(values.to_vec()));
        Ok(())
    }

    fn update(&self, table: &str, key: &[(String, Value)], values: &[(String, Value)]) -> Result<usize> {
        let mut tables = self.tables.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let mut changed = 0;
        for row in rows.iter_mut().filter(|row| key_matches(row, key)) {
            for (column, value) in values {
                row.set(column, value.clone());
            }
            changed += 1;
        }
        Ok(changed)
    }

    fn delete(&self, table: &str, key: &[(String, Value)]) -> Result<usize> {
        let mut tables = self.tables.write();
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !key_matches(row, key));
        Ok(before - rows.len())
    }
}
