//! SQLite data store.

use boquery_proto::{SelectQuery, Value, DATE_TIME_FORMAT};
use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info, instrument};

use super::{DataStore, Row};
use crate::config::SqliteConfig;
use crate::error::Result;
use crate::query::sql::{self, SqlStatement};
use crate::query::QueryContext;

/// Rows fetched between deadline checks.
const DEADLINE_CHECK_INTERVAL: usize = 256;

/// Data store backed by a SQLite database.
///
/// `LIKE` is made case-sensitive so that it matches the in-memory store.
/// Dates and date-times are stored as `YYYY-MM-DD HH:MM:SS` text (dates at
/// midnight) so they compare chronologically and a date equals the `Today`
/// token; GUIDs as hyphenated text; booleans as 0/1.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    config: SqliteConfig,
}

impl SqliteStore {
    /// Open a store.
    pub fn open(config: SqliteConfig) -> Result<Self> {
        let conn = match &config.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(config.busy_timeout)?;
        conn.execute_batch("PRAGMA case_sensitive_like = ON;")?;

        info!(path = ?config.path, "opened sqlite store");
        Ok(Self {
            conn: Mutex::new(conn),
            config,
        })
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(SqliteConfig::in_memory())
    }

    /// Run raw SQL, such as schema creation.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    fn run(&self, statement: &SqlStatement) -> Result<usize> {
        debug!(sql = %statement.sql, params = statement.params.len(), "executing statement");
        let conn = self.conn.lock();
        let changed = conn.execute(
            &statement.sql,
            params_from_iter(statement.params.iter().map(to_sql)),
        )?;
        Ok(changed)
    }
}

/// Convert a value to its stored form.
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int32(i) => SqlValue::Integer(i64::from(*i)),
        Value::Int64(i) => SqlValue::Integer(*i),
        Value::Float64(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Date(d) => SqlValue::Text(d.format("%Y-%m-%d 00:00:00").to_string()),
        Value::DateTime(dt) => SqlValue::Text(dt.format(DATE_TIME_FORMAT).to_string()),
        Value::Guid(g) => SqlValue::Text(g.hyphenated().to_string()),
    }
}

/// Convert a stored value back. Typing is left to the property definition.
fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(t) | ValueRef::Blob(t) => {
            Value::String(String::from_utf8_lossy(t).into_owned())
        }
    }
}

fn select_rows(conn: &Connection, query: &SelectQuery, ctx: &QueryContext) -> Result<Vec<Row>> {
    ctx.check_deadline()?;
    let statement = sql::render_select(query, ctx.now());
    debug!(sql = %statement.sql, params = statement.params.len(), "executing select");

    let mut prepared = conn.prepare_cached(&statement.sql)?;
    let columns: Vec<String> = prepared
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let mut rows = prepared.query(params_from_iter(statement.params.iter().map(to_sql)))?;

    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        if result.len() % DEADLINE_CHECK_INTERVAL == 0 {
            ctx.check_deadline()?;
        }
        let mut out = Row::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            out.push(column.clone(), from_sql(row.get_ref(index)?));
        }
        result.push(out);
    }

    ctx.check_deadline()?;
    debug!(returned = result.len(), "executed select");
    Ok(result)
}

fn count_rows(conn: &Connection, query: &SelectQuery, ctx: &QueryContext) -> Result<usize> {
    ctx.check_deadline()?;
    let statement = sql::render_count(query, ctx.now());
    debug!(sql = %statement.sql, "executing count");

    let count: i64 = conn.query_row(
        &statement.sql,
        params_from_iter(statement.params.iter().map(to_sql)),
        |row| row.get(0),
    )?;
    ctx.check_deadline()?;
    Ok(usize::try_from(count).unwrap_or_default())
}

impl DataStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    #[instrument(skip(self, query, ctx), fields(class = %query.class_name()))]
    fn execute(&self, query: &SelectQuery, ctx: &QueryContext) -> Result<Vec<Row>> {
        let conn = self.conn.lock();
        select_rows(&conn, query, ctx)
    }

    fn count(&self, query: &SelectQuery, ctx: &QueryContext) -> Result<usize> {
        let conn = self.conn.lock();
        count_rows(&conn, query, ctx)
    }

    /// Runs the select and the count in one read transaction, so both see
    /// the same database state.
    #[instrument(skip(self, query, ctx), fields(class = %query.class_name()))]
    fn execute_page(&self, query: &SelectQuery, ctx: &QueryContext) -> Result<(Vec<Row>, usize)> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        let rows = select_rows(&tx, query, ctx)?;
        let total = if query.is_paged() {
            count_rows(&tx, query, ctx)?
        } else {
            rows.len()
        };
        tx.commit()?;
        Ok((rows, total))
    }

    fn insert(&self, table: &str, values: &[(String, Value)]) -> Result<()> {
        self.run(&sql::render_insert(table, values))?;
        Ok(())
    }

    fn update(&self, table: &str, key: &[(String, Value)], values: &[(String, Value)]) -> Result<usize> {
        if values.is_empty() {
            return Ok(0);
        }
        self.run(&sql::render_update(table, key, values))
    }

    fn delete(&self, table: &str, key: &[(String, Value)]) -> Result<usize> {
        self.run(&sql::render_delete(table, key))
    }
}
