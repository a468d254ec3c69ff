//! Command execution against a SQLite database.

use std::path::Path;
use std::sync::Arc;

use boquery_core::{
    ClassDefRegistry, DataAccessor, IntoCriteria, IntoOrderCriteria, SqliteConfig, SqliteStore,
};
use thiserror::Error;
use tracing::debug;

use crate::formatter::{Formatter, QueryOutput};

/// Execution errors.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Schema file could not be read.
    #[error("cannot read schema '{path}': {source}")]
    Schema {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Error raised by the loader or the store.
    #[error("{0}")]
    Core(#[from] boquery_core::Error),
}

/// A page request.
#[derive(Debug, Clone)]
pub struct QueryRequest<'a> {
    pub class_name: &'a str,
    pub criteria: Option<&'a str>,
    pub order: Option<&'a str>,
    pub first: i64,
    pub limit: i64,
}

/// Open a data accessor over a schema file and a SQLite database.
pub fn open_accessor(schema: &Path, db: &Path) -> Result<DataAccessor, ExecuteError> {
    let json = std::fs::read_to_string(schema).map_err(|source| ExecuteError::Schema {
        path: schema.display().to_string(),
        source,
    })?;
    let registry = ClassDefRegistry::from_json(&json)?;
    let store = SqliteStore::open(SqliteConfig::new(db))?;
    Ok(DataAccessor::new(registry, Arc::new(store))?)
}

/// Load one page and format it.
pub fn execute_query(
    accessor: &DataAccessor,
    request: &QueryRequest<'_>,
    formatter: &dyn Formatter,
) -> Result<String, ExecuteError> {
    let collection = accessor.loader().get_business_object_collection_paged(
        request.class_name,
        request.criteria,
        request.order,
        request.first,
        request.limit,
    )?;

    let columns: Vec<String> = collection
        .class()
        .props()
        .iter()
        .filter(|p| p.persisted)
        .map(|p| p.name.clone())
        .collect();

    let rows = collection
        .iter()
        .map(|object| {
            columns
                .iter()
                .map(|column| object.get_property_value(column))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(rows = rows.len(), total = collection.total_count(), "query executed");
    Ok(formatter.format_query_result(&QueryOutput {
        class_name: request.class_name.to_string(),
        columns,
        rows,
        first_record: usize::try_from(request.first).unwrap_or(0),
        total_count: collection.total_count(),
    }))
}

/// Render the SQL a page request would run, without running it.
pub fn explain(accessor: &DataAccessor, request: &QueryRequest<'_>) -> Result<String, ExecuteError> {
    let builder = accessor.query_builder();
    let mut query = builder.create_select_query(
        request.class_name,
        request.criteria.into_criteria()?,
        request.order.into_order_criteria()?,
    )?;
    query
        .set_first_record_to_load(request.first)
        .map_err(boquery_core::Error::from)?;
    query.set_limit(request.limit);
    Ok(builder.explain(&query).to_string())
}

/// List the registered classes.
pub fn list_classes(accessor: &DataAccessor, formatter: &dyn Formatter) -> String {
    let mut names = accessor.registry().class_names();
    names.sort_unstable();
    formatter.format_classes(&names)
}
