//! Output formatters for query results.

use boquery_proto::Value;
use clap::ValueEnum;
use comfy_table::{Cell, Table};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// One loaded page, flattened for display.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutput {
    pub class_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub first_record: usize,
    pub total_count: usize,
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format a loaded page.
    fn format_query_result(&self, result: &QueryOutput) -> String;

    /// Format registered class names.
    fn format_classes(&self, classes: &[&str]) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_query_result(&self, result: &QueryOutput) -> String {
        let mut table = Table::new();
        table.set_header(result.columns.iter().map(Cell::new).collect::<Vec<_>>());

        for row in &result.rows {
            table.add_row(row.iter().map(|v| Cell::new(v.to_string())).collect::<Vec<_>>());
        }

        let shown = if result.rows.is_empty() {
            "No results".to_string()
        } else {
            format!(
                "{} rows {}-{}",
                result.class_name,
                result.first_record + 1,
                result.first_record + result.rows.len()
            )
        };
        format!("{}\n{} of {} total", table, shown, result.total_count)
    }

    fn format_classes(&self, classes: &[&str]) -> String {
        let mut table = Table::new();
        table.set_header(vec!["Class"]);
        for class in classes {
            table.add_row(vec![*class]);
        }
        table.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_query_result(&self, result: &QueryOutput) -> String {
        let rows: Vec<serde_json::Value> = result
            .rows
            .iter()
            .map(|row| {
                let object = result
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| (column.clone(), value_to_json(value)))
                    .collect::<serde_json::Map<_, _>>();
                serde_json::Value::Object(object)
            })
            .collect();

        let output = serde_json::json!({
            "class": result.class_name,
            "first_record": result.first_record,
            "total_count": result.total_count,
            "rows": rows,
        });
        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_classes(&self, classes: &[&str]) -> String {
        serde_json::to_string_pretty(classes).unwrap_or_else(|_| "[]".to_string())
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int32(i) => serde_json::Value::from(*i),
        Value::Int64(i) => serde_json::Value::from(*i),
        Value::Float64(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        other => serde_json::Value::String(other.to_string()),
    }
}
