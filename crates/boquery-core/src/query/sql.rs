//! SQL rendering for the SQLite store.

use std::fmt::Write;

use boquery_proto::{
    ComparisonOp, Criteria, CriterionValue, QueryField, SelectQuery, Source, Value,
};
use chrono::NaiveDateTime;

/// A rendered statement with positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl std::fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql)?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
            write!(f, "\n-- params: [{}]", params.join(", "))?;
        }
        Ok(())
    }
}

/// Quote an identifier.
pub fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn column(field: &QueryField) -> String {
    match &field.source_name {
        Some(source) => format!("{}.{}", quote(source), quote(&field.field_name)),
        None => quote(&field.field_name),
    }
}

/// Render the paged select for a query.
pub fn render_select(query: &SelectQuery, now: NaiveDateTime) -> SqlStatement {
    let mut statement = render_distinct(query, now);

    if !query.order_criteria().is_empty() {
        let order: Vec<String> = query
            .order_criteria()
            .fields()
            .iter()
            .map(|f| format!("{} {}", column(&f.field), f.direction.as_sql()))
            .collect();
        let _ = write!(statement.sql, " ORDER BY {}", order.join(", "));
    }

    match (query.limit(), query.first_record_to_load()) {
        (Some(limit), first) => {
            let _ = write!(statement.sql, " LIMIT {} OFFSET {}", limit, first);
        }
        (None, first) if first > 0 => {
            let _ = write!(statement.sql, " LIMIT -1 OFFSET {}", first);
        }
        _ => {}
    }

    statement
}

/// Render a count of every row the query matches, ignoring the page window.
pub fn render_count(query: &SelectQuery, now: NaiveDateTime) -> SqlStatement {
    let inner = render_distinct(query, now);
    SqlStatement {
        sql: format!("SELECT COUNT(*) FROM ({})", inner.sql),
        params: inner.params,
    }
}

fn render_distinct(query: &SelectQuery, now: NaiveDateTime) -> SqlStatement {
    let mut params = Vec::new();
    let mut sql = String::from("SELECT DISTINCT ");

    if query.fields().is_empty() {
        sql.push('*');
    } else {
        let columns: Vec<String> = query
            .fields()
            .iter()
            .map(|f| format!("{} AS {}", column(f), quote(&f.property_name)))
            .collect();
        sql.push_str(&columns.join(", "));
    }

    if let Some(source) = query.source() {
        let _ = write!(sql, " FROM {}", render_source(source));
    }

    if let Some(criteria) = query.effective_criteria() {
        sql.push_str(" WHERE ");
        render_criteria(&criteria, now, &mut sql, &mut params);
    }

    SqlStatement { sql, params }
}

fn render_source(source: &Source) -> String {
    let mut sql = format!("{} AS {}", quote(&source.entity_name), quote(&source.name));
    for (parent, join) in source.flatten_joins() {
        let conditions: Vec<String> = join
            .join_fields
            .iter()
            .map(|jf| {
                format!(
                    "{}.{} = {}.{}",
                    quote(parent),
                    quote(&jf.from_field),
                    quote(&join.to_source.name),
                    quote(&jf.to_field)
                )
            })
            .collect();
        let _ = write!(
            sql,
            " {} {} AS {} ON {}",
            join.join_type.as_sql(),
            quote(&join.to_source.entity_name),
            quote(&join.to_source.name),
            conditions.join(" AND ")
        );
    }
    sql
}

fn render_criteria(criteria: &Criteria, now: NaiveDateTime, sql: &mut String, params: &mut Vec<Value>) {
    match criteria {
        Criteria::Comparison { field, op, value } => {
            let column = column(field);
            let mut values = match value.resolve(now) {
                CriterionValue::Literal(v) => vec![v],
                CriterionValue::List(vs) => vs,
                CriterionValue::Today | CriterionValue::Now => Vec::new(),
            };
            match op {
                ComparisonOp::Is | ComparisonOp::IsNot
                    if values.first().map_or(true, Value::is_null) =>
                {
                    let _ = write!(sql, "{} {} NULL", column, op.as_sql());
                }
                ComparisonOp::In | ComparisonOp::NotIn if values.is_empty() => {
                    sql.push_str(if *op == ComparisonOp::In { "0 = 1" } else { "1 = 1" });
                }
                ComparisonOp::In | ComparisonOp::NotIn => {
                    let placeholders = vec!["?"; values.len()].join(", ");
                    let _ = write!(sql, "{} {} ({})", column, op.as_sql(), placeholders);
                    params.extend(values);
                }
                _ => {
                    let _ = write!(sql, "{} {} ?", column, op.as_sql());
                    params.push(if values.is_empty() {
                        Value::Null
                    } else {
                        values.swap_remove(0)
                    });
                }
            }
        }
        Criteria::Composite { left, op, right } => {
            sql.push('(');
            render_criteria(left, now, sql, params);
            let _ = write!(sql, ") {} (", op.as_sql());
            render_criteria(right, now, sql, params);
            sql.push(')');
        }
        Criteria::Not(inner) => {
            sql.push_str("NOT (");
            render_criteria(inner, now, sql, params);
            sql.push(')');
        }
    }
}

/// Render an insert of one row.
pub fn render_insert(table: &str, values: &[(String, Value)]) -> SqlStatement {
    let columns: Vec<String> = values.iter().map(|(c, _)| quote(c)).collect();
    let placeholders = vec!["?"; values.len()].join(", ");
    SqlStatement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(table),
            columns.join(", "),
            placeholders
        ),
        params: values.iter().map(|(_, v)| v.clone()).collect(),
    }
}

/// Render an update of the rows matching `key`.
pub fn render_update(table: &str, key: &[(String, Value)], values: &[(String, Value)]) -> SqlStatement {
    let assignments: Vec<String> = values.iter().map(|(c, _)| format!("{} = ?", quote(c))).collect();
    let mut params: Vec<Value> = values.iter().map(|(_, v)| v.clone()).collect();
    let (filter, key_params) = render_key_filter(key);
    params.extend(key_params);
    SqlStatement {
        sql: format!(
            "UPDATE {} SET {} WHERE {}",
            quote(table),
            assignments.join(", "),
            filter
        ),
        params,
    }
}

/// Render a delete of the rows matching `key`.
pub fn render_delete(table: &str, key: &[(String, Value)]) -> SqlStatement {
    let (filter, params) = render_key_filter(key);
    SqlStatement {
        sql: format!("DELETE FROM {} WHERE {}", quote(table), filter),
        params,
    }
}

fn render_key_filter(key: &[(String, Value)]) -> (String, Vec<Value>) {
    let mut conditions = Vec::with_capacity(key.len());
    let mut params = Vec::with_capacity(key.len());
    for (column, value) in key {
        if value.is_null() {
            conditions.push(format!("{} IS NULL", quote(column)));
        } else {
            conditions.push(format!("{} = ?", quote(column)));
            params.push(value.clone());
        }
    }
    if conditions.is_empty() {
        conditions.push("1 = 1".to_string());
    }
    (conditions.join(" AND "), params)
}
