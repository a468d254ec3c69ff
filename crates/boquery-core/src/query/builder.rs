//! Query builder: turns a class plus criteria into an executable query.

use boquery_proto::{
    ComparisonOp, Criteria, CriterionValue, JoinField, JoinType, OrderCriteria, QueryError,
    QueryField, SelectQuery, Source, Value, PATH_SEPARATOR,
};
use tracing::{debug, instrument};

use super::context::QueryContext;
use super::sql::{self, SqlStatement};
use crate::catalog::{ClassDefRegistry, ClassMapping, PropType};
use crate::error::{Error, Result};

/// Builds [`SelectQuery`] values from class metadata.
///
/// Every relationship path in criteria or ordering becomes a join named by
/// its dotted path from the root, so two fields sharing a path share the
/// join. Criteria joins are inner joins; ordering joins are left outer so
/// that ordering never drops rows. A path needed by both stays inner.
pub struct QueryBuilder<'a> {
    registry: &'a ClassDefRegistry,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(registry: &'a ClassDefRegistry) -> Self {
        Self { registry }
    }

    /// Build a query loading `class_name`.
    ///
    /// The query projects every persisted property, inherited ones
    /// included, under its property name.
    #[instrument(skip(self, criteria, order), fields(class = %class_name))]
    pub fn create_select_query(
        &self,
        class_name: &str,
        criteria: Option<Criteria>,
        order: Option<OrderCriteria>,
    ) -> Result<SelectQuery> {
        let mapping = self.registry.get(class_name)?;

        let mut root = Source::new(class_name, mapping.table_name());
        add_inheritance_joins(&mut root, mapping, JoinType::InnerJoin);

        let mut query = SelectQuery::new(class_name);
        for prop in mapping.props() {
            if let Some((index, _)) = mapping.prop_location(&prop.name) {
                query.add_field(QueryField::resolved(
                    prop.name.clone(),
                    prop.field_name.clone(),
                    table_source_name(&root.name, mapping, index),
                ));
            }
        }

        if let Some(discriminator) = &mapping.layout().discriminator {
            query.set_discriminator(Some(Criteria::Comparison {
                field: QueryField::resolved(
                    discriminator.field_name.clone(),
                    discriminator.field_name.clone(),
                    root.name.clone(),
                ),
                op: ComparisonOp::Equals,
                value: CriterionValue::Literal(Value::String(discriminator.value.clone())),
            }));
        }

        query.set_source(root);
        self.prepare_criteria(&mut query, criteria)?;
        if let Some(order) = order {
            self.prepare_order_criteria(&mut query, order)?;
        }

        debug!(
            joins = query.source().map_or(0, Source::join_count),
            fields = query.fields().len(),
            "built select query"
        );
        Ok(query)
    }

    /// Resolve criteria against the query's class and attach it.
    ///
    /// Each leaf's relationship path is joined in, its field bound to a
    /// source and column, and its literal coerced to the property type.
    pub fn prepare_criteria(&self, query: &mut SelectQuery, criteria: Option<Criteria>) -> Result<()> {
        let Some(mut criteria) = criteria else {
            query.set_criteria(None);
            return Ok(());
        };

        let mapping = self.registry.get(query.class_name())?;
        let source = query.source_mut().ok_or_else(|| {
            Error::developer(
                "The query could not be prepared",
                "criteria prepared before the query source was set",
            )
        })?;

        criteria.try_for_each_leaf(&mut |field: &mut QueryField, op, value: &mut CriterionValue| {
            let prop_type = self.resolve_field(mapping, source, field, JoinType::InnerJoin)?;
            coerce_criterion(prop_type, op, field, value)
        })?;

        query.set_criteria(Some(criteria));
        Ok(())
    }

    /// Resolve order criteria against the query's joins and attach it.
    pub fn prepare_order_criteria(&self, query: &mut SelectQuery, mut order: OrderCriteria) -> Result<()> {
        let mapping = self.registry.get(query.class_name())?;
        let source = query
            .source_mut()
            .ok_or(QueryError::OrderCriteriaWithoutSource)?;

        for order_field in order.fields_mut() {
            self.resolve_field(mapping, source, &mut order_field.field, JoinType::LeftOuterJoin)?;
        }

        query.set_order_criteria(order)?;
        Ok(())
    }

    /// Render the SQL the SQLite store would run for `query`.
    pub fn explain(&self, query: &SelectQuery) -> SqlStatement {
        sql::render_select(query, QueryContext::new().now())
    }

    fn resolve_field(
        &self,
        root_mapping: &'a ClassMapping,
        root: &mut Source,
        field: &mut QueryField,
        join_type: JoinType,
    ) -> Result<PropType> {
        let mut mapping = root_mapping;
        let mut source_name = root.name.clone();

        for rel_name in &field.relationship_path {
            let rel = mapping.relationship(rel_name).ok_or_else(|| {
                Error::InvalidCriteria(format!(
                    "'{}' has no relationship '{}' (in '{}')",
                    mapping.name(),
                    rel_name,
                    field.path()
                ))
            })?;
            let related: &'a ClassMapping = self.registry.get(&rel.related_class)?;

            let mut join_fields = Vec::with_capacity(rel.key_mappings.len());
            let mut from_source = source_name.clone();
            for key in &rel.key_mappings {
                let (index, owner_prop) = mapping.prop_location(&key.owner_prop).ok_or_else(|| {
                    Error::InvalidCriteria(format!(
                        "relationship '{}.{}' key '{}' is not persisted",
                        mapping.name(),
                        rel.name,
                        key.owner_prop
                    ))
                })?;
                let to_field = related.primary_field_name(&key.related_prop).ok_or_else(|| {
                    Error::InvalidCriteria(format!(
                        "relationship '{}.{}' key '{}' is not stored in table '{}'",
                        mapping.name(),
                        rel.name,
                        key.related_prop,
                        related.table_name()
                    ))
                })?;
                from_source = table_source_name(&source_name, mapping, index);
                join_fields.push(JoinField::new(owner_prop.field_name.clone(), to_field));
            }

            let joined_name = format!("{}{}{}", source_name, PATH_SEPARATOR, rel_name);
            let parent = root.find_mut(&from_source).ok_or_else(|| {
                Error::developer(
                    "The query could not be prepared",
                    format!("join source '{}' missing from query", from_source),
                )
            })?;
            let joined = parent.add_join(
                Source::new(joined_name.clone(), related.table_name()),
                join_fields,
                join_type,
            );
            add_inheritance_joins(joined, related, join_type);

            mapping = related;
            source_name = joined_name;
        }

        let prop = mapping.prop(&field.property_name).ok_or_else(|| {
            Error::InvalidCriteria(format!(
                "'{}' has no property '{}' (in '{}')",
                mapping.name(),
                field.property_name,
                field.path()
            ))
        })?;
        let (index, _) = mapping.prop_location(&prop.name).ok_or_else(|| {
            Error::InvalidCriteria(format!(
                "property '{}.{}' is not persisted",
                mapping.name(),
                prop.name
            ))
        })?;

        field.field_name = prop.field_name.clone();
        field.source_name = Some(table_source_name(&source_name, mapping, index));
        Ok(prop.prop_type)
    }
}

/// Name of the source holding table `index` of a class reached as `source_name`.
fn table_source_name(source_name: &str, mapping: &ClassMapping, index: usize) -> String {
    if index == 0 {
        source_name.to_string()
    } else {
        format!("{}:{}", source_name, mapping.layout().tables[index].class_name)
    }
}

/// Join the superclass tables of a class-table hierarchy onto `source`.
fn add_inheritance_joins(source: &mut Source, mapping: &ClassMapping, join_type: JoinType) {
    let layout = mapping.layout();
    let primary_keys = &layout.primary().key_fields;
    for (index, table) in layout.tables.iter().enumerate().skip(1) {
        let join_fields = primary_keys
            .iter()
            .zip(&table.key_fields)
            .map(|(from, to)| JoinField::new(from.clone(), to.clone()))
            .collect();
        let name = table_source_name(&source.name, mapping, index);
        source.add_join(Source::new(name, table.table_name.clone()), join_fields, join_type);
    }
}

fn coerce_criterion(
    prop_type: PropType,
    op: ComparisonOp,
    field: &QueryField,
    value: &mut CriterionValue,
) -> Result<()> {
    if matches!(op, ComparisonOp::Like | ComparisonOp::NotLike) {
        return Ok(());
    }

    let coerce = |v: Value| {
        prop_type.coerce(v).map_err(|e| {
            Error::InvalidCriteria(format!("value for '{}' is invalid: {}", field.path(), e))
        })
    };

    match value {
        CriterionValue::Literal(v) => {
            *v = coerce(std::mem::replace(v, Value::Null))?;
        }
        CriterionValue::List(values) => {
            for v in values.iter_mut() {
                *v = coerce(std::mem::replace(v, Value::Null))?;
            }
        }
        CriterionValue::Today | CriterionValue::Now => {}
    }
    Ok(())
}
