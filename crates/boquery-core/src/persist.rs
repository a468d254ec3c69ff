//! Saving and deleting business objects.
//!
//! Writes follow the class layout: an object spans one table per entry of
//! its [`ClassLayout`](crate::catalog::ClassLayout). Inserts go base table
//! first and deletes subclass table first, so a subclass row never exists
//! without its superclass row.
//!
//! Deleting an object applies the delete-parent action of each of its
//! multiple relationships:
//! - `Prevent`: refuse while related objects exist
//! - `DereferenceRelated`: null the related objects' foreign keys
//! - `DeleteRelated`: delete the related objects, recursively
//! - `DoNothing`: leave related objects alone

use std::collections::HashSet;
use std::sync::Arc;

use boquery_proto::Value;
use tracing::{debug, info};

use crate::catalog::{ClassMapping, DeleteParentAction, TableMapping};
use crate::config::LoaderConfig;
use crate::error::{Error, Result};
use crate::loader::BusinessObjectLoader;
use crate::object::{BusinessObject, ObjectKey, ObjectManager};
use crate::store::DataStore;

/// Result of a delete, cascades included.
#[derive(Debug, Default)]
pub struct DeleteResult {
    /// Objects removed from the store, the requested one last.
    pub deleted: Vec<ObjectKey>,
    /// Objects whose foreign keys were set to null.
    pub dereferenced: Vec<ObjectKey>,
}

impl DeleteResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of objects written.
    pub fn affected_count(&self) -> usize {
        self.deleted.len() + self.dereferenced.len()
    }
}

/// Applies object writes to a store.
pub(crate) struct Persister<'a> {
    store: &'a dyn DataStore,
    objects: &'a ObjectManager,
    config: &'a LoaderConfig,
    loader: BusinessObjectLoader<'a>,
}

impl<'a> Persister<'a> {
    pub(crate) fn new(
        store: &'a dyn DataStore,
        objects: &'a ObjectManager,
        config: &'a LoaderConfig,
        loader: BusinessObjectLoader<'a>,
    ) -> Self {
        Self {
            store,
            objects,
            config,
            loader,
        }
    }

    /// Persist whatever state the object is in.
    pub(crate) fn save(&self, object: &Arc<BusinessObject>) -> Result<()> {
        let status = object.status();
        if status.is_deleted {
            if !status.is_dirty {
                return Ok(());
            }
            if status.is_new {
                object.mark_removed();
                return Ok(());
            }
            return self.delete(object).map(|_| ());
        }
        if status.is_new {
            self.insert(object)
        } else if status.is_dirty {
            self.update(object)
        } else {
            Ok(())
        }
    }

    fn insert(&self, object: &Arc<BusinessObject>) -> Result<()> {
        object.validate()?;
        let mapping = object.class();
        let key = object.key();

        if let Some(existing) = self.objects.lookup(&key) {
            if !Arc::ptr_eq(&existing, object) {
                return Err(Error::developer(
                    "A business object with the same identity already exists",
                    format!("{} is already loaded as another instance", key),
                ));
            }
        }

        let values = object.values();
        let layout = mapping.layout();
        for (index, table) in layout.tables.iter().enumerate().rev() {
            let mut row = key_columns(mapping, table, &values);
            for prop_name in &table.props {
                if let Some((field, value)) = column_of(mapping, prop_name, &values) {
                    set_column(&mut row, field, value);
                }
            }
            if index == 0 {
                if let Some(discriminator) = &layout.discriminator {
                    set_column(
                        &mut row,
                        discriminator.field_name.clone(),
                        Value::String(discriminator.value.clone()),
                    );
                }
            }
            self.store.insert(&table.table_name, &row)?;
        }

        object.mark_saved();
        self.objects.register_as(key.clone(), object.clone());
        info!(object = %key, tables = layout.tables.len(), "inserted business object");
        Ok(())
    }

    fn update(&self, object: &Arc<BusinessObject>) -> Result<()> {
        object.validate()?;
        let mapping = object.class();
        let old_key = object.persisted_key();
        let new_key = object.key();
        let key_changed = old_key != new_key;

        let current = object.values();
        let persisted: Vec<(String, Value)> = mapping
            .props()
            .iter()
            .map(|p| Ok((p.name.clone(), object.persisted_property_value(&p.name)?)))
            .collect::<Result<_>>()?;

        for table in &mapping.layout().tables {
            let mut changed = Vec::new();
            for prop_name in &table.props {
                let now = lookup(&current, prop_name);
                if now != lookup(&persisted, prop_name) {
                    if let Some((field, value)) = column_of(mapping, prop_name, &current) {
                        set_column(&mut changed, field, value);
                    }
                }
            }
            if key_changed {
                for (field, value) in key_columns(mapping, table, &current) {
                    set_column(&mut changed, field, value);
                }
            }
            if changed.is_empty() {
                continue;
            }

            let key = key_columns(mapping, table, &persisted);
            let rows = self.store.update(&table.table_name, &key, &changed)?;
            if rows == 0 {
                return Err(Error::developer(
                    "The business object could not be saved",
                    format!(
                        "{} has no row in table '{}'; it may have been deleted",
                        old_key, table.table_name
                    ),
                ));
            }
        }

        object.mark_saved();
        if key_changed {
            self.objects.rekey(&old_key, object);
        }
        info!(object = %new_key, "updated business object");
        Ok(())
    }

    /// Delete an object and apply its delete-parent actions.
    pub(crate) fn delete(&self, object: &Arc<BusinessObject>) -> Result<DeleteResult> {
        let mut result = DeleteResult::new();
        if object.is_new() {
            object.mark_removed();
            return Ok(result);
        }

        let mut visited = HashSet::new();
        self.delete_recursive(object, &mut result, &mut visited, 0)?;
        Ok(result)
    }

    fn delete_recursive(
        &self,
        object: &Arc<BusinessObject>,
        result: &mut DeleteResult,
        visited: &mut HashSet<ObjectKey>,
        depth: usize,
    ) -> Result<()> {
        if depth > self.config.max_cascade_depth {
            return Err(Error::CascadeDepthExceeded(self.config.max_cascade_depth));
        }

        let key = object.persisted_key();
        if !visited.insert(key.clone()) {
            return Ok(());
        }

        let mapping = object.class();
        let mut actions = Vec::new();
        for rel in mapping.relationships().iter().filter(|r| r.is_multiple()) {
            if rel.delete_parent_action == DeleteParentAction::DoNothing {
                continue;
            }
            let related = self.loader.get_related_collection(object, &rel.name)?;
            if related.is_empty() {
                continue;
            }
            if rel.delete_parent_action == DeleteParentAction::Prevent {
                return Err(Error::DeletePrevented {
                    object: key.to_string(),
                    relationship: rel.name.clone(),
                    count: related.len(),
                });
            }
            actions.push((rel, related));
        }

        // Every Prevent has been checked before anything is written.
        for (rel, related) in actions {
            debug!(
                object = %key,
                relationship = %rel.name,
                related = related.len(),
                action = ?rel.delete_parent_action,
                "applying delete-parent action"
            );
            for child in &related {
                match rel.delete_parent_action {
                    DeleteParentAction::DereferenceRelated => {
                        for key_mapping in &rel.key_mappings {
                            child.set_property_value_unchecked(&key_mapping.related_prop, Value::Null)?;
                        }
                        self.save(child)?;
                        result.dereferenced.push(child.key());
                    }
                    DeleteParentAction::DeleteRelated => {
                        self.delete_recursive(child, result, visited, depth + 1)?;
                    }
                    DeleteParentAction::Prevent | DeleteParentAction::DoNothing => {}
                }
            }
        }

        let persisted: Vec<(String, Value)> = mapping
            .primary_key()
            .props
            .iter()
            .map(|p| Ok((p.clone(), object.persisted_property_value(p)?)))
            .collect::<Result<_>>()?;
        for table in &mapping.layout().tables {
            let key_values = key_columns(mapping, table, &persisted);
            self.store.delete(&table.table_name, &key_values)?;
        }

        object.mark_removed();
        self.objects.remove(&key, object);
        info!(object = %key, depth, "deleted business object");
        result.deleted.push(key);
        Ok(())
    }
}

fn lookup<'v>(values: &'v [(String, Value)], name: &str) -> Option<&'v Value> {
    values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}

/// Column name and value of a property.
fn column_of(mapping: &ClassMapping, prop_name: &str, values: &[(String, Value)]) -> Option<(String, Value)> {
    let prop = mapping.prop(prop_name)?;
    let value = lookup(values, prop_name).cloned().unwrap_or(Value::Null);
    Some((prop.field_name.clone(), value))
}

/// Key columns of `table` with their values taken from `values`.
fn key_columns(mapping: &ClassMapping, table: &TableMapping, values: &[(String, Value)]) -> Vec<(String, Value)> {
    mapping
        .primary_key()
        .props
        .iter()
        .zip(&table.key_fields)
        .map(|(prop, field)| {
            let value = lookup(values, prop).cloned().unwrap_or(Value::Null);
            (field.clone(), value)
        })
        .collect()
}

fn set_column(row: &mut Vec<(String, Value)>, field: String, value: Value) {
    match row.iter_mut().find(|(n, _)| *n == field) {
        Some((_, existing)) => *existing = value,
        None => row.push((field, value)),
    }
}
