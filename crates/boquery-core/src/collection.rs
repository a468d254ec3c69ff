//! Business object collections.

use std::collections::HashSet;
use std::sync::Arc;

use boquery_proto::{SelectQuery, Value};
use tracing::{debug, info};

use crate::catalog::ClassMapping;
use crate::error::{Error, Result};
use crate::loader::{BusinessObjectLoader, Page};
use crate::object::{BusinessObject, ObjectKey};
use crate::query::filter::sort_order;
use crate::query::{IntoCriteria, IntoOrderCriteria};

/// An ordered set of business objects of one class, tied to the query that
/// loaded it.
///
/// The collection keeps its select query so that [`refresh`] re-executes
/// exactly the same request, page window included. Objects created through
/// the collection are kept across refreshes until they are saved.
///
/// [`refresh`]: BusinessObjectCollection::refresh
#[derive(Debug, Clone)]
pub struct BusinessObjectCollection {
    class: Arc<ClassMapping>,
    select_query: Arc<SelectQuery>,
    items: Vec<Arc<BusinessObject>>,
    persisted: Vec<Arc<BusinessObject>>,
    created: Vec<Arc<BusinessObject>>,
    total_count: usize,
}

impl BusinessObjectCollection {
    /// Create an empty collection that will load with `query`.
    pub fn new(class: Arc<ClassMapping>, query: SelectQuery) -> Self {
        Self {
            class,
            select_query: Arc::new(query),
            items: Vec::new(),
            persisted: Vec::new(),
            created: Vec::new(),
            total_count: 0,
        }
    }

    pub fn class(&self) -> &Arc<ClassMapping> {
        &self.class
    }

    /// The query the collection loads and refreshes with.
    pub fn select_query(&self) -> &SelectQuery {
        &self.select_query
    }

    /// Replace contents with every object matching `criteria`, in `order`.
    pub fn load(
        &mut self,
        loader: &BusinessObjectLoader<'_>,
        criteria: impl IntoCriteria,
        order: impl IntoOrderCriteria,
    ) -> Result<()> {
        self.load_with_limit(loader, criteria, order, 0, -1).map(|_| ())
    }

    /// Replace contents with the window `[first, first + limit)` of the
    /// matching objects and return the total match count.
    ///
    /// The window is kept, so [`refresh`](Self::refresh) reloads the same
    /// positions of the result rather than the same objects.
    pub fn load_with_limit(
        &mut self,
        loader: &BusinessObjectLoader<'_>,
        criteria: impl IntoCriteria,
        order: impl IntoOrderCriteria,
        first: i64,
        limit: i64,
    ) -> Result<usize> {
        let mut query = loader.query_builder().create_select_query(
            self.class.name(),
            criteria.into_criteria()?,
            order.into_order_criteria()?,
        )?;
        query.set_first_record_to_load(first)?;
        query.set_limit(limit);

        self.select_query = Arc::new(query);
        loader.refresh(self)?;
        Ok(self.total_count)
    }

    /// Load every object of the class.
    pub fn load_all(&mut self, loader: &BusinessObjectLoader<'_>) -> Result<()> {
        self.load(loader, None::<&str>, None::<&str>)
    }

    /// Re-execute the stored query.
    pub fn refresh(&mut self, loader: &BusinessObjectLoader<'_>) -> Result<()> {
        loader.refresh(self)
    }

    /// Fail if the persisted snapshot holds one identity twice.
    pub(crate) fn check_persisted_unique(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.persisted.len());
        for object in &self.persisted {
            let key = object.persisted_key();
            if !seen.insert(key.clone()) {
                return Err(Error::developer(
                    "A duplicate business object was found in the collection",
                    format!(
                        "the persisted snapshot of a '{}' collection holds more than one \
                         entry for {}",
                        object.class_name(),
                        key
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Replace contents with a freshly executed page.
    pub(crate) fn apply_page(&mut self, page: Page) {
        let previous: HashSet<ObjectKey> = self.persisted.iter().map(|o| o.persisted_key()).collect();
        let current: HashSet<ObjectKey> = page.objects.iter().map(|o| o.persisted_key()).collect();
        let added = current.difference(&previous).count();
        let removed = previous.difference(&current).count();

        self.created.retain(|o| o.is_new() && !o.is_deleted());
        self.persisted = page.objects.clone();
        self.items = page.objects;
        for object in &self.created {
            if !self.items.iter().any(|o| Arc::ptr_eq(o, object)) {
                self.items.push(object.clone());
            }
        }
        self.total_count = page.total_count;

        if added > 0 || removed > 0 {
            info!(
                class = %self.class.name(),
                added,
                removed,
                total_count = self.total_count,
                "collection membership changed"
            );
        } else {
            debug!(class = %self.class.name(), loaded = self.persisted.len(), "refreshed collection");
        }
    }

    /// Create a new object of the collection's class and add it.
    pub fn create_business_object(&mut self) -> Arc<BusinessObject> {
        let object = BusinessObject::new(self.class.clone());
        self.created.push(object.clone());
        self.items.push(object.clone());
        object
    }

    /// Add an object. Unsaved objects are kept across refreshes.
    pub fn add(&mut self, object: Arc<BusinessObject>) -> Result<()> {
        if !object.class().is_a(self.class.name()) {
            return Err(Error::developer(
                "The object cannot be added to this collection",
                format!(
                    "a '{}' cannot be added to a collection of '{}'",
                    object.class_name(),
                    self.class.name()
                ),
            ));
        }
        if self.items.iter().any(|o| Arc::ptr_eq(o, &object)) {
            return Ok(());
        }
        if object.is_new() {
            self.created.push(object.clone());
        }
        self.items.push(object);
        Ok(())
    }

    /// Remove an object from the visible contents.
    pub fn remove(&mut self, object: &Arc<BusinessObject>) -> bool {
        self.created.retain(|o| !Arc::ptr_eq(o, object));
        let before = self.items.len();
        self.items.retain(|o| !Arc::ptr_eq(o, object));
        self.items.len() != before
    }

    /// Object with the given identity.
    pub fn find(&self, key: &ObjectKey) -> Option<&Arc<BusinessObject>> {
        self.items.iter().find(|o| &o.key() == key)
    }

    pub fn get(&self, index: usize) -> Option<&Arc<BusinessObject>> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<BusinessObject>> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Matches of the last load, ignoring the page window.
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    /// Objects as last loaded from the store.
    pub fn persisted(&self) -> &[Arc<BusinessObject>] {
        &self.persisted
    }

    pub fn persisted_mut(&mut self) -> &mut Vec<Arc<BusinessObject>> {
        &mut self.persisted
    }

    /// Unsaved objects created or added since the last load.
    pub fn created(&self) -> &[Arc<BusinessObject>] {
        &self.created
    }

    /// Sort the visible contents in memory by a property.
    ///
    /// The sort is stable. Strings compare case-insensitively; nulls sort
    /// first.
    pub fn sort_by_property(&mut self, property: &str, ascending: bool) -> Result<()> {
        let mut keyed = self
            .items
            .drain(..)
            .map(|o| Ok((sort_key(o.get_property_value(property)?), o)))
            .collect::<Result<Vec<_>>>()?;

        keyed.sort_by(|(a, _), (b, _)| {
            let ordering = sort_order(a, b);
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
        self.items = keyed.into_iter().map(|(_, o)| o).collect();
        Ok(())
    }
}

fn sort_key(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_lowercase()),
        other => other,
    }
}

impl<'c> IntoIterator for &'c BusinessObjectCollection {
    type Item = &'c Arc<BusinessObject>;
    type IntoIter = std::slice::Iter<'c, Arc<BusinessObject>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ClassDef, ClassDefRegistry, PropDef, PropType};

    fn collection() -> BusinessObjectCollection {
        let mut registry = ClassDefRegistry::new();
        let mapping = registry
            .register(
                ClassDef::new("ContactPerson")
                    .with_object_id("ContactPersonID")
                    .with_prop(PropDef::new("Surname", PropType::String)),
            )
            .unwrap();
        BusinessObjectCollection::new(mapping, SelectQuery::new("ContactPerson"))
    }

    fn surnames(col: &BusinessObjectCollection) -> Vec<String> {
        col.iter()
            .map(|o| o.get_property_value("Surname").unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_sort_by_property_is_case_insensitive_and_stable() {
        let mut col = collection();
        for name in ["beta", "Alpha", "alpha", "Gamma"] {
            col.create_business_object()
                .set_property_value("Surname", name)
                .unwrap();
        }

        col.sort_by_property("Surname", true).unwrap();
        assert_eq!(surnames(&col), vec!["Alpha", "alpha", "beta", "Gamma"]);

        col.sort_by_property("Surname", false).unwrap();
        assert_eq!(surnames(&col), vec!["Gamma", "beta", "Alpha", "alpha"]);
    }

    #[test]
    fn test_sort_by_unknown_property_fails() {
        let mut col = collection();
        col.create_business_object();
        assert!(col.sort_by_property("Nope", true).is_err());
    }

    #[test]
    fn test_duplicate_persisted_entry_is_developer_error() {
        let mut col = collection();
        let object = BusinessObject::new(col.class().clone());
        col.persisted_mut().push(object.clone());
        assert!(col.check_persisted_unique().is_ok());

        col.persisted_mut().push(object.clone());
        let err = col.check_persisted_unique().unwrap_err();
        let message = err.developer_message().unwrap();
        assert!(message.contains("ContactPerson"));
        assert!(message.contains(&object.key().to_string()));
    }

    #[test]
    fn test_add_and_remove() {
        let mut col = collection();
        let object = BusinessObject::new(col.class().clone());
        col.add(object.clone()).unwrap();
        col.add(object.clone()).unwrap();
        assert_eq!(col.len(), 1);
        assert_eq!(col.created().len(), 1);
        assert!(col.find(&object.key()).is_some());

        assert!(col.remove(&object));
        assert!(col.is_empty());
        assert!(col.created().is_empty());
        assert!(!col.remove(&object));
    }

    #[test]
    fn test_apply_page_keeps_unsaved_objects() {
        let mut col = collection();
        let created = col.create_business_object();
        let loaded = BusinessObject::new(col.class().clone());

        col.apply_page(Page {
            objects: vec![loaded.clone()],
            total_count: 7,
        });

        assert_eq!(col.len(), 2);
        assert!(Arc::ptr_eq(col.get(0).unwrap(), &loaded));
        assert!(col.iter().any(|o| Arc::ptr_eq(o, &created)));
        assert_eq!(col.persisted().len(), 1);
        assert_eq!(col.total_count(), 7);
    }
}
