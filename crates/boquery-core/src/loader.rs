//! Business object loader.
//!
//! The loader executes select queries against a [`DataStore`] and turns the
//! returned rows into business objects, resolving every row through the
//! identity map so that one identity always maps to one instance.

use std::sync::Arc;

use boquery_proto::{ComparisonOp, Criteria, CriterionValue, SelectQuery, Value};
use tracing::{debug, instrument};

use crate::catalog::{ClassDefRegistry, ClassMapping, RelationshipDef};
use crate::collection::BusinessObjectCollection;
use crate::config::LoaderConfig;
use crate::error::{Error, Result};
use crate::object::{BusinessObject, ObjectKey, ObjectManager};
use crate::query::{IntoCriteria, IntoOrderCriteria, QueryBuilder, QueryContext};
use crate::store::{DataStore, Row};

/// Outcome of a load that expects at most one match.
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(Arc<BusinessObject>),
    NotFound,
    /// More than one row matched.
    Ambiguous(usize),
}

impl Lookup {
    pub fn found(self) -> Option<Arc<BusinessObject>> {
        match self {
            Lookup::Found(object) => Some(object),
            _ => None,
        }
    }
}

/// One executed page of a query.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Objects of the page window, in query order.
    pub objects: Vec<Arc<BusinessObject>>,
    /// Rows matching the query, ignoring the page window.
    pub total_count: usize,
}

/// Loads business objects from a store.
///
/// A loader borrows everything it needs from its
/// [`DataAccessor`](crate::DataAccessor) and is cheap to create.
pub struct BusinessObjectLoader<'a> {
    registry: &'a ClassDefRegistry,
    store: &'a dyn DataStore,
    objects: &'a ObjectManager,
    config: &'a LoaderConfig,
}

impl<'a> BusinessObjectLoader<'a> {
    pub fn new(
        registry: &'a ClassDefRegistry,
        store: &'a dyn DataStore,
        objects: &'a ObjectManager,
        config: &'a LoaderConfig,
    ) -> Self {
        Self {
            registry,
            store,
            objects,
            config,
        }
    }

    pub fn query_builder(&self) -> QueryBuilder<'a> {
        QueryBuilder::new(self.registry)
    }

    pub fn registry(&self) -> &'a ClassDefRegistry {
        self.registry
    }

    /// Context for one store call, carrying the configured deadline.
    pub fn context(&self) -> QueryContext {
        let ctx = QueryContext::new();
        match self.config.query_timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        }
    }

    /// Load the object matching `criteria`, distinguishing no match from
    /// several.
    #[instrument(skip(self, criteria), fields(class = %class_name))]
    pub fn find_unique(&self, class_name: &str, criteria: impl IntoCriteria) -> Result<Lookup> {
        let query = self
            .query_builder()
            .create_select_query(class_name, criteria.into_criteria()?, None)?;
        let page = self.load_page(&query)?;

        let mut objects = page.objects;
        Ok(match objects.len() {
            0 => Lookup::NotFound,
            1 => Lookup::Found(objects.remove(0)),
            n => Lookup::Ambiguous(n),
        })
    }

    /// Load the single object matching `criteria`.
    ///
    /// No match is `Ok(None)`. More than one match is a developer error:
    /// the criteria were expected to identify one object.
    pub fn get_business_object(
        &self,
        class_name: &str,
        criteria: impl IntoCriteria,
    ) -> Result<Option<Arc<BusinessObject>>> {
        let criteria = criteria.into_criteria()?;
        let described = criteria
            .as_ref()
            .map_or_else(|| "<none>".to_string(), ToString::to_string);

        match self.find_unique(class_name, criteria)? {
            Lookup::Found(object) => Ok(Some(object)),
            Lookup::NotFound => Ok(None),
            Lookup::Ambiguous(count) => Err(Error::developer(
                "Loading a single business object returned more than one match",
                format!(
                    "{} objects of class '{}' matched criteria '{}'; a single-object load \
                     expects at most one",
                    count, class_name, described
                ),
            )),
        }
    }

    /// Load an object by primary key, consulting the identity map first.
    ///
    /// `key` gives a value for every primary-key property.
    #[instrument(skip(self, key), fields(class = %class_name))]
    pub fn get_business_object_by_key(
        &self,
        class_name: &str,
        key: &[(&str, Value)],
    ) -> Result<Option<Arc<BusinessObject>>> {
        let mapping = self.registry.get(class_name)?;

        let mut parts = Vec::with_capacity(mapping.primary_key().props.len());
        for name in &mapping.primary_key().props {
            let raw = key
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| {
                    Error::developer(
                        "The object could not be loaded",
                        format!("no value given for key property '{}' of '{}'", name, class_name),
                    )
                })?;
            let prop = self.registry.find_prop(class_name, name)?;
            parts.push((name.as_str(), prop.prop_type.coerce(raw)?));
        }

        let object_key = ObjectKey::new(mapping.name(), parts.iter().map(|(n, v)| (*n, v)));
        if let Some(object) = self.objects.lookup(&object_key) {
            debug!(key = %object_key, "loaded from identity map");
            return Ok(Some(object));
        }

        let criteria = parts
            .into_iter()
            .map(|(name, value)| Criteria::eq(name, value))
            .reduce(Criteria::and);
        self.get_business_object(class_name, criteria)
    }

    /// Load every object matching `criteria`, in `order`.
    pub fn get_business_object_collection(
        &self,
        class_name: &str,
        criteria: impl IntoCriteria,
        order: impl IntoOrderCriteria,
    ) -> Result<BusinessObjectCollection> {
        self.get_business_object_collection_paged(class_name, criteria, order, 0, -1)
    }

    /// Load the window `[first, first + limit)` of the objects matching
    /// `criteria` in `order`.
    ///
    /// A negative `limit` is unbounded. A negative `first` is a range
    /// error raised before the store is touched. The collection's
    /// [`total_count`](BusinessObjectCollection::total_count) is the number
    /// of matches ignoring the window.
    pub fn get_business_object_collection_paged(
        &self,
        class_name: &str,
        criteria: impl IntoCriteria,
        order: impl IntoOrderCriteria,
        first: i64,
        limit: i64,
    ) -> Result<BusinessObjectCollection> {
        let mapping = self.registry.get(class_name)?.clone();
        let mut query = self.query_builder().create_select_query(
            class_name,
            criteria.into_criteria()?,
            order.into_order_criteria()?,
        )?;
        query.set_first_record_to_load(first)?;
        query.set_limit(limit);

        let mut collection = BusinessObjectCollection::new(mapping, query);
        self.refresh(&mut collection)?;
        Ok(collection)
    }

    /// Execute a prepared query.
    #[instrument(skip(self, query), fields(class = %query.class_name(), store = self.store.name()))]
    pub fn load_page(&self, query: &SelectQuery) -> Result<Page> {
        let mapping = self.registry.get(query.class_name())?;
        let ctx = self.context();

        let (rows, total_count) = self.store.execute_page(query, &ctx)?;

        let objects = rows
            .iter()
            .map(|row| self.resolve(mapping, row))
            .collect::<Result<Vec<_>>>()?;

        debug!(rows = objects.len(), total_count, "loaded page");
        Ok(Page {
            objects,
            total_count,
        })
    }

    /// Re-run a collection's query and reconcile its contents.
    pub fn refresh(&self, collection: &mut BusinessObjectCollection) -> Result<()> {
        collection.check_persisted_unique()?;
        let page = self.load_page(collection.select_query())?;
        collection.apply_page(page);
        Ok(())
    }

    /// Follow a single relationship from `object`.
    pub fn get_related_business_object(
        &self,
        object: &BusinessObject,
        relationship: &str,
    ) -> Result<Option<Arc<BusinessObject>>> {
        let rel = relationship_of(object.class(), relationship)?;
        if rel.is_multiple() {
            return Err(Error::developer(
                "The related object could not be loaded",
                format!(
                    "'{}.{}' is a multiple relationship; load it as a collection",
                    object.class_name(),
                    relationship
                ),
            ));
        }

        let criteria = related_criteria(object, rel)?;
        self.get_business_object(&rel.related_class, criteria)
    }

    /// Load the collection at the end of a multiple relationship from
    /// `object`.
    pub fn get_related_collection(
        &self,
        object: &BusinessObject,
        relationship: &str,
    ) -> Result<BusinessObjectCollection> {
        let rel = relationship_of(object.class(), relationship)?;
        if !rel.is_multiple() {
            return Err(Error::developer(
                "The related collection could not be loaded",
                format!(
                    "'{}.{}' is a single relationship; load it as an object",
                    object.class_name(),
                    relationship
                ),
            ));
        }

        let criteria = related_criteria(object, rel)?;
        self.get_business_object_collection(&rel.related_class, criteria, None::<&str>)
    }

    /// Instance for a row: the registered one if live, else a fresh one.
    /// An existing instance is never overwritten with row data.
    fn resolve(&self, mapping: &Arc<ClassMapping>, row: &Row) -> Result<Arc<BusinessObject>> {
        let key = BusinessObject::key_of_row(mapping, row)?;
        if let Some(existing) = self.objects.lookup(&key) {
            return Ok(existing);
        }
        let object = BusinessObject::from_row(mapping.clone(), row)?;
        Ok(self.objects.register_as(key, object))
    }
}

fn relationship_of<'m>(mapping: &'m ClassMapping, name: &str) -> Result<&'m RelationshipDef> {
    mapping
        .relationship(name)
        .ok_or_else(|| Error::UnknownRelationship {
            class: mapping.name().to_string(),
            relationship: name.to_string(),
        })
}

/// Criteria selecting the objects related to `object` through `rel`.
///
/// A null owner key matches nothing.
pub(crate) fn related_criteria(object: &BusinessObject, rel: &RelationshipDef) -> Result<Criteria> {
    let mut criteria: Option<Criteria> = None;
    for mapping in &rel.key_mappings {
        let value = object.get_property_value(&mapping.owner_prop)?;
        let leaf = if value.is_null() {
            Criteria::compare(
                &mapping.related_prop,
                ComparisonOp::In,
                CriterionValue::List(Vec::new()),
            )
        } else {
            Criteria::eq(&mapping.related_prop, value)
        };
        criteria = Criteria::merge(criteria, Some(leaf));
    }
    criteria.ok_or_else(|| {
        Error::InvalidClassDef(format!(
            "relationship '{}' of '{}' has no key mappings",
            rel.name,
            object.class_name()
        ))
    })
}
