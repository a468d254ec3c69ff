//! Data accessor: the session that ties metadata, store and identity map
//! together.

use std::sync::Arc;

use tracing::info;

use crate::catalog::ClassDefRegistry;
use crate::collection::BusinessObjectCollection;
use crate::config::LoaderConfig;
use crate::error::Result;
use crate::loader::BusinessObjectLoader;
use crate::object::{BusinessObject, ObjectManager};
use crate::persist::{DeleteResult, Persister};
use crate::query::{QueryBuilder, QueryContext};
use crate::store::DataStore;

/// A unit of work over one store.
///
/// Owns the class registry, the store, the identity map and the loader
/// configuration. Loaders and query builders borrow from it, so every
/// object loaded or saved through one accessor shares one identity map.
pub struct DataAccessor {
    registry: Arc<ClassDefRegistry>,
    store: Arc<dyn DataStore>,
    objects: ObjectManager,
    config: LoaderConfig,
}

impl DataAccessor {
    /// Create an accessor. Fails if the registry's relationships do not
    /// resolve.
    pub fn new(registry: impl Into<Arc<ClassDefRegistry>>, store: Arc<dyn DataStore>) -> Result<Self> {
        let registry = registry.into();
        registry.validate()?;
        info!(classes = registry.len(), store = store.name(), "data accessor ready");
        Ok(Self {
            registry,
            store,
            objects: ObjectManager::new(),
            config: LoaderConfig::default(),
        })
    }

    /// Replace the loader configuration.
    pub fn with_config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Get a reference to the class registry.
    pub fn registry(&self) -> &ClassDefRegistry {
        &self.registry
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    /// Get a reference to the identity map.
    pub fn object_manager(&self) -> &ObjectManager {
        &self.objects
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Create a loader for this accessor.
    pub fn loader(&self) -> BusinessObjectLoader<'_> {
        BusinessObjectLoader::new(&self.registry, self.store.as_ref(), &self.objects, &self.config)
    }

    /// Create a query builder over this accessor's registry.
    pub fn query_builder(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.registry)
    }

    /// Query context with the configured deadline.
    pub fn context(&self) -> QueryContext {
        self.loader().context()
    }

    /// Create a new, unsaved object.
    pub fn create_business_object(&self, class_name: &str) -> Result<Arc<BusinessObject>> {
        Ok(BusinessObject::new(self.registry.get(class_name)?.clone()))
    }

    /// Create an empty collection whose query loads every object of the
    /// class.
    pub fn create_collection(&self, class_name: &str) -> Result<BusinessObjectCollection> {
        let mapping = self.registry.get(class_name)?.clone();
        let query = self.query_builder().create_select_query(class_name, None, None)?;
        Ok(BusinessObjectCollection::new(mapping, query))
    }

    /// Persist an object: insert if new, update if dirty, delete if marked
    /// for deletion.
    pub fn save(&self, object: &Arc<BusinessObject>) -> Result<()> {
        self.persister().save(object)
    }

    /// Save every object of a collection that has pending changes.
    pub fn save_collection(&self, collection: &BusinessObjectCollection) -> Result<()> {
        let persister = self.persister();
        for object in collection {
            persister.save(object)?;
        }
        Ok(())
    }

    /// Delete an object, applying the delete-parent actions of its
    /// relationships.
    pub fn delete(&self, object: &Arc<BusinessObject>) -> Result<DeleteResult> {
        self.persister().delete(object)
    }

    fn persister(&self) -> Persister<'_> {
        Persister::new(self.store.as_ref(), &self.objects, &self.config, self.loader())
    }
}

impl std::fmt::Debug for DataAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataAccessor")
            .field("classes", &self.registry.len())
            .field("store", &self.store.name())
            .field("objects", &self.objects)
            .field("config", &self.config)
            .finish()
    }
}
