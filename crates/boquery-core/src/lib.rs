//! boquery core - class metadata, query building, data stores and the
//! business object loader.
//!
//! A [`DataAccessor`] owns a [`ClassDefRegistry`], a [`DataStore`] and an
//! identity map. Loads go through a [`BusinessObjectLoader`], which turns
//! criteria into a [`SelectQuery`](boquery_proto::SelectQuery), runs it on
//! the store and resolves each row to the one live instance of its
//! identity.
//!
//! ```rust
//! use std::sync::Arc;
//! use boquery_core::{ClassDef, ClassDefRegistry, DataAccessor, MemoryStore, PropDef, PropType};
//!
//! let mut registry = ClassDefRegistry::new();
//! registry
//!     .register(
//!         ClassDef::new("ContactPerson")
//!             .with_object_id("ContactPersonID")
//!             .with_prop(PropDef::new("Surname", PropType::String)),
//!     )
//!     .unwrap();
//!
//! let accessor = DataAccessor::new(registry, Arc::new(MemoryStore::new())).unwrap();
//! let person = accessor.create_business_object("ContactPerson").unwrap();
//! person.set_property_value("Surname", "Smith").unwrap();
//! accessor.save(&person).unwrap();
//!
//! let loaded = accessor
//!     .loader()
//!     .get_business_object("ContactPerson", "Surname = 'Smith'")
//!     .unwrap()
//!     .unwrap();
//! assert!(Arc::ptr_eq(&person, &loaded));
//! ```

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod catalog;
pub mod collection;
pub mod config;
pub mod error;
pub mod loader;
pub mod object;
mod persist;
pub mod query;
pub mod session;
pub mod store;

pub use catalog::{
    ClassDef, ClassDefRegistry, ClassMapping, DeleteParentAction, Inheritance, KeyDef,
    MappingStrategy, PrimaryKeyDef, PropDef, PropType, ReadWriteRule, RelPropDef,
    RelationshipDef, RelationshipType,
};
pub use collection::BusinessObjectCollection;
pub use config::{LoaderConfig, SqliteConfig};
pub use error::{Error, Result};
pub use loader::{BusinessObjectLoader, Lookup, Page};
pub use object::{BusinessObject, ObjectKey, ObjectManager, ObjectStatus};
pub use persist::DeleteResult;
pub use query::{IntoCriteria, IntoOrderCriteria, QueryBuilder, QueryContext, SqlStatement};
pub use session::DataAccessor;
pub use store::{DataStore, MemoryStore, Row, SqliteStore};

/// Re-export the query IR.
pub use boquery_proto as proto;
