//! Class metadata.
//!
//! Describes business object classes: their properties, keys,
//! relationships and inheritance mapping. A [`ClassDefRegistry`] resolves
//! each class into a [`ClassMapping`] that the query builder, the loader and
//! business objects share.

mod class_def;
pub mod inheritance;
mod key;
mod mapping;
mod prop_def;
mod registry;
mod relationship;

pub use class_def::ClassDef;
pub use inheritance::{
    ClassLayout, Discriminator, Inheritance, MappingStrategy, TableMapping,
};
pub use key::{KeyDef, PrimaryKeyDef};
pub use mapping::ClassMapping;
pub use prop_def::{PropDef, PropType, ReadWriteRule};
pub use registry::ClassDefRegistry;
pub use relationship::{DeleteParentAction, RelPropDef, RelationshipDef, RelationshipType};
