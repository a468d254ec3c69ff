//! Class definitions.

use serde::{Deserialize, Serialize};

use super::inheritance::{Inheritance, MappingStrategy};
use super::key::{KeyDef, PrimaryKeyDef};
use super::prop_def::{PropDef, PropType};
use super::relationship::RelationshipDef;

/// Metadata for one business object class.
///
/// A class declares only its own properties and relationships; inherited
/// ones come from the superclass named in `inheritance` and are merged when
/// the registry is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    /// Class name, unique within a registry.
    pub name: String,
    /// Table the class's own properties are stored in. Empty means the
    /// class name.
    #[serde(default)]
    pub table_name: String,
    /// Own properties.
    #[serde(default)]
    pub props: Vec<PropDef>,
    /// Primary key. Subclasses inherit their superclass's key.
    #[serde(default)]
    pub primary_key: Option<PrimaryKeyDef>,
    /// Alternate keys.
    #[serde(default)]
    pub alternate_keys: Vec<KeyDef>,
    /// Own relationships.
    #[serde(default)]
    pub relationships: Vec<RelationshipDef>,
    /// Superclass and mapping strategy.
    #[serde(default)]
    pub inheritance: Option<Inheritance>,
}

impl ClassDef {
    /// Create a class stored in a table of the same name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table_name: name.clone(),
            name,
            props: Vec::new(),
            primary_key: None,
            alternate_keys: Vec::new(),
            relationships: Vec::new(),
            inheritance: None,
        }
    }

    /// Override the table name.
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Add a property.
    pub fn with_prop(mut self, prop: PropDef) -> Self {
        self.props.push(prop);
        self
    }

    /// Add a GUID property and make it the object-ID primary key.
    pub fn with_object_id(mut self, prop_name: impl Into<String>) -> Self {
        let prop_name = prop_name.into();
        self.props.push(PropDef::new(prop_name.clone(), PropType::Guid));
        self.primary_key = Some(PrimaryKeyDef::object_id(prop_name));
        self
    }

    /// Set the primary key.
    pub fn with_primary_key(mut self, key: PrimaryKeyDef) -> Self {
        self.primary_key = Some(key);
        self
    }

    /// Add an alternate key.
    pub fn with_alternate_key(mut self, key: KeyDef) -> Self {
        self.alternate_keys.push(key);
        self
    }

    /// Add a relationship.
    pub fn with_relationship(mut self, relationship: RelationshipDef) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Set the superclass.
    pub fn with_super_class(mut self, super_class: impl Into<String>, strategy: MappingStrategy) -> Self {
        self.inheritance = Some(Inheritance {
            super_class: super_class.into(),
            strategy,
        });
        self
    }

    /// Get an own property by name.
    pub fn get_prop(&self, name: &str) -> Option<&PropDef> {
        self.props.iter().find(|p| p.name == name)
    }

    /// Get an own relationship by name.
    pub fn get_relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Superclass name, if any.
    pub fn super_class(&self) -> Option<&str> {
        self.inheritance.as_ref().map(|i| i.super_class.as_str())
    }

    pub(crate) fn normalise(&mut self) {
        if self.table_name.is_empty() {
            self.table_name = self.name.clone();
        }
        for prop in &mut self.props {
            prop.normalise();
        }
    }
}
