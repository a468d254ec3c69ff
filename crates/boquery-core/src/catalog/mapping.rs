//! Resolved class mappings.

use std::collections::HashMap;

use super::inheritance::ClassLayout;
use super::key::{KeyDef, PrimaryKeyDef};
use super::prop_def::PropDef;
use super::relationship::RelationshipDef;

/// A class with its hierarchy merged in.
///
/// Built once by the registry when the class is registered and shared as
/// `Arc<ClassMapping>` by every business object of the class. Properties
/// are laid out base class first; `slot` gives each property's index in a
/// business object's value array.
#[derive(Debug, Clone)]
pub struct ClassMapping {
    pub(crate) name: String,
    pub(crate) hierarchy: Vec<String>,
    pub(crate) props: Vec<PropDef>,
    pub(crate) prop_index: HashMap<String, usize>,
    pub(crate) relationships: Vec<RelationshipDef>,
    pub(crate) primary_key: PrimaryKeyDef,
    pub(crate) alternate_keys: Vec<KeyDef>,
    pub(crate) layout: ClassLayout,
}

impl ClassMapping {
    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Superclass names, nearest first.
    pub fn super_classes(&self) -> &[String] {
        &self.hierarchy[1..]
    }

    /// Whether this class is `class_name` or one of its subclasses.
    pub fn is_a(&self, class_name: &str) -> bool {
        self.hierarchy.iter().any(|c| c == class_name)
    }

    /// All properties, inherited ones first.
    pub fn props(&self) -> &[PropDef] {
        &self.props
    }

    /// Property by name.
    pub fn prop(&self, name: &str) -> Option<&PropDef> {
        self.slot(name).map(|i| &self.props[i])
    }

    /// Slot index of a property.
    pub fn slot(&self, name: &str) -> Option<usize> {
        self.prop_index.get(name).copied()
    }

    /// Primary key.
    pub fn primary_key(&self) -> &PrimaryKeyDef {
        &self.primary_key
    }

    /// Alternate keys, own and inherited.
    pub fn alternate_keys(&self) -> &[KeyDef] {
        &self.alternate_keys
    }

    /// Relationships, own first, then inherited.
    pub fn relationships(&self) -> &[RelationshipDef] {
        &self.relationships
    }

    /// Relationship by name.
    pub fn relationship(&self, name: &str) -> Option<&RelationshipDef> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Physical layout.
    pub fn layout(&self) -> &ClassLayout {
        &self.layout
    }

    /// Table the class is loaded from.
    pub fn table_name(&self) -> &str {
        &self.layout.primary().table_name
    }

    /// Table index and definition of a persisted property.
    pub fn prop_location(&self, name: &str) -> Option<(usize, &PropDef)> {
        let prop = self.prop(name)?;
        let index = self.layout.table_index_of(name)?;
        Some((index, prop))
    }

    /// Column name of a property as seen from the primary table.
    ///
    /// Key properties exist in every table of the layout, so they resolve
    /// against the primary table even when declared by a superclass.
    pub fn primary_field_name(&self, name: &str) -> Option<&str> {
        let (index, prop) = self.prop_location(name)?;
        if index == 0 || self.primary_key.contains(name) {
            Some(prop.field_name.as_str())
        } else {
            None
        }
    }
}
