//! Relationship definitions between classes.

use serde::{Deserialize, Serialize};

/// How many related objects a relationship yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipType {
    /// At most one related object (the owner holds the foreign key).
    Single,
    /// Any number of related objects (the related class holds the key).
    Multiple,
}

/// What happens to related objects when the owner is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeleteParentAction {
    /// Refuse to delete while related objects exist.
    #[default]
    Prevent,
    /// Null the related objects' key properties.
    DereferenceRelated,
    /// Delete the related objects too.
    DeleteRelated,
    /// Leave related objects untouched.
    DoNothing,
}

/// One key mapping: owner property equals related property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelPropDef {
    pub owner_prop: String,
    pub related_prop: String,
}

/// A named relationship from an owner class to a related class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDef {
    /// Relationship name, usable as a path segment in criteria.
    pub name: String,
    /// Related class name.
    pub related_class: String,
    /// Cardinality.
    pub relationship_type: RelationshipType,
    /// Key mappings joining owner to related.
    pub key_mappings: Vec<RelPropDef>,
    /// Applied when the owner is deleted. Only meaningful for `Multiple`.
    #[serde(default)]
    pub delete_parent_action: DeleteParentAction,
}

impl RelationshipDef {
    /// A single relationship.
    pub fn single(name: impl Into<String>, related_class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            related_class: related_class.into(),
            relationship_type: RelationshipType::Single,
            key_mappings: Vec::new(),
            delete_parent_action: DeleteParentAction::DoNothing,
        }
    }

    /// A multiple relationship.
    pub fn multiple(name: impl Into<String>, related_class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            related_class: related_class.into(),
            relationship_type: RelationshipType::Multiple,
            key_mappings: Vec::new(),
            delete_parent_action: DeleteParentAction::Prevent,
        }
    }

    /// Add a key mapping.
    pub fn with_key(mut self, owner_prop: impl Into<String>, related_prop: impl Into<String>) -> Self {
        self.key_mappings.push(RelPropDef {
            owner_prop: owner_prop.into(),
            related_prop: related_prop.into(),
        });
        self
    }

    /// Set the delete-parent action.
    pub fn on_delete(mut self, action: DeleteParentAction) -> Self {
        self.delete_parent_action = action;
        self
    }

    pub fn is_multiple(&self) -> bool {
        self.relationship_type == RelationshipType::Multiple
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_builders() {
        let owner = RelationshipDef::single("Owner", "ContactPerson")
            .with_key("OwnerID", "ContactPersonID");
        assert!(!owner.is_multiple());
        assert_eq!(owner.key_mappings.len(), 1);
        assert_eq!(owner.delete_parent_action, DeleteParentAction::DoNothing);

        let cars = RelationshipDef::multiple("Cars", "Car")
            .with_key("ContactPersonID", "OwnerID")
            .on_delete(DeleteParentAction::DereferenceRelated);
        assert!(cars.is_multiple());
        assert_eq!(
            cars.delete_parent_action,
            DeleteParentAction::DereferenceRelated
        );
    }
}
