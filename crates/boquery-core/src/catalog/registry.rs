//! Class definition registry.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use super::class_def::ClassDef;
use super::inheritance::plan;
use super::mapping::ClassMapping;
use super::prop_def::{PropDef, PropType};
use crate::error::{Error, Result};

/// Registry of class definitions, keyed by class name.
///
/// The registry is passed to the loader explicitly; tests build a fresh one
/// per case. A class must be registered after its superclass. Relationship
/// targets may be registered in any order and are checked by
/// [`validate`](Self::validate).
#[derive(Debug, Default, Clone)]
pub struct ClassDefRegistry {
    defs: HashMap<String, ClassDef>,
    mappings: HashMap<String, Arc<ClassMapping>>,
}

impl ClassDefRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from a JSON array of class definitions.
    ///
    /// Classes may appear in any order; superclasses are registered first.
    pub fn from_json(json: &str) -> Result<Self> {
        let defs: Vec<ClassDef> = serde_json::from_str(json)?;
        Self::from_defs(defs)
    }

    /// Build a registry from definitions in any order, then validate it.
    pub fn from_defs(defs: Vec<ClassDef>) -> Result<Self> {
        let mut registry = Self::new();
        let mut pending = defs;

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for def in pending {
                let ready = match def.super_class() {
                    Some(super_class) => registry.defs.contains_key(super_class),
                    None => true,
                };
                if ready {
                    registry.register(def)?;
                } else {
                    deferred.push(def);
                }
            }
            if deferred.len() == before {
                let names: Vec<_> = deferred.iter().map(|d| d.name.as_str()).collect();
                return Err(Error::InvalidClassDef(format!(
                    "unresolvable superclass for {}",
                    names.join(", ")
                )));
            }
            pending = deferred;
        }

        registry.validate()?;
        Ok(registry)
    }

    /// Register a class definition.
    pub fn register(&mut self, mut def: ClassDef) -> Result<Arc<ClassMapping>> {
        def.normalise();
        if self.defs.contains_key(&def.name) {
            return Err(Error::InvalidClassDef(format!(
                "class '{}' is already registered",
                def.name
            )));
        }

        let mapping = Arc::new(self.resolve(&def)?);
        debug!(
            class = %def.name,
            table = %mapping.table_name(),
            props = mapping.props().len(),
            "registered class"
        );
        self.mappings.insert(def.name.clone(), mapping.clone());
        self.defs.insert(def.name.clone(), def);
        Ok(mapping)
    }

    /// Check that every relationship targets a registered class and maps
    /// properties that exist on both sides.
    pub fn validate(&self) -> Result<()> {
        for mapping in self.mappings.values() {
            for rel in mapping.relationships() {
                let related = self.mappings.get(&rel.related_class).ok_or_else(|| {
                    Error::InvalidClassDef(format!(
                        "relationship '{}.{}' targets unknown class '{}'",
                        mapping.name(),
                        rel.name,
                        rel.related_class
                    ))
                })?;
                if rel.key_mappings.is_empty() {
                    return Err(Error::InvalidClassDef(format!(
                        "relationship '{}.{}' has no key mappings",
                        mapping.name(),
                        rel.name
                    )));
                }
                for key in &rel.key_mappings {
                    if mapping.prop(&key.owner_prop).is_none() {
                        return Err(Error::InvalidClassDef(format!(
                            "relationship '{}.{}' maps unknown property '{}'",
                            mapping.name(),
                            rel.name,
                            key.owner_prop
                        )));
                    }
                    if related.prop(&key.related_prop).is_none() {
                        return Err(Error::InvalidClassDef(format!(
                            "relationship '{}.{}' maps unknown property '{}.{}'",
                            mapping.name(),
                            rel.name,
                            rel.related_class,
                            key.related_prop
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Get a class mapping by name.
    pub fn get(&self, class_name: &str) -> Result<&Arc<ClassMapping>> {
        self.mappings
            .get(class_name)
            .ok_or_else(|| Error::UnknownClass(class_name.to_string()))
    }

    /// Get the declaration a class was registered with.
    pub fn class_def(&self, class_name: &str) -> Option<&ClassDef> {
        self.defs.get(class_name)
    }

    /// Find a property on a class or any of its superclasses.
    pub fn find_prop(&self, class_name: &str, prop_name: &str) -> Result<&PropDef> {
        self.get(class_name)?
            .prop(prop_name)
            .ok_or_else(|| Error::UnknownProperty {
                class: class_name.to_string(),
                property: prop_name.to_string(),
            })
    }

    /// Registered class names, sorted.
    pub fn class_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.defs.keys().map(|n| n.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    fn resolve(&self, def: &ClassDef) -> Result<ClassMapping> {
        // Class followed by superclasses, nearest first.
        let mut chain: Vec<&ClassDef> = vec![def];
        let mut seen = HashSet::from([def.name.as_str()]);
        let mut current = def;
        while let Some(super_name) = current.super_class() {
            if !seen.insert(super_name) {
                return Err(Error::InvalidClassDef(format!(
                    "inheritance cycle through '{}'",
                    super_name
                )));
            }
            let super_def = self.defs.get(super_name).ok_or_else(|| {
                Error::InvalidClassDef(format!(
                    "superclass '{}' of '{}' is not registered",
                    super_name, def.name
                ))
            })?;
            chain.push(super_def);
            current = super_def;
        }

        let primary_key = chain
            .iter()
            .find_map(|c| c.primary_key.clone())
            .ok_or_else(|| {
                Error::InvalidClassDef(format!("class '{}' has no primary key", def.name))
            })?;

        let mut props: Vec<PropDef> = Vec::new();
        let mut prop_index = HashMap::new();
        for class in chain.iter().rev() {
            for prop in &class.props {
                if prop_index.insert(prop.name.clone(), props.len()).is_some() {
                    return Err(Error::InvalidClassDef(format!(
                        "property '{}' is declared more than once in the hierarchy of '{}'",
                        prop.name, def.name
                    )));
                }
                props.push(prop.clone());
            }
        }

        let mut key_fields = Vec::with_capacity(primary_key.props.len());
        for key_prop in &primary_key.props {
            let prop = prop_index
                .get(key_prop)
                .map(|&i| &props[i])
                .ok_or_else(|| {
                    Error::InvalidClassDef(format!(
                        "primary key of '{}' names unknown property '{}'",
                        def.name, key_prop
                    ))
                })?;
            key_fields.push(prop.field_name.clone());
        }
        if primary_key.is_object_id {
            let is_single_guid = primary_key.props.len() == 1
                && props[prop_index[&primary_key.props[0]]].prop_type == PropType::Guid;
            if !is_single_guid {
                return Err(Error::InvalidClassDef(format!(
                    "object-ID key of '{}' must be a single Guid property",
                    def.name
                )));
            }
        }

        let mut alternate_keys = Vec::new();
        for class in &chain {
            for key in &class.alternate_keys {
                if let Some(missing) = key.props.iter().find(|p| !prop_index.contains_key(*p)) {
                    return Err(Error::InvalidClassDef(format!(
                        "alternate key '{}' of '{}' names unknown property '{}'",
                        key.name, def.name, missing
                    )));
                }
                alternate_keys.push(key.clone());
            }
        }

        let mut relationships = Vec::new();
        let mut rel_names = HashSet::new();
        for class in &chain {
            for rel in &class.relationships {
                if rel_names.insert(rel.name.as_str()) {
                    relationships.push(rel.clone());
                }
            }
        }

        Ok(ClassMapping {
            name: def.name.clone(),
            hierarchy: chain.iter().map(|c| c.name.clone()).collect(),
            layout: plan(&chain, &key_fields),
            props,
            prop_index,
            relationships,
            primary_key,
            alternate_keys,
        })
    }
}
