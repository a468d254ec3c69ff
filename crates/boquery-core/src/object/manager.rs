//! Identity map.

use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

use super::business_object::BusinessObject;
use super::key::ObjectKey;

/// Registry of live business objects, one instance per identity.
///
/// Entries are weak: the map never keeps an object alive, and an identity
/// whose instance has been dropped is free to be loaded again.
/// Registration is an atomic check-and-insert, so concurrent loaders of the
/// same identity converge on one instance.
#[derive(Debug, Default)]
pub struct ObjectManager {
    objects: DashMap<ObjectKey, Weak<BusinessObject>>,
}

impl ObjectManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object under its current key and return the canonical
    /// instance for that key.
    ///
    /// If a live instance is already registered it is returned unchanged and
    /// `object` is discarded.
    pub fn register(&self, object: Arc<BusinessObject>) -> Arc<BusinessObject> {
        self.register_as(object.key(), object)
    }

    pub(crate) fn register_as(&self, key: ObjectKey, object: Arc<BusinessObject>) -> Arc<BusinessObject> {
        match self.objects.entry(key) {
            Entry::Occupied(mut entry) => {
                if let Some(existing) = entry.get().upgrade() {
                    trace!(key = %entry.key(), "identity map hit");
                    return existing;
                }
                entry.insert(Arc::downgrade(&object));
                object
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::downgrade(&object));
                object
            }
        }
    }

    /// Live instance registered under `key`.
    pub fn lookup(&self, key: &ObjectKey) -> Option<Arc<BusinessObject>> {
        self.objects.get(key).and_then(|weak| weak.upgrade())
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.lookup(key).is_some()
    }

    /// Remove `object` from the map if it is the instance registered under
    /// `key`.
    pub fn remove(&self, key: &ObjectKey, object: &Arc<BusinessObject>) -> bool {
        self.objects
            .remove_if(key, |_, weak| {
                weak.upgrade().map_or(true, |live| Arc::ptr_eq(&live, object))
            })
            .is_some()
    }

    /// Move `object` from `old_key` to its current key.
    pub(crate) fn rekey(&self, old_key: &ObjectKey, object: &Arc<BusinessObject>) {
        self.remove(old_key, object);
        self.register(object.clone());
    }

    /// Forget every registered object.
    pub fn clear_all(&self) {
        self.objects.clear();
    }

    /// Number of live registered objects. Dead entries are pruned.
    pub fn len(&self) -> usize {
        self.objects.retain(|_, weak| weak.strong_count() > 0);
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ClassDef, ClassDefRegistry, PropDef, PropType};
    use crate::store::Row;
    use boquery_proto::Value;
    use std::thread;

    fn class() -> Arc<crate::catalog::ClassMapping> {
        let mut registry = ClassDefRegistry::new();
        registry
            .register(
                ClassDef::new("Car")
                    .with_object_id("CarID")
                    .with_prop(PropDef::new("Make", PropType::String)),
            )
            .unwrap()
    }

    fn row(id: &str, make: &str) -> Row {
        Row::from(vec![
            ("CarID".to_string(), Value::from(id)),
            ("Make".to_string(), Value::from(make)),
        ])
    }

    const ID: &str = "6f1c2a4e-9d3b-4c1a-8e2f-0a1b2c3d4e5f";

    #[test]
    fn test_register_returns_existing_instance() {
        let manager = ObjectManager::new();
        let first = BusinessObject::from_row(class(), &row(ID, "Ford")).unwrap();
        let second = BusinessObject::from_row(class(), &row(ID, "Audi")).unwrap();

        let a = manager.register(first.clone());
        let b = manager.register(second);
        assert!(Arc::ptr_eq(&a, &first));
        assert!(Arc::ptr_eq(&b, &first));
        assert_eq!(b.get_property_value("Make").unwrap(), Value::from("Ford"));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_dropped_instances_are_not_kept_alive() {
        let manager = ObjectManager::new();
        let obj = manager.register(BusinessObject::from_row(class(), &row(ID, "Ford")).unwrap());
        let key = obj.key();
        assert!(manager.contains(&key));
        drop(obj);
        assert!(manager.lookup(&key).is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn test_remove_only_matching_instance() {
        let manager = ObjectManager::new();
        let obj = manager.register(BusinessObject::from_row(class(), &row(ID, "Ford")).unwrap());
        let impostor = BusinessObject::from_row(class(), &row(ID, "Ford")).unwrap();
        assert!(!manager.remove(&obj.key(), &impostor));
        assert!(manager.remove(&obj.key(), &obj));
        assert!(manager.lookup(&obj.key()).is_none());
    }

    #[test]
    fn test_concurrent_registration_converges() {
        let manager = Arc::new(ObjectManager::new());
        let class = class();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                let class = class.clone();
                thread::spawn(move || {
                    manager.register(BusinessObject::from_row(class, &row(ID, "Ford")).unwrap())
                })
            })
            .collect();
        let objects: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(objects.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_clear_all() {
        let manager = ObjectManager::new();
        let _obj = manager.register(BusinessObject::from_row(class(), &row(ID, "Ford")).unwrap());
        manager.clear_all();
        assert!(manager.is_empty());
    }
}
