//! Business objects.

use std::sync::Arc;

use boquery_proto::Value;
use parking_lot::RwLock;
use uuid::Uuid;

use super::key::ObjectKey;
use crate::catalog::{ClassMapping, ReadWriteRule};
use crate::error::{Error, Result};
use crate::store::Row;

/// Lifecycle flags of a business object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectStatus {
    /// Not yet saved.
    pub is_new: bool,
    /// Has unsaved changes.
    pub is_dirty: bool,
    /// Marked for deletion, or deleted.
    pub is_deleted: bool,
}

#[derive(Debug, Clone)]
struct ObjectState {
    values: Vec<Value>,
    persisted: Vec<Value>,
    status: ObjectStatus,
}

/// An instance of a class.
///
/// Business objects are shared as `Arc<BusinessObject>`; the identity map
/// guarantees one instance per identity, and every holder sees the same
/// state. Property values live in slots laid out by the class mapping.
pub struct BusinessObject {
    class: Arc<ClassMapping>,
    state: RwLock<ObjectState>,
}

impl BusinessObject {
    /// Create a new, unsaved object.
    ///
    /// Properties start at their defaults. An object-ID key gets a fresh
    /// GUID.
    pub fn new(class: Arc<ClassMapping>) -> Arc<Self> {
        let mut values: Vec<Value> = class
            .props()
            .iter()
            .map(|p| p.default.clone().unwrap_or(Value::Null))
            .collect();

        if class.primary_key().is_object_id {
            if let Some(slot) = class
                .primary_key()
                .props
                .first()
                .and_then(|p| class.slot(p))
            {
                values[slot] = Value::Guid(Uuid::new_v4());
            }
        }

        Arc::new(Self {
            class,
            state: RwLock::new(ObjectState {
                persisted: values.clone(),
                values,
                status: ObjectStatus {
                    is_new: true,
                    ..Default::default()
                },
            }),
        })
    }

    /// Hydrate a persisted object from a store row keyed by property name.
    pub(crate) fn from_row(class: Arc<ClassMapping>, row: &Row) -> Result<Arc<Self>> {
        let values = class
            .props()
            .iter()
            .map(|prop| {
                let raw = row.get(&prop.name).cloned().unwrap_or(Value::Null);
                prop.prop_type.coerce(raw)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Arc::new(Self {
            class,
            state: RwLock::new(ObjectState {
                persisted: values.clone(),
                values,
                status: ObjectStatus::default(),
            }),
        }))
    }

    /// Key a store row would hydrate to, without hydrating it.
    pub(crate) fn key_of_row(class: &ClassMapping, row: &Row) -> Result<ObjectKey> {
        let mut values = Vec::with_capacity(class.primary_key().props.len());
        for name in &class.primary_key().props {
            let prop = class.prop(name).ok_or_else(|| Error::UnknownProperty {
                class: class.name().to_string(),
                property: name.clone(),
            })?;
            let raw = row.get(name).cloned().unwrap_or(Value::Null);
            values.push((name.as_str(), prop.prop_type.coerce(raw)?));
        }
        Ok(ObjectKey::new(
            class.name(),
            values.iter().map(|(n, v)| (*n, v)),
        ))
    }

    pub fn class(&self) -> &Arc<ClassMapping> {
        &self.class
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    fn slot(&self, name: &str) -> Result<usize> {
        self.class.slot(name).ok_or_else(|| Error::UnknownProperty {
            class: self.class.name().to_string(),
            property: name.to_string(),
        })
    }

    /// Current value of a property.
    pub fn get_property_value(&self, name: &str) -> Result<Value> {
        let slot = self.slot(name)?;
        Ok(self.state.read().values[slot].clone())
    }

    /// Last persisted value of a property.
    pub fn persisted_property_value(&self, name: &str) -> Result<Value> {
        let slot = self.slot(name)?;
        Ok(self.state.read().persisted[slot].clone())
    }

    /// Set a property, enforcing its read-write rule.
    ///
    /// The value is coerced to the property type. Setting a different value
    /// marks the object dirty.
    pub fn set_property_value(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let slot = self.slot(name)?;
        let prop = &self.class.props()[slot];
        let value = prop.prop_type.coerce(value.into())?;

        let mut state = self.state.write();
        let rejected = match prop.read_write_rule {
            ReadWriteRule::ReadWrite => None,
            ReadWriteRule::ReadOnly => Some("the property is read-only"),
            ReadWriteRule::WriteNew if !state.status.is_new => {
                Some("the property can only be set before the object is first saved")
            }
            ReadWriteRule::WriteOnce
                if !state.status.is_new && !state.persisted[slot].is_null() =>
            {
                Some("the property has already been written once")
            }
            _ => None,
        };
        if let Some(reason) = rejected {
            return Err(Error::NotWritable {
                class: self.class.name().to_string(),
                property: name.to_string(),
                reason: reason.to_string(),
            });
        }

        Self::write_slot(&mut state, slot, value);
        Ok(())
    }

    /// Set a property without consulting its read-write rule.
    pub(crate) fn set_property_value_unchecked(&self, name: &str, value: Value) -> Result<()> {
        let slot = self.slot(name)?;
        let value = self.class.props()[slot].prop_type.coerce(value)?;
        Self::write_slot(&mut self.state.write(), slot, value);
        Ok(())
    }

    fn write_slot(state: &mut ObjectState, slot: usize, value: Value) {
        if state.values[slot] != value {
            state.values[slot] = value;
            state.status.is_dirty = true;
        }
    }

    /// Property values, in slot order.
    pub fn values(&self) -> Vec<(String, Value)> {
        let state = self.state.read();
        self.class
            .props()
            .iter()
            .zip(&state.values)
            .map(|(p, v)| (p.name.clone(), v.clone()))
            .collect()
    }

    pub fn status(&self) -> ObjectStatus {
        self.state.read().status
    }

    pub fn is_new(&self) -> bool {
        self.status().is_new
    }

    pub fn is_dirty(&self) -> bool {
        self.status().is_dirty
    }

    pub fn is_deleted(&self) -> bool {
        self.status().is_deleted
    }

    /// Identity from the current key values.
    pub fn key(&self) -> ObjectKey {
        let state = self.state.read();
        self.key_from(&state.values)
    }

    /// Identity the object was last persisted under.
    pub fn persisted_key(&self) -> ObjectKey {
        let state = self.state.read();
        self.key_from(&state.persisted)
    }

    fn key_from(&self, values: &[Value]) -> ObjectKey {
        let parts = self.class.primary_key().props.iter().filter_map(|name| {
            self.class
                .slot(name)
                .map(|slot| (name.as_str(), &values[slot]))
        });
        ObjectKey::new(self.class.name(), parts)
    }

    /// Mark for deletion on the next save.
    pub fn mark_for_delete(&self) {
        let mut state = self.state.write();
        state.status.is_deleted = true;
        state.status.is_dirty = true;
    }

    /// Discard unsaved changes, restoring the last persisted values.
    pub fn cancel_edits(&self) {
        let mut state = self.state.write();
        state.values = state.persisted.clone();
        state.status.is_dirty = false;
        state.status.is_deleted = false;
    }

    /// Check that every compulsory property has a value.
    pub fn validate(&self) -> Result<()> {
        let state = self.state.read();
        let missing: Vec<&str> = self
            .class
            .props()
            .iter()
            .zip(&state.values)
            .filter(|(p, v)| p.compulsory && v.is_null())
            .map(|(p, _)| p.name.as_str())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation {
                class: self.class.name().to_string(),
                message: format!("compulsory properties have no value: {}", missing.join(", ")),
            })
        }
    }

    /// Record that the current values are now persisted.
    pub(crate) fn mark_saved(&self) {
        let mut state = self.state.write();
        state.persisted = state.values.clone();
        state.status.is_new = false;
        state.status.is_dirty = false;
    }

    /// Record that the object has been deleted from the store.
    pub(crate) fn mark_removed(&self) {
        let mut state = self.state.write();
        state.status.is_deleted = true;
        state.status.is_dirty = false;
        state.status.is_new = false;
    }
}

impl std::fmt::Debug for BusinessObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusinessObject")
            .field("key", &self.key())
            .field("status", &self.status())
            .finish()
    }
}

impl std::fmt::Display for BusinessObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ClassDef, ClassDefRegistry, PrimaryKeyDef, PropDef, PropType};

    fn person() -> Arc<ClassMapping> {
        let mut registry = ClassDefRegistry::new();
        registry
            .register(
                ClassDef::new("ContactPerson")
                    .with_object_id("ContactPersonID")
                    .with_prop(PropDef::new("Surname", PropType::String).compulsory())
                    .with_prop(PropDef::new("Age", PropType::Int32).with_default(18))
                    .with_prop(
                        PropDef::new("Code", PropType::String).with_rule(ReadWriteRule::WriteNew),
                    )
                    .with_prop(
                        PropDef::new("Badge", PropType::Int32).with_rule(ReadWriteRule::WriteOnce),
                    )
                    .with_prop(
                        PropDef::new("Created", PropType::DateTime)
                            .with_rule(ReadWriteRule::ReadOnly),
                    ),
            )
            .unwrap()
    }

    #[test]
    fn test_new_object_defaults() {
        let obj = BusinessObject::new(person());
        assert!(obj.is_new());
        assert!(!obj.is_dirty());
        assert_eq!(obj.get_property_value("Age").unwrap(), Value::Int32(18));
        assert!(matches!(
            obj.get_property_value("ContactPersonID").unwrap(),
            Value::Guid(_)
        ));
    }

    #[test]
    fn test_set_marks_dirty_and_coerces() {
        let obj = BusinessObject::new(person());
        obj.set_property_value("Age", "42").unwrap();
        assert_eq!(obj.get_property_value("Age").unwrap(), Value::Int32(42));
        assert!(obj.is_dirty());

        obj.cancel_edits();
        assert_eq!(obj.get_property_value("Age").unwrap(), Value::Int32(18));
        assert!(!obj.is_dirty());
    }

    #[test]
    fn test_unknown_property() {
        let obj = BusinessObject::new(person());
        assert!(matches!(
            obj.get_property_value("Nope"),
            Err(Error::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_read_write_rules() {
        let obj = BusinessObject::new(person());
        assert!(obj.set_property_value("Created", Value::Null).is_err());
        obj.set_property_value("Code", "A1").unwrap();
        obj.set_property_value("Badge", 7).unwrap();
        obj.set_property_value("Surname", "Smith").unwrap();
        obj.mark_saved();

        let err = obj.set_property_value("Code", "B2").unwrap_err();
        assert!(matches!(err, Error::NotWritable { .. }));
        assert!(obj.set_property_value("Badge", 8).is_err());
        obj.set_property_value("Surname", "Jones").unwrap();
    }

    #[test]
    fn test_write_once_allows_first_write_after_save() {
        let obj = BusinessObject::new(person());
        obj.mark_saved();
        obj.set_property_value("Badge", 1).unwrap();
        obj.mark_saved();
        assert!(obj.set_property_value("Badge", 2).is_err());
    }

    #[test]
    fn test_validate_compulsory() {
        let obj = BusinessObject::new(person());
        let err = obj.validate().unwrap_err();
        assert!(err.to_string().contains("Surname"));
        obj.set_property_value("Surname", "Smith").unwrap();
        obj.validate().unwrap();
    }

    #[test]
    fn test_from_row_coerces_store_values() {
        let class = person();
        let id = Uuid::new_v4();
        let row = Row::from(vec![
            ("ContactPersonID".to_string(), Value::String(id.to_string())),
            ("Age".to_string(), Value::Int64(30)),
        ]);
        let obj = BusinessObject::from_row(class.clone(), &row).unwrap();
        assert!(!obj.is_new());
        assert_eq!(obj.get_property_value("Age").unwrap(), Value::Int32(30));
        assert_eq!(obj.get_property_value("Surname").unwrap(), Value::Null);
        assert_eq!(obj.key(), BusinessObject::key_of_row(&class, &row).unwrap());
        assert_eq!(obj.key().to_string(), format!("ContactPerson(ContactPersonID={})", id));
    }

    #[test]
    fn test_key_change_keeps_persisted_key() {
        let mut registry = ClassDefRegistry::new();
        let class = registry
            .register(
                ClassDef::new("Car")
                    .with_prop(PropDef::new("Reg", PropType::String))
                    .with_primary_key(PrimaryKeyDef::new(&["Reg"])),
            )
            .unwrap();
        let obj = BusinessObject::new(class);
        obj.set_property_value("Reg", "ABC").unwrap();
        obj.mark_saved();
        obj.set_property_value("Reg", "XYZ").unwrap();
        assert_eq!(obj.key().to_string(), "Car(Reg=\"XYZ\")");
        assert_eq!(obj.persisted_key().to_string(), "Car(Reg=\"ABC\")");
    }
}
