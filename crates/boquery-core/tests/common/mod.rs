//! Shared fixture for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use boquery_core::{
    BusinessObject, ClassDef, ClassDefRegistry, DataAccessor, DataStore, DeleteParentAction,
    MappingStrategy, MemoryStore, PropDef, PropType, RelationshipDef, SqliteConfig, SqliteStore,
};

const SCHEMA: &str = "
    CREATE TABLE contact_person (
        ContactPersonID TEXT PRIMARY KEY,
        surname_field TEXT,
        FirstName TEXT,
        DateOfBirth TEXT
    );
    CREATE TABLE car (CarID TEXT PRIMARY KEY, OwnerID TEXT, Make TEXT);
    CREATE TABLE engine (EngineID TEXT PRIMARY KEY, CarID TEXT, EngineNo TEXT);
    CREATE TABLE address (AddressID TEXT PRIMARY KEY, ContactPersonID TEXT, Street TEXT);
    CREATE TABLE shape (ShapeID TEXT PRIMARY KEY, ShapeName TEXT, ShapeType TEXT, Side INTEGER);
    CREATE TABLE circle (ShapeID TEXT PRIMARY KEY, Radius INTEGER);
";

#[derive(Debug, Clone, Copy)]
pub enum Backend {
    Memory,
    Sqlite,
}

pub const BACKENDS: [Backend; 2] = [Backend::Memory, Backend::Sqlite];

pub struct TestContext {
    pub accessor: DataAccessor,
    _dir: Option<tempfile::TempDir>,
}

impl TestContext {
    pub fn new(backend: Backend) -> Self {
        let (store, dir): (Arc<dyn DataStore>, _) = match backend {
            Backend::Memory => (Arc::new(MemoryStore::new()), None),
            Backend::Sqlite => {
                let dir = tempfile::tempdir().unwrap();
                let store = SqliteStore::open(SqliteConfig::new(dir.path().join("test.db"))).unwrap();
                store.execute_batch(SCHEMA).unwrap();
                (Arc::new(store), Some(dir))
            }
        };

        let accessor = DataAccessor::new(registry(), store).unwrap();
        Self {
            accessor,
            _dir: dir,
        }
    }

    pub fn person(&self, surname: &str) -> Arc<BusinessObject> {
        let person = self.accessor.create_business_object("ContactPerson").unwrap();
        person.set_property_value("Surname", surname).unwrap();
        self.accessor.save(&person).unwrap();
        person
    }

    pub fn car(&self, owner: &BusinessObject, make: &str) -> Arc<BusinessObject> {
        let car = self.accessor.create_business_object("Car").unwrap();
        car.set_property_value("OwnerID", owner.get_property_value("ContactPersonID").unwrap())
            .unwrap();
        car.set_property_value("Make", make).unwrap();
        self.accessor.save(&car).unwrap();
        car
    }

    pub fn engine(&self, car: &BusinessObject, number: &str) -> Arc<BusinessObject> {
        let engine = self.accessor.create_business_object("Engine").unwrap();
        engine
            .set_property_value("CarID", car.get_property_value("CarID").unwrap())
            .unwrap();
        engine.set_property_value("EngineNo", number).unwrap();
        self.accessor.save(&engine).unwrap();
        engine
    }

    pub fn address(&self, person: &BusinessObject, street: &str) -> Arc<BusinessObject> {
        let address = self.accessor.create_business_object("Address").unwrap();
        address
            .set_property_value(
                "ContactPersonID",
                person.get_property_value("ContactPersonID").unwrap(),
            )
            .unwrap();
        address.set_property_value("Street", street).unwrap();
        self.accessor.save(&address).unwrap();
        address
    }
}

/// Surnames of a collection, in order.
pub fn surnames<'a>(objects: impl IntoIterator<Item = &'a Arc<BusinessObject>>) -> Vec<String> {
    objects
        .into_iter()
        .map(|o| o.get_property_value("Surname").unwrap().to_string())
        .collect()
}

pub fn registry() -> ClassDefRegistry {
    ClassDefRegistry::from_defs(vec![
        ClassDef::new("ContactPerson")
            .with_table_name("contact_person")
            .with_object_id("ContactPersonID")
            .with_prop(PropDef::new("Surname", PropType::String).with_field_name("surname_field"))
            .with_prop(PropDef::new("FirstName", PropType::String))
            .with_prop(PropDef::new("DateOfBirth", PropType::Date))
            .with_prop(PropDef::new("Display", PropType::String).not_persisted())
            .with_relationship(
                RelationshipDef::multiple("Cars", "Car").with_key("ContactPersonID", "OwnerID"),
            )
            .with_relationship(
                RelationshipDef::multiple("Addresses", "Address")
                    .with_key("ContactPersonID", "ContactPersonID")
                    .on_delete(DeleteParentAction::DereferenceRelated),
            ),
        ClassDef::new("Car")
            .with_table_name("car")
            .with_object_id("CarID")
            .with_prop(PropDef::new("OwnerID", PropType::Guid))
            .with_prop(PropDef::new("Make", PropType::String))
            .with_relationship(
                RelationshipDef::single("Owner", "ContactPerson").with_key("OwnerID", "ContactPersonID"),
            )
            .with_relationship(
                RelationshipDef::multiple("Engines", "Engine")
                    .with_key("CarID", "CarID")
                    .on_delete(DeleteParentAction::DeleteRelated),
            ),
        ClassDef::new("Engine")
            .with_table_name("engine")
            .with_object_id("EngineID")
            .with_prop(PropDef::new("CarID", PropType::Guid))
            .with_prop(PropDef::new("EngineNo", PropType::String))
            .with_relationship(RelationshipDef::single("Car", "Car").with_key("CarID", "CarID")),
        ClassDef::new("Address")
            .with_table_name("address")
            .with_object_id("AddressID")
            .with_prop(PropDef::new("ContactPersonID", PropType::Guid))
            .with_prop(PropDef::new("Street", PropType::String)),
        ClassDef::new("Shape")
            .with_table_name("shape")
            .with_object_id("ShapeID")
            .with_prop(PropDef::new("ShapeName", PropType::String)),
        ClassDef::new("Circle")
            .with_table_name("circle")
            .with_prop(PropDef::new("Radius", PropType::Int32))
            .with_super_class("Shape", MappingStrategy::ClassTableInheritance),
        ClassDef::new("Square")
            .with_prop(PropDef::new("Side", PropType::Int32))
            .with_super_class(
                "Shape",
                MappingStrategy::SingleTableInheritance {
                    discriminator: "ShapeType".to_string(),
                },
            ),
    ])
    .unwrap()
}
