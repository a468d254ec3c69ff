//! Integration tests for loading, paging and refreshing, run against every
//! store backend.

mod common;

use std::sync::Arc;

use boquery_core::proto::{Criteria, Value};
use boquery_core::{BusinessObjectCollection, Error, Lookup};
use chrono::Local;

use common::{surnames, Backend, TestContext, BACKENDS};

#[test]
fn test_collection_ordered_by_surname() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        for name in ["eeeee", "ggggg", "bbbbb"] {
            ctx.person(name);
        }

        let col = ctx
            .accessor
            .loader()
            .get_business_object_collection("ContactPerson", None::<&str>, "Surname")
            .unwrap();

        assert_eq!(surnames(&col), vec!["bbbbb", "eeeee", "ggggg"], "{:?}", backend);
        assert_eq!(col.total_count(), 3);
    }
}

#[test]
fn test_descending_order() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        for name in ["b", "c", "a"] {
            ctx.person(name);
        }

        let col = ctx
            .accessor
            .loader()
            .get_business_object_collection("ContactPerson", None::<&str>, "Surname DESC")
            .unwrap();

        assert_eq!(surnames(&col), vec!["c", "b", "a"], "{:?}", backend);
    }
}

#[test]
fn test_paged_load_returns_window_and_total() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        for name in ["e", "c", "a", "d", "b"] {
            ctx.person(name);
        }
        let loader = ctx.accessor.loader();

        let page = loader
            .get_business_object_collection_paged("ContactPerson", None::<&str>, "Surname", 3, 4)
            .unwrap();
        assert_eq!(surnames(&page), vec!["d", "e"], "{:?}", backend);
        assert_eq!(page.total_count(), 5);

        let empty = loader
            .get_business_object_collection_paged("ContactPerson", None::<&str>, "Surname", 0, 0)
            .unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.total_count(), 5);

        let past_end = loader
            .get_business_object_collection_paged("ContactPerson", None::<&str>, "Surname", 10, 2)
            .unwrap();
        assert!(past_end.is_empty());
        assert_eq!(past_end.total_count(), 5);

        let unbounded = loader
            .get_business_object_collection_paged("ContactPerson", None::<&str>, "Surname", 1, -1)
            .unwrap();
        assert_eq!(surnames(&unbounded), vec!["b", "c", "d", "e"]);
        assert_eq!(unbounded.total_count(), 5);
    }
}

#[test]
fn test_paged_load_with_criteria_counts_matches_only() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        for name in ["Smith", "Smythe", "Jones", "Smart"] {
            ctx.person(name);
        }

        let page = ctx
            .accessor
            .loader()
            .get_business_object_collection_paged(
                "ContactPerson",
                "Surname LIKE 'Sm%'",
                "Surname",
                0,
                2,
            )
            .unwrap();

        assert_eq!(surnames(&page), vec!["Smart", "Smith"], "{:?}", backend);
        assert_eq!(page.total_count(), 3);
    }
}

#[test]
fn test_negative_first_record_is_range_error() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        ctx.person("a");

        let err = ctx
            .accessor
            .loader()
            .get_business_object_collection_paged("ContactPerson", None::<&str>, "Surname", -1, 2)
            .unwrap_err();
        assert!(matches!(err, Error::Range(_)), "{:?}: {}", backend, err);
        assert!(err.to_string().contains("FirstRecordToLoad should not be negative"));

        let mut col = ctx.accessor.create_collection("ContactPerson").unwrap();
        let loader = ctx.accessor.loader();
        assert!(matches!(
            col.load_with_limit(&loader, None::<&str>, None::<&str>, -5, 1),
            Err(Error::Range(_))
        ));
        assert!(col.is_empty());
    }
}

#[test]
fn test_same_identity_loads_same_instance() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        ctx.person("Smith");
        ctx.person("Jones");
        ctx.accessor.object_manager().clear_all();

        let loader = ctx.accessor.loader();
        let single = loader
            .get_business_object("ContactPerson", "Surname = 'Smith'")
            .unwrap()
            .unwrap();
        let col = loader
            .get_business_object_collection("ContactPerson", None::<&str>, "Surname")
            .unwrap();

        let from_collection = col.find(&single.key()).unwrap();
        assert!(Arc::ptr_eq(&single, from_collection), "{:?}", backend);

        let id = single.get_property_value("ContactPersonID").unwrap();
        let by_key = loader
            .get_business_object_by_key("ContactPerson", &[("ContactPersonID", id)])
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&single, &by_key));
    }
}

#[test]
fn test_load_does_not_overwrite_unsaved_edits() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        let person = ctx.person("Smith");
        person.set_property_value("FirstName", "Edited").unwrap();

        let reloaded = ctx
            .accessor
            .loader()
            .get_business_object("ContactPerson", "Surname = 'Smith'")
            .unwrap()
            .unwrap();

        assert!(Arc::ptr_eq(&person, &reloaded));
        assert_eq!(
            reloaded.get_property_value("FirstName").unwrap(),
            Value::from("Edited"),
            "{:?}",
            backend
        );
        assert!(reloaded.is_dirty());
    }
}

#[test]
fn test_single_load_not_found_and_ambiguous() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        ctx.person("Twin");
        ctx.person("Twin");
        let loader = ctx.accessor.loader();

        assert!(loader
            .get_business_object("ContactPerson", "Surname = 'Nobody'")
            .unwrap()
            .is_none());

        assert!(matches!(
            loader.find_unique("ContactPerson", "Surname = 'Twin'").unwrap(),
            Lookup::Ambiguous(2)
        ));

        let err = loader
            .get_business_object("ContactPerson", "Surname = 'Twin'")
            .unwrap_err();
        let detail = err.developer_message().unwrap();
        assert!(detail.contains("ContactPerson"), "{:?}: {}", backend, detail);
    }
}

#[test]
fn test_criteria_through_relationship_path() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        let smith = ctx.person("Smith");
        let jones = ctx.person("Jones");
        let smith_car = ctx.car(&smith, "Ford");
        let jones_car = ctx.car(&jones, "Fiat");
        let smith_engine = ctx.engine(&smith_car, "E1");
        ctx.engine(&jones_car, "E2");

        let loader = ctx.accessor.loader();
        let query = loader
            .query_builder()
            .create_select_query(
                "Engine",
                Some(Criteria::eq("Car.Owner.Surname", "Smith")),
                None,
            )
            .unwrap();
        assert_eq!(query.source().unwrap().join_count(), 2);

        let found = loader
            .get_business_object("Engine", "Car.Owner.Surname = 'Smith'")
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&found, &smith_engine), "{:?}", backend);

        let by_make = loader
            .get_business_object_collection("Engine", "Car.Make <> 'Ford'", "EngineNo")
            .unwrap();
        assert_eq!(by_make.len(), 1);
        assert_eq!(
            by_make.get(0).unwrap().get_property_value("EngineNo").unwrap(),
            Value::from("E2")
        );
    }
}

#[test]
fn test_order_through_relationship_keeps_unmatched_rows() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        let zed = ctx.person("Zed");
        let amy = ctx.person("Amy");
        ctx.car(&zed, "Ford");
        ctx.car(&amy, "Fiat");
        let orphan = ctx.accessor.create_business_object("Car").unwrap();
        orphan.set_property_value("Make", "Saab").unwrap();
        ctx.accessor.save(&orphan).unwrap();

        let cars = ctx
            .accessor
            .loader()
            .get_business_object_collection("Car", None::<&str>, "Owner.Surname")
            .unwrap();

        let makes: Vec<String> = cars
            .iter()
            .map(|c| c.get_property_value("Make").unwrap().to_string())
            .collect();
        assert_eq!(makes, vec!["Saab", "Fiat", "Ford"], "{:?}", backend);
    }
}

#[test]
fn test_today_matches_stored_date() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        let today = Local::now().date_naive();
        let person = ctx.accessor.create_business_object("ContactPerson").unwrap();
        person.set_property_value("Surname", "Born").unwrap();
        person.set_property_value("DateOfBirth", today).unwrap();
        ctx.accessor.save(&person).unwrap();
        ctx.person("Other");

        let found = ctx
            .accessor
            .loader()
            .get_business_object("ContactPerson", "DateOfBirth = Today")
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&found, &person), "{:?}", backend);
    }
}

#[test]
fn test_unknown_property_is_invalid_criteria() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        let loader = ctx.accessor.loader();

        let err = loader
            .get_business_object_collection("ContactPerson", "Nope = 1", None::<&str>)
            .unwrap_err();
        assert!(err.is_invalid_criteria(), "{:?}: {}", backend, err);

        let err = loader
            .get_business_object_collection("ContactPerson", "Surname = 'x' AND", None::<&str>)
            .unwrap_err();
        assert!(err.is_invalid_criteria());
    }
}

#[test]
fn test_refresh_follows_the_window() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        for name in ["b", "d", "f"] {
            ctx.person(name);
        }
        let loader = ctx.accessor.loader();

        let mut col = ctx.accessor.create_collection("ContactPerson").unwrap();
        let total = col
            .load_with_limit(&loader, None::<&str>, "Surname", 0, 2)
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(surnames(&col), vec!["b", "d"]);

        ctx.person("a");
        col.refresh(&loader).unwrap();

        assert_eq!(surnames(&col), vec!["a", "b"], "{:?}", backend);
        assert_eq!(col.total_count(), 4);
    }
}

#[test]
fn test_refresh_window_with_tied_sort_keys() {
    // Ties keep insertion order only in the memory store.
    let ctx = TestContext::new(Backend::Memory);
    let named = |surname: &str, first: &str| {
        let person = ctx.person(surname);
        person.set_property_value("FirstName", first).unwrap();
        ctx.accessor.save(&person).unwrap();
        person
    };
    let first_names = |col: &BusinessObjectCollection| -> Vec<String> {
        col.iter()
            .map(|o| o.get_property_value("FirstName").unwrap().to_string())
            .collect()
    };

    named("a", "one");
    named("m", "two");
    named("m", "three");
    named("z", "last");
    let loader = ctx.accessor.loader();

    let mut col = ctx.accessor.create_collection("ContactPerson").unwrap();
    col.load_with_limit(&loader, None::<&str>, "Surname", 1, 2).unwrap();
    assert_eq!(first_names(&col), vec!["two", "three"]);

    // A new row tied with the window's keys sorts after them and stays out.
    named("m", "four");
    col.refresh(&loader).unwrap();
    assert_eq!(first_names(&col), vec!["two", "three"]);
    assert_eq!(col.total_count(), 5);

    // A row tied with the key before the window pushes the last member out.
    named("a", "five");
    col.refresh(&loader).unwrap();
    assert_eq!(first_names(&col), vec!["five", "two"]);
    assert_eq!(col.total_count(), 6);
}

#[test]
fn test_refresh_drops_objects_no_longer_matching() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        let smith = ctx.person("Smith");
        ctx.person("Smart");
        let loader = ctx.accessor.loader();

        let mut col = ctx.accessor.create_collection("ContactPerson").unwrap();
        col.load(&loader, "Surname LIKE 'Sm%'", "Surname").unwrap();
        assert_eq!(col.len(), 2);

        smith.set_property_value("Surname", "Jones").unwrap();
        ctx.accessor.save(&smith).unwrap();
        col.refresh(&loader).unwrap();

        assert_eq!(surnames(&col), vec!["Smart"], "{:?}", backend);
    }
}

#[test]
fn test_refresh_keeps_unsaved_created_objects() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        ctx.person("Smith");
        let loader = ctx.accessor.loader();

        let mut col = ctx.accessor.create_collection("ContactPerson").unwrap();
        col.load_all(&loader).unwrap();
        let created = col.create_business_object();
        created.set_property_value("Surname", "Draft").unwrap();

        col.refresh(&loader).unwrap();
        assert_eq!(col.len(), 2, "{:?}", backend);
        assert!(col.iter().any(|o| Arc::ptr_eq(o, &created)));

        ctx.accessor.save(&created).unwrap();
        col.refresh(&loader).unwrap();
        assert_eq!(col.len(), 2);
        assert!(col.created().is_empty());
    }
}

#[test]
fn test_refresh_with_duplicate_snapshot_entry_fails() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        ctx.person("Smith");
        ctx.person("Jones");
        let loader = ctx.accessor.loader();

        let mut col = ctx.accessor.create_collection("ContactPerson").unwrap();
        col.load(&loader, "Surname = 'Smith'", None::<&str>).unwrap();
        assert_eq!(col.len(), 1);

        let smith = col.get(0).unwrap().clone();
        col.persisted_mut().push(smith.clone());

        let err = col.refresh(&loader).unwrap_err();
        let detail = err.developer_message().unwrap();
        assert!(detail.contains("ContactPerson"), "{:?}: {}", backend, detail);
        assert!(detail.contains(&smith.key().to_string()));
    }
}

#[test]
fn test_related_object_and_collection() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        let owner = ctx.person("Smith");
        let first = ctx.car(&owner, "Ford");
        ctx.car(&owner, "Fiat");
        let loader = ctx.accessor.loader();

        let related_owner = loader
            .get_related_business_object(&first, "Owner")
            .unwrap()
            .unwrap();
        assert!(Arc::ptr_eq(&related_owner, &owner), "{:?}", backend);

        let cars = loader.get_related_collection(&owner, "Cars").unwrap();
        assert_eq!(cars.len(), 2);
        assert!(cars.iter().any(|c| Arc::ptr_eq(c, &first)));

        assert!(loader.get_related_collection(&first, "Owner").is_err());
        assert!(loader.get_related_business_object(&owner, "Cars").is_err());
    }
}

#[test]
fn test_related_object_with_null_key_is_none() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        ctx.person("Smith");
        let car = ctx.accessor.create_business_object("Car").unwrap();
        car.set_property_value("Make", "Saab").unwrap();
        ctx.accessor.save(&car).unwrap();

        let owner = ctx
            .accessor
            .loader()
            .get_related_business_object(&car, "Owner")
            .unwrap();
        assert!(owner.is_none(), "{:?}", backend);
    }
}

#[test]
fn test_query_timeout_stops_loads() {
    for backend in BACKENDS {
        let ctx = TestContext::new(backend);
        ctx.person("Smith");
        let accessor = ctx
            .accessor
            .with_config(boquery_core::LoaderConfig::default().query_timeout(std::time::Duration::ZERO));

        let err = accessor
            .loader()
            .get_business_object_collection("ContactPerson", None::<&str>, None::<&str>)
            .unwrap_err();
        assert!(matches!(err, Error::DeadlineExceeded), "{:?}: {}", backend, err);
    }
}
