//! Tests for tracing and collection of objects

use super::{RecordingVisitor, create_test_realm, ids_of, obj};
use js_object_model::{GcStats, JsValue, PropertyKey, Realm};

/// Live object count with only the realm's intrinsics alive
fn baseline(realm: &Realm) -> usize {
    realm.collect_garbage();
    realm.gc_stats().live_objects
}

#[test]
fn test_visit_children_reports_elements_and_properties() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let o1 = realm.create_object(&guard);
    let o2 = realm.create_object(&guard);
    let o3 = realm.create_object(&guard);

    let arr = realm.create_array_from(&guard, vec![obj(&o1), obj(&o2)]);
    realm.set_prototype(&arr, None).unwrap();
    arr.put(PropertyKey::from("k"), obj(&o3));

    let mut visitor = RecordingVisitor::default();
    arr.visit_children(&mut visitor);
    assert_eq!(visitor.sorted(), ids_of(&[&o1, &o2, &o3]));
}

#[test]
fn test_visit_children_skips_holes_and_scalars() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let target = realm.create_object(&guard);
    let arr = realm.create_array(&guard);
    let this = obj(&arr);

    arr.put_own_property(&this, PropertyKey::Index(4), obj(&target));
    arr.put_own_property(&this, PropertyKey::Index(1), JsValue::Number(1.0));
    arr.put(PropertyKey::from("label"), JsValue::from("not an object"));

    let mut visitor = RecordingVisitor::default();
    arr.visit_children(&mut visitor);
    assert_eq!(visitor.sorted(), ids_of(&[&target, &realm.array_prototype]));
}

#[test]
fn test_visit_children_includes_prototype() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let o = realm.create_object(&guard);

    let mut visitor = RecordingVisitor::default();
    o.visit_children(&mut visitor);
    assert_eq!(visitor.sorted(), ids_of(&[&realm.object_prototype]));
}

#[test]
fn test_unreachable_objects_are_collected() {
    let realm = create_test_realm();
    let base = baseline(&realm);
    {
        let guard = realm.create_guard();
        let holder = realm.create_object(&guard);
        for i in 0..10 {
            let child = realm.create_object(&guard);
            holder.put(PropertyKey::from(format!("c{}", i)), obj(&child));
        }
        assert_eq!(realm.gc_stats().live_objects, base + 11);
    }

    realm.collect_garbage();
    assert_eq!(realm.gc_stats().live_objects, base);
}

#[test]
fn test_elements_keep_objects_alive() {
    let realm = create_test_realm();
    let base = baseline(&realm);
    let guard = realm.create_guard();
    let arr = realm.create_array(&guard);
    let this = obj(&arr);

    {
        let temp = realm.create_guard();
        let element = realm.create_object(&temp);
        element.put(PropertyKey::from("tag"), JsValue::from("kept"));
        realm.array_push(&this, obj(&element)).unwrap();
    }

    realm.collect_garbage();
    assert_eq!(realm.gc_stats().live_objects, base + 2);

    let element = arr.get(&PropertyKey::Index(0)).unwrap();
    let element = element.as_object().cloned().unwrap();
    assert_eq!(element.get(&PropertyKey::from("tag")).unwrap(), JsValue::from("kept"));
}

#[test]
fn test_popped_element_becomes_collectable() {
    let realm = create_test_realm();
    let base = baseline(&realm);
    let guard = realm.create_guard();
    let arr = realm.create_array(&guard);
    let this = obj(&arr);

    {
        let temp = realm.create_guard();
        let element = realm.create_object(&temp);
        realm.array_push(&this, obj(&element)).unwrap();
    }
    realm.collect_garbage();
    assert_eq!(realm.gc_stats().live_objects, base + 2);

    drop(realm.array_pop(&this).unwrap());
    realm.collect_garbage();
    assert_eq!(realm.gc_stats().live_objects, base + 1);
}

#[test]
fn test_held_value_survives_collection() {
    let realm = create_test_realm();
    let base = baseline(&realm);
    let guard = realm.create_guard();
    let arr = realm.create_array(&guard);
    let this = obj(&arr);

    {
        let temp = realm.create_guard();
        let element = realm.create_object(&temp);
        realm.array_push(&this, obj(&element)).unwrap();
    }

    // The popped value is held outside the heap, so it stays alive
    let popped = realm.array_pop(&this).unwrap();
    realm.collect_garbage();
    assert_eq!(realm.gc_stats().live_objects, base + 2);
    assert!(popped.as_object().is_some());
}

#[test]
fn test_unreachable_cycle_is_collected() {
    let realm = create_test_realm();
    let base = baseline(&realm);
    {
        let guard = realm.create_guard();
        let a = realm.create_object(&guard);
        let b = realm.create_object(&guard);
        a.put(PropertyKey::from("peer"), obj(&b));
        b.put(PropertyKey::from("peer"), obj(&a));
        let arr = realm.create_array_from(&guard, vec![obj(&a), obj(&b)]);
        a.put(PropertyKey::from("owner"), obj(&arr));
    }

    let collected = realm.collect_garbage();
    assert_eq!(collected, 3);
    assert_eq!(realm.gc_stats().live_objects, base);
}

#[test]
fn test_prototype_kept_alive_by_instance() {
    let realm = create_test_realm();
    let base = baseline(&realm);
    let guard = realm.create_guard();

    let instance = {
        let temp = realm.create_guard();
        let proto = realm.create_object(&temp);
        proto.put(PropertyKey::from("inherited"), JsValue::Boolean(true));
        realm.create_object_with_prototype(&guard, Some(proto))
    };

    realm.collect_garbage();
    assert_eq!(realm.gc_stats().live_objects, base + 2);
    assert_eq!(
        instance.get(&PropertyKey::from("inherited")).unwrap(),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_many_arrays_under_automatic_collection() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let outer = realm.create_array(&guard);
    let this = obj(&outer);

    for i in 0..200 {
        let temp = realm.create_guard();
        let inner = realm.create_array(&temp);
        realm.array_push(&obj(&inner), JsValue::Number(i as f64)).unwrap();
        realm.array_push(&this, obj(&inner)).unwrap();
    }

    assert_eq!(realm.array_length(&this).unwrap(), JsValue::Number(200.0));
    for i in [0u32, 57, 199] {
        let inner = outer.get(&PropertyKey::Index(i)).unwrap();
        let first = inner.as_object().cloned().unwrap().get(&PropertyKey::Index(0)).unwrap();
        assert_eq!(first, JsValue::Number(i as f64));
    }
}

#[test]
fn test_stats_serialize() {
    let realm = create_test_realm();
    realm.collect_garbage();
    let stats: GcStats = realm.gc_stats();
    let json = serde_json::to_value(&stats).unwrap();

    assert_eq!(json["live_objects"], serde_json::json!(stats.live_objects));
    assert!(json["collections"].as_u64().unwrap() >= 1);
}

#[test]
fn test_handle_outliving_realm_is_dead() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let arr = realm.create_array_from(&guard, vec![JsValue::Number(1.0)]);
    let held = arr.clone();
    drop(guard);
    drop(arr);
    drop(realm);

    assert!(!held.is_live());
    assert!(held.try_borrow().is_none());
}

#[test]
#[should_panic(expected = "used after its heap was dropped")]
fn test_get_after_realm_drop_panics() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let arr = realm.create_array_from(&guard, vec![JsValue::Number(1.0)]);
    drop(realm);

    let _ = arr.get(&PropertyKey::Index(0));
}
