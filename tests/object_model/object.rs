//! Tests for ordinary objects and prototype lookup

use super::{create_test_realm, obj};
use js_object_model::{JsError, JsValue, PropertyKey};

#[test]
fn test_own_lookup_never_consults_prototype() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let proto = realm.create_object(&guard);
    let child = realm.create_object_with_prototype(&guard, Some(proto.clone()));
    let key = PropertyKey::from("greeting");

    proto.put(key.clone(), JsValue::from("hello"));

    let this = obj(&child);
    assert_eq!(child.get_own_property(&this, &key).unwrap(), None);
    assert_eq!(child.get(&key).unwrap(), JsValue::from("hello"));
    assert!(child.has_property(&key));
    assert!(!child.borrow().has_own_property(&key));
}

#[test]
fn test_lookup_walks_whole_chain() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let a = realm.create_object(&guard);
    let b = realm.create_object_with_prototype(&guard, Some(a.clone()));
    let c = realm.create_object_with_prototype(&guard, Some(b.clone()));

    a.put(PropertyKey::from("depth"), JsValue::Number(0.0));
    a.put(PropertyKey::from("root"), JsValue::Boolean(true));
    b.put(PropertyKey::from("depth"), JsValue::Number(1.0));

    assert_eq!(c.get(&PropertyKey::from("depth")).unwrap(), JsValue::Number(1.0));
    assert_eq!(c.get(&PropertyKey::from("root")).unwrap(), JsValue::Boolean(true));
    assert_eq!(c.get(&PropertyKey::from("missing")).unwrap(), JsValue::Undefined);
    assert!(!c.has_property(&PropertyKey::from("missing")));
}

#[test]
fn test_assignment_writes_to_receiver() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let proto = realm.create_object(&guard);
    let child = realm.create_object_with_prototype(&guard, Some(proto.clone()));
    let key = PropertyKey::from("x");

    proto.put(key.clone(), JsValue::Number(1.0));
    child.put(key.clone(), JsValue::Number(2.0));

    assert_eq!(child.get(&key).unwrap(), JsValue::Number(2.0));
    assert_eq!(proto.get(&key).unwrap(), JsValue::Number(1.0));
}

#[test]
fn test_inherited_accessor_sees_original_receiver() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let arr = realm.create_array_from(&guard, vec![JsValue::Null, JsValue::Null]);
    let derived = realm.create_object_with_prototype(&guard, Some(arr.clone()));
    let length = PropertyKey::from("length");

    // The accessor lives on the array but runs against `derived`
    let err = derived.get(&length).unwrap_err();
    assert!(matches!(err, JsError::TypeError { .. }));

    let via_array = derived
        .get_with_receiver(&obj(&arr), &length)
        .unwrap();
    assert_eq!(via_array, JsValue::Number(2.0));

    // Elements are own properties of the array only
    assert_eq!(derived.get(&PropertyKey::Index(1)).unwrap(), JsValue::Null);
    assert_eq!(
        derived.get_own_property(&obj(&derived), &PropertyKey::Index(1)).unwrap(),
        None
    );
}

#[test]
fn test_insertion_order_is_observable() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let o = realm.create_object(&guard);

    for name in ["zeta", "alpha", "7", "mid"] {
        o.put(PropertyKey::from(name), JsValue::from(name));
    }
    // Overwrite keeps position
    o.put(PropertyKey::from("alpha"), JsValue::Number(0.0));

    let keys: Vec<String> = o.borrow().own_keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(keys, ["zeta", "alpha", "7", "mid"]);
    assert_eq!(o.get(&PropertyKey::from("alpha")).unwrap(), JsValue::Number(0.0));
}

#[test]
fn test_delete_removes_key_entirely() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let proto = realm.create_object(&guard);
    let o = realm.create_object_with_prototype(&guard, Some(proto.clone()));
    let key = PropertyKey::from("shadowed");

    proto.put(key.clone(), JsValue::from("proto"));
    o.put(key.clone(), JsValue::from("own"));
    assert!(o.borrow_mut().delete_own_property(&key));

    assert!(!o.borrow().has_own_property(&key));
    assert!(o.borrow().own_keys().is_empty());
    assert_eq!(o.get(&key).unwrap(), JsValue::from("proto"));

    // Deleting a missing key is not an error
    assert!(o.borrow_mut().delete_own_property(&PropertyKey::from("nothing")));
}

#[test]
fn test_set_prototype_rejects_cycles() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let a = realm.create_object(&guard);
    let b = realm.create_object_with_prototype(&guard, Some(a.clone()));
    let c = realm.create_object_with_prototype(&guard, Some(b.clone()));

    assert!(matches!(
        realm.set_prototype(&a, Some(a.clone())),
        Err(JsError::PrototypeCycle)
    ));
    assert!(matches!(
        realm.set_prototype(&a, Some(c.clone())),
        Err(JsError::PrototypeCycle)
    ));

    // The chain is untouched and lookups still terminate
    assert_eq!(a.borrow().prototype().cloned(), Some(realm.object_prototype.clone()));
    assert_eq!(c.get(&PropertyKey::from("missing")).unwrap(), JsValue::Undefined);
}

#[test]
fn test_set_prototype_replaces_and_detaches() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let first = realm.create_object(&guard);
    let second = realm.create_object(&guard);
    let o = realm.create_object_with_prototype(&guard, Some(first.clone()));

    first.put(PropertyKey::from("from"), JsValue::from("first"));
    second.put(PropertyKey::from("from"), JsValue::from("second"));

    realm.set_prototype(&o, Some(second.clone())).unwrap();
    assert_eq!(o.get(&PropertyKey::from("from")).unwrap(), JsValue::from("second"));

    realm.set_prototype(&o, None).unwrap();
    assert!(o.borrow().prototype().is_none());
    assert_eq!(o.get(&PropertyKey::from("from")).unwrap(), JsValue::Undefined);
}

#[test]
fn test_values_share_referents() {
    let realm = create_test_realm();
    let guard = realm.create_guard();
    let target = realm.create_object(&guard);
    let holder = realm.create_object(&guard);

    let value = obj(&target);
    let copy = value.clone();
    holder.put(PropertyKey::from("ref"), copy);
    target.put(PropertyKey::from("mark"), JsValue::Number(42.0));

    let stored = holder.get(&PropertyKey::from("ref")).unwrap();
    assert!(stored.strict_equals(&value));
    let stored_obj = stored.as_object().cloned().unwrap();
    assert_eq!(
        stored_obj.get(&PropertyKey::from("mark")).unwrap(),
        JsValue::Number(42.0)
    );
}
