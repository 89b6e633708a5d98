#![no_main]

use js_object_model::{JsValue, NoOpLogProvider, PropertyKey, Realm, RealmOptions};
use libfuzzer_sys::fuzz_target;
use std::rc::Rc;

// Keeps sparse puts from allocating gigabytes of holes
const MAX_INDEX: u32 = 4096;

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }

    let options = RealmOptions {
        gc_threshold: 1 + data.first().copied().unwrap_or(0) as usize % 8,
        ..RealmOptions::default()
    };
    let realm = Realm::with_logger(options, Rc::new(NoOpLogProvider));
    let guard = realm.create_guard();
    let arr = realm.create_array(&guard);
    let this = JsValue::from(arr.clone());

    // Shadow model of the element count
    let mut expected: u32 = 0;

    for chunk in data.chunks(3) {
        let op = chunk[0] % 6;
        let arg = chunk.get(1).copied().unwrap_or(0) as u32
            | (chunk.get(2).copied().unwrap_or(0) as u32) << 8;

        match op {
            0 => {
                let index = arg % MAX_INDEX;
                let value = if arg & 1 == 0 {
                    JsValue::Number(arg as f64)
                } else {
                    JsValue::from(realm.create_object(&realm.create_guard()))
                };
                assert!(arr.put_own_property(&this, PropertyKey::Index(index), value.clone()));
                expected = expected.max(index + 1);
                let read = arr.get_own_property(&this, &PropertyKey::Index(index)).unwrap();
                assert!(read.is_some_and(|v| v.strict_equals(&value)));
            }
            1 => {
                realm.array_push(&this, JsValue::Number(arg as f64)).unwrap();
                expected += 1;
            }
            2 => {
                let popped = realm.array_pop(&this).unwrap();
                if expected == 0 {
                    assert!(popped.is_undefined());
                }
                expected = expected.saturating_sub(1);
            }
            3 => {
                let shifted = realm.array_shift(&this).unwrap();
                if expected == 0 {
                    assert!(shifted.is_undefined());
                }
                expected = expected.saturating_sub(1);
            }
            4 => {
                arr.put(PropertyKey::from(format!("k{}", arg)), JsValue::Boolean(true));
            }
            _ => {
                realm.collect_garbage();
            }
        }

        let length = realm.array_length(&this).unwrap();
        assert_eq!(length, JsValue::Number(expected as f64));
    }
});
