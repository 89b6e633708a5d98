//! Object model core for an embeddable JavaScript runtime
//!
//! Property stores with prototype-based lookup, the Array exotic object and a
//! tracing heap that discovers live objects through each object's
//! `visit_children` hook.
//!
//! # Example
//!
//! ```
//! use js_object_model::{JsValue, PropertyKey, Realm};
//!
//! let realm = Realm::new();
//! let guard = realm.create_guard();
//! let arr = realm.create_array(&guard);
//! let this = JsValue::from(arr.clone());
//!
//! realm.array_push(&this, JsValue::Number(10.0)).unwrap();
//! realm.array_push(&this, JsValue::Number(20.0)).unwrap();
//! assert_eq!(realm.array_length(&this).unwrap(), JsValue::Number(2.0));
//! assert_eq!(realm.array_pop(&this).unwrap(), JsValue::Number(20.0));
//! assert_eq!(arr.get(&PropertyKey::from("0")).unwrap(), JsValue::Number(10.0));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod prelude;

pub mod error;
pub mod gc;
pub mod object;
pub mod platform;
pub mod realm;
pub mod string_dict;
pub mod value;

pub use error::JsError;
pub use gc::{DEFAULT_GC_THRESHOLD, Gc, GcStats, Guard, Heap};
pub use object::{
    ExoticObject, JsObject, JsObjectRef, NativeAccessor, Property, PropertyStore, Visitor,
};
pub use platform::{LogLevel, LogProvider, MemoryLogProvider, NoOpLogProvider};
#[cfg(feature = "std")]
pub use platform::StdLogProvider;
pub use realm::{Realm, RealmOptions};
pub use string_dict::StringDict;
pub use value::{CheapClone, JsString, JsValue, PropertyKey};
