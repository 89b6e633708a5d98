//! Interning of property-key strings.
//!
//! Identical key strings share one `Rc<str>`, so property stores hash and
//! compare short, shared keys and a realm does not allocate `"length"` once per
//! array.

use crate::prelude::*;
use crate::value::{CheapClone, JsString, PropertyKey};

/// A dictionary for deduplicating JsString instances.
///
/// Strings inserted into the dictionary are stored once and subsequent
/// requests for the same string return a cheap clone of the existing instance.
pub struct StringDict {
    /// Map from string content to shared JsString instance.
    /// Using Box<str> as key to avoid double-indirection through Rc.
    strings: FxHashMap<Box<str>, JsString>,
}

impl StringDict {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self {
            strings: FxHashMap::default(),
        }
    }

    /// Create a dictionary pre-populated with the keys the object model itself uses.
    pub fn with_common_strings() -> Self {
        let mut dict = Self::new();
        for s in COMMON_STRINGS {
            dict.get_or_insert(s);
        }
        dict
    }

    /// Get an existing string or insert a new one.
    /// Returns a cheap clone of the shared JsString instance.
    pub fn get_or_insert(&mut self, s: &str) -> JsString {
        if let Some(existing) = self.strings.get(s) {
            return existing.cheap_clone();
        }
        let js_str = JsString::from(s);
        self.strings.insert(s.into(), js_str.cheap_clone());
        js_str
    }

    /// Get an existing string without inserting.
    pub fn get(&self, s: &str) -> Option<JsString> {
        self.strings.get(s).map(|s| s.cheap_clone())
    }

    /// Build a property key, interning it unless it is an array index.
    ///
    /// Index keys never reach the dictionary: `"7"` becomes `PropertyKey::Index(7)`.
    pub fn key(&mut self, s: &str) -> PropertyKey {
        match PropertyKey::parse_index(s) {
            Some(index) => PropertyKey::Index(index),
            None => PropertyKey::String(self.get_or_insert(s)),
        }
    }

    /// Number of unique strings in the dictionary.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringDict {
    fn default() -> Self {
        Self::new()
    }
}

const COMMON_STRINGS: &[&str] = &[
    "length",
    "prototype",
    "constructor",
    "__proto__",
    "push",
    "pop",
    "shift",
];
