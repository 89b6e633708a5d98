//! JavaScript value representation
//!
//! The core JsValue type, strings and property keys.

use crate::gc::Gc;
use crate::object::{ExoticObject, JsObjectRef};
use crate::prelude::*;

/// Trait for types that have cheap (O(1), reference-counted) clones.
///
/// This trait makes it explicit when a clone is cheap (just incrementing a reference count)
/// vs when it might be expensive (copying data).
///
/// # Examples
/// - `JsObjectRef` (`Gc<JsObject>`) - cheap clone
/// - `JsString` (`Rc<str>`) - cheap clone
pub trait CheapClone: Clone {
    /// Create a cheap (reference-counted) clone of this value.
    fn cheap_clone(&self) -> Self {
        self.clone()
    }
}

impl<T: ?Sized> CheapClone for Rc<T> {}

/// A JavaScript value
///
/// Cloning copies scalars and duplicates object handles; the referenced object
/// itself is shared, never copied.
#[derive(Clone, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    Object(JsObjectRef),
}

impl JsValue {
    /// Check if this value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    /// Check if this value references an Array exotic object
    pub fn is_array(&self) -> bool {
        match self {
            JsValue::Object(obj) => obj.borrow().is_array(),
            _ => false,
        }
    }

    /// Borrow the object handle, if this value is an object
    pub fn as_object(&self) -> Option<&JsObjectRef> {
        match self {
            JsValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Convert to string (ToString)
    pub fn to_js_string(&self) -> JsString {
        match self {
            JsValue::Undefined => JsString::from("undefined"),
            JsValue::Null => JsString::from("null"),
            JsValue::Boolean(true) => JsString::from("true"),
            JsValue::Boolean(false) => JsString::from("false"),
            JsValue::Number(n) => number_to_js_string(*n),
            JsValue::String(s) => s.cheap_clone(),
            JsValue::Object(obj) => {
                if obj.borrow().is_array() {
                    JsString::from("[object Array]")
                } else {
                    JsString::from("[object Object]")
                }
            }
        }
    }

    /// Strict equality (===)
    pub fn strict_equals(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Undefined, JsValue::Undefined) => true,
            (JsValue::Null, JsValue::Null) => true,
            (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
            // NaN !== NaN falls out of f64 comparison
            (JsValue::Number(a), JsValue::Number(b)) => a == b,
            (JsValue::String(a), JsValue::String(b)) => a == b,
            (JsValue::Object(a), JsValue::Object(b)) => Gc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn number_to_js_string(n: f64) -> JsString {
    if n.is_nan() {
        JsString::from("NaN")
    } else if n.is_infinite() {
        if n > 0.0 {
            JsString::from("Infinity")
        } else {
            JsString::from("-Infinity")
        }
    } else if n == 0.0 {
        // Covers -0 as well
        JsString::from("0")
    } else {
        JsString::from(n.to_string())
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => write!(f, "undefined"),
            JsValue::Null => write!(f, "null"),
            JsValue::Boolean(b) => write!(f, "{}", b),
            JsValue::Number(n) => write!(f, "{}", n),
            JsValue::String(s) => write!(f, "\"{}\"", s.as_str()),
            JsValue::Object(obj) => match obj.try_borrow() {
                Some(obj) => match &obj.exotic {
                    ExoticObject::Ordinary => write!(f, "{{...}}"),
                    ExoticObject::Array { elements } => write!(f, "[Array({})]", elements.len()),
                },
                None => write!(f, "[object #{}]", obj.id()),
            },
        }
    }
}

impl PartialEq for JsValue {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

// Conversions from Rust types

impl From<bool> for JsValue {
    fn from(b: bool) -> Self {
        JsValue::Boolean(b)
    }
}

impl From<f64> for JsValue {
    fn from(n: f64) -> Self {
        JsValue::Number(n)
    }
}

impl From<i32> for JsValue {
    fn from(n: i32) -> Self {
        JsValue::Number(n as f64)
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(JsString::from(s))
    }
}

impl From<JsString> for JsValue {
    fn from(s: JsString) -> Self {
        JsValue::String(s)
    }
}

impl From<JsObjectRef> for JsValue {
    fn from(obj: JsObjectRef) -> Self {
        JsValue::Object(obj)
    }
}

/// Reference-counted string for efficient string handling
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct JsString(Rc<str>);

// JsString wraps Rc<str>, so clone is cheap (just reference count increment)
impl CheapClone for JsString {}

impl JsString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl AsRef<str> for JsString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl core::borrow::Borrow<str> for JsString {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for JsString {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for JsString {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        JsString(s.into())
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString(s.into())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Property key: either an array index or any other string.
///
/// Canonical index strings (`"0"`, `"42"`) are always represented as `Index`,
/// so the two variants never describe the same property.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(JsString),
    Index(u32),
}

impl PropertyKey {
    /// Parse a canonical array index.
    ///
    /// Rejects leading zeros (`"01"`), signs, and `u32::MAX`, which is a valid
    /// string key but not an index.
    pub fn parse_index(s: &str) -> Option<u32> {
        let first = s.bytes().next()?;
        if !first.is_ascii_digit() || (first == b'0' && s.len() > 1) {
            return None;
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        match s.parse::<u32>() {
            Ok(idx) if idx != u32::MAX => Some(idx),
            _ => None,
        }
    }

    /// The array index this key denotes, if any
    #[inline]
    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyKey::Index(i) => Some(*i),
            PropertyKey::String(_) => None,
        }
    }

    /// Check if this key equals a string literal (avoids allocation)
    #[inline]
    pub fn eq_str(&self, s: &str) -> bool {
        match self {
            PropertyKey::String(js_str) => js_str.as_str() == s,
            PropertyKey::Index(_) => false,
        }
    }
}

impl From<&str> for PropertyKey {
    #[inline]
    fn from(s: &str) -> Self {
        match PropertyKey::parse_index(s) {
            Some(idx) => PropertyKey::Index(idx),
            None => PropertyKey::String(JsString::from(s)),
        }
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::from(s.as_str())
    }
}

impl From<JsString> for PropertyKey {
    #[inline]
    fn from(s: JsString) -> Self {
        match PropertyKey::parse_index(s.as_str()) {
            Some(idx) => PropertyKey::Index(idx),
            None => PropertyKey::String(s),
        }
    }
}

impl From<u32> for PropertyKey {
    fn from(idx: u32) -> Self {
        PropertyKey::Index(idx)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{}", s),
            PropertyKey::Index(i) => write!(f, "{}", i),
        }
    }
}
