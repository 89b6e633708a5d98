//! Array exotic object.
//!
//! Index keys are served from a dense `elements` vector that may contain
//! holes; every other key goes through the ordinary property store. `length`
//! is not stored anywhere: it is a native accessor registered on each array
//! instance that reports `elements.len()`.

use super::{ExoticObject, JsObject, NativeAccessor, Visitor};
use crate::error::JsError;
use crate::prelude::*;
use crate::value::{JsValue, PropertyKey};

/// Read `key` from the element store.
///
/// `None` means the key is not an in-range index and the ordinary store
/// should be consulted. Holes read as `undefined`.
pub(crate) fn get_own_element(elements: &[Option<JsValue>], key: &PropertyKey) -> Option<JsValue> {
    let index = key.as_index()? as usize;
    elements
        .get(index)
        .map(|slot| slot.clone().unwrap_or(JsValue::Undefined))
}

/// Write `value` at `index`, growing the store with holes when needed.
pub(crate) fn put_element(elements: &mut Vec<Option<JsValue>>, index: u32, value: JsValue) {
    let index = index as usize;
    if index >= elements.len() {
        elements.resize(index + 1, None);
    }
    if let Some(slot) = elements.get_mut(index) {
        *slot = Some(value);
    }
}

pub(crate) fn visit_elements<V: Visitor + ?Sized>(elements: &[Option<JsValue>], visitor: &mut V) {
    for value in elements.iter().flatten() {
        visitor.visit(value);
    }
}

fn not_an_array() -> JsError {
    JsError::type_error("Not an array")
}

impl JsObject {
    /// Create an empty array object
    pub fn new_array() -> Self {
        Self {
            exotic: ExoticObject::Array {
                elements: Vec::new(),
            },
            ..Self::default()
        }
    }

    /// Element storage, if this object is an array
    pub fn array_elements(&self) -> Option<&[Option<JsValue>]> {
        match &self.exotic {
            ExoticObject::Array { elements } => Some(elements),
            ExoticObject::Ordinary => None,
        }
    }

    fn array_elements_mut(&mut self) -> Result<&mut Vec<Option<JsValue>>, JsError> {
        match &mut self.exotic {
            ExoticObject::Array { elements } => Ok(elements),
            ExoticObject::Ordinary => Err(not_an_array()),
        }
    }

    /// Current array length, or `None` for ordinary objects
    pub fn array_length(&self) -> Option<u32> {
        self.array_elements().map(|elements| elements.len() as u32)
    }

    /// Append `value` to the end of the array
    pub fn push(&mut self, value: JsValue) -> Result<(), JsError> {
        self.array_elements_mut()?.push(Some(value));
        Ok(())
    }

    /// Remove and return the last element; `undefined` when empty.
    pub fn pop(&mut self) -> Result<JsValue, JsError> {
        let elements = self.array_elements_mut()?;
        Ok(elements.pop().flatten().unwrap_or(JsValue::Undefined))
    }

    /// Remove and return the first element; `undefined` when empty.
    ///
    /// Every remaining element moves down one index.
    pub fn shift(&mut self) -> Result<JsValue, JsError> {
        let elements = self.array_elements_mut()?;
        if elements.is_empty() {
            return Ok(JsValue::Undefined);
        }
        Ok(elements.remove(0).unwrap_or(JsValue::Undefined))
    }
}

/// Getter for `length`
pub fn length_getter(this: &JsValue) -> Result<JsValue, JsError> {
    let obj = this.as_object().ok_or_else(not_an_array)?;
    let length = obj.borrow().array_length().ok_or_else(not_an_array)?;
    Ok(JsValue::Number(length as f64))
}

/// Setter for `length`.
///
/// Truncation and extension through `length` are not supported; reaching
/// this is a contract violation in the caller.
#[allow(clippy::panic)]
pub fn length_setter(_this: &JsValue, _value: JsValue) {
    panic!("Array length setter is not supported")
}

/// The accessor registered as `length` on every array instance
pub fn length_accessor() -> NativeAccessor {
    NativeAccessor {
        getter: length_getter,
        setter: length_setter,
    }
}
