//! Script-visible objects.
//!
//! Every object owns a [`PropertyStore`] and an optional prototype handle.
//! Exotic behavior is selected by [`ExoticObject`]: the own-property hooks
//! match on it before falling back to the ordinary store, which keeps the
//! dispatch a single branch on the hot property-access path.
//!
//! The hooks that may run native accessors (`get_own_property`,
//! `put_own_property`, `get`, `put`) live on [`JsObjectRef`] rather than on
//! `JsObject`, so no borrow of the object is held while an accessor runs
//! against its receiver.

pub mod array;
mod property_store;

pub use property_store::PropertyStore;

use crate::error::JsError;
use crate::gc::{Gc, GcPtr, Reset, Traceable};
use crate::prelude::*;
use crate::value::{JsValue, PropertyKey};

/// Reference to a heap-allocated object (GC-managed)
pub type JsObjectRef = Gc<JsObject>;

/// Getter half of a native accessor; receives the observed `this`.
pub type NativeGetter = fn(this: &JsValue) -> Result<JsValue, JsError>;

/// Setter half of a native accessor; receives the observed `this`.
pub type NativeSetter = fn(this: &JsValue, value: JsValue);

/// A computed property backed by host functions instead of a stored value.
#[derive(Clone, Copy)]
pub struct NativeAccessor {
    pub getter: NativeGetter,
    pub setter: NativeSetter,
}

impl fmt::Debug for NativeAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeAccessor")
    }
}

/// An own property slot
#[derive(Debug, Clone)]
pub enum Property {
    /// Ordinary stored value
    Data(JsValue),
    /// Computed accessor; cannot be deleted
    Native(NativeAccessor),
}

/// Exotic object behavior
#[derive(Debug, Default)]
pub enum ExoticObject {
    /// Ordinary object
    #[default]
    Ordinary,
    /// Array exotic object. `None` slots are holes left by sparse growth.
    Array { elements: Vec<Option<JsValue>> },
}

/// Receives every value an object keeps reachable.
pub trait Visitor {
    fn visit_object(&mut self, obj: &JsObjectRef);

    fn visit(&mut self, value: &JsValue) {
        if let JsValue::Object(obj) = value {
            self.visit_object(obj);
        }
    }
}

/// What an own-property lookup found, resolved without running any accessor
enum OwnSlot {
    Value(JsValue),
    Native(NativeAccessor),
    Missing,
}

/// Result of a raw own-property write
enum OwnWrite {
    Stored(bool),
    Native(NativeSetter, JsValue),
}

/// A JavaScript object
#[derive(Debug, Default)]
pub struct JsObject {
    /// Prototype link. Shared, and only ever installed through paths that
    /// keep the chain acyclic.
    pub(crate) prototype: Option<JsObjectRef>,
    /// Own properties (for arrays: everything except element indices)
    pub(crate) properties: PropertyStore,
    /// Exotic object behavior
    pub(crate) exotic: ExoticObject,
}

/// Reset implementation for JsObject - used by the GC for object pooling.
impl Reset for JsObject {
    fn reset(&mut self) {
        self.prototype = None;
        self.properties.clear();
        self.exotic = ExoticObject::Ordinary;
    }
}

impl Traceable for JsObject {
    fn trace<F: FnMut(GcPtr<Self>)>(&self, visitor: F) {
        struct Edges<F>(F);

        impl<F: FnMut(GcPtr<JsObject>)> Visitor for Edges<F> {
            fn visit_object(&mut self, obj: &JsObjectRef) {
                (self.0)(obj.copy_ref());
            }
        }

        self.visit_children(&mut Edges(visitor));
    }
}

impl JsObject {
    /// Create a new ordinary object
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prototype(&self) -> Option<&JsObjectRef> {
        self.prototype.as_ref()
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    /// Check if this object is an Array exotic object
    pub fn is_array(&self) -> bool {
        matches!(self.exotic, ExoticObject::Array { .. })
    }

    fn own_slot(&self, key: &PropertyKey) -> OwnSlot {
        if let ExoticObject::Array { elements } = &self.exotic
            && let Some(value) = array::get_own_element(elements, key)
        {
            return OwnSlot::Value(value);
        }
        match self.properties.get(key) {
            Some(Property::Data(value)) => OwnSlot::Value(value.clone()),
            Some(Property::Native(accessor)) => OwnSlot::Native(*accessor),
            None => OwnSlot::Missing,
        }
    }

    fn write_own(&mut self, key: PropertyKey, value: JsValue) -> OwnWrite {
        if let ExoticObject::Array { elements } = &mut self.exotic
            && let Some(index) = key.as_index()
        {
            array::put_element(elements, index, value);
            return OwnWrite::Stored(true);
        }
        match self.properties.get_mut(&key) {
            Some(Property::Native(accessor)) => OwnWrite::Native(accessor.setter, value),
            Some(Property::Data(slot)) => {
                *slot = value;
                OwnWrite::Stored(true)
            }
            None => {
                self.properties.put(key, Property::Data(value));
                OwnWrite::Stored(true)
            }
        }
    }

    /// Register a computed property on this object
    pub fn define_native_property(&mut self, key: PropertyKey, accessor: NativeAccessor) {
        self.properties.put(key, Property::Native(accessor));
    }

    /// Check own properties only, including array elements (holes excluded)
    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        if let ExoticObject::Array { elements } = &self.exotic
            && let Some(index) = key.as_index()
        {
            return matches!(elements.get(index as usize), Some(Some(_)));
        }
        self.properties.has(key)
    }

    /// Delete an own property.
    ///
    /// Returns false only for properties that refuse deletion (native
    /// accessors). Deleting an array element leaves a hole; `length` is unchanged.
    pub fn delete_own_property(&mut self, key: &PropertyKey) -> bool {
        if let ExoticObject::Array { elements } = &mut self.exotic
            && let Some(index) = key.as_index()
        {
            if let Some(slot) = elements.get_mut(index as usize) {
                *slot = None;
            }
            return true;
        }
        if matches!(self.properties.get(key), Some(Property::Native(_))) {
            return false;
        }
        self.properties.delete(key);
        true
    }

    /// Own keys in enumeration order: array indices ascending, then the
    /// store's keys in insertion order.
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        let mut keys = Vec::with_capacity(self.properties.len());
        if let ExoticObject::Array { elements } = &self.exotic {
            keys.extend(
                elements
                    .iter()
                    .enumerate()
                    .filter(|(_, slot)| slot.is_some())
                    .map(|(i, _)| PropertyKey::Index(i as u32)),
            );
        }
        keys.extend(self.properties.keys().cloned());
        keys
    }

    /// Report every value this object keeps reachable: stored properties,
    /// the prototype, and (for arrays) every non-hole element.
    pub fn visit_children<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        for (_, property) in self.properties.iter() {
            if let Property::Data(value) = property {
                visitor.visit(value);
            }
        }
        if let Some(proto) = &self.prototype {
            visitor.visit_object(proto);
        }
        if let ExoticObject::Array { elements } = &self.exotic {
            array::visit_elements(elements, visitor);
        }
    }
}

impl JsObjectRef {
    /// Look up `key` among this object's own properties only.
    ///
    /// `this` is the observed receiver; native accessors run against it, not
    /// against the object that stores them. A miss is `Ok(None)`, never an error.
    pub fn get_own_property(
        &self,
        this: &JsValue,
        key: &PropertyKey,
    ) -> Result<Option<JsValue>, JsError> {
        let slot = self.borrow().own_slot(key);
        match slot {
            OwnSlot::Value(value) => Ok(Some(value)),
            OwnSlot::Native(accessor) => (accessor.getter)(this).map(Some),
            OwnSlot::Missing => Ok(None),
        }
    }

    /// Write `key` into this object's own properties.
    ///
    /// Array index keys go to the element store; everything else goes to the
    /// property store, where a native accessor intercepts the write.
    ///
    /// The element store is dense: writing index `i` grows it to `i + 1`
    /// slots, filling the gap with holes. An index near `u32::MAX` therefore
    /// allocates billions of slots, so callers must bound untrusted indices
    /// before writing them into an array.
    pub fn put_own_property(&self, this: &JsValue, key: PropertyKey, value: JsValue) -> bool {
        let write = self.borrow_mut().write_own(key, value);
        match write {
            OwnWrite::Stored(accepted) => accepted,
            OwnWrite::Native(setter, value) => {
                setter(this, value);
                true
            }
        }
    }

    /// Prototype-qualified lookup with this object as the receiver
    pub fn get(&self, key: &PropertyKey) -> Result<JsValue, JsError> {
        self.get_with_receiver(&JsValue::Object(self.clone()), key)
    }

    /// Walk the prototype chain from this object, passing `this` to every
    /// own lookup. Yields `undefined` once the last object in the chain misses.
    pub fn get_with_receiver(&self, this: &JsValue, key: &PropertyKey) -> Result<JsValue, JsError> {
        let mut current = self.clone();
        loop {
            if let Some(value) = current.get_own_property(this, key)? {
                return Ok(value);
            }
            let next = current.borrow().prototype.clone();
            match next {
                Some(proto) => current = proto,
                None => return Ok(JsValue::Undefined),
            }
        }
    }

    /// Qualified existence check along the prototype chain
    pub fn has_property(&self, key: &PropertyKey) -> bool {
        let mut current = self.clone();
        loop {
            if current.borrow().has_own_property(key) {
                return true;
            }
            let next = current.borrow().prototype.clone();
            match next {
                Some(proto) => current = proto,
                None => return false,
            }
        }
    }

    /// Assignment (`obj[key] = value`).
    ///
    /// An own property of this object takes the write. Otherwise a native
    /// accessor found on the prototype chain handles it with this object as
    /// receiver, and failing that the value becomes a new own property.
    pub fn put(&self, key: PropertyKey, value: JsValue) -> bool {
        let this = JsValue::Object(self.clone());
        let inherited = if self.borrow().has_own_property(&key) {
            None
        } else {
            self.inherited_setter(&key)
        };
        match inherited {
            Some(setter) => {
                setter(&this, value);
                true
            }
            None => self.put_own_property(&this, key, value),
        }
    }

    fn inherited_setter(&self, key: &PropertyKey) -> Option<NativeSetter> {
        let mut current = self.borrow().prototype.clone();
        while let Some(obj) = current {
            let found = match obj.borrow().properties.get(key) {
                Some(Property::Native(accessor)) => Some(accessor.setter),
                _ => None,
            };
            if found.is_some() {
                return found;
            }
            current = obj.borrow().prototype.clone();
        }
        None
    }

    /// Report this object's children to `visitor`
    pub fn visit_children<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        self.borrow().visit_children(visitor);
    }
}
