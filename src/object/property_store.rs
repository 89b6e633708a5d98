//! Ordered own-property storage.

use crate::prelude::*;
use crate::value::PropertyKey;

use super::Property;

/// Insertion-ordered map from property key to property.
///
/// Enumeration order is insertion order. Overwriting an existing key keeps
/// its position; deleting a key closes the gap, so the relative order of the
/// remaining keys never changes.
#[derive(Debug, Default)]
pub struct PropertyStore {
    map: IndexMap<PropertyKey, Property>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self {
            map: index_map_new(),
        }
    }

    #[inline]
    pub fn get(&self, key: &PropertyKey) -> Option<&Property> {
        self.map.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: &PropertyKey) -> Option<&mut Property> {
        self.map.get_mut(key)
    }

    /// Insert or overwrite; returns the previous property for `key`.
    pub fn put(&mut self, key: PropertyKey, property: Property) -> Option<Property> {
        self.map.insert(key, property)
    }

    #[inline]
    pub fn has(&self, key: &PropertyKey) -> bool {
        self.map.contains_key(key)
    }

    /// Remove `key` entirely, preserving the order of the remaining keys.
    pub fn delete(&mut self, key: &PropertyKey) -> Option<Property> {
        self.map.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &PropertyKey> {
        self.map.keys()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&PropertyKey, &Property)> {
        self.map.iter()
    }
}
