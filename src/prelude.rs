//! Prelude module for no_std compatibility.
//!
//! This module re-exports types from core/alloc/std based on feature flags,
//! allowing the rest of the codebase to use a consistent import path.

// ═══════════════════════════════════════════════════════════════════════════════
// Core types (always available)
// ═══════════════════════════════════════════════════════════════════════════════

pub use core::{
    cell::{Cell, Ref, RefCell, RefMut},
    fmt,
    hash::{Hash, Hasher},
    mem,
    ptr::NonNull,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Alloc types (conditional on std vs no_std)
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "std")]
pub use std::{
    boxed::Box,
    format,
    rc::{Rc, Weak},
    string::{String, ToString},
    vec,
    vec::Vec,
};

#[cfg(not(feature = "std"))]
pub use alloc::{
    boxed::Box,
    format,
    rc::{Rc, Weak},
    string::{String, ToString},
    vec,
    vec::Vec,
};

// ═══════════════════════════════════════════════════════════════════════════════
// FxHashMap - use rustc-hash for std, hashbrown with FxHasher for no_std
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "std")]
pub use rustc_hash::FxHashMap;

#[cfg(not(feature = "std"))]
pub type FxHashMap<K, V> =
    hashbrown::HashMap<K, V, core::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

// ═══════════════════════════════════════════════════════════════════════════════
// IndexMap - use FxHasher for both std and no_std
// ═══════════════════════════════════════════════════════════════════════════════

pub type IndexMap<K, V> =
    indexmap::IndexMap<K, V, core::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

/// Create an empty IndexMap
#[inline]
pub fn index_map_new<K, V>() -> IndexMap<K, V>
where
    K: core::hash::Hash + Eq,
{
    indexmap::IndexMap::with_hasher(Default::default())
}
