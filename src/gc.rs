//! Mark-and-sweep garbage collection system.
//!
//! Objects live in fixed-size chunks and are handed out as `Gc<T>` handles.
//! A collection treats two kinds of objects as roots:
//!
//! - objects held by a [`Guard`];
//! - objects with more handles than the heap itself accounts for, i.e. handles
//!   owned by Rust code outside the heap.
//!
//! The second set is computed by tracing every live object once and counting
//! how many of each object's handles are stored inside other heap objects.
//! Everything reachable from the roots through [`Traceable::trace`] survives;
//! unreachable objects (including cycles) are reset and pooled for reuse.

use serde::Serialize;

use crate::prelude::*;

// ============================================================================
// ChunkBitmask - 256-bit bitmask for marking objects within a chunk
// ============================================================================

/// 256-bit bitmask for marking objects within a chunk.
/// Each bit corresponds to an index in the chunk (0-255).
#[derive(Clone, Copy, Default)]
struct ChunkBitmask {
    /// 4 × u64 = 256 bits
    bits: [u64; 4],
}

impl ChunkBitmask {
    #[inline]
    fn set(&mut self, index: usize) {
        debug_assert!(index < CHUNK_CAPACITY);
        if let Some(word) = self.bits.get_mut(index >> 6) {
            *word |= 1 << (index & 63);
        }
    }

    #[inline]
    fn get(&self, index: usize) -> bool {
        debug_assert!(index < CHUNK_CAPACITY);
        self.bits
            .get(index >> 6)
            .is_some_and(|word| word & (1 << (index & 63)) != 0)
    }

    #[inline]
    fn clear(&mut self) {
        self.bits = [0; 4];
    }

    /// Iterate over unmarked indices (bits that are 0) up to `len`
    #[inline]
    fn iter_unmarked(&self, len: usize) -> impl Iterator<Item = usize> + '_ {
        UnmarkedIter {
            bitmask: self,
            len,
            current_word: 0,
            current_bits: !self.bits[0],
            base_index: 0,
        }
    }
}

/// Iterator over unmarked (zero) bits in a ChunkBitmask
struct UnmarkedIter<'a> {
    bitmask: &'a ChunkBitmask,
    len: usize,
    current_word: usize,
    current_bits: u64, // Inverted bits (1 = unmarked)
    base_index: usize,
}

impl Iterator for UnmarkedIter<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        loop {
            if self.current_bits != 0 {
                let bit_pos = self.current_bits.trailing_zeros() as usize;
                let index = self.base_index + bit_pos;
                self.current_bits &= self.current_bits - 1;

                if index < self.len {
                    return Some(index);
                }
            }

            self.current_word += 1;
            self.base_index = self.current_word << 6;
            if self.base_index >= self.len {
                return None;
            }
            self.current_bits = !*self.bitmask.bits.get(self.current_word)?;
        }
    }
}

// ============================================================================
// Gc - smart pointer to GC-managed object
// ============================================================================

/// A smart pointer to a GC-managed object.
///
/// Works like `Rc<T>` - cloning increments the handle count, dropping decrements it.
/// An object whose handle count drops to zero is reset and pooled right away;
/// objects kept alive only by unreachable cycles are reclaimed by [`Heap::collect`].
pub struct Gc<T: Default + Reset + Traceable> {
    /// Unique object ID (slot index, stable across reuse)
    id: usize,

    /// Pointer to the GcBox for fast access
    ptr: NonNull<GcBox<T>>,

    /// Weak reference to space - used to check if space is still alive before accessing ptr
    space: Weak<RefCell<Space<T>>>,
}

impl<T: Default + Reset + Traceable> PartialEq for Gc<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: Default + Reset + Traceable> Hash for Gc<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T: Default + Reset + Traceable> Eq for Gc<T> {}

impl<T: Default + Reset + Traceable> Gc<T> {
    /// Whether the heap that owns this object still exists
    #[inline]
    pub fn is_live(&self) -> bool {
        self.space.strong_count() > 0
    }

    #[allow(clippy::panic)]
    fn assert_live(&self) {
        if !self.is_live() {
            panic!("GC error: object #{} used after its heap was dropped", self.id);
        }
    }

    /// Borrow the inner data immutably.
    ///
    /// Panics if the owning heap has been dropped: the object's memory is
    /// gone and the handle is dangling.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.assert_live();
        unsafe { self.ptr.as_ref().data.borrow() }
    }

    /// Borrow the inner data mutably.
    ///
    /// Panics if the owning heap has been dropped.
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.assert_live();
        unsafe { self.ptr.as_ref().data.borrow_mut() }
    }

    /// Borrow the inner data if the heap is alive and the object is not
    /// mutably borrowed elsewhere
    pub fn try_borrow(&self) -> Option<Ref<'_, T>> {
        if !self.is_live() {
            return None;
        }
        unsafe { self.ptr.as_ref().data.try_borrow().ok() }
    }

    /// Get the object's unique ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Check if two Gc pointers point to the same object
    pub fn ptr_eq(a: &Gc<T>, b: &Gc<T>) -> bool {
        a.id == b.id
    }

    /// Create a copy of this Gc without incrementing the handle count.
    /// Used during tracing, where visiting must not change liveness.
    pub fn copy_ref(&self) -> GcPtr<T> {
        GcPtr {
            id: self.id,
            ptr: self.ptr,
        }
    }
}

// ============================================================================
// GcPtr - a Copy pointer without Drop (for tracing)
// ============================================================================

/// A raw pointer to a GC-managed object. Copy and no Drop.
/// Handed to trace visitors so they can report edges without owning them.
pub struct GcPtr<T: Default + Reset + Traceable> {
    pub(crate) id: usize,
    pub(crate) ptr: NonNull<GcBox<T>>,
}

impl<T: Default + Reset + Traceable> Copy for GcPtr<T> {}

impl<T: Default + Reset + Traceable> Clone for GcPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Default + Reset + Traceable> GcPtr<T> {
    /// Get the object's unique ID
    pub fn id(&self) -> usize {
        self.id
    }
}

impl<T: Default + Reset + Traceable> Clone for Gc<T> {
    fn clone(&self) -> Self {
        if self.space.upgrade().is_some() {
            let gc_box = unsafe { self.ptr.as_ref() };
            if !gc_box.pooled.get() {
                gc_box.ref_count.set(gc_box.ref_count.get() + 1);
            }
        }
        Self {
            id: self.id,
            ptr: self.ptr,
            space: self.space.clone(),
        }
    }
}

impl<T: Default + Reset + Traceable> Drop for Gc<T> {
    fn drop(&mut self) {
        // The GcBox memory is freed together with the space; a dead space
        // means ptr is dangling.
        let Some(space_rc) = self.space.upgrade() else {
            return;
        };
        release(&space_rc, self.ptr);
    }
}

impl<T: Default + Reset + Traceable> fmt::Debug for Gc<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gc").field("id", &self.id).finish()
    }
}

/// Drop one handle to `ptr`, pooling the object once no handle remains.
fn release<T: Default + Reset + Traceable>(
    space_rc: &Rc<RefCell<Space<T>>>,
    ptr: NonNull<GcBox<T>>,
) {
    let gc_box = unsafe { ptr.as_ref() };
    if gc_box.pooled.get() {
        return;
    }

    let count = gc_box.ref_count.get().saturating_sub(1);
    gc_box.ref_count.set(count);
    if count > 0 {
        return;
    }

    // While a collection is running the space is borrowed; sweep pools the
    // object itself in that case.
    if let Ok(mut space) = space_rc.try_borrow_mut() {
        if let Ok(mut data) = gc_box.data.try_borrow_mut() {
            data.reset();
        }
        space.pool_object(ptr);
    }
}

// ============================================================================
// Traceable trait - for discovering object references
// ============================================================================

/// Trait for types that can be traced by the garbage collector.
///
/// Implementations must be total: every `Gc<Self>` stored in the object has to
/// be reported. A missed edge makes the collector treat the target as held from
/// outside the heap, which leaks it (and everything it references) for as
/// long as the edge exists.
pub trait Traceable: Sized + Default + Reset {
    /// Visit all `Gc<Self>` references held by this object.
    ///
    /// Use `gc.copy_ref()` to report an edge without touching its handle count.
    fn trace<F: FnMut(GcPtr<Self>)>(&self, visitor: F);
}

// ============================================================================
// Reset trait - for pooling objects
// ============================================================================

/// Trait for types that can be reset to a clean state for pooling.
///
/// When an object is collected, it's reset and placed in a pool for reuse.
/// Resetting must drop every `Gc` the object holds.
pub trait Reset: Default {
    /// Reset object to clean state (equivalent to Default but in-place)
    fn reset(&mut self);
}

// ============================================================================
// GcBox - the internal storage for GC-managed objects
// ============================================================================

/// Internal storage for a GC-managed object.
pub struct GcBox<T: Default + Reset + Traceable> {
    /// Index in chunks (chunk_idx * CHUNK_CAPACITY + index_in_chunk).
    index: usize,

    /// The actual data
    data: RefCell<T>,

    /// Handle count: `Gc` pointers plus guard entries pointing to this object
    ref_count: Cell<usize>,

    /// Handles found inside other live objects during the current collection
    traced_refs: Cell<usize>,

    /// Whether this object is in the pool (dead)
    pooled: Cell<bool>,
}

impl<T: Default + Reset + Traceable> GcBox<T> {
    fn new(index: usize, data: T) -> Self {
        Self {
            index,
            data: RefCell::new(data),
            ref_count: Cell::new(0),
            traced_refs: Cell::new(0),
            pooled: Cell::new(false),
        }
    }

    #[inline]
    fn is_live(&self) -> bool {
        !self.pooled.get()
    }
}

// ============================================================================
// Space - the internal memory arena
// ============================================================================

/// Internal memory arena that manages all allocations.
/// Not exposed directly - accessed through `Heap<T>`.
struct Space<T: Default + Reset + Traceable> {
    /// Chunks of allocated objects. Each chunk has fixed capacity (CHUNK_CAPACITY).
    /// Inner vecs never reallocate, ensuring stable pointers.
    chunks: Vec<Vec<GcBox<T>>>,

    /// Free list of pooled object pointers
    free_list: Vec<NonNull<GcBox<T>>>,

    /// Per-chunk mark bitmasks
    marked_chunks: Vec<ChunkBitmask>,

    /// Persistent mark stack, reused between collections
    mark_stack: Vec<NonNull<GcBox<T>>>,

    /// Persistent sweep buffer, reused between collections
    sweep_buffer: Vec<NonNull<GcBox<T>>>,

    /// Pool of reusable guard storage (Vec capacity is preserved for reuse)
    guard_pool: Vec<Vec<NonNull<GcBox<T>>>>,

    /// Net allocations since the last collection
    net_allocs: isize,

    /// Threshold for triggering collection (0 = never auto-collect)
    gc_threshold: isize,

    /// Number of completed collections
    collections: usize,

    /// Objects reclaimed by the most recent collection
    last_collected: usize,

    /// Weak self-reference for Gc pointers
    self_weak: Weak<RefCell<Space<T>>>,
}

/// Default threshold: collect after this many net allocations
pub const DEFAULT_GC_THRESHOLD: usize = 100;

/// Chunk capacity: objects per chunk, matching ChunkBitmask size
const CHUNK_CAPACITY: usize = 256;

impl<T: Default + Reset + Traceable> Space<T> {
    fn new() -> Self {
        Self {
            chunks: Vec::new(),
            free_list: Vec::new(),
            marked_chunks: Vec::new(),
            mark_stack: Vec::new(),
            sweep_buffer: Vec::new(),
            guard_pool: Vec::new(),
            net_allocs: 0,
            gc_threshold: DEFAULT_GC_THRESHOLD as isize,
            collections: 0,
            last_collected: 0,
            self_weak: Weak::new(),
        }
    }

    fn set_self_weak(&mut self, weak: Weak<RefCell<Space<T>>>) {
        self.self_weak = weak;
    }

    /// Create a new guard, reusing pooled guard storage when available.
    fn create_guard(&mut self) -> Guard<T> {
        let guarded = self.guard_pool.pop().unwrap_or_default();
        Guard {
            space: self.self_weak.clone(),
            guarded: RefCell::new(guarded),
        }
    }

    fn return_guard_to_pool(&mut self, mut guarded: Vec<NonNull<GcBox<T>>>) {
        // Keep max 16 guards in pool to bound memory usage
        if self.guard_pool.len() < 16 {
            guarded.clear();
            self.guard_pool.push(guarded);
        }
    }

    /// Allocate a new object (starts with ref_count = 1 for the returned Gc)
    fn alloc_internal(&mut self) -> Gc<T> {
        let ptr = match self.free_list.pop() {
            Some(ptr) => {
                let gc_box = unsafe { ptr.as_ref() };
                gc_box.data.borrow_mut().reset();
                gc_box.pooled.set(false);
                ptr
            }
            None => self.push_new_box(),
        };

        let gc_box = unsafe { ptr.as_ref() };
        // The fresh object must count as held before a threshold collection runs.
        gc_box.ref_count.set(1);
        let index = gc_box.index;

        self.net_allocs += 1;
        if self.gc_threshold > 0 && self.net_allocs >= self.gc_threshold {
            self.collect();
        }

        Gc {
            id: index,
            ptr,
            space: self.self_weak.clone(),
        }
    }

    fn push_new_box(&mut self) -> NonNull<GcBox<T>> {
        if self
            .chunks
            .last()
            .is_none_or(|chunk| chunk.len() >= CHUNK_CAPACITY)
        {
            self.chunks.push(Vec::with_capacity(CHUNK_CAPACITY));
            self.marked_chunks.push(ChunkBitmask::default());
        }

        let chunk_idx = self.chunks.len().saturating_sub(1);
        let Some(chunk) = self.chunks.last_mut() else {
            #[allow(clippy::panic)]
            {
                panic!("GC internal error: no chunk after creation")
            }
        };

        let index = chunk_idx * CHUNK_CAPACITY + chunk.len();
        chunk.push(GcBox::new(index, T::default()));

        // The chunk was created with CHUNK_CAPACITY, so the push above never reallocates
        match chunk.last() {
            Some(b) => NonNull::from(b),
            None => {
                #[allow(clippy::panic)]
                {
                    panic!("GC internal error: chunk empty after push")
                }
            }
        }
    }

    /// Move an object to the pool.
    /// reset() must have been called already so the object holds no handles.
    fn pool_object(&mut self, ptr: NonNull<GcBox<T>>) {
        let gc_box = unsafe { ptr.as_ref() };
        if gc_box.pooled.get() {
            return;
        }
        self.net_allocs -= 1;
        gc_box.pooled.set(true);
        self.free_list.push(ptr);
    }

    fn live_boxes(&self) -> impl Iterator<Item = &GcBox<T>> {
        self.chunks
            .iter()
            .flat_map(|chunk| chunk.iter())
            .filter(|gc_box| gc_box.is_live())
    }

    /// Count, for every live object, the handles stored inside other live objects.
    fn count_traced_refs(&self) {
        for gc_box in self.live_boxes() {
            gc_box.traced_refs.set(0);
        }
        for gc_box in self.live_boxes() {
            // An object borrowed mutably by the mutator cannot be traced; its
            // children then look externally held and become roots themselves.
            let Ok(data) = gc_box.data.try_borrow() else {
                continue;
            };
            data.trace(|child: GcPtr<T>| {
                let child_box = unsafe { child.ptr.as_ref() };
                if child_box.is_live() {
                    child_box.traced_refs.set(child_box.traced_refs.get() + 1);
                }
            });
        }
    }

    /// Mark phase: trace from roots to find all reachable objects
    fn mark(&mut self) {
        for bitmask in &mut self.marked_chunks {
            bitmask.clear();
        }

        self.count_traced_refs();

        let mut stack = mem::take(&mut self.mark_stack);
        stack.clear();

        // Roots: guarded objects and handles held outside the heap. Guards own
        // a handle each, so both show up as untraced handles.
        for gc_box in self.live_boxes() {
            if gc_box.ref_count.get() > gc_box.traced_refs.get() {
                stack.push(NonNull::from(gc_box));
            }
        }

        // Iterative traversal, deep chains do not recurse
        while let Some(ptr) = stack.pop() {
            let gc_box = unsafe { ptr.as_ref() };
            let chunk_idx = gc_box.index / CHUNK_CAPACITY;
            let index_in_chunk = gc_box.index % CHUNK_CAPACITY;

            let Some(bitmask) = self.marked_chunks.get_mut(chunk_idx) else {
                continue;
            };
            if bitmask.get(index_in_chunk) {
                continue;
            }
            bitmask.set(index_in_chunk);

            let Ok(data) = gc_box.data.try_borrow() else {
                continue;
            };
            data.trace(|child: GcPtr<T>| {
                let child_box = unsafe { child.ptr.as_ref() };
                if child_box.is_live() {
                    stack.push(child.ptr);
                }
            });
        }

        self.mark_stack = stack;
    }

    /// Sweep phase: collect all unmarked objects.
    /// Returns number of objects collected.
    fn sweep(&mut self) -> usize {
        let mut unmarked = mem::take(&mut self.sweep_buffer);
        unmarked.clear();

        // Reset every unmarked object before pooling any of them: resetting
        // drops handles into other unmarked objects, which is what breaks cycles.
        for (chunk, bitmask) in self.chunks.iter().zip(self.marked_chunks.iter()) {
            for index_in_chunk in bitmask.iter_unmarked(chunk.len()) {
                let Some(gc_box) = chunk.get(index_in_chunk) else {
                    continue;
                };
                if gc_box.is_live() {
                    if let Ok(mut data) = gc_box.data.try_borrow_mut() {
                        data.reset();
                    }
                    unmarked.push(NonNull::from(gc_box));
                }
            }
        }

        let mut collected = 0;
        for ptr in &unmarked {
            let gc_box = unsafe { ptr.as_ref() };
            if gc_box.ref_count.get() == 0 {
                self.pool_object(*ptr);
                collected += 1;
            }
        }

        unmarked.clear();
        self.sweep_buffer = unmarked;

        collected
    }

    fn collect(&mut self) -> usize {
        self.mark();
        let collected = self.sweep();
        self.net_allocs = 0;
        self.collections += 1;
        self.last_collected = collected;
        collected
    }

    fn stats(&self) -> GcStats {
        let total_objects: usize = self.chunks.iter().map(|c| c.len()).sum();

        GcStats {
            total_objects,
            pooled_objects: self.free_list.len(),
            live_objects: total_objects - self.free_list.len(),
            collections: self.collections,
            last_collected: self.last_collected,
        }
    }

    fn set_gc_threshold(&mut self, threshold: usize) {
        self.gc_threshold = threshold as isize;
    }
}

impl<T: Default + Reset + Traceable> Drop for Space<T> {
    fn drop(&mut self) {
        // Any Gc dropped while the chunks are torn down sees pooled=true and
        // skips the about-to-be-freed GcBox.
        for chunk in &self.chunks {
            for gc_box in chunk {
                gc_box.pooled.set(true);
            }
        }
    }
}

// ============================================================================
// Heap - the public wrapper
// ============================================================================

/// A wrapper around the GC space that provides the public API.
pub struct Heap<T: Default + Reset + Traceable> {
    inner: Rc<RefCell<Space<T>>>,
}

impl<T: Default + Reset + Traceable> Heap<T> {
    /// Create a new heap
    pub fn new() -> Self {
        let inner = Rc::new(RefCell::new(Space::new()));
        inner.borrow_mut().set_self_weak(Rc::downgrade(&inner));
        Self { inner }
    }

    /// Create a new guard for allocating objects
    pub fn create_guard(&self) -> Guard<T> {
        self.inner.borrow_mut().create_guard()
    }

    /// Get statistics
    pub fn stats(&self) -> GcStats {
        self.inner.borrow().stats()
    }

    /// Force a garbage collection cycle, returning the number of objects reclaimed
    pub fn collect(&self) -> usize {
        self.inner.borrow_mut().collect()
    }

    /// Set the GC threshold (0 = disable automatic collection)
    pub fn set_gc_threshold(&self, threshold: usize) {
        self.inner.borrow_mut().set_gc_threshold(threshold);
    }
}

impl<T: Default + Reset + Traceable> Default for Heap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default + Reset + Traceable> Clone for Heap<T> {
    fn clone(&self) -> Self {
        Heap {
            inner: self.inner.clone(),
        }
    }
}

// ============================================================================
// Guard - root anchor for objects
// ============================================================================

/// A root anchor that keeps objects alive.
///
/// Objects allocated through or added to a guard survive collections until
/// they are unguarded or the guard is dropped. Guard storage is pooled by the
/// heap and reused.
pub struct Guard<T: Default + Reset + Traceable> {
    space: Weak<RefCell<Space<T>>>,
    /// Each entry owns one handle count on its object
    guarded: RefCell<Vec<NonNull<GcBox<T>>>>,
}

impl<T: Default + Reset + Traceable> Guard<T> {
    /// Allocate a new object and add it to this guard's roots.
    ///
    /// The object is `T::default()`: fully initialized before anything can
    /// reach it.
    ///
    /// # Panics
    /// Panics if the Heap has been dropped while the guard is still alive.
    pub fn alloc(&self) -> Gc<T> {
        let Some(space) = self.space.upgrade() else {
            #[allow(clippy::panic)]
            {
                panic!("GC error: Heap dropped while guard is still alive")
            }
        };
        let result = space.borrow_mut().alloc_internal();
        self.push(result.ptr);
        result
    }

    /// Add an existing object to this guard's roots.
    pub fn guard(&self, obj: &Gc<T>) {
        if self.space.upgrade().is_some() {
            let gc_box = unsafe { obj.ptr.as_ref() };
            if gc_box.is_live() {
                self.push(obj.ptr);
            }
        }
    }

    fn push(&self, ptr: NonNull<GcBox<T>>) {
        let gc_box = unsafe { ptr.as_ref() };
        gc_box.ref_count.set(gc_box.ref_count.get() + 1);
        self.guarded.borrow_mut().push(ptr);
    }

    /// Remove an object from this guard's roots.
    /// Returns true if the object was found and removed.
    pub fn unguard(&self, obj: &Gc<T>) -> bool {
        let removed = {
            let mut guarded = self.guarded.borrow_mut();
            guarded
                .iter()
                .position(|p| *p == obj.ptr)
                .map(|pos| guarded.swap_remove(pos))
        };
        match removed {
            Some(ptr) => {
                if let Some(space) = self.space.upgrade() {
                    release(&space, ptr);
                }
                true
            }
            None => false,
        }
    }

    /// Clear all guarded objects
    pub fn clear(&self) {
        let released: Vec<_> = self.guarded.borrow_mut().drain(..).collect();
        if let Some(space) = self.space.upgrade() {
            for ptr in released {
                release(&space, ptr);
            }
        }
    }

    /// Get the number of guarded objects
    pub fn len(&self) -> usize {
        self.guarded.borrow().len()
    }

    /// Check if this guard has no objects
    pub fn is_empty(&self) -> bool {
        self.guarded.borrow().is_empty()
    }
}

impl<T: Default + Reset + Traceable> Drop for Guard<T> {
    fn drop(&mut self) {
        let Some(space) = self.space.upgrade() else {
            return;
        };
        let mut guarded = mem::take(self.guarded.get_mut());
        for ptr in guarded.drain(..) {
            release(&space, ptr);
        }
        if let Ok(mut space) = space.try_borrow_mut() {
            space.return_guard_to_pool(guarded);
        }
    }
}

// ============================================================================
// GcStats - statistics about the GC
// ============================================================================

/// Statistics about the garbage collector
#[derive(Debug, Clone, Serialize)]
pub struct GcStats {
    /// Total number of GcBox slots (including pooled)
    pub total_objects: usize,
    /// Number of objects in the pool (available for reuse)
    pub pooled_objects: usize,
    /// Number of live objects
    pub live_objects: usize,
    /// Completed collections since the heap was created
    pub collections: usize,
    /// Objects reclaimed by the most recent collection
    pub last_collected: usize,
}

// ============================================================================
// Tests
// ============================================================================
