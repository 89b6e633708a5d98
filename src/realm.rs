//! Realm: the explicit context every object-model operation runs in.
//!
//! A realm owns the heap, the intrinsic prototypes (rooted for the realm's
//! lifetime), the string dictionary and the host's log sink. There are no
//! global singletons; embedders create as many realms as they need.

use serde::{Deserialize, Serialize};

use crate::error::JsError;
use crate::gc::{DEFAULT_GC_THRESHOLD, GcStats, Guard, Heap};
use crate::object::array::{length_accessor, length_getter};
use crate::object::{ExoticObject, JsObject, JsObjectRef};
use crate::platform::{LogLevel, LogProvider};
use crate::prelude::*;
use crate::string_dict::StringDict;
use crate::value::{JsValue, PropertyKey};

/// Host-tunable realm settings.
///
/// Missing fields take their defaults, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealmOptions {
    /// Net allocations between automatic collections (0 = never collect automatically)
    pub gc_threshold: usize,
    /// Least severe level forwarded to the log provider
    pub log_level: LogLevel,
}

impl Default for RealmOptions {
    fn default() -> Self {
        Self {
            gc_threshold: DEFAULT_GC_THRESHOLD,
            log_level: LogLevel::Warn,
        }
    }
}

impl RealmOptions {
    /// Parse options from a JSON document
    pub fn from_json(source: &str) -> Result<Self, JsError> {
        serde_json::from_str(source)
            .map_err(|e| JsError::config_error(format!("invalid realm options: {}", e)))
    }
}

#[cfg(feature = "std")]
fn default_logger() -> Rc<dyn LogProvider> {
    Rc::new(crate::platform::StdLogProvider)
}

#[cfg(not(feature = "std"))]
fn default_logger() -> Rc<dyn LogProvider> {
    Rc::new(crate::platform::NoOpLogProvider)
}

/// The object-model context
pub struct Realm {
    /// Roots the intrinsics below
    root_guard: Guard<JsObject>,
    /// Object.prototype for all ordinary objects
    pub object_prototype: JsObjectRef,
    /// Array.prototype for all array instances
    pub array_prototype: JsObjectRef,
    /// String dictionary for deduplicating property names
    string_dict: StringDict,
    /// Interned `"length"` key
    length_key: PropertyKey,
    logger: Rc<dyn LogProvider>,
    options: RealmOptions,
    heap: Heap<JsObject>,
}

impl Realm {
    /// Create a realm with default options and the platform's default logger
    pub fn new() -> Self {
        Self::with_options(RealmOptions::default())
    }

    pub fn with_options(options: RealmOptions) -> Self {
        Self::with_logger(options, default_logger())
    }

    /// Create a realm that sends diagnostics to `logger`
    pub fn with_logger(options: RealmOptions, logger: Rc<dyn LogProvider>) -> Self {
        let heap: Heap<JsObject> = Heap::new();
        // Intrinsics are built before the threshold applies
        heap.set_gc_threshold(0);

        let mut string_dict = StringDict::with_common_strings();
        let length_key = string_dict.key("length");

        let root_guard = heap.create_guard();
        let object_prototype = root_guard.alloc();
        let array_prototype = root_guard.alloc();
        array_prototype.borrow_mut().prototype = Some(object_prototype.clone());

        heap.set_gc_threshold(options.gc_threshold);

        Self {
            root_guard,
            object_prototype,
            array_prototype,
            string_dict,
            length_key,
            logger,
            options,
            heap,
        }
    }

    pub fn options(&self) -> &RealmOptions {
        &self.options
    }

    fn log_enabled(&self, level: LogLevel) -> bool {
        level >= self.options.log_level
    }

    fn log(&self, level: LogLevel, message: &str) {
        if self.log_enabled(level) {
            self.logger.write(level, message);
        }
    }

    /// Create a guard for keeping freshly created objects alive
    pub fn create_guard(&self) -> Guard<JsObject> {
        self.heap.create_guard()
    }

    /// Create a PropertyKey, sharing the string allocation for non-index keys
    #[inline]
    pub fn key(&mut self, s: &str) -> PropertyKey {
        self.string_dict.key(s)
    }

    /// Create a plain object with Object.prototype
    pub fn create_object(&self, guard: &Guard<JsObject>) -> JsObjectRef {
        self.create_object_with_prototype(guard, Some(self.object_prototype.clone()))
    }

    /// Create a plain object with an explicit prototype (or none)
    pub fn create_object_with_prototype(
        &self,
        guard: &Guard<JsObject>,
        prototype: Option<JsObjectRef>,
    ) -> JsObjectRef {
        let obj = guard.alloc();
        obj.borrow_mut().prototype = prototype;
        obj
    }

    /// Create an empty array with Array.prototype and its `length` accessor
    pub fn create_array(&self, guard: &Guard<JsObject>) -> JsObjectRef {
        self.create_array_from(guard, Vec::new())
    }

    /// Create an array holding `values` at indices `0..values.len()`
    pub fn create_array_from(&self, guard: &Guard<JsObject>, values: Vec<JsValue>) -> JsObjectRef {
        let arr = guard.alloc();
        {
            let mut obj = arr.borrow_mut();
            obj.exotic = ExoticObject::Array {
                elements: values.into_iter().map(Some).collect(),
            };
            obj.prototype = Some(self.array_prototype.clone());
            obj.define_native_property(self.length_key.clone(), length_accessor());
        }
        arr
    }

    /// Install `prototype` as the prototype of `obj`.
    ///
    /// Fails with [`JsError::PrototypeCycle`] when `obj` is already reachable
    /// from `prototype`'s chain, leaving the old prototype in place.
    pub fn set_prototype(
        &self,
        obj: &JsObjectRef,
        prototype: Option<JsObjectRef>,
    ) -> Result<(), JsError> {
        let mut current = prototype.clone();
        while let Some(candidate) = current {
            if JsObjectRef::ptr_eq(&candidate, obj) {
                if self.log_enabled(LogLevel::Warn) {
                    self.log(
                        LogLevel::Warn,
                        &format!("rejected cyclic prototype for object #{}", obj.id()),
                    );
                }
                return Err(JsError::PrototypeCycle);
            }
            current = candidate.borrow().prototype.clone();
        }
        obj.borrow_mut().prototype = prototype;
        Ok(())
    }

    fn array_receiver(this: &JsValue) -> Result<&JsObjectRef, JsError> {
        match this {
            JsValue::Object(obj) if obj.borrow().is_array() => Ok(obj),
            _ => Err(JsError::type_error("Not an array")),
        }
    }

    /// `this.push(value)`
    pub fn array_push(&self, this: &JsValue, value: JsValue) -> Result<(), JsError> {
        Self::array_receiver(this)?.borrow_mut().push(value)
    }

    /// `this.pop()`
    pub fn array_pop(&self, this: &JsValue) -> Result<JsValue, JsError> {
        Self::array_receiver(this)?.borrow_mut().pop()
    }

    /// `this.shift()`
    pub fn array_shift(&self, this: &JsValue) -> Result<JsValue, JsError> {
        Self::array_receiver(this)?.borrow_mut().shift()
    }

    /// `this.length`, requiring an array receiver
    pub fn array_length(&self, this: &JsValue) -> Result<JsValue, JsError> {
        length_getter(this)
    }

    /// Run garbage collection manually, returning the number of objects reclaimed
    pub fn collect_garbage(&self) -> usize {
        let collected = self.heap.collect();
        if self.log_enabled(LogLevel::Debug) {
            let stats = serde_json::to_string(&self.heap.stats()).unwrap_or_default();
            self.log(
                LogLevel::Debug,
                &format!("gc: collected {} objects {}", collected, stats),
            );
        }
        collected
    }

    /// Get GC statistics
    pub fn gc_stats(&self) -> GcStats {
        self.heap.stats()
    }

    pub fn gc_threshold(&self) -> usize {
        self.options.gc_threshold
    }

    /// Set the GC threshold
    ///
    /// - `0`: Disable threshold-based collection
    /// - `n > 0`: Collect after every `n` net allocations
    pub fn set_gc_threshold(&mut self, threshold: usize) {
        self.options.gc_threshold = threshold;
        self.heap.set_gc_threshold(threshold);
    }

    /// Number of objects rooted by the realm itself
    pub fn intrinsic_count(&self) -> usize {
        self.root_guard.len()
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}
