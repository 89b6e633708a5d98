//! Platform abstraction traits for no_std compatibility.
//!
//! The object model never prints on its own; diagnostics go through a
//! [`LogProvider`] chosen by the host.

#[cfg(feature = "std")]
mod std_impl;

#[cfg(feature = "std")]
pub use std_impl::StdLogProvider;

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Severity of a diagnostic message.
///
/// Ordered from most to least verbose, so `level >= threshold` selects what to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Collector activity, allocation statistics
    Debug,
    /// Informational messages
    Info,
    /// Rejected operations the host may want to know about
    Warn,
    /// Failures the host should surface; the object model itself never emits this level
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for handling diagnostic output.
///
/// In std environments, this writes to stdout/stderr.
/// In no_std environments, the host supplies its own sink or uses the no-op one.
pub trait LogProvider {
    /// Write a message at the specified level.
    fn write(&self, level: LogLevel, message: &str);
}

/// A no-op log provider that discards all output.
/// Used as the fallback in no_std environments.
pub struct NoOpLogProvider;

impl LogProvider for NoOpLogProvider {
    fn write(&self, _level: LogLevel, _message: &str) {}
}

/// Log provider that keeps every line in memory.
///
/// Useful for hosts that forward diagnostics in batches, and for tests.
#[derive(Default)]
pub struct MemoryLogProvider {
    lines: RefCell<Vec<(LogLevel, String)>>,
}

impl MemoryLogProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured lines
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.borrow().clone()
    }

    /// Check whether any captured line at `level` contains `needle`
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.lines
            .borrow()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }
}

impl LogProvider for MemoryLogProvider {
    fn write(&self, level: LogLevel, message: &str) {
        self.lines.borrow_mut().push((level, message.to_string()));
    }
}
