//! Standard library implementations of platform traits.
//!
//! These implementations are only available when the `std` feature is enabled.

use super::{LogLevel, LogProvider};

/// Log provider using std print macros.
///
/// Writes to stdout for Debug/Info and stderr for Warn/Error.
pub struct StdLogProvider;

impl StdLogProvider {
    /// Create a new StdLogProvider.
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdLogProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl LogProvider for StdLogProvider {
    fn write(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug | LogLevel::Info => {
                println!("[{level}] {message}");
            }
            LogLevel::Warn | LogLevel::Error => {
                eprintln!("[{level}] {message}");
            }
        }
    }
}
