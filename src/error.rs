//! Error types for the object model

use thiserror::Error;

use crate::prelude::*;
use crate::value::{JsString, JsValue};

/// Main error type for the object model
#[derive(Debug, Error)]
pub enum JsError {
    #[error("TypeError: {message}")]
    TypeError { message: String },

    /// Installing a prototype would make the prototype chain loop back on itself
    #[error("TypeError: Cyclic __proto__ value")]
    PrototypeCycle,

    /// Host configuration could not be parsed
    #[error("ConfigError: {message}")]
    Config { message: String },
}

impl JsError {
    pub fn type_error(message: impl Into<String>) -> Self {
        JsError::TypeError {
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        JsError::Config {
            message: message.into(),
        }
    }

    /// Error kind as seen by scripts (`e.name`)
    pub fn kind(&self) -> &'static str {
        match self {
            JsError::TypeError { .. } | JsError::PrototypeCycle => "TypeError",
            JsError::Config { .. } => "ConfigError",
        }
    }

    /// Convert the error into the script value handed to a catch handler
    pub fn to_value(&self) -> JsValue {
        JsValue::String(JsString::from(self.to_string()))
    }
}
