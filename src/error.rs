//! Error types for deferred values and the event loop

use std::fmt;
use thiserror::Error;

use crate::value::Value;

/// Engine error kinds, named after their JavaScript counterparts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::enum_variant_names)]
pub enum ErrorKind {
    /// TypeError - wrong type for operation
    TypeError,
}

impl ErrorKind {
    /// The `name` an error object of this kind carries
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::TypeError => "TypeError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Main error type
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// A value raised by a handler or native function
    #[error("Uncaught {0}")]
    Thrown(Value),

    /// Engine-raised error, such as a TypeError
    #[error("{kind}: {message}")]
    RuntimeError { kind: ErrorKind, message: String },

    /// Invalid configuration
    #[error("ConfigError: {0}")]
    ConfigError(String),

    /// Resource limit exceeded while running the event loop
    #[error("ResourceLimitError: {message} (limit {limit})")]
    ResourceLimitError { limit: u64, message: String },
}

impl Error {
    /// Raise an arbitrary value
    pub fn thrown(value: impl Into<Value>) -> Self {
        Error::Thrown(value.into())
    }

    /// Create a TypeError
    pub fn type_error(message: impl Into<String>) -> Self {
        Error::RuntimeError {
            kind: ErrorKind::TypeError,
            message: message.into(),
        }
    }

    /// Create a tick limit exceeded error
    pub fn tick_limit_exceeded(ticks: u64, limit: u64) -> Self {
        Error::ResourceLimitError {
            limit,
            message: format!("Event loop still busy after {} ticks", ticks),
        }
    }

    /// Convert this error into the reason a deferred value is rejected with.
    ///
    /// A thrown value is passed through untouched; engine-raised errors
    /// become `{ name, message }` error objects.
    pub fn into_reason(self) -> Value {
        match self {
            Error::Thrown(value) => value,
            Error::RuntimeError { kind, message } => Value::new_error(kind.name(), &message),
            Error::ConfigError(message) => Value::new_error("ConfigError", &message),
            Error::ResourceLimitError { message, .. } => {
                Value::new_error("ResourceLimitError", &message)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
