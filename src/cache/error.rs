//! Cache error types.

use thiserror::Error;

/// Errors that can occur while building or using a cache facade.
///
/// A missing key is never an error: lookups return `None` (or the caller's
/// default) and batch lookups omit the key.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid or missing construction parameters. Never retried.
    #[error("Invalid cache configuration: {field} - {message}")]
    Configuration { field: String, message: String },

    /// The store could not be reached or answered with a protocol error.
    #[error("Cache backend unavailable during {operation}: {message}")]
    BackendUnavailable {
        operation: &'static str,
        message: String,
    },
}

impl CacheError {
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn backend(operation: &'static str, message: impl ToString) -> Self {
        Self::BackendUnavailable {
            operation,
            message: message.to_string(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}
