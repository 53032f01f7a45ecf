//! Error types for pdflib-scope

use pdflib_engine::{EngineException, Scope};
use thiserror::Error;

/// Result type for pdflib-scope operations
pub type Result<T> = std::result::Result<T, ScopeError>;

/// Error types for scope and resource operations
#[derive(Error, Debug)]
pub enum ScopeError {
    /// Empty data passed where content is required
    #[error("Cannot create empty {what}!")]
    EmptyInput { what: &'static str },

    /// A second exclusive child was requested while one is still active
    #[error("A {scope} is already being edited! There can be only one.")]
    AlreadyActive { scope: Scope },

    /// The engine returned no handle for an open or load operation
    #[error("{context} {message}")]
    OpenFailed { context: String, message: String },

    /// The engine rejected a license key
    #[error("Invalid license key: {message}")]
    LicenseInvalid { message: String },

    /// The engine raised its native exception; the owning root object is unusable
    #[error("Unexpected engine failure, root object is no longer usable: {0}")]
    EngineUnexpected(EngineException),

    /// An operation was attempted outside the scope it requires
    #[error("{operation} requires {required} scope, current scope is {current}")]
    WrongScope {
        operation: &'static str,
        required: Scope,
        current: Scope,
    },

    /// The object was already closed
    #[error("{0} is already closed")]
    Closed(&'static str),

    /// A property query on an imported document failed
    #[error("Failed to query '{key}': {message}")]
    QueryFailed { key: String, message: String },
}

impl ScopeError {
    /// Whether the error leaves the owning root object unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScopeError::EngineUnexpected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_failed_prefixes_context() {
        let err = ScopeError::OpenFailed {
            context: "Cannot open PDI document a.pdf!".to_string(),
            message: "Couldn't open file 'a.pdf' for reading".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot open PDI document a.pdf! Couldn't open file 'a.pdf' for reading"
        );
    }

    #[test]
    fn test_empty_input_message() {
        let err = ScopeError::EmptyInput {
            what: "virtual file",
        };
        assert_eq!(err.to_string(), "Cannot create empty virtual file!");
    }

    #[test]
    fn test_only_engine_failures_are_fatal() {
        let fatal = ScopeError::EngineUnexpected(EngineException::new(1010, "create_pvf", "x"));
        assert!(fatal.is_fatal());
        assert!(!ScopeError::AlreadyActive {
            scope: Scope::Page
        }
        .is_fatal());
    }

    #[test]
    fn test_wrong_scope_message() {
        let err = ScopeError::WrongScope {
            operation: "stroke",
            required: Scope::Page,
            current: Scope::Document,
        };
        assert_eq!(
            err.to_string(),
            "stroke requires page scope, current scope is document"
        );
    }
}
