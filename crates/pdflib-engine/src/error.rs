//! Engine exceptions

use thiserror::Error;

/// Result type for raw engine calls
pub type EngineResult<T> = std::result::Result<T, EngineException>;

/// A call was made in a scope where it is not allowed.
pub const ERR_WRONG_SCOPE: i32 = 2000;
/// An option list could not be parsed or named an unknown option.
pub const ERR_OPTION: i32 = 1200;
/// The license key was rejected.
pub const ERR_LICENSE: i32 = 1100;
/// A virtual file with the requested name already exists.
pub const ERR_PVF_EXISTS: i32 = 1010;
/// A virtual file is in use by an open handle.
pub const ERR_PVF_LOCKED: i32 = 1011;
/// A file could not be found or read.
pub const ERR_FILE_NOT_FOUND: i32 = 1020;
/// A file is not a valid PDF document.
pub const ERR_CORRUPT_FILE: i32 = 2500;
/// An image could not be loaded.
pub const ERR_IMAGE: i32 = 2400;
/// A handle was unknown or already closed.
pub const ERR_HANDLE: i32 = 2200;
/// A pCOS path could not be resolved.
pub const ERR_PCOS: i32 = 2600;
/// `end_document` was called on a document without pages.
pub const ERR_NO_PAGES: i32 = 2100;

/// The engine's native exception.
///
/// Once raised, the engine's internal state is not guaranteed to be
/// consistent; callers should stop using the engine instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{apiname}: {message} (error {errnum})")]
pub struct EngineException {
    /// Numeric error code.
    pub errnum: i32,
    /// Name of the API call that raised.
    pub apiname: String,
    /// Human-readable reason.
    pub message: String,
}

impl EngineException {
    /// Create a new exception for the given call.
    pub fn new(errnum: i32, apiname: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errnum,
            apiname: apiname.into(),
            message: message.into(),
        }
    }

    /// Whether this is the "document contains no pages" condition raised by
    /// `end_document`.
    pub fn is_no_pages(&self) -> bool {
        self.errnum == ERR_NO_PAGES || self.message.contains("doesn't contain any pages")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_call_and_code() {
        let ex = EngineException::new(
            ERR_WRONG_SCOPE,
            "rect",
            "Function must not be called in 'object' scope",
        );
        assert_eq!(
            ex.to_string(),
            "rect: Function must not be called in 'object' scope (error 2000)"
        );
    }

    #[test]
    fn test_no_pages_recognised_by_code_or_text() {
        assert!(EngineException::new(ERR_NO_PAGES, "end_document", "x").is_no_pages());
        assert!(EngineException::new(
            0,
            "end_document",
            "Generated document doesn't contain any pages"
        )
        .is_no_pages());
        assert!(!EngineException::new(ERR_HANDLE, "close_image", "bad handle").is_no_pages());
    }
}
