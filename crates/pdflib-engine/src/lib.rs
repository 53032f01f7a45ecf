//! Handle-based PDF engine interface
//!
//! This crate describes the low-level, C-style API of a stateful PDF
//! generation/import engine. Resources are identified by opaque integer
//! handles and the engine tracks a single implicit "current scope"
//! (object, document or page) that decides which calls are legal.
//!
//! Nothing here enforces call ordering. That is the job of the safety layer
//! built on top of [`PdfEngine`]; this crate only models the raw surface.
//!
//! [`MemoryEngine`] is an in-process implementation of the interface. It
//! honours the same scope rules, keeps a virtual-file table with locking,
//! inspects imported PDFs with `lopdf`, probes images with `image` and
//! writes a skeleton PDF on `end_document`. Every call is recorded in a
//! [`Journal`] so callers can assert on the exact sequence.
//!
//! ```
//! use pdflib_engine::{MemoryEngine, PdfEngine, Scope};
//!
//! let mut engine = MemoryEngine::new();
//! engine.set_option("errorpolicy=return")?;
//! assert_eq!(engine.begin_document("", "")?, 1);
//! engine.begin_page_ext(595.0, 842.0, "")?;
//! assert_eq!(engine.scope(), Scope::Page);
//! engine.end_page_ext("")?;
//! engine.end_document("")?;
//! assert!(engine.get_buffer()?.starts_with(b"%PDF-"));
//! # Ok::<(), pdflib_engine::EngineException>(())
//! ```

mod error;
mod import;
mod journal;
mod memory;
mod optlist;
mod output;

pub use error::{
    EngineException, EngineResult, ERR_CORRUPT_FILE, ERR_FILE_NOT_FOUND, ERR_HANDLE, ERR_IMAGE,
    ERR_LICENSE, ERR_NO_PAGES, ERR_OPTION, ERR_PCOS, ERR_PVF_EXISTS, ERR_PVF_LOCKED,
    ERR_WRONG_SCOPE,
};
pub use journal::{Journal, JournalEntry};
pub use memory::{MemoryEngine, MemoryEngineBuilder};
pub use optlist::OptionList;

/// Opaque resource handle returned by the engine.
pub type Handle = i32;

/// Returned by handle-producing calls when the error policy is `return`.
pub const INVALID_HANDLE: Handle = -1;

/// The engine's current operating mode.
///
/// Scopes are ordered by nesting depth, so `Scope::Page > Scope::Document`
/// means "the page scope lies inside the document scope".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Scope {
    /// No document is being generated.
    #[default]
    Object = 0,
    /// Between `begin_document` and `end_document`.
    Document = 1,
    /// Between `begin_page_ext` and `end_page_ext`.
    Page = 2,
}

impl Scope {
    /// Nesting depth of the scope (object=0, document=1, page=2).
    pub fn depth(self) -> u8 {
        self as u8
    }

    /// Keyword used by the engine's `scope` option.
    pub fn name(self) -> &'static str {
        match self {
            Scope::Object => "object",
            Scope::Document => "document",
            Scope::Page => "page",
        }
    }

    /// Parse the keyword reported by the engine's `scope` option.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "object" => Some(Scope::Object),
            "document" => Some(Scope::Document),
            "page" => Some(Scope::Page),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How the engine reports failures of calls that have a failure return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Raise an [`EngineException`].
    #[default]
    Exception,
    /// Return [`INVALID_HANDLE`] (or `-1`) and keep the reason for `get_errmsg`.
    Return,
}

impl ErrorPolicy {
    /// Parse the value of the `errorpolicy` option.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "exception" => Some(ErrorPolicy::Exception),
            "return" => Some(ErrorPolicy::Return),
            _ => None,
        }
    }

    /// Keyword used by the `errorpolicy` option.
    pub fn keyword(self) -> &'static str {
        match self {
            ErrorPolicy::Exception => "exception",
            ErrorPolicy::Return => "return",
        }
    }
}

/// The raw engine API.
///
/// Calls that produce a handle (`open_pdi_document`, `open_pdi_page`,
/// `load_image`) and `begin_document`/`delete_pvf` follow the error policy:
/// with [`ErrorPolicy::Return`] they yield `Ok(-1)` and record the reason.
/// All other calls raise on failure regardless of the policy. `create_pvf`
/// in particular always raises.
///
/// Option lists use the `key=value key={braced value}` syntax understood by
/// [`OptionList`].
pub trait PdfEngine {
    /// Apply an option list (`errorpolicy`, `license`, ...).
    fn set_option(&mut self, optlist: &str) -> EngineResult<()>;

    /// Read an engine option such as `scope` or `errorpolicy`.
    fn get_option(&self, keyword: &str) -> Option<String>;

    /// The engine's current scope.
    fn scope(&self) -> Scope;

    /// Text of the most recent error condition.
    fn get_errmsg(&self) -> String;

    /// Number of the most recent error condition, 0 if none.
    fn get_errnum(&self) -> i32;

    /// Begin a document scope. An empty filename generates into memory.
    /// Returns 1 on success, -1 on failure.
    fn begin_document(&mut self, filename: &str, optlist: &str) -> EngineResult<i32>;

    /// End the document scope and produce the output.
    fn end_document(&mut self, optlist: &str) -> EngineResult<()>;

    /// Fetch (and drain) the in-memory output buffer.
    fn get_buffer(&mut self) -> EngineResult<Vec<u8>>;

    /// Begin a page scope with the given dimensions in points.
    fn begin_page_ext(&mut self, width: f64, height: f64, optlist: &str) -> EngineResult<()>;

    /// End the current page scope.
    fn end_page_ext(&mut self, optlist: &str) -> EngineResult<()>;

    /// Register a named in-memory file.
    fn create_pvf(&mut self, filename: &str, data: &[u8], optlist: &str) -> EngineResult<()>;

    /// Delete a virtual file. Returns -1 if the file is locked, 1 otherwise.
    fn delete_pvf(&mut self, filename: &str) -> EngineResult<i32>;

    /// Open a PDF for import from a path or virtual file name.
    fn open_pdi_document(&mut self, filename: &str, optlist: &str) -> EngineResult<Handle>;

    /// Close an imported document.
    fn close_pdi_document(&mut self, document: Handle) -> EngineResult<()>;

    /// Open a page (1-based) of an imported document.
    fn open_pdi_page(&mut self, document: Handle, page_number: i32, optlist: &str)
        -> EngineResult<Handle>;

    /// Close an imported page.
    fn close_pdi_page(&mut self, page: Handle) -> EngineResult<()>;

    /// Place an imported page on the current page.
    fn fit_pdi_page(&mut self, page: Handle, x: f64, y: f64, optlist: &str) -> EngineResult<()>;

    /// Load an image from a path or virtual file name.
    fn load_image(&mut self, imagetype: &str, filename: &str, optlist: &str)
        -> EngineResult<Handle>;

    /// Close an image.
    fn close_image(&mut self, image: Handle) -> EngineResult<()>;

    /// Place an image on the current page.
    fn fit_image(&mut self, image: Handle, x: f64, y: f64, optlist: &str) -> EngineResult<()>;

    /// Query a numeric property of an imported document by pCOS path.
    fn pcos_get_number(&mut self, document: Handle, path: &str) -> EngineResult<f64>;

    /// Set a document info field (Title, Author, Creator, ...).
    fn set_info(&mut self, key: &str, value: &str) -> EngineResult<()>;

    /// Set fill and/or stroke colour.
    #[allow(clippy::too_many_arguments)]
    fn setcolor(
        &mut self,
        fstype: &str,
        colorspace: &str,
        c1: f64,
        c2: f64,
        c3: f64,
        c4: f64,
    ) -> EngineResult<()>;

    /// Append a rectangle to the current path.
    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> EngineResult<()>;

    /// Stroke and clear the current path.
    fn stroke(&mut self) -> EngineResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_ordering() {
        assert!(Scope::Object < Scope::Document);
        assert!(Scope::Document < Scope::Page);
        assert_eq!(Scope::Page.depth(), 2);
    }

    #[test]
    fn test_scope_names_round_trip() {
        for scope in [Scope::Object, Scope::Document, Scope::Page] {
            assert_eq!(Scope::from_name(scope.name()), Some(scope));
        }
        assert_eq!(Scope::from_name("glyph"), None);
    }

    #[test]
    fn test_error_policy_keywords() {
        assert_eq!(ErrorPolicy::from_keyword("return"), Some(ErrorPolicy::Return));
        assert_eq!(ErrorPolicy::from_keyword("exception"), Some(ErrorPolicy::Exception));
        assert_eq!(ErrorPolicy::from_keyword("legacy"), None);
        assert_eq!(ErrorPolicy::default(), ErrorPolicy::Exception);
    }
}
