//! Object scope: the root of every wrapper tree

use crate::config::RootConfig;
use crate::document::Document;
use crate::error::{Result, ScopeError};
use crate::lib_object::{impl_lib_object, ScopedObject};
use crate::pdi::PdiDocument;
use crate::session::{ScopeState, Session, SharedSession};
use crate::version;
use crate::virtual_file::VirtualFile;
use pdflib_engine::{PdfEngine, Scope};
use tracing::{debug, warn};

/// Option list that applies `key` as the engine license.
pub(crate) fn license_option(key: &str) -> String {
    format!("license={{{key}}}")
}

/// Owner of one engine instance and of everything created through it.
///
/// At most one [`Document`] is active at a time. Closing or dropping the
/// root object finishes that document, which in turn ends its page and
/// closes its images and imported pages.
///
/// # Example
///
/// ```
/// use pdflib_engine::MemoryEngine;
/// use pdflib_scope::RootObject;
///
/// let root = RootObject::new(Box::new(MemoryEngine::new()))?;
/// let file = root.create_virtual_file(b"%PDF-1.4 not really", Some("f"))?;
/// assert_eq!(file.name(), "f");
///
/// let document = root.create_document_with_version(16, "")?;
/// assert!(root.create_document("", "").is_err());
/// document.finish(false, "")?;
/// assert!(root.get_document().is_some());
/// # Ok::<(), pdflib_scope::ScopeError>(())
/// ```
pub struct RootObject {
    session: SharedSession,
    state: ScopeState,
}

impl RootObject {
    /// Take ownership of `engine` with default settings.
    pub fn new(engine: Box<dyn PdfEngine>) -> Result<Self> {
        Self::with_config(engine, RootConfig::default())
    }

    /// Take ownership of `engine`.
    ///
    /// Switches the engine to the `return` error policy and applies the
    /// configured license key. A rejected key is logged and the root object
    /// continues unlicensed.
    pub fn with_config(engine: Box<dyn PdfEngine>, config: RootConfig) -> Result<Self> {
        let license_key = config.license_key.clone();
        let mut session = Session::new(engine, config);
        session
            .set_engine_option("errorpolicy=return")
            .map_err(ScopeError::EngineUnexpected)?;

        if let Some(key) = license_key.as_deref().filter(|key| !key.is_empty()) {
            if let Err(exception) = session.set_engine_option(&license_option(key)) {
                let err = ScopeError::LicenseInvalid {
                    message: exception.message,
                };
                warn!("{err}; continuing unlicensed");
            }
        }

        debug!("created root object");
        Ok(Self {
            session: session.into_shared(),
            state: ScopeState::Open,
        })
    }

    fn check_open(&self) -> Result<()> {
        match self.state {
            ScopeState::Open => Ok(()),
            _ => Err(ScopeError::Closed("Root object")),
        }
    }

    /// Register `data` with the engine under a fresh name.
    ///
    /// The name is `prefix` if free, otherwise the first free one of
    /// `prefix.1`, `prefix.2`, ... Without a prefix the configured default
    /// (`pvf`) is used.
    pub fn create_virtual_file(&self, data: &[u8], prefix: Option<&str>) -> Result<VirtualFile> {
        self.check_open()?;
        let name = self.session.borrow_mut().create_virtual_file(data, prefix)?;
        Ok(VirtualFile::new(self.session.clone(), name))
    }

    /// Names of all virtual files currently registered, sorted.
    pub fn virtual_file_names(&self) -> Vec<String> {
        self.session.borrow().virtual_file_names()
    }

    /// Whether `name` is currently registered as a virtual file.
    pub fn has_virtual_file(&self, name: &str) -> bool {
        self.session.borrow().is_virtual_file_registered(name)
    }

    /// Open a PDF for import from a path or virtual file name.
    pub fn open_pdi_document(
        &self,
        source: impl AsRef<str>,
        options: &str,
    ) -> Result<PdiDocument> {
        self.check_open()?;
        let id = self
            .session
            .borrow_mut()
            .open_pdi_document(source.as_ref(), options)?;
        Ok(PdiDocument::new(self.session.clone(), id))
    }

    /// Open a PDF for import from memory. The returned document owns the
    /// virtual file holding `data` and deletes it when closed.
    pub fn open_pdi_document_with_virtual_file(
        &self,
        data: &[u8],
        name: Option<&str>,
        options: &str,
    ) -> Result<PdiDocument> {
        let file = self.create_virtual_file(data, name)?;
        let mut document = self.open_pdi_document(&file, options)?;
        document.hold_file(file);
        Ok(document)
    }

    /// Begin a new document. An empty `filename` generates into memory.
    ///
    /// Fails with `AlreadyActive` while another document is active and with
    /// `OpenFailed` if the engine declines; the root then has no document.
    pub fn create_document(&self, filename: &str, options: &str) -> Result<Document> {
        self.check_open()?;
        let id = self.session.borrow_mut().begin_document(filename, options)?;
        Ok(Document::new(self.session.clone(), id))
    }

    /// The active document, creating an in-memory one if there is none.
    /// Returns `None` if that fails.
    pub fn get_document(&self) -> Option<Document> {
        let active = self.session.borrow().active_document();
        match active {
            Some(id) => Some(Document::new(self.session.clone(), id)),
            None => match self.create_document("", "") {
                Ok(document) => Some(document),
                Err(err) => {
                    debug!("could not create default document: {err}");
                    None
                }
            },
        }
    }

    /// Begin a document for a PDF version given times ten (`17` for 1.7).
    /// Versions below the configured minimum are raised to it.
    pub fn create_document_with_version(&self, version: u32, filename: &str) -> Result<Document> {
        let minimum = self.session.borrow().config().min_pdf_version;
        self.create_document(filename, &version::compatibility_option(version, minimum))
    }

    /// Begin a document with the PDF version of an imported document.
    pub fn create_document_like(&self, template: &PdiDocument, filename: &str) -> Result<Document> {
        let version = template.pdf_version()?;
        self.create_document_with_version(version, filename)
    }

    /// The engine's own idea of the current scope. Matches
    /// [`current_scope`](crate::LibObject::current_scope) unless the engine
    /// failed.
    pub fn engine_scope(&self) -> Scope {
        self.session.borrow().engine_scope()
    }

    /// Whether an engine exception made this root object unusable.
    pub fn is_poisoned(&self) -> bool {
        self.session.borrow().is_poisoned()
    }
}

impl ScopedObject for RootObject {
    const SCOPE: Scope = Scope::Object;

    fn is_open(&self) -> bool {
        self.state == ScopeState::Open
    }

    /// Finish the active document, if any. The root object cannot be used
    /// afterwards.
    fn close(&mut self) -> Result<()> {
        if self.state != ScopeState::Open {
            return Ok(());
        }
        self.state = ScopeState::Closing;
        let result = self.session.borrow_mut().close_active_document();
        self.state = ScopeState::Closed;
        debug!("closed root object");
        result
    }
}

impl Drop for RootObject {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            if !err.is_fatal() {
                warn!("failed to close root object: {err}");
            }
        }
    }
}

impl std::fmt::Debug for RootObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootObject")
            .field("state", &self.state)
            .field("scope", &self.session.borrow().scope())
            .finish()
    }
}

impl_lib_object!(RootObject);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_license_option_braces_key() {
        assert_eq!(license_option("A-1 B"), "license={A-1 B}");
    }
}
