//! Imported PDF documents and their pages

use crate::error::Result;
use crate::lib_object::impl_lib_object;
use crate::session::{ObjectId, ResourceKind, SharedSession};
use crate::virtual_file::VirtualFile;
use std::rc::Rc;
use tracing::warn;

/// A PDF document opened for import.
///
/// Owns the pages opened from it and, optionally, the virtual file it was
/// read from. Closing (or dropping) it closes the pages first, then the
/// document handle, then deletes the held file.
pub struct PdiDocument {
    session: SharedSession,
    id: ObjectId,
    file: Option<VirtualFile>,
}

impl PdiDocument {
    pub(crate) fn new(session: SharedSession, id: ObjectId) -> Self {
        Self {
            session,
            id,
            file: None,
        }
    }

    /// Take ownership of the virtual file this document was opened from.
    /// A previously held file is released.
    pub fn hold_file(&mut self, file: VirtualFile) {
        self.file = Some(file);
    }

    /// The held virtual file, if any.
    pub fn held_file(&self) -> Option<&VirtualFile> {
        self.file.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.session.borrow().is_pdi_document_open(self.id)
    }

    /// Whether this document was opened through `session`.
    pub(crate) fn belongs_to(&self, session: &SharedSession) -> bool {
        Rc::ptr_eq(&self.session, session)
    }

    pub fn page_count(&self) -> Result<usize> {
        let count = self.number("length:pages")?;
        Ok(count as usize)
    }

    /// Width in points of the 1-based page `page_number`.
    pub fn page_width(&self, page_number: i32) -> Result<f64> {
        self.number(&format!("pages[{}]/width", page_number - 1))
    }

    /// Height in points of the 1-based page `page_number`.
    pub fn page_height(&self, page_number: i32) -> Result<f64> {
        self.number(&format!("pages[{}]/height", page_number - 1))
    }

    /// PDF version times ten, e.g. `17` for PDF 1.7.
    pub fn pdf_version(&self) -> Result<u32> {
        let version = self.number("pdfversion")?;
        Ok(version.round() as u32)
    }

    /// Open the 1-based page `page_number` for placement.
    ///
    /// Requires an active document, which the page is registered on.
    pub fn open_page(&self, page_number: i32, options: &str) -> Result<PdiPage> {
        let id = self
            .session
            .borrow_mut()
            .open_pdi_page(self.id, page_number, options)?;
        let size = self
            .page_width(page_number)
            .and_then(|width| Ok((width, self.page_height(page_number)?)));
        match size {
            Ok(size) => Ok(PdiPage::new(self.session.clone(), id, size)),
            Err(err) => {
                self.session.borrow_mut().close_resource(id)?;
                Err(err)
            }
        }
    }

    /// Close the pages opened from this document, the document, then
    /// delete the held file. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.session.borrow_mut().close_pdi_document(self.id)?;
        if let Some(mut file) = self.file.take() {
            if !file.delete()? {
                warn!(name = file.name(), "virtual file of closed PDI document is still locked");
            }
        }
        Ok(())
    }

    fn number(&self, path: &str) -> Result<f64> {
        self.session.borrow_mut().pcos_number(self.id, path)
    }
}

impl Drop for PdiDocument {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            if !err.is_fatal() {
                warn!("failed to close PDI document: {err}");
            }
        }
    }
}

impl std::fmt::Debug for PdiDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdiDocument")
            .field("id", &self.id)
            .field("file", &self.file)
            .finish()
    }
}

/// A page of an imported document, ready to be placed.
///
/// Closed with its [`PdiDocument`], with the document it was opened in, or
/// explicitly. Clones refer to the same page.
#[derive(Clone)]
pub struct PdiPage {
    session: SharedSession,
    id: ObjectId,
    size: (f64, f64),
}

impl PdiPage {
    pub(crate) fn new(session: SharedSession, id: ObjectId, size: (f64, f64)) -> Self {
        Self { session, id, size }
    }

    /// Width in points of the imported page.
    pub fn width(&self) -> f64 {
        self.size.0
    }

    /// Height in points of the imported page.
    pub fn height(&self) -> f64 {
        self.size.1
    }

    /// Place the page on the current page. Requires page scope. Empty
    /// `options` means [`OPTION_ADJUST_PAGE`](crate::OPTION_ADJUST_PAGE).
    pub fn fit_on_page(&self, x: f64, y: f64, options: &str) -> Result<()> {
        self.session
            .borrow_mut()
            .fit_resource(self.id, ResourceKind::PdiPage, x, y, options)
    }

    /// Close the page handle. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        self.session.borrow_mut().close_resource(self.id)
    }

    pub fn is_closed(&self) -> bool {
        !self.session.borrow().is_resource_open(self.id)
    }
}

impl std::fmt::Debug for PdiPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdiPage")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl_lib_object!(PdiDocument, PdiPage);
