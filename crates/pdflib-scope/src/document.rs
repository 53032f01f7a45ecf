//! Document scope

use crate::error::{Result, ScopeError};
use crate::image::Image;
use crate::lib_object::{impl_lib_object, ScopedObject};
use crate::page::Page;
use crate::pdi::{PdiDocument, PdiPage};
use crate::session::{ObjectId, SharedSession};
use pdflib_engine::Scope;

/// Document info key for the title.
pub const META_TITLE: &str = "Title";
/// Document info key for the creator.
pub const META_CREATOR: &str = "Creator";
/// Document info key for the author.
pub const META_AUTHOR: &str = "Author";

/// The document currently being generated by a [`RootObject`](crate::RootObject).
///
/// A `Document` is a view: clones refer to the same document, and dropping
/// one does not end the document. The scope ends on
/// [`finish`](Document::finish) or when the root object is closed or dropped.
/// Once finished, every operation fails with [`ScopeError::Closed`].
///
/// ```
/// use pdflib_engine::MemoryEngine;
/// use pdflib_scope::RootObject;
///
/// let root = RootObject::new(Box::new(MemoryEngine::new()))?;
/// let document = root.create_document("", "")?;
/// let mut page = document.create_page(595.0, 842.0, "")?;
/// page.finish("")?;
/// let pdf = document.finish(true, "")?.unwrap_or_default();
/// assert!(pdf.starts_with(b"%PDF-1.7"));
/// # Ok::<(), pdflib_scope::ScopeError>(())
/// ```
#[derive(Clone)]
pub struct Document {
    session: SharedSession,
    id: ObjectId,
}

impl Document {
    pub(crate) fn new(session: SharedSession, id: ObjectId) -> Self {
        Self { session, id }
    }

    /// Begin a new page. Fails with `AlreadyActive` while another page of
    /// this document is open.
    pub fn create_page(&self, width: f64, height: f64, options: &str) -> Result<Page> {
        let page = self
            .session
            .borrow_mut()
            .begin_page(self.id, width, height, options)?;
        Ok(Page::new(self.session.clone(), self.id, page))
    }

    pub fn has_active_page(&self) -> bool {
        self.session.borrow().has_active_page(self.id)
    }

    /// Load an image from a file path or virtual file name.
    ///
    /// The image stays open until it is closed or the document finishes.
    pub fn load_image(
        &self,
        source: impl AsRef<str>,
        imagetype: &str,
        options: &str,
    ) -> Result<Image> {
        let id = self.session.borrow_mut().load_image(
            self.id,
            source.as_ref(),
            imagetype,
            options,
            None,
        )?;
        Ok(Image::new(self.session.clone(), id))
    }

    /// Load an image from memory. The bytes are handed to the engine as a
    /// virtual file that is deleted when the image closes.
    pub fn load_image_from_bytes(
        &self,
        data: &[u8],
        imagetype: &str,
        options: &str,
    ) -> Result<Image> {
        let id = self
            .session
            .borrow_mut()
            .load_image_from_bytes(self.id, data, imagetype, options)?;
        Ok(Image::new(self.session.clone(), id))
    }

    /// Open a page of an imported document for placement in this document.
    ///
    /// `pdi_document` must have been opened through the same root object.
    pub fn load_pdi_page(
        &self,
        pdi_document: &PdiDocument,
        page_number: i32,
        options: &str,
    ) -> Result<PdiPage> {
        if !self.is_open() {
            return Err(ScopeError::Closed("Document"));
        }
        if !pdi_document.belongs_to(&self.session) {
            return Err(ScopeError::OpenFailed {
                context: format!("Cannot open page {page_number} of PDI document!"),
                message: "The PDI document belongs to another root object.".to_string(),
            });
        }
        pdi_document.open_page(page_number, options)
    }

    /// Number of images and imported pages currently registered.
    pub fn resource_count(&self) -> usize {
        self.session.borrow().resource_count(self.id)
    }

    /// End the document.
    ///
    /// Ends the active page, closes all images and imported pages in the
    /// order they were opened, then ends the document scope. Returns the
    /// generated PDF if `get_buffer` is set and the document was written to
    /// memory. A document without pages produces no output and is not an
    /// error. Calling `finish` again returns `Ok(None)`.
    pub fn finish(&self, get_buffer: bool, options: &str) -> Result<Option<Vec<u8>>> {
        self.session
            .borrow_mut()
            .finish_document(self.id, get_buffer, options)
    }

    pub fn set_title(&self, title: &str) -> Result<()> {
        self.set_info(META_TITLE, title)
    }

    pub fn set_creator(&self, creator: &str) -> Result<()> {
        self.set_info(META_CREATOR, creator)
    }

    pub fn set_author(&self, author: &str) -> Result<()> {
        self.set_info(META_AUTHOR, author)
    }

    fn set_info(&self, key: &str, value: &str) -> Result<()> {
        self.session.borrow_mut().set_info(self.id, key, value)
    }

    /// Set the fill and/or stroke colour. Requires page scope.
    pub fn set_color(
        &self,
        fstype: &str,
        colorspace: &str,
        c1: f64,
        c2: f64,
        c3: f64,
        c4: f64,
    ) -> Result<()> {
        self.session
            .borrow_mut()
            .set_color(self.id, fstype, colorspace, [c1, c2, c3, c4])
    }

    /// Add a rectangle to the current path. Requires page scope.
    pub fn draw_rectangle(&self, x: f64, y: f64, width: f64, height: f64) -> Result<()> {
        self.session
            .borrow_mut()
            .draw_rectangle(self.id, x, y, width, height)
    }

    /// Stroke and clear the current path. Requires page scope.
    pub fn stroke(&self) -> Result<()> {
        self.session.borrow_mut().stroke(self.id)
    }
}

impl ScopedObject for Document {
    const SCOPE: Scope = Scope::Document;

    fn is_open(&self) -> bool {
        self.session.borrow().is_document_open(self.id)
    }

    fn close(&mut self) -> Result<()> {
        self.finish(false, "").map(|_| ())
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish()
    }
}

impl_lib_object!(Document);
