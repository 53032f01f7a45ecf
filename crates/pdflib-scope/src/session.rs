//! Shared engine session
//!
//! Every wrapper handed out by a [`RootObject`](crate::RootObject) refers to
//! one `Session`. The session owns the engine, mirrors its scope in a shadow
//! field and keeps the tables that tie wrapper ids to engine handles. Wrappers
//! never hold engine handles themselves, so a cascade close only has to update
//! these tables for every outstanding wrapper to observe it.

use crate::config::RootConfig;
use crate::error::{Result, ScopeError};
use crate::image::OPTION_ADJUST_PAGE;
use pdflib_engine::{EngineException, EngineResult, Handle, PdfEngine, Scope, INVALID_HANDLE};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use tracing::{debug, error, trace};

pub(crate) type SharedSession = Rc<RefCell<Session>>;

/// Identifier of a wrapper object within its session.
pub(crate) type ObjectId = u64;

/// Lifecycle of a scope-owning object. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScopeState {
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResourceKind {
    Image,
    PdiPage,
}

impl ResourceKind {
    pub(crate) fn name(self) -> &'static str {
        match self {
            ResourceKind::Image => "Image",
            ResourceKind::PdiPage => "PDI page",
        }
    }
}

/// An auxiliary resource opened within a document scope.
#[derive(Debug)]
struct Resource {
    kind: ResourceKind,
    handle: Handle,
    /// Imported document the page was opened from.
    pdi_document: Option<ObjectId>,
    /// Virtual file owned by the resource, deleted once the handle is closed.
    held_file: Option<String>,
}

#[derive(Debug)]
struct DocumentSlot {
    id: ObjectId,
    state: ScopeState,
    page: Option<ObjectId>,
    /// Auxiliary resources in registration order.
    resources: Vec<ObjectId>,
}

#[derive(Debug)]
struct PdiEntry {
    handle: Handle,
    pages: Vec<ObjectId>,
}

pub(crate) struct Session {
    engine: Box<dyn PdfEngine>,
    /// Shadow of the engine's current scope.
    scope: Scope,
    config: RootConfig,
    virtual_files: BTreeSet<String>,
    /// Virtual files whose owner went away while the engine held a lock.
    pending_deletes: BTreeSet<String>,
    document: Option<DocumentSlot>,
    resources: HashMap<ObjectId, Resource>,
    pdi_documents: HashMap<ObjectId, PdiEntry>,
    next_id: ObjectId,
    /// The exception that made the engine unusable, if any.
    failure: Option<EngineException>,
}

impl Session {
    pub(crate) fn new(engine: Box<dyn PdfEngine>, config: RootConfig) -> Self {
        Self {
            engine,
            scope: Scope::Object,
            config,
            virtual_files: BTreeSet::new(),
            pending_deletes: BTreeSet::new(),
            document: None,
            resources: HashMap::new(),
            pdi_documents: HashMap::new(),
            next_id: 1,
            failure: None,
        }
    }

    pub(crate) fn into_shared(self) -> SharedSession {
        Rc::new(RefCell::new(self))
    }

    pub(crate) fn config(&self) -> &RootConfig {
        &self.config
    }

    pub(crate) fn scope(&self) -> Scope {
        self.scope
    }

    pub(crate) fn engine_scope(&self) -> Scope {
        self.engine.scope()
    }

    pub(crate) fn last_error_message(&self) -> String {
        self.engine.get_errmsg()
    }

    pub(crate) fn is_poisoned(&self) -> bool {
        self.failure.is_some()
    }

    fn allocate_id(&mut self) -> ObjectId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn check_usable(&self) -> Result<()> {
        match &self.failure {
            Some(failure) => Err(ScopeError::EngineUnexpected(failure.clone())),
            None => Ok(()),
        }
    }

    fn poison(&mut self, exception: EngineException) -> ScopeError {
        error!(
            errnum = exception.errnum,
            api = %exception.apiname,
            "PDF engine raised an exception, root object is no longer usable: {}",
            exception.message
        );
        self.failure = Some(exception.clone());
        ScopeError::EngineUnexpected(exception)
    }

    /// Run an engine call. A raised exception poisons the session.
    fn call<T>(&mut self, f: impl FnOnce(&mut dyn PdfEngine) -> EngineResult<T>) -> Result<T> {
        self.check_usable()?;
        let result = f(self.engine.as_mut());
        result.map_err(|exception| self.poison(exception))
    }

    /// Apply an option list outside of the poisoning rules.
    pub(crate) fn set_engine_option(&mut self, optlist: &str) -> EngineResult<()> {
        self.engine.set_option(optlist)
    }

    fn open_failed(&self, context: String) -> ScopeError {
        ScopeError::OpenFailed {
            context,
            message: self.engine.get_errmsg(),
        }
    }

    pub(crate) fn require_scope(&self, operation: &'static str, required: Scope) -> Result<()> {
        if self.scope == required {
            Ok(())
        } else {
            Err(ScopeError::WrongScope {
                operation,
                required,
                current: self.scope,
            })
        }
    }

    // ------------------------------------------------------------------
    // Virtual files
    // ------------------------------------------------------------------

    /// First free name among `prefix`, `prefix.1`, `prefix.2`, ...
    fn free_name(&self, prefix: &str) -> String {
        let mut candidate = prefix.to_string();
        let mut counter = 0u32;
        while self.virtual_files.contains(&candidate) {
            counter += 1;
            candidate = format!("{prefix}.{counter}");
        }
        candidate
    }

    pub(crate) fn create_virtual_file(
        &mut self,
        data: &[u8],
        prefix: Option<&str>,
    ) -> Result<String> {
        if data.is_empty() {
            return Err(ScopeError::EmptyInput {
                what: "virtual file",
            });
        }
        self.check_usable()?;

        let prefix = match prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => prefix.to_string(),
            None => self.config.virtual_file_prefix.clone(),
        };
        let name = self.free_name(&prefix);
        self.call(|engine| engine.create_pvf(&name, data, ""))?;
        self.virtual_files.insert(name.clone());
        debug!(name = %name, bytes = data.len(), "created virtual file");
        Ok(name)
    }

    /// Delete a virtual file. `Ok(false)` if the engine still has it locked,
    /// in which case it stays registered.
    pub(crate) fn delete_virtual_file(&mut self, name: &str) -> Result<bool> {
        if !self.virtual_files.contains(name) {
            return Ok(true);
        }
        let status = self.call(|engine| engine.delete_pvf(name))?;
        if status == -1 {
            debug!(name, "virtual file is locked, not deleted");
            return Ok(false);
        }
        self.virtual_files.remove(name);
        self.pending_deletes.remove(name);
        debug!(name, "deleted virtual file");
        Ok(true)
    }

    /// Delete `name` as soon as the engine releases it.
    pub(crate) fn defer_virtual_file_delete(&mut self, name: &str) {
        if self.virtual_files.contains(name) {
            debug!(name, "virtual file queued for deletion");
            self.pending_deletes.insert(name.to_string());
        }
    }

    /// Retry queued deletes. Files that are still locked stay queued.
    fn retry_pending_deletes(&mut self) -> Result<()> {
        for name in std::mem::take(&mut self.pending_deletes) {
            if !self.delete_virtual_file(&name)? {
                self.pending_deletes.insert(name);
            }
        }
        Ok(())
    }

    pub(crate) fn virtual_file_names(&self) -> Vec<String> {
        self.virtual_files.iter().cloned().collect()
    }

    pub(crate) fn is_virtual_file_registered(&self, name: &str) -> bool {
        self.virtual_files.contains(name)
    }

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    fn open_document(&self, id: ObjectId) -> Result<&DocumentSlot> {
        self.document
            .as_ref()
            .filter(|slot| slot.id == id && slot.state == ScopeState::Open)
            .ok_or(ScopeError::Closed("Document"))
    }

    pub(crate) fn is_document_open(&self, id: ObjectId) -> bool {
        self.open_document(id).is_ok()
    }

    pub(crate) fn active_document(&self) -> Option<ObjectId> {
        self.document.as_ref().map(|slot| slot.id)
    }

    pub(crate) fn begin_document(&mut self, filename: &str, options: &str) -> Result<ObjectId> {
        self.check_usable()?;
        if self.document.is_some() {
            return Err(ScopeError::AlreadyActive {
                scope: Scope::Document,
            });
        }

        let status = self.call(|engine| engine.begin_document(filename, options))?;
        if status == -1 {
            let target = if filename.is_empty() { "in memory" } else { filename };
            return Err(self.open_failed(format!("Cannot create document {target}!")));
        }

        let id = self.allocate_id();
        self.scope = Scope::Document;
        self.document = Some(DocumentSlot {
            id,
            state: ScopeState::Open,
            page: None,
            resources: Vec::new(),
        });
        debug!(document = id, filename, options, "began document");
        Ok(id)
    }

    /// Close the document `id`: end its page, close its resources in
    /// registration order, then end the document scope.
    ///
    /// Returns the output buffer if `get_buffer` is set and the document had
    /// pages. Does nothing if the document is not the open one.
    pub(crate) fn finish_document(
        &mut self,
        id: ObjectId,
        get_buffer: bool,
        options: &str,
    ) -> Result<Option<Vec<u8>>> {
        let Some(slot) = self.document.as_mut().filter(|slot| slot.id == id) else {
            return Ok(None);
        };
        if slot.state != ScopeState::Open {
            return Ok(None);
        }
        slot.state = ScopeState::Closing;

        // Clearing the slot is the root's notification.
        let Some(mut slot) = self.document.take() else {
            return Ok(None);
        };
        debug!(document = id, resources = slot.resources.len(), "closing document");
        self.check_usable()?;

        if slot.page.take().is_some() && self.scope == Scope::Page {
            self.call(|engine| engine.end_page_ext(""))?;
            self.scope = Scope::Document;
        }

        for resource in std::mem::take(&mut slot.resources) {
            self.close_resource(resource)?;
        }

        self.check_usable()?;
        let ended = self.engine.end_document(options);
        self.scope = Scope::Object;
        slot.state = ScopeState::Closed;
        match ended {
            Ok(()) => {}
            Err(exception) if exception.is_no_pages() => {
                debug!(document = id, "document has no pages, no output produced");
                return Ok(None);
            }
            Err(exception) => return Err(self.poison(exception)),
        }
        debug!(document = id, "ended document");

        if get_buffer {
            self.call(|engine| engine.get_buffer()).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Close whatever document is active, if any.
    pub(crate) fn close_active_document(&mut self) -> Result<()> {
        match self.active_document() {
            Some(id) => self.finish_document(id, false, "").map(|_| ()),
            None => Ok(()),
        }
    }

    pub(crate) fn set_info(&mut self, document: ObjectId, key: &str, value: &str) -> Result<()> {
        self.open_document(document)?;
        self.call(|engine| engine.set_info(key, value))
    }

    // ------------------------------------------------------------------
    // Pages
    // ------------------------------------------------------------------

    pub(crate) fn has_active_page(&self, document: ObjectId) -> bool {
        self.open_document(document)
            .map(|slot| slot.page.is_some())
            .unwrap_or(false)
    }

    pub(crate) fn is_page_open(&self, document: ObjectId, page: ObjectId) -> bool {
        self.open_document(document)
            .map(|slot| slot.page == Some(page))
            .unwrap_or(false)
    }

    pub(crate) fn begin_page(
        &mut self,
        document: ObjectId,
        width: f64,
        height: f64,
        options: &str,
    ) -> Result<ObjectId> {
        self.check_usable()?;
        if self.open_document(document)?.page.is_some() {
            return Err(ScopeError::AlreadyActive { scope: Scope::Page });
        }

        self.call(|engine| engine.begin_page_ext(width, height, options))?;
        let id = self.allocate_id();
        self.scope = Scope::Page;
        if let Some(slot) = self.document.as_mut() {
            slot.page = Some(id);
        }
        trace!(document, page = id, width, height, "began page");
        Ok(id)
    }

    /// End page `page` of `document`. Does nothing if the page is no longer
    /// the document's active page.
    pub(crate) fn end_page(
        &mut self,
        document: ObjectId,
        page: ObjectId,
        options: &str,
    ) -> Result<()> {
        let Some(slot) = self
            .document
            .as_mut()
            .filter(|slot| slot.id == document && slot.page == Some(page))
        else {
            return Ok(());
        };
        slot.page = None;
        self.check_usable()?;

        // The engine may already have unwound past the page.
        if self.scope == Scope::Page {
            self.call(|engine| engine.end_page_ext(options))?;
            self.scope = Scope::Document;
        }
        trace!(document, page, "ended page");
        Ok(())
    }

    pub(crate) fn set_color(
        &mut self,
        document: ObjectId,
        fstype: &str,
        colorspace: &str,
        components: [f64; 4],
    ) -> Result<()> {
        self.open_document(document)?;
        self.require_scope("set_color", Scope::Page)?;
        let [c1, c2, c3, c4] = components;
        self.call(|engine| engine.setcolor(fstype, colorspace, c1, c2, c3, c4))
    }

    pub(crate) fn draw_rectangle(
        &mut self,
        document: ObjectId,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    ) -> Result<()> {
        self.open_document(document)?;
        self.require_scope("draw_rectangle", Scope::Page)?;
        self.call(|engine| engine.rect(x, y, width, height))
    }

    pub(crate) fn stroke(&mut self, document: ObjectId) -> Result<()> {
        self.open_document(document)?;
        self.require_scope("stroke", Scope::Page)?;
        self.call(|engine| engine.stroke())
    }

    // ------------------------------------------------------------------
    // Auxiliary resources
    // ------------------------------------------------------------------

    fn register_resource(&mut self, resource: Resource) -> ObjectId {
        let id = self.allocate_id();
        if let Some(pdi) = resource.pdi_document {
            if let Some(entry) = self.pdi_documents.get_mut(&pdi) {
                entry.pages.push(id);
            }
        }
        if let Some(slot) = self.document.as_mut() {
            slot.resources.push(id);
        }
        trace!(
            resource = id,
            kind = resource.kind.name(),
            handle = resource.handle,
            "registered resource"
        );
        self.resources.insert(id, resource);
        id
    }

    pub(crate) fn is_resource_open(&self, id: ObjectId) -> bool {
        self.resources.contains_key(&id)
    }

    /// Number of auxiliary resources registered on `document`.
    pub(crate) fn resource_count(&self, document: ObjectId) -> usize {
        self.open_document(document)
            .map(|slot| slot.resources.len())
            .unwrap_or(0)
    }

    /// Close a resource and release its virtual file. Closing an unknown or
    /// already closed resource does nothing.
    pub(crate) fn close_resource(&mut self, id: ObjectId) -> Result<()> {
        let Some(resource) = self.resources.remove(&id) else {
            return Ok(());
        };
        if let Some(pdi) = resource.pdi_document {
            if let Some(entry) = self.pdi_documents.get_mut(&pdi) {
                entry.pages.retain(|page| *page != id);
            }
        }
        if let Some(slot) = self.document.as_mut() {
            slot.resources.retain(|r| *r != id);
        }

        let handle = resource.handle;
        match resource.kind {
            ResourceKind::Image => self.call(|engine| engine.close_image(handle))?,
            ResourceKind::PdiPage => self.call(|engine| engine.close_pdi_page(handle))?,
        }
        trace!(resource = id, kind = resource.kind.name(), "closed resource");

        if let Some(name) = resource.held_file {
            if !self.delete_virtual_file(&name)? {
                self.defer_virtual_file_delete(&name);
            }
        }
        self.retry_pending_deletes()
    }

    pub(crate) fn load_image(
        &mut self,
        document: ObjectId,
        source: &str,
        imagetype: &str,
        options: &str,
        held_file: Option<String>,
    ) -> Result<ObjectId> {
        self.check_usable()?;
        self.open_document(document)?;

        let handle = self.call(|engine| engine.load_image(imagetype, source, options))?;
        if handle == INVALID_HANDLE {
            return Err(self.open_failed(format!("Cannot load image {source}!")));
        }
        Ok(self.register_resource(Resource {
            kind: ResourceKind::Image,
            handle,
            pdi_document: None,
            held_file,
        }))
    }

    pub(crate) fn load_image_from_bytes(
        &mut self,
        document: ObjectId,
        data: &[u8],
        imagetype: &str,
        options: &str,
    ) -> Result<ObjectId> {
        self.open_document(document)?;
        let name = self.create_virtual_file(data, None)?;
        match self.load_image(document, &name, imagetype, options, Some(name.clone())) {
            Ok(id) => Ok(id),
            Err(err) => {
                if !err.is_fatal() {
                    self.delete_virtual_file(&name)?;
                }
                Err(err)
            }
        }
    }

    pub(crate) fn fit_resource(
        &mut self,
        id: ObjectId,
        kind: ResourceKind,
        x: f64,
        y: f64,
        options: &str,
    ) -> Result<()> {
        self.check_usable()?;
        let handle = self
            .resources
            .get(&id)
            .map(|resource| resource.handle)
            .ok_or(ScopeError::Closed(kind.name()))?;
        let options = if options.is_empty() {
            OPTION_ADJUST_PAGE
        } else {
            options
        };
        match kind {
            ResourceKind::Image => {
                self.require_scope("fit_image", Scope::Page)?;
                self.call(|engine| engine.fit_image(handle, x, y, options))
            }
            ResourceKind::PdiPage => {
                self.require_scope("fit_pdi_page", Scope::Page)?;
                self.call(|engine| engine.fit_pdi_page(handle, x, y, options))
            }
        }
    }

    // ------------------------------------------------------------------
    // Imported documents
    // ------------------------------------------------------------------

    pub(crate) fn open_pdi_document(&mut self, source: &str, options: &str) -> Result<ObjectId> {
        self.check_usable()?;
        let handle = self.call(|engine| engine.open_pdi_document(source, options))?;
        if handle == INVALID_HANDLE {
            return Err(self.open_failed(format!("Cannot open PDI document {source}!")));
        }

        let id = self.allocate_id();
        self.pdi_documents.insert(
            id,
            PdiEntry {
                handle,
                pages: Vec::new(),
            },
        );
        debug!(pdi_document = id, source, "opened PDI document");
        Ok(id)
    }

    pub(crate) fn is_pdi_document_open(&self, id: ObjectId) -> bool {
        self.pdi_documents.contains_key(&id)
    }

    fn pdi_handle(&self, id: ObjectId) -> Result<Handle> {
        self.pdi_documents
            .get(&id)
            .map(|entry| entry.handle)
            .ok_or(ScopeError::Closed("PDI document"))
    }

    /// Close an imported document's pages, then the document itself.
    pub(crate) fn close_pdi_document(&mut self, id: ObjectId) -> Result<()> {
        let Some(entry) = self.pdi_documents.get(&id) else {
            return Ok(());
        };
        for page in entry.pages.clone() {
            self.close_resource(page)?;
        }

        let Some(entry) = self.pdi_documents.remove(&id) else {
            return Ok(());
        };
        let handle = entry.handle;
        self.call(|engine| engine.close_pdi_document(handle))?;
        debug!(pdi_document = id, "closed PDI document");
        self.retry_pending_deletes()
    }

    pub(crate) fn pcos_number(&mut self, id: ObjectId, path: &str) -> Result<f64> {
        let handle = self.pdi_handle(id)?;
        let value = self.call(|engine| engine.pcos_get_number(handle, path))?;
        if value < 0.0 {
            return Err(ScopeError::QueryFailed {
                key: path.to_string(),
                message: self.engine.get_errmsg(),
            });
        }
        Ok(value)
    }

    /// Open a page of an imported document. The page is registered on the
    /// active document as well, since the engine ties it to that scope.
    pub(crate) fn open_pdi_page(
        &mut self,
        pdi: ObjectId,
        page_number: i32,
        options: &str,
    ) -> Result<ObjectId> {
        self.check_usable()?;
        let pdi_handle = self.pdi_handle(pdi)?;
        let handle =
            self.call(|engine| engine.open_pdi_page(pdi_handle, page_number, options))?;
        if handle == INVALID_HANDLE {
            let context = format!("Cannot open page {page_number} of PDI document!");
            return Err(self.open_failed(context));
        }
        Ok(self.register_resource(Resource {
            kind: ResourceKind::PdiPage,
            handle,
            pdi_document: Some(pdi),
            held_file: None,
        }))
    }
}
