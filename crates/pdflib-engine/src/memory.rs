//! In-process engine

use crate::error::{
    EngineException, EngineResult, ERR_CORRUPT_FILE, ERR_FILE_NOT_FOUND, ERR_HANDLE, ERR_IMAGE,
    ERR_LICENSE, ERR_NO_PAGES, ERR_OPTION, ERR_PCOS, ERR_PVF_EXISTS, ERR_PVF_LOCKED,
    ERR_WRONG_SCOPE,
};
use crate::import::ImportedPdf;
use crate::journal::Journal;
use crate::optlist::OptionList;
use crate::output::{OutputDocument, OutputPage};
use crate::{ErrorPolicy, Handle, PdfEngine, Scope, INVALID_HANDLE};
use lopdf::content::Operation;
use lopdf::Object;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Cursor;
use std::path::Path;
use tracing::trace;

/// Lowest and highest `compatibility` values accepted by `begin_document`.
const MIN_COMPATIBILITY: f64 = 14.0;
const MAX_COMPATIBILITY: f64 = 20.0;
const DEFAULT_COMPATIBILITY: &str = "1.7";

const IMAGE_TYPES: &[&str] = &["auto", "png", "jpeg", "gif"];

#[derive(Debug)]
struct VirtualFileEntry {
    data: Vec<u8>,
    locks: usize,
}

#[derive(Debug)]
struct PdiDocumentEntry {
    pdf: ImportedPdf,
    locked_file: Option<String>,
    open_pages: usize,
}

#[derive(Debug)]
struct PdiPageEntry {
    document: Handle,
}

#[derive(Debug)]
struct ImageEntry {
    locked_file: Option<String>,
}

/// Configures a [`MemoryEngine`].
#[derive(Debug, Default)]
pub struct MemoryEngineBuilder {
    licenses: HashSet<String>,
    journal: Option<Journal>,
}

impl MemoryEngineBuilder {
    /// Make `key` a valid value for the `license` option.
    pub fn accept_license(mut self, key: impl Into<String>) -> Self {
        self.licenses.insert(key.into());
        self
    }

    /// Record calls into an existing journal instead of a fresh one.
    pub fn journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn build(self) -> MemoryEngine {
        MemoryEngine {
            scope: Scope::Object,
            error_policy: ErrorPolicy::default(),
            accepted_licenses: self.licenses,
            license: None,
            errnum: 0,
            errmsg: String::new(),
            next_handle: 1,
            virtual_files: HashMap::new(),
            pdi_documents: HashMap::new(),
            pdi_pages: HashMap::new(),
            images: HashMap::new(),
            pending_info: BTreeMap::new(),
            output: None,
            current_page: None,
            buffer: None,
            journal: self.journal.unwrap_or_default(),
        }
    }
}

/// An engine that keeps all state in memory.
///
/// It follows the scope rules and error policy of the real engine closely
/// enough to drive the safety layer end to end, and writes a minimal PDF on
/// `end_document`. Nothing is rendered: placed images and imported pages
/// only show up in the [`Journal`].
#[derive(Debug)]
pub struct MemoryEngine {
    scope: Scope,
    error_policy: ErrorPolicy,
    accepted_licenses: HashSet<String>,
    license: Option<String>,
    errnum: i32,
    errmsg: String,
    next_handle: Handle,
    virtual_files: HashMap<String, VirtualFileEntry>,
    pdi_documents: HashMap<Handle, PdiDocumentEntry>,
    pdi_pages: HashMap<Handle, PdiPageEntry>,
    images: HashMap<Handle, ImageEntry>,
    /// Info fields set in object scope, applied to the next document.
    pending_info: BTreeMap<String, String>,
    output: Option<OutputDocument>,
    current_page: Option<OutputPage>,
    buffer: Option<Vec<u8>>,
    journal: Journal,
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// An engine that accepts no license keys.
    pub fn new() -> Self {
        MemoryEngineBuilder::default().build()
    }

    pub fn builder() -> MemoryEngineBuilder {
        MemoryEngineBuilder::default()
    }

    /// Another view onto this engine's call journal.
    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    /// Whether a valid license key has been applied.
    pub fn is_licensed(&self) -> bool {
        self.license.is_some()
    }

    /// Names of all registered virtual files, sorted.
    pub fn virtual_file_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.virtual_files.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of image and imported page handles currently open.
    pub fn open_resource_count(&self) -> usize {
        self.images.len() + self.pdi_pages.len()
    }

    /// Number of imported documents currently open.
    pub fn open_pdi_document_count(&self) -> usize {
        self.pdi_documents.len()
    }

    fn exception(&mut self, errnum: i32, apiname: &str, message: String) -> EngineException {
        trace!(errnum, apiname, %message, "engine error");
        self.errnum = errnum;
        self.errmsg = message.clone();
        EngineException::new(errnum, apiname, message)
    }

    /// Report a failure of a call that has a failure return value.
    fn fail_with<T>(
        &mut self,
        errnum: i32,
        apiname: &str,
        message: String,
        failure: T,
    ) -> EngineResult<T> {
        let exception = self.exception(errnum, apiname, message);
        match self.error_policy {
            ErrorPolicy::Return => Ok(failure),
            ErrorPolicy::Exception => Err(exception),
        }
    }

    fn clear_error(&mut self) {
        self.errnum = 0;
        self.errmsg.clear();
    }

    fn scope_message(&self) -> String {
        format!("Function must not be called in '{}' scope", self.scope)
    }

    fn require_scope(&mut self, apiname: &str, allowed: &[Scope]) -> EngineResult<()> {
        if allowed.contains(&self.scope) {
            return Ok(());
        }
        let message = self.scope_message();
        Err(self.exception(ERR_WRONG_SCOPE, apiname, message))
    }

    fn parse_options(&mut self, apiname: &str, optlist: &str) -> EngineResult<OptionList> {
        OptionList::parse(optlist).map_err(|message| self.exception(ERR_OPTION, apiname, message))
    }

    fn allocate_handle(&mut self) -> Handle {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Read a source by virtual file name first, then from disk.
    fn read_source(&self, filename: &str) -> Result<(Vec<u8>, bool), String> {
        if let Some(entry) = self.virtual_files.get(filename) {
            return Ok((entry.data.clone(), true));
        }
        std::fs::read(filename)
            .map(|data| (data, false))
            .map_err(|e| format!("Couldn't open file '{filename}' for reading ({e})"))
    }

    fn lock_file(&mut self, filename: &str) {
        if let Some(entry) = self.virtual_files.get_mut(filename) {
            entry.locks += 1;
        }
    }

    fn unlock_file(&mut self, filename: Option<String>) {
        if let Some(entry) = filename.and_then(|name| self.virtual_files.get_mut(&name)) {
            entry.locks = entry.locks.saturating_sub(1);
        }
    }

    fn draw(&mut self, operation: Operation) {
        if let Some(page) = self.current_page.as_mut() {
            page.operations.push(operation);
        }
    }

    /// Handles that only live as long as the document scope.
    fn release_document_resources(&mut self) {
        let images: Vec<ImageEntry> = self.images.drain().map(|(_, image)| image).collect();
        for image in images {
            self.unlock_file(image.locked_file);
        }
        let pages: Vec<PdiPageEntry> = self.pdi_pages.drain().map(|(_, page)| page).collect();
        for page in pages {
            if let Some(document) = self.pdi_documents.get_mut(&page.document) {
                document.open_pages = document.open_pages.saturating_sub(1);
            }
        }
    }
}

fn parse_compatibility(value: &str) -> Option<String> {
    let (major, minor) = value.split_once('.')?;
    let major: u32 = major.parse().ok()?;
    let minor: u32 = minor.parse().ok()?;
    if minor >= 10 {
        return None;
    }
    let raw = f64::from(major * 10 + minor);
    (MIN_COMPATIBILITY..=MAX_COMPATIBILITY)
        .contains(&raw)
        .then(|| format!("{major}.{minor}"))
}

fn probe_image(data: &[u8]) -> Result<&'static str, String> {
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| e.to_string())?;
    let format = reader
        .format()
        .ok_or_else(|| "unknown image format".to_string())?;
    reader.into_dimensions().map_err(|e| e.to_string())?;
    Ok(match format {
        image::ImageFormat::Png => "png",
        image::ImageFormat::Jpeg => "jpeg",
        image::ImageFormat::Gif => "gif",
        _ => "unsupported",
    })
}

/// Parse `pages[N]/width` or `pages[N]/height` into a 0-based index and key.
fn parse_page_path(path: &str) -> Option<(usize, &str)> {
    let rest = path.strip_prefix("pages[")?;
    let (index, key) = rest.split_once("]/")?;
    Some((index.parse().ok()?, key))
}

impl PdfEngine for MemoryEngine {
    fn set_option(&mut self, optlist: &str) -> EngineResult<()> {
        self.journal.record("set_option", "", optlist);
        let options = self.parse_options("set_option", optlist)?;

        let mut policy = self.error_policy;
        let mut license = self.license.clone();
        for (key, value) in options.iter() {
            match key {
                "errorpolicy" => {
                    policy = ErrorPolicy::from_keyword(value).ok_or_else(|| {
                        self.exception(
                            ERR_OPTION,
                            "set_option",
                            format!("Unknown keyword '{value}' for option 'errorpolicy'"),
                        )
                    })?;
                }
                "license" => {
                    if !self.accepted_licenses.contains(value) {
                        return Err(self.exception(
                            ERR_LICENSE,
                            "set_option",
                            format!("Invalid license key '{value}'"),
                        ));
                    }
                    license = Some(value.to_string());
                }
                other => {
                    return Err(self.exception(
                        ERR_OPTION,
                        "set_option",
                        format!("Unknown option '{other}'"),
                    ));
                }
            }
        }

        self.error_policy = policy;
        self.license = license;
        Ok(())
    }

    fn get_option(&self, keyword: &str) -> Option<String> {
        self.journal.record("get_option", keyword, "");
        match keyword {
            "scope" => Some(self.scope.name().to_string()),
            "errorpolicy" => Some(self.error_policy.keyword().to_string()),
            "licensed" => Some(self.is_licensed().to_string()),
            "compatibility" => self.output.as_ref().map(|doc| doc.compatibility.clone()),
            _ => None,
        }
    }

    fn scope(&self) -> Scope {
        self.scope
    }

    fn get_errmsg(&self) -> String {
        self.errmsg.clone()
    }

    fn get_errnum(&self) -> i32 {
        self.errnum
    }

    fn begin_document(&mut self, filename: &str, optlist: &str) -> EngineResult<i32> {
        self.journal.record("begin_document", filename, optlist);
        if self.scope != Scope::Object {
            let message = self.scope_message();
            return self.fail_with(ERR_WRONG_SCOPE, "begin_document", message, -1);
        }

        let options = match OptionList::parse(optlist) {
            Ok(options) => options,
            Err(message) => return self.fail_with(ERR_OPTION, "begin_document", message, -1),
        };
        let requested = options.get("compatibility").unwrap_or(DEFAULT_COMPATIBILITY);
        let Some(compatibility) = parse_compatibility(requested) else {
            let message = format!("Unsupported value '{requested}' for option 'compatibility'");
            return self.fail_with(ERR_OPTION, "begin_document", message, -1);
        };

        let parent = Path::new(filename).parent();
        if let Some(dir) = parent.filter(|dir| !dir.as_os_str().is_empty() && !dir.is_dir()) {
            let message = format!(
                "Couldn't open PDF file '{filename}' for writing (directory '{}' not found)",
                dir.display()
            );
            return self.fail_with(ERR_FILE_NOT_FOUND, "begin_document", message, -1);
        }

        self.clear_error();
        self.output = Some(OutputDocument {
            filename: filename.to_string(),
            compatibility,
            info: std::mem::take(&mut self.pending_info),
            pages: Vec::new(),
        });
        self.buffer = None;
        self.scope = Scope::Document;
        Ok(1)
    }

    fn end_document(&mut self, optlist: &str) -> EngineResult<()> {
        self.journal.record("end_document", "", optlist);
        self.require_scope("end_document", &[Scope::Document])?;
        self.parse_options("end_document", optlist)?;

        let output = self.output.take().unwrap_or_default();
        self.release_document_resources();
        self.scope = Scope::Object;

        if output.pages.is_empty() {
            return Err(self.exception(
                ERR_NO_PAGES,
                "end_document",
                "Generated document doesn't contain any pages".to_string(),
            ));
        }

        let bytes = output
            .to_bytes()
            .map_err(|message| self.exception(ERR_CORRUPT_FILE, "end_document", message))?;
        if output.filename.is_empty() {
            self.buffer = Some(bytes);
        } else {
            std::fs::write(&output.filename, bytes).map_err(|e| {
                self.exception(
                    ERR_FILE_NOT_FOUND,
                    "end_document",
                    format!("Couldn't write PDF file '{}' ({e})", output.filename),
                )
            })?;
        }
        Ok(())
    }

    fn get_buffer(&mut self) -> EngineResult<Vec<u8>> {
        self.journal.record("get_buffer", "", "");
        self.require_scope("get_buffer", &[Scope::Object, Scope::Document])?;
        Ok(self.buffer.take().unwrap_or_default())
    }

    fn begin_page_ext(&mut self, width: f64, height: f64, optlist: &str) -> EngineResult<()> {
        self.journal
            .record("begin_page_ext", format!("{width}x{height}"), optlist);
        self.require_scope("begin_page_ext", &[Scope::Document])?;
        self.parse_options("begin_page_ext", optlist)?;
        for (name, value) in [("width", width), ("height", height)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(self.exception(
                    ERR_OPTION,
                    "begin_page_ext",
                    format!("Parameter '{name}' must be positive, got {value}"),
                ));
            }
        }

        self.current_page = Some(OutputPage {
            width,
            height,
            operations: Vec::new(),
        });
        self.scope = Scope::Page;
        Ok(())
    }

    fn end_page_ext(&mut self, optlist: &str) -> EngineResult<()> {
        self.journal.record("end_page_ext", "", optlist);
        self.require_scope("end_page_ext", &[Scope::Page])?;
        self.parse_options("end_page_ext", optlist)?;

        if let (Some(page), Some(output)) = (self.current_page.take(), self.output.as_mut()) {
            output.pages.push(page);
        }
        self.scope = Scope::Document;
        Ok(())
    }

    fn create_pvf(&mut self, filename: &str, data: &[u8], optlist: &str) -> EngineResult<()> {
        self.journal.record("create_pvf", filename, optlist);
        self.parse_options("create_pvf", optlist)?;
        if filename.is_empty() {
            return Err(self.exception(
                ERR_OPTION,
                "create_pvf",
                "Virtual file name must not be empty".to_string(),
            ));
        }
        if self.virtual_files.contains_key(filename) {
            return Err(self.exception(
                ERR_PVF_EXISTS,
                "create_pvf",
                format!("Couldn't create virtual file '{filename}' (name already exists)"),
            ));
        }

        self.virtual_files.insert(
            filename.to_string(),
            VirtualFileEntry {
                data: data.to_vec(),
                locks: 0,
            },
        );
        Ok(())
    }

    fn delete_pvf(&mut self, filename: &str) -> EngineResult<i32> {
        self.journal.record("delete_pvf", filename, "");
        match self.virtual_files.get(filename) {
            Some(entry) if entry.locks > 0 => {
                let message = format!("Virtual file '{filename}' is locked");
                self.errnum = ERR_PVF_LOCKED;
                self.errmsg = message;
                Ok(-1)
            }
            Some(_) => {
                self.virtual_files.remove(filename);
                Ok(1)
            }
            None => Ok(1),
        }
    }

    fn open_pdi_document(&mut self, filename: &str, optlist: &str) -> EngineResult<Handle> {
        self.journal.record("open_pdi_document", filename, optlist);
        if let Err(message) = OptionList::parse(optlist) {
            return self.fail_with(ERR_OPTION, "open_pdi_document", message, INVALID_HANDLE);
        }

        let (data, virtual_file) = match self.read_source(filename) {
            Ok(source) => source,
            Err(message) => {
                return self.fail_with(
                    ERR_FILE_NOT_FOUND,
                    "open_pdi_document",
                    message,
                    INVALID_HANDLE,
                )
            }
        };
        let pdf = match ImportedPdf::from_bytes(&data) {
            Ok(pdf) => pdf,
            Err(reason) => {
                let message = format!("Couldn't open PDF file '{filename}' ({reason})");
                return self.fail_with(
                    ERR_CORRUPT_FILE,
                    "open_pdi_document",
                    message,
                    INVALID_HANDLE,
                );
            }
        };

        let locked_file = virtual_file.then(|| filename.to_string());
        if let Some(name) = &locked_file {
            self.lock_file(name);
        }
        let handle = self.allocate_handle();
        self.pdi_documents.insert(
            handle,
            PdiDocumentEntry {
                pdf,
                locked_file,
                open_pages: 0,
            },
        );
        self.clear_error();
        Ok(handle)
    }

    fn close_pdi_document(&mut self, document: Handle) -> EngineResult<()> {
        self.journal
            .record("close_pdi_document", document.to_string(), "");
        let open_pages = match self.pdi_documents.get(&document) {
            Some(entry) => entry.open_pages,
            None => {
                return Err(self.exception(
                    ERR_HANDLE,
                    "close_pdi_document",
                    format!("Handle {document} is not a valid PDI document"),
                ))
            }
        };
        if open_pages > 0 {
            return Err(self.exception(
                ERR_HANDLE,
                "close_pdi_document",
                format!("PDI document {document} still has {open_pages} open page(s)"),
            ));
        }

        if let Some(entry) = self.pdi_documents.remove(&document) {
            self.unlock_file(entry.locked_file);
        }
        Ok(())
    }

    fn open_pdi_page(
        &mut self,
        document: Handle,
        page_number: i32,
        optlist: &str,
    ) -> EngineResult<Handle> {
        self.journal
            .record("open_pdi_page", format!("{document}:{page_number}"), optlist);
        if !matches!(self.scope, Scope::Document | Scope::Page) {
            let message = self.scope_message();
            return self.fail_with(ERR_WRONG_SCOPE, "open_pdi_page", message, INVALID_HANDLE);
        }
        if let Err(message) = OptionList::parse(optlist) {
            return self.fail_with(ERR_OPTION, "open_pdi_page", message, INVALID_HANDLE);
        }

        let found = match self.pdi_documents.get(&document) {
            Some(entry) => entry.pdf.page(page_number).is_some(),
            None => {
                let message = format!("Handle {document} is not a valid PDI document");
                return self.fail_with(ERR_HANDLE, "open_pdi_page", message, INVALID_HANDLE);
            }
        };
        if !found {
            let message = format!("Page {page_number} not found in PDI document {document}");
            return self.fail_with(ERR_HANDLE, "open_pdi_page", message, INVALID_HANDLE);
        }

        if let Some(entry) = self.pdi_documents.get_mut(&document) {
            entry.open_pages += 1;
        }
        let handle = self.allocate_handle();
        self.pdi_pages.insert(handle, PdiPageEntry { document });
        self.clear_error();
        Ok(handle)
    }

    fn close_pdi_page(&mut self, page: Handle) -> EngineResult<()> {
        self.journal.record("close_pdi_page", page.to_string(), "");
        let Some(entry) = self.pdi_pages.remove(&page) else {
            return Err(self.exception(
                ERR_HANDLE,
                "close_pdi_page",
                format!("Handle {page} is not a valid PDI page"),
            ));
        };
        if let Some(document) = self.pdi_documents.get_mut(&entry.document) {
            document.open_pages = document.open_pages.saturating_sub(1);
        }
        Ok(())
    }

    fn fit_pdi_page(&mut self, page: Handle, x: f64, y: f64, optlist: &str) -> EngineResult<()> {
        self.journal
            .record("fit_pdi_page", format!("{page}@{x},{y}"), optlist);
        self.require_scope("fit_pdi_page", &[Scope::Page])?;
        self.parse_options("fit_pdi_page", optlist)?;
        if !self.pdi_pages.contains_key(&page) {
            return Err(self.exception(
                ERR_HANDLE,
                "fit_pdi_page",
                format!("Handle {page} is not a valid PDI page"),
            ));
        }
        Ok(())
    }

    fn load_image(
        &mut self,
        imagetype: &str,
        filename: &str,
        optlist: &str,
    ) -> EngineResult<Handle> {
        self.journal
            .record("load_image", format!("{imagetype}:{filename}"), optlist);
        if !matches!(self.scope, Scope::Document | Scope::Page) {
            let message = self.scope_message();
            return self.fail_with(ERR_WRONG_SCOPE, "load_image", message, INVALID_HANDLE);
        }
        if let Err(message) = OptionList::parse(optlist) {
            return self.fail_with(ERR_OPTION, "load_image", message, INVALID_HANDLE);
        }
        if !IMAGE_TYPES.contains(&imagetype) {
            let message = format!("Unknown image type '{imagetype}'");
            return self.fail_with(ERR_OPTION, "load_image", message, INVALID_HANDLE);
        }

        let (data, virtual_file) = match self.read_source(filename) {
            Ok(source) => source,
            Err(message) => {
                return self.fail_with(ERR_FILE_NOT_FOUND, "load_image", message, INVALID_HANDLE)
            }
        };
        let detected = match probe_image(&data) {
            Ok(detected) => detected,
            Err(reason) => {
                let message = format!("Couldn't load image '{filename}' ({reason})");
                return self.fail_with(ERR_IMAGE, "load_image", message, INVALID_HANDLE);
            }
        };
        if imagetype != "auto" && imagetype != detected {
            let message = format!("Image '{filename}' is not a {imagetype} image");
            return self.fail_with(ERR_IMAGE, "load_image", message, INVALID_HANDLE);
        }
        if detected == "unsupported" {
            let message = format!("Image '{filename}' has an unsupported format");
            return self.fail_with(ERR_IMAGE, "load_image", message, INVALID_HANDLE);
        }

        let locked_file = virtual_file.then(|| filename.to_string());
        if let Some(name) = &locked_file {
            self.lock_file(name);
        }
        let handle = self.allocate_handle();
        self.images.insert(handle, ImageEntry { locked_file });
        self.clear_error();
        Ok(handle)
    }

    fn close_image(&mut self, image: Handle) -> EngineResult<()> {
        self.journal.record("close_image", image.to_string(), "");
        let Some(entry) = self.images.remove(&image) else {
            return Err(self.exception(
                ERR_HANDLE,
                "close_image",
                format!("Handle {image} is not a valid image"),
            ));
        };
        self.unlock_file(entry.locked_file);
        Ok(())
    }

    fn fit_image(&mut self, image: Handle, x: f64, y: f64, optlist: &str) -> EngineResult<()> {
        self.journal
            .record("fit_image", format!("{image}@{x},{y}"), optlist);
        self.require_scope("fit_image", &[Scope::Page])?;
        self.parse_options("fit_image", optlist)?;
        if !self.images.contains_key(&image) {
            return Err(self.exception(
                ERR_HANDLE,
                "fit_image",
                format!("Handle {image} is not a valid image"),
            ));
        }
        Ok(())
    }

    fn pcos_get_number(&mut self, document: Handle, path: &str) -> EngineResult<f64> {
        self.journal
            .record("pcos_get_number", format!("{document}:{path}"), "");
        let Some(entry) = self.pdi_documents.get(&document) else {
            let message = format!("Handle {document} is not a valid PDI document");
            return self.fail_with(ERR_HANDLE, "pcos_get_number", message, -1.0);
        };

        let value = match path {
            "length:pages" => Some(entry.pdf.pages.len() as f64),
            "pdfversion" => Some(entry.pdf.version),
            _ => parse_page_path(path).and_then(|(index, key)| {
                let (width, height) = *entry.pdf.pages.get(index)?;
                match key {
                    "width" => Some(width),
                    "height" => Some(height),
                    _ => None,
                }
            }),
        };

        match value {
            Some(value) => Ok(value),
            None => {
                let message = format!("Couldn't resolve pCOS path '{path}'");
                self.fail_with(ERR_PCOS, "pcos_get_number", message, -1.0)
            }
        }
    }

    fn set_info(&mut self, key: &str, value: &str) -> EngineResult<()> {
        self.journal.record("set_info", key, value);
        if key.is_empty() {
            return Err(self.exception(
                ERR_OPTION,
                "set_info",
                "Info key must not be empty".to_string(),
            ));
        }
        let info = match self.output.as_mut() {
            Some(output) => &mut output.info,
            None => &mut self.pending_info,
        };
        info.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn setcolor(
        &mut self,
        fstype: &str,
        colorspace: &str,
        c1: f64,
        c2: f64,
        c3: f64,
        c4: f64,
    ) -> EngineResult<()> {
        self.journal.record(
            "setcolor",
            format!("{fstype} {colorspace} {c1} {c2} {c3} {c4}"),
            "",
        );
        self.require_scope("setcolor", &[Scope::Document, Scope::Page])?;

        let components: Vec<f64> = match colorspace {
            "gray" => vec![c1],
            "rgb" => vec![c1, c2, c3],
            "cmyk" => vec![c1, c2, c3, c4],
            other => {
                return Err(self.exception(
                    ERR_OPTION,
                    "setcolor",
                    format!("Unknown color space '{other}'"),
                ))
            }
        };
        let (fill, stroke) = match colorspace {
            "gray" => ("g", "G"),
            "rgb" => ("rg", "RG"),
            _ => ("k", "K"),
        };
        let operators = match fstype {
            "fill" => vec![fill],
            "stroke" => vec![stroke],
            "fillstroke" => vec![fill, stroke],
            other => {
                return Err(self.exception(
                    ERR_OPTION,
                    "setcolor",
                    format!("Unknown keyword '{other}' for parameter 'fstype'"),
                ))
            }
        };

        for operator in operators {
            let operands = components.iter().map(|&c| Object::Real(c as f32)).collect();
            self.draw(Operation::new(operator, operands));
        }
        Ok(())
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> EngineResult<()> {
        self.journal
            .record("rect", format!("{x} {y} {width} {height}"), "");
        self.require_scope("rect", &[Scope::Page])?;
        let operands = [x, y, width, height]
            .iter()
            .map(|&v| Object::Real(v as f32))
            .collect();
        self.draw(Operation::new("re", operands));
        Ok(())
    }

    fn stroke(&mut self) -> EngineResult<()> {
        self.journal.record("stroke", "", "");
        self.require_scope("stroke", &[Scope::Page])?;
        self.draw(Operation::new("S", vec![]));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compatibility() {
        assert_eq!(parse_compatibility("1.7"), Some("1.7".to_string()));
        assert_eq!(parse_compatibility("2.0"), Some("2.0".to_string()));
        assert_eq!(parse_compatibility("1.3"), None);
        assert_eq!(parse_compatibility("2.1"), None);
        assert_eq!(parse_compatibility("1.10"), None);
        assert_eq!(parse_compatibility("latest"), None);
    }

    #[test]
    fn test_parse_page_path() {
        assert_eq!(parse_page_path("pages[0]/width"), Some((0, "width")));
        assert_eq!(parse_page_path("pages[12]/height"), Some((12, "height")));
        assert_eq!(parse_page_path("pages[x]/height"), None);
        assert_eq!(parse_page_path("length:pages"), None);
    }

    #[test]
    fn test_rejected_option_leaves_engine_unchanged() {
        let mut engine = MemoryEngine::builder().accept_license("GOOD").build();
        let err = engine
            .set_option("errorpolicy=return license=BAD")
            .unwrap_err();
        assert_eq!(err.errnum, ERR_LICENSE);
        assert_eq!(engine.get_option("errorpolicy").as_deref(), Some("exception"));
        assert!(!engine.is_licensed());

        engine.set_option("license=GOOD").unwrap();
        assert!(engine.is_licensed());
    }

    #[test]
    fn test_drawing_operators_are_collected_on_the_page() {
        let mut engine = MemoryEngine::new();
        engine.begin_document("", "").unwrap();
        engine.begin_page_ext(100.0, 100.0, "").unwrap();
        engine.setcolor("stroke", "rgb", 1.0, 0.0, 0.0, 0.0).unwrap();
        engine.rect(10.0, 10.0, 50.0, 50.0).unwrap();
        engine.stroke().unwrap();

        let page = engine.current_page.as_ref().unwrap();
        let operators: Vec<&str> = page.operations.iter().map(|op| op.operator.as_str()).collect();
        assert_eq!(operators, vec!["RG", "re", "S"]);
    }
}
