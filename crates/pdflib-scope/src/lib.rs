//! # pdflib-scope
//!
//! Scope and resource lifecycle management for handle-based PDF engines.
//!
//! A [`PdfEngine`](pdflib_engine::PdfEngine) tracks one implicit scope
//! (object, document or page) and hands out bare integer handles. Calling a
//! function in the wrong scope or forgetting to close a handle leaves the
//! engine in a broken state. This crate wraps the engine in a small tree of
//! owners:
//!
//! - [`RootObject`] owns the engine, the virtual file namespace and at most
//!   one active [`Document`].
//! - [`Document`] owns at most one active [`Page`] plus the [`Image`]s and
//!   [`PdiPage`]s opened while it is active.
//! - [`PdiDocument`] owns the pages opened from it and optionally the
//!   [`VirtualFile`] it was read from.
//!
//! Closing an owner closes everything below it first, in a fixed order, and
//! every close is idempotent. Dropping a [`RootObject`] therefore tears down
//! the whole tree exactly once.
//!
//! ## Quick Start
//!
//! ```
//! use pdflib_engine::MemoryEngine;
//! use pdflib_scope::RootObject;
//!
//! let root = RootObject::new(Box::new(MemoryEngine::new()))?;
//! let document = root.create_document("", "")?;
//! document.set_title("Quick start")?;
//!
//! let mut page = document.create_page(595.0, 842.0, "")?;
//! document.set_color("stroke", "rgb", 1.0, 0.0, 0.0, 0.0)?;
//! document.draw_rectangle(50.0, 50.0, 200.0, 100.0)?;
//! document.stroke()?;
//! page.finish("")?;
//!
//! let pdf = document.finish(true, "")?.expect("document has a page");
//! assert!(pdf.starts_with(b"%PDF-"));
//! # Ok::<(), pdflib_scope::ScopeError>(())
//! ```
//!
//! Handles are `!Send`: a root object and everything created from it stay
//! on one thread.

pub mod config;
mod document;
mod error;
mod factory;
mod image;
mod lib_object;
mod page;
mod pdi;
mod root;
mod session;
pub mod version;
mod virtual_file;

pub use config::{load_config, Config, ConfigError, ConfigResult, RootConfig};
pub use document::{Document, META_AUTHOR, META_CREATOR, META_TITLE};
pub use error::{Result, ScopeError};
pub use factory::{EngineProvider, Factory};
pub use image::{Image, OPTION_ADJUST_PAGE};
pub use lib_object::{LibObject, ScopedObject};
pub use page::Page;
pub use pdi::{PdiDocument, PdiPage};
pub use root::RootObject;
pub use virtual_file::VirtualFile;
