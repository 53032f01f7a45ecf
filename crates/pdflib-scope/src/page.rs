//! Page scope

use crate::error::Result;
use crate::lib_object::{impl_lib_object, ScopedObject};
use crate::session::{ObjectId, ScopeState, SharedSession};
use pdflib_engine::Scope;
use tracing::warn;

/// An open page of a [`Document`](crate::Document).
///
/// Created by [`Document::create_page`](crate::Document::create_page). At most
/// one page per document is open at a time. The page scope ends on
/// [`finish`](Page::finish), on drop, or when the document finishes.
pub struct Page {
    session: SharedSession,
    document: ObjectId,
    id: ObjectId,
    state: ScopeState,
}

impl Page {
    pub(crate) fn new(session: SharedSession, document: ObjectId, id: ObjectId) -> Self {
        Self {
            session,
            document,
            id,
            state: ScopeState::Open,
        }
    }

    /// End the page scope. Later calls do nothing.
    pub fn finish(&mut self, options: &str) -> Result<()> {
        if self.state != ScopeState::Open {
            return Ok(());
        }
        self.state = ScopeState::Closing;
        let result = self
            .session
            .borrow_mut()
            .end_page(self.document, self.id, options);
        self.state = ScopeState::Closed;
        result
    }
}

impl ScopedObject for Page {
    const SCOPE: Scope = Scope::Page;

    fn is_open(&self) -> bool {
        self.state == ScopeState::Open
            && self.session.borrow().is_page_open(self.document, self.id)
    }

    fn close(&mut self) -> Result<()> {
        self.finish("")
    }
}

impl Drop for Page {
    fn drop(&mut self) {
        if let Err(err) = self.finish("") {
            if !err.is_fatal() {
                warn!("failed to finish page: {err}");
            }
        }
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("document", &self.document)
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}

impl_lib_object!(Page);
