//! Named in-memory files registered with the engine

use crate::error::Result;
use crate::lib_object::impl_lib_object;
use crate::session::SharedSession;
use std::fmt;
use tracing::warn;

/// An in-memory byte buffer the engine can open like a file.
///
/// Created through [`RootObject::create_virtual_file`](crate::RootObject::create_virtual_file).
/// The name can be passed anywhere the engine expects a path. Dropping the
/// value deletes the file, or queues the delete until the engine releases it.
pub struct VirtualFile {
    session: SharedSession,
    name: String,
    deleted: bool,
}

impl VirtualFile {
    pub(crate) fn new(session: SharedSession, name: String) -> Self {
        Self {
            session,
            name,
            deleted: false,
        }
    }

    /// The name the file is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Delete the file from the engine.
    ///
    /// Returns `Ok(true)` once the file is gone, including on repeated calls.
    /// Returns `Ok(false)` if the engine still has the file open; the file
    /// then stays registered and a later call (or drop) tries again.
    pub fn delete(&mut self) -> Result<bool> {
        if self.deleted {
            return Ok(true);
        }
        let deleted = self.session.borrow_mut().delete_virtual_file(&self.name)?;
        self.deleted = deleted;
        Ok(deleted)
    }
}

impl AsRef<str> for VirtualFile {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for VirtualFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for VirtualFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualFile")
            .field("name", &self.name)
            .field("deleted", &self.deleted)
            .finish()
    }
}

impl Drop for VirtualFile {
    fn drop(&mut self) {
        match self.delete() {
            Ok(true) => {}
            Ok(false) => self
                .session
                .borrow_mut()
                .defer_virtual_file_delete(&self.name),
            Err(err) if err.is_fatal() => {}
            Err(err) => warn!(name = %self.name, "failed to delete virtual file: {err}"),
        }
    }
}

impl_lib_object!(VirtualFile);
