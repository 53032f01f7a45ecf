//! Capabilities shared by every wrapper

use crate::error::Result;
use pdflib_engine::Scope;

/// Access to engine state every wrapper provides.
pub trait LibObject {
    /// Text of the engine's most recent error condition.
    fn last_error_message(&self) -> String;

    /// The current scope as tracked by the owning root object.
    fn current_scope(&self) -> Scope;
}

/// A wrapper that owns an engine scope.
///
/// Closing is idempotent: once closed, an object stays closed and further
/// `close` calls return `Ok(())` without touching the engine. Closing a
/// scope first closes everything opened inside it.
pub trait ScopedObject: LibObject {
    /// The scope this object owns.
    const SCOPE: Scope;

    /// Whether the scope is still active.
    fn is_open(&self) -> bool;

    /// End the scope.
    fn close(&mut self) -> Result<()>;
}

macro_rules! impl_lib_object {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::LibObject for $ty {
                fn last_error_message(&self) -> String {
                    self.session.borrow().last_error_message()
                }

                fn current_scope(&self) -> pdflib_engine::Scope {
                    self.session.borrow().scope()
                }
            }
        )+
    };
}

pub(crate) use impl_lib_object;
