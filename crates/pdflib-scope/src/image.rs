//! Loaded images

use crate::error::Result;
use crate::lib_object::impl_lib_object;
use crate::session::{ObjectId, ResourceKind, SharedSession};

/// Placement options `fit_on_page` uses when `options` is empty.
pub const OPTION_ADJUST_PAGE: &str = "adjustpage";

/// An image loaded into a [`Document`](crate::Document).
///
/// The document keeps the image open until it is closed explicitly or the
/// document finishes. Clones refer to the same image.
#[derive(Clone)]
pub struct Image {
    session: SharedSession,
    id: ObjectId,
}

impl Image {
    pub(crate) fn new(session: SharedSession, id: ObjectId) -> Self {
        Self { session, id }
    }

    /// Place the image on the current page. Requires page scope. Empty
    /// `options` means [`OPTION_ADJUST_PAGE`].
    pub fn fit_on_page(&self, x: f64, y: f64, options: &str) -> Result<()> {
        self.session
            .borrow_mut()
            .fit_resource(self.id, ResourceKind::Image, x, y, options)
    }

    /// Close the image handle. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        self.session.borrow_mut().close_resource(self.id)
    }

    pub fn is_closed(&self) -> bool {
        !self.session.borrow().is_resource_open(self.id)
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl_lib_object!(Image);
