//! Exclusive checkout of a session's controller.
//!
//! A run holds the controller for its whole span, from the first byte
//! of the upload to the last stage. While it does, further checkouts
//! fail, so a second upload is refused instead of racing the first
//! against the backend's single stored file.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::controller::PipelineController;

type Home<B> = Rc<RefCell<Option<PipelineController<B>>>>;

/// Shared home of a session's [`PipelineController`].
///
/// Clones share the same controller.
pub struct ControllerSlot<B> {
    home: Home<B>,
}

impl<B> ControllerSlot<B> {
    /// Place `controller` in a new slot.
    #[must_use]
    pub fn new(controller: PipelineController<B>) -> Self {
        Self {
            home: Rc::new(RefCell::new(Some(controller))),
        }
    }

    /// Take the controller for a run, or `None` while another
    /// [`Lease`] holds it.
    #[must_use]
    pub fn checkout(&self) -> Option<Lease<B>> {
        let controller = self.home.borrow_mut().take()?;
        Some(Lease {
            controller: Some(controller),
            home: Rc::clone(&self.home),
        })
    }

    /// Whether a lease currently holds the controller.
    #[must_use]
    pub fn is_checked_out(&self) -> bool {
        self.home.borrow().is_none()
    }
}

impl<B> Clone for ControllerSlot<B> {
    fn clone(&self) -> Self {
        Self {
            home: Rc::clone(&self.home),
        }
    }
}

impl<B> fmt::Debug for ControllerSlot<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerSlot")
            .field("checked_out", &self.is_checked_out())
            .finish()
    }
}

/// A checked-out controller.
///
/// Dropping the lease returns the controller to its slot, including
/// when the task holding it is cancelled mid-run.
pub struct Lease<B> {
    controller: Option<PipelineController<B>>,
    home: Home<B>,
}

impl<B> Lease<B> {
    /// The leased controller.
    pub const fn controller(&mut self) -> Option<&mut PipelineController<B>> {
        self.controller.as_mut()
    }
}

impl<B> Drop for Lease<B> {
    fn drop(&mut self) {
        if let Some(controller) = self.controller.take() {
            *self.home.borrow_mut() = Some(controller);
        }
    }
}

impl<B> fmt::Debug for Lease<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease").finish_non_exhaustive()
    }
}
