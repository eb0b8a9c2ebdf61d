//! Test doubles shared by the unit tests.

use crate::ruler::{Orientation, Rect};
use crate::traits::WindowBackend;
use crate::window::WindowId;
use std::cell::RefCell;

/// One call made to a [`RecorderBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Created(WindowId, Orientation, Rect),
    Destroyed(WindowId),
    Frame(WindowId, Rect),
    Alpha(WindowId, f64),
    Floating(WindowId, bool),
    Shadow(WindowId, bool),
    InvalidateShadow(WindowId),
    AddChild(WindowId, WindowId),
    RemoveChild(WindowId, WindowId),
    Visible(WindowId, bool),
}

/// Record-keeping mock backend.
#[derive(Debug, Default)]
pub struct RecorderBackend {
    pub calls: RefCell<Vec<BackendCall>>,
}

impl RecorderBackend {
    /// Number of recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    fn push(&self, call: BackendCall) {
        self.calls.borrow_mut().push(call);
    }
}

impl WindowBackend for RecorderBackend {
    fn window_created(&self, id: WindowId, orientation: Orientation, frame: Rect) {
        self.push(BackendCall::Created(id, orientation, frame));
    }

    fn window_destroyed(&self, id: WindowId) {
        self.push(BackendCall::Destroyed(id));
    }

    fn set_frame(&self, id: WindowId, frame: Rect) {
        self.push(BackendCall::Frame(id, frame));
    }

    fn set_alpha(&self, id: WindowId, alpha: f64) {
        self.push(BackendCall::Alpha(id, alpha));
    }

    fn set_floating(&self, id: WindowId, floating: bool) {
        self.push(BackendCall::Floating(id, floating));
    }

    fn set_shadow(&self, id: WindowId, shadow: bool) {
        self.push(BackendCall::Shadow(id, shadow));
    }

    fn invalidate_shadow(&self, id: WindowId) {
        self.push(BackendCall::InvalidateShadow(id));
    }

    fn add_child_below(&self, parent: WindowId, child: WindowId) {
        self.push(BackendCall::AddChild(parent, child));
    }

    fn remove_child(&self, parent: WindowId, child: WindowId) {
        self.push(BackendCall::RemoveChild(parent, child));
    }

    fn set_visible(&self, id: WindowId, visible: bool) {
        self.push(BackendCall::Visible(id, visible));
    }
}
