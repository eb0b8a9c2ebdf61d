//! [`WindowBackend`] that draws nothing and logs every presentation change.
//!
//! Used by the daemon when no rendering layer is attached, and handy for
//! scripting the controllers over the event socket with `RUST_LOG=debug`.

use crate::ruler::{Orientation, Rect};
use crate::traits::WindowBackend;
use crate::window::WindowId;
use log::{debug, info, trace};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// What the backend last heard about one window.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub orientation: Orientation,
    pub frame: Rect,
    pub alpha: f64,
    pub floating: bool,
    pub shadow: bool,
    pub visible: bool,
    pub attached_to: Option<WindowId>,
}

/// Headless backend.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    surfaces: RefCell<BTreeMap<WindowId, Surface>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one surface.
    pub fn surface(&self, id: WindowId) -> Option<Surface> {
        self.surfaces.borrow().get(&id).cloned()
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.borrow().len()
    }

    fn with(&self, id: WindowId, f: impl FnOnce(&mut Surface)) {
        match self.surfaces.borrow_mut().get_mut(&id) {
            Some(s) => f(s),
            None => debug!("backend: update for unknown {}", id),
        }
    }
}

impl WindowBackend for HeadlessBackend {
    fn window_created(&self, id: WindowId, orientation: Orientation, frame: Rect) {
        info!("{}: new {} ruler at {:?}", id, orientation, frame);
        self.surfaces.borrow_mut().insert(
            id,
            Surface {
                orientation,
                frame,
                alpha: 1.0,
                floating: false,
                shadow: false,
                visible: false,
                attached_to: None,
            },
        );
    }

    fn window_destroyed(&self, id: WindowId) {
        info!("{}: closed", id);
        self.surfaces.borrow_mut().remove(&id);
    }

    fn set_frame(&self, id: WindowId, frame: Rect) {
        trace!("{}: frame {:?}", id, frame);
        self.with(id, |s| s.frame = frame);
    }

    fn set_alpha(&self, id: WindowId, alpha: f64) {
        debug!("{}: alpha {:.2}", id, alpha);
        self.with(id, |s| s.alpha = alpha);
    }

    fn set_floating(&self, id: WindowId, floating: bool) {
        debug!("{}: floating {}", id, floating);
        self.with(id, |s| s.floating = floating);
    }

    fn set_shadow(&self, id: WindowId, shadow: bool) {
        debug!("{}: shadow {}", id, shadow);
        self.with(id, |s| s.shadow = shadow);
    }

    fn invalidate_shadow(&self, id: WindowId) {
        trace!("{}: shadow invalidated", id);
    }

    fn add_child_below(&self, parent: WindowId, child: WindowId) {
        debug!("{}: attached below {}", child, parent);
        self.with(child, |s| s.attached_to = Some(parent));
    }

    fn remove_child(&self, parent: WindowId, child: WindowId) {
        debug!("{}: detached from {}", child, parent);
        self.with(child, |s| s.attached_to = None);
    }

    fn set_visible(&self, id: WindowId, visible: bool) {
        debug!("{}: {}", id, if visible { "shown" } else { "hidden" });
        self.with(id, |s| s.visible = visible);
    }
}
