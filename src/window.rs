//! Live ruler windows.
//!
//! The [`Desktop`] is the registry of every live window and the single
//! owner of its presentation state: frame, opacity, floating and shadow
//! flags, visibility, and the parent/child grouping links between windows.
//! It also tracks which window is key and queues the notifications a window
//! system would deliver after a state change ([`WindowEvent`]).
//!
//! Windows are referred to by [`WindowId`].  An id is resolved every time it
//! is used, so an id whose window has been destroyed simply resolves to
//! nothing and the operation becomes a no-op.
//!
//! A [`RulerWindow`] is the owning handle for one window: it is created by a
//! controller and destroys its window when dropped.  Other parties (a peer
//! controller grouping it, the key nudge listener) only ever hold the id.

use crate::event::Direction;
use crate::ruler::{Orientation, Rect, Ruler, SizeLimits};
use crate::traits::WindowBackend;
use log::{debug, trace, warn};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::rc::Rc;

/// Pixels moved by a plain arrow-key nudge.
pub const SMALL_STEP: f64 = 1.0;
/// Pixels moved by a nudge with Shift held.
pub const BIG_STEP: f64 = 10.0;

/// Handle to a window in the [`Desktop`].  Not an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Presentation state of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowState {
    pub orientation: Orientation,
    pub frame: Rect,
    pub limits: SizeLimits,
    /// Opacity in `[0.0, 1.0]`.
    pub alpha: f64,
    /// Always-on-top.
    pub floating: bool,
    pub shadow: bool,
    pub visible: bool,
    /// The window this one is attached to, if any.
    pub parent: Option<WindowId>,
    /// Windows attached below this one, in attach order.
    pub children: Vec<WindowId>,
}

/// Notifications queued by the desktop for the application to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// The window's origin changed (drag, nudge, reset, or its parent moved).
    Moved(WindowId),
    /// The window's size changed.
    Resized(WindowId),
    /// The window became key.
    BecameKey(WindowId),
    /// The window stopped being key.
    ResignedKey(WindowId),
}

impl WindowEvent {
    pub fn window(&self) -> WindowId {
        match *self {
            WindowEvent::Moved(id)
            | WindowEvent::Resized(id)
            | WindowEvent::BecameKey(id)
            | WindowEvent::ResignedKey(id) => id,
        }
    }
}

/// Registry of live windows.
///
/// All mutation happens on the application's event thread; interior
/// mutability lets controllers, the key listener and the application share
/// one `Rc<Desktop>`.
pub struct Desktop<B: WindowBackend> {
    backend: B,
    windows: RefCell<BTreeMap<WindowId, WindowState>>,
    next_id: Cell<u64>,
    key_window: Cell<Option<WindowId>>,
    pending: RefCell<VecDeque<WindowEvent>>,
}

impl<B: WindowBackend> Desktop<B> {
    pub fn new(backend: B) -> Rc<Self> {
        Rc::new(Self {
            backend,
            windows: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(1),
            key_window: Cell::new(None),
            pending: RefCell::new(VecDeque::new()),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    //  lifecycle

    fn create(&self, ruler: &Ruler) -> WindowId {
        let id = WindowId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let state = WindowState {
            orientation: ruler.orientation(),
            frame: ruler.frame(),
            limits: ruler.size_limits(),
            alpha: 1.0,
            floating: false,
            shadow: false,
            visible: false,
            parent: None,
            children: Vec::new(),
        };
        self.windows.borrow_mut().insert(id, state);
        self.backend
            .window_created(id, ruler.orientation(), ruler.frame());
        debug!("created {} ({})", id, ruler.orientation());
        id
    }

    fn destroy(&self, id: WindowId) {
        let Some(state) = self.windows.borrow_mut().remove(&id) else {
            return;
        };
        {
            let mut windows = self.windows.borrow_mut();
            if let Some(parent) = state.parent {
                if let Some(p) = windows.get_mut(&parent) {
                    p.children.retain(|c| *c != id);
                }
                self.backend.remove_child(parent, id);
            }
            for child in &state.children {
                if let Some(c) = windows.get_mut(child) {
                    c.parent = None;
                }
                self.backend.remove_child(id, *child);
            }
        }
        if self.key_window.get() == Some(id) {
            self.key_window.set(None);
        }
        self.pending.borrow_mut().retain(|e| e.window() != id);
        self.backend.window_destroyed(id);
        debug!("destroyed {}", id);
    }

    //  queries

    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.borrow().contains_key(&id)
    }

    /// Snapshot of a window's state.
    pub fn state(&self, id: WindowId) -> Option<WindowState> {
        self.windows.borrow().get(&id).cloned()
    }

    pub fn frame(&self, id: WindowId) -> Option<Rect> {
        self.windows.borrow().get(&id).map(|w| w.frame)
    }

    pub fn children(&self, id: WindowId) -> Vec<WindowId> {
        self.windows
            .borrow()
            .get(&id)
            .map(|w| w.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: WindowId) -> Option<WindowId> {
        self.windows.borrow().get(&id).and_then(|w| w.parent)
    }

    /// Number of live windows.
    pub fn len(&self) -> usize {
        self.windows.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    //  presentation

    /// Set the opacity, clamped to `[0.0, 1.0]`.  Returns whether it changed.
    pub fn set_alpha(&self, id: WindowId, alpha: f64) -> bool {
        let alpha = if alpha.is_nan() { 1.0 } else { alpha.clamp(0.0, 1.0) };
        let changed = self.update(id, |w| {
            if w.alpha == alpha {
                return false;
            }
            w.alpha = alpha;
            true
        });
        if changed {
            trace!("{} alpha {:.2}", id, alpha);
            self.backend.set_alpha(id, alpha);
        }
        changed
    }

    pub fn set_floating(&self, id: WindowId, floating: bool) -> bool {
        let changed = self.update(id, |w| std::mem::replace(&mut w.floating, floating) != floating);
        if changed {
            debug!("{} floating={}", id, floating);
            self.backend.set_floating(id, floating);
        }
        changed
    }

    pub fn set_shadow(&self, id: WindowId, shadow: bool) -> bool {
        let changed = self.update(id, |w| std::mem::replace(&mut w.shadow, shadow) != shadow);
        if changed {
            debug!("{} shadow={}", id, shadow);
            self.backend.set_shadow(id, shadow);
        }
        changed
    }

    /// Ask the backend to recompute the window's shadow.
    pub fn invalidate_shadow(&self, id: WindowId) {
        if self.contains(id) {
            self.backend.invalidate_shadow(id);
        }
    }

    /// Order the window and its attached children in.
    pub fn order_front(&self, id: WindowId) {
        self.set_visible_tree(id, true);
    }

    /// Order the window and its attached children out.
    pub fn order_out(&self, id: WindowId) {
        self.set_visible_tree(id, false);
    }

    fn set_visible_tree(&self, id: WindowId, visible: bool) {
        for window in self.subtree(id) {
            let changed =
                self.update(window, |w| std::mem::replace(&mut w.visible, visible) != visible);
            if changed {
                self.backend.set_visible(window, visible);
            }
        }
    }

    //  geometry

    /// Translate the window, and every window attached under it, by
    /// `(dx, dy)`.  No bounds clamping: a ruler may move off-screen.
    pub fn move_by(&self, id: WindowId, dx: f64, dy: f64) -> bool {
        if !self.contains(id) {
            return false;
        }
        if dx == 0.0 && dy == 0.0 {
            return true;
        }
        for window in self.subtree(id) {
            let frame = self.update(window, |w| {
                w.frame = w.frame.offset(dx, dy);
                Some(w.frame)
            });
            if let Some(frame) = frame {
                trace!("{} moved to ({}, {})", window, frame.x, frame.y);
                self.backend.set_frame(window, frame);
                self.pending.borrow_mut().push_back(WindowEvent::Moved(window));
            }
        }
        true
    }

    /// Move the window one step in `direction`: [`BIG_STEP`] pixels if
    /// `big_step`, otherwise [`SMALL_STEP`].
    pub fn nudge(&self, id: WindowId, direction: Direction, big_step: bool) -> bool {
        let step = if big_step { BIG_STEP } else { SMALL_STEP };
        let (ux, uy) = direction.unit();
        self.move_by(id, ux * step, uy * step)
    }

    /// Apply a new frame, clamping its size to the window's limits.
    ///
    /// A change of origin moves attached children along, exactly like
    /// [`move_by`](Self::move_by).
    pub fn set_frame(&self, id: WindowId, frame: Rect) -> bool {
        if !frame.is_valid() {
            warn!("{}: ignoring invalid frame {:?}", id, frame);
            return false;
        }
        let Some(current) = self.state(id) else {
            return false;
        };
        let frame = current.limits.clamp(frame);
        let resized = frame.width != current.frame.width || frame.height != current.frame.height;
        if resized {
            self.update(id, |w| {
                w.frame.width = frame.width;
                w.frame.height = frame.height;
            });
            self.backend.set_frame(id, self.frame(id).unwrap_or(frame));
            self.pending.borrow_mut().push_back(WindowEvent::Resized(id));
        }
        self.move_by(id, frame.x - current.frame.x, frame.y - current.frame.y)
    }

    //  grouping

    /// Attach `child` below `parent`.
    ///
    /// Attaching an existing link, or a window that no longer exists, is a
    /// no-op.  A window attached elsewhere is detached from its old parent
    /// first.  A link that would form a cycle is refused.
    pub fn attach_child(&self, parent: WindowId, child: WindowId) -> bool {
        if parent == child || !self.contains(parent) || !self.contains(child) {
            debug!("attach {} under {}: not applicable", child, parent);
            return false;
        }
        if self.parent(child) == Some(parent) {
            return true;
        }
        if self.ancestors(parent).contains(&child) {
            warn!("attach {} under {} refused: would form a cycle", child, parent);
            return false;
        }
        if let Some(old) = self.parent(child) {
            self.detach_child(old, child);
        }
        {
            let mut windows = self.windows.borrow_mut();
            if let Some(c) = windows.get_mut(&child) {
                c.parent = Some(parent);
            }
            if let Some(p) = windows.get_mut(&parent) {
                p.children.push(child);
            }
        }
        debug!("attached {} below {}", child, parent);
        self.backend.add_child_below(parent, child);
        true
    }

    /// Remove the link between `parent` and `child`; a no-op if there is none.
    pub fn detach_child(&self, parent: WindowId, child: WindowId) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        {
            let mut windows = self.windows.borrow_mut();
            if let Some(c) = windows.get_mut(&child) {
                c.parent = None;
            }
            if let Some(p) = windows.get_mut(&parent) {
                p.children.retain(|c| *c != child);
            }
        }
        debug!("detached {} from {}", child, parent);
        self.backend.remove_child(parent, child);
        true
    }

    //  focus

    pub fn key_window(&self) -> Option<WindowId> {
        self.key_window.get()
    }

    pub fn is_key(&self, id: WindowId) -> bool {
        self.key_window.get() == Some(id)
    }

    /// Make `id` the key window.  The previous key window resigns first.
    pub fn make_key(&self, id: WindowId) -> bool {
        if !self.contains(id) {
            return false;
        }
        match self.key_window.get() {
            Some(current) if current == id => return true,
            Some(current) => {
                self.key_window.set(None);
                self.pending
                    .borrow_mut()
                    .push_back(WindowEvent::ResignedKey(current));
            }
            None => {}
        }
        self.key_window.set(Some(id));
        self.pending.borrow_mut().push_back(WindowEvent::BecameKey(id));
        true
    }

    /// Stop `id` from being key; a no-op if it is not key.
    pub fn resign_key(&self, id: WindowId) -> bool {
        if self.key_window.get() != Some(id) {
            return false;
        }
        self.key_window.set(None);
        self.pending
            .borrow_mut()
            .push_back(WindowEvent::ResignedKey(id));
        true
    }

    //  notifications

    /// Take the oldest queued notification.
    pub fn poll_event(&self) -> Option<WindowEvent> {
        self.pending.borrow_mut().pop_front()
    }

    //  internals

    fn update<T: Default>(&self, id: WindowId, f: impl FnOnce(&mut WindowState) -> T) -> T {
        self.windows
            .borrow_mut()
            .get_mut(&id)
            .map(f)
            .unwrap_or_default()
    }

    /// `id` followed by every window attached under it, depth first.
    fn subtree(&self, id: WindowId) -> Vec<WindowId> {
        let windows = self.windows.borrow();
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(w) = stack.pop() {
            let Some(state) = windows.get(&w) else { continue };
            if !seen.insert(w) {
                continue;
            }
            order.push(w);
            stack.extend(state.children.iter().rev().copied());
        }
        order
    }

    fn ancestors(&self, id: WindowId) -> Vec<WindowId> {
        let mut out = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            if out.contains(&p) {
                break;
            }
            out.push(p);
            cursor = self.parent(p);
        }
        out
    }
}

/// Owning handle to one ruler window.
///
/// Every operation is a local state change with no failure path; setting a
/// value that is already current and detaching a peer that is not attached
/// are no-ops.  Dropping the handle destroys the window and removes every
/// grouping link that names it.
pub struct RulerWindow<B: WindowBackend> {
    id: WindowId,
    desktop: Rc<Desktop<B>>,
}

impl<B: WindowBackend> RulerWindow<B> {
    /// Create a hidden window for `ruler` at the ruler's frame.
    pub fn create(desktop: &Rc<Desktop<B>>, ruler: &Ruler) -> Self {
        let id = desktop.create(ruler);
        Self {
            id,
            desktop: Rc::clone(desktop),
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn desktop(&self) -> &Rc<Desktop<B>> {
        &self.desktop
    }

    pub fn frame(&self) -> Rect {
        self.desktop.frame(self.id).unwrap_or_default()
    }

    pub fn set_frame(&self, frame: Rect) {
        self.desktop.set_frame(self.id, frame);
    }

    pub fn opacity(&self) -> f64 {
        self.desktop.state(self.id).map(|w| w.alpha).unwrap_or(0.0)
    }

    /// Set the transparency; `alpha` is clamped to `[0.0, 1.0]`.
    pub fn set_opacity(&self, alpha: f64) {
        self.desktop.set_alpha(self.id, alpha);
    }

    pub fn is_floating(&self) -> bool {
        self.desktop.state(self.id).is_some_and(|w| w.floating)
    }

    pub fn set_floating(&self, floating: bool) {
        self.desktop.set_floating(self.id, floating);
    }

    pub fn has_shadow(&self) -> bool {
        self.desktop.state(self.id).is_some_and(|w| w.shadow)
    }

    pub fn set_shadow(&self, shadow: bool) {
        self.desktop.set_shadow(self.id, shadow);
    }

    pub fn is_visible(&self) -> bool {
        self.desktop.state(self.id).is_some_and(|w| w.visible)
    }

    pub fn is_key(&self) -> bool {
        self.desktop.is_key(self.id)
    }

    pub fn move_by(&self, dx: f64, dy: f64) {
        self.desktop.move_by(self.id, dx, dy);
    }

    pub fn nudge(&self, direction: Direction, big_step: bool) {
        self.desktop.nudge(self.id, direction, big_step);
    }

    /// Recompute the cached shadow after the window moved.
    pub fn invalidate_visual_shadow(&self) {
        self.desktop.invalidate_shadow(self.id);
    }

    /// Attach `peer` below this window.
    pub fn attach_child(&self, peer: WindowId) -> bool {
        self.desktop.attach_child(self.id, peer)
    }

    /// Detach `peer` from this window; a no-op if it is not attached.
    pub fn detach_child(&self, peer: WindowId) -> bool {
        self.desktop.detach_child(self.id, peer)
    }

    pub fn children(&self) -> Vec<WindowId> {
        self.desktop.children(self.id)
    }

    pub fn order_front(&self) {
        self.desktop.order_front(self.id);
    }

    pub fn order_out(&self) {
        self.desktop.order_out(self.id);
    }
}

impl<B: WindowBackend> Drop for RulerWindow<B> {
    fn drop(&mut self) {
        self.desktop.destroy(self.id);
    }
}
