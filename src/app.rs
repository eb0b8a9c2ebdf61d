//! The application orchestrator.
//!
//! [`RulerApp`] owns the shared collaborators (preference store, desktop,
//! key monitor chain) and the two ruler controllers, and reacts to
//! [`Event`]s by routing them to the right controller or collaborator.
//!
//! After each event the desktop's queued [`WindowEvent`]s are delivered to
//! the controller owning the window, the way a window system posts its
//! notifications once the triggering action has completed.

use crate::config::Config;
use crate::controller::{AppContext, RulerController};
use crate::event::Event;
use crate::keys::{KeyEvent, KeyMonitors};
use crate::positions::SavedPositions;
use crate::prefs::PreferenceStore;
use crate::ruler::{Orientation, Ruler, RulerError};
use crate::traits::WindowBackend;
use crate::window::{Desktop, WindowEvent, WindowId};
use log::{debug, info, warn};
use std::cell::RefCell;
use std::rc::Rc;

type Controller<B> = Rc<RefCell<RulerController<B>>>;

/// Owns the horizontal and vertical rulers and everything they share.
///
/// The application is generic over any [`WindowBackend`], so the same
/// routing runs against the headless logging backend and the recording
/// backend used in tests.
pub struct RulerApp<B: WindowBackend + 'static> {
    ctx: AppContext<B>,
    horizontal: Controller<B>,
    vertical: Controller<B>,
    preferences_open: bool,
}

impl<B: WindowBackend + 'static> RulerApp<B> {
    /// Create both rulers.  A ruler whose name has a saved frame starts
    /// there; otherwise it starts at its default frame on the configured
    /// screen.  The rulers are each other's grouping peer.
    pub fn new(backend: B, config: &Config, positions: &SavedPositions) -> Result<Self, RulerError> {
        let ctx = AppContext {
            desktop: Desktop::new(backend),
            prefs: PreferenceStore::new(config.preferences.normalized()),
            key_monitors: KeyMonitors::new(),
            screen: config.screen,
        };
        let ruler = |orientation: Orientation| {
            let name = orientation.to_string();
            match positions.get(&name) {
                Some(frame) => Ruler::new(orientation, Some(name), frame),
                None => {
                    debug!("no saved frame for {}, using default", name);
                    Ruler::with_default_frame(orientation, Some(name), &config.screen)
                }
            }
        };
        let horizontal = RulerController::new(ruler(Orientation::Horizontal)?, &ctx);
        let vertical = RulerController::new(ruler(Orientation::Vertical)?, &ctx);

        let (h_id, v_id) = (horizontal.borrow().window_id(), vertical.borrow().window_id());
        horizontal.borrow_mut().set_other_window(Some(v_id));
        vertical.borrow_mut().set_other_window(Some(h_id));

        Ok(Self {
            ctx,
            horizontal,
            vertical,
            preferences_open: false,
        })
    }

    pub fn desktop(&self) -> &Rc<Desktop<B>> {
        &self.ctx.desktop
    }

    pub fn prefs(&self) -> &Rc<PreferenceStore> {
        &self.ctx.prefs
    }

    pub fn key_monitors(&self) -> &Rc<KeyMonitors> {
        &self.ctx.key_monitors
    }

    pub fn controller(&self, orientation: Orientation) -> &Controller<B> {
        match orientation {
            Orientation::Horizontal => &self.horizontal,
            Orientation::Vertical => &self.vertical,
        }
    }

    pub fn window_id(&self, orientation: Orientation) -> WindowId {
        self.controller(orientation).borrow().window_id()
    }

    pub fn is_preferences_open(&self) -> bool {
        self.preferences_open
    }

    fn controllers(&self) -> [&Controller<B>; 2] {
        [&self.horizontal, &self.vertical]
    }

    /// Process a single [`Event`].
    ///
    /// Nothing here fails: unknown preference names, mistyped values and
    /// operations on windows that are gone are logged and ignored.
    pub fn handle(&mut self, event: Event) {
        match event {
            Event::ShowRulers => {
                info!("showing rulers");
                for c in self.controllers() {
                    c.borrow().show_window();
                }
            }

            Event::Hide(o) => self.controller(o).borrow().hide_window(),

            Event::Focus(o) => {
                let id = self.window_id(o);
                if !self.ctx.desktop.make_key(id) {
                    warn!("cannot focus {} ruler: {} is gone", o, id);
                }
            }

            Event::ResignFocus(o) => {
                self.ctx.desktop.resign_key(self.window_id(o));
            }

            Event::WillMove(o) => self.controller(o).borrow().window_will_move(),

            Event::Drag(drag) => {
                let id = self.window_id(drag.ruler);
                self.ctx.desktop.move_by(id, drag.dx, drag.dy);
            }

            Event::Resize(resize) => {
                let id = self.window_id(resize.ruler);
                self.ctx.desktop.set_frame(id, resize.frame);
            }

            Event::StartLiveResize(o) => self
                .controller(o)
                .borrow()
                .window_will_start_live_resize(),

            Event::EndLiveResize(o) => self.controller(o).borrow().window_did_end_live_resize(),

            Event::KeyDown(key) => {
                if let Some(unhandled) = self.key_down(key) {
                    debug!("key {} not handled", unhandled);
                }
            }

            Event::PreferencesOpened => self.set_preferences_open(true),

            Event::PreferencesClosed => self.set_preferences_open(false),

            Event::SetPreference(update) => {
                match self.ctx.prefs.set_named(&update.name, &update.value) {
                    Ok(true) => info!("preference {} set to {}", update.name, update.value),
                    Ok(false) => debug!("preference {} unchanged", update.name),
                    Err(e) => warn!("ignoring preference update: {}", e),
                }
            }

            Event::Foreground | Event::AppActivated => {
                for c in self.controllers() {
                    c.borrow_mut().foreground();
                }
            }

            Event::Background | Event::AppDeactivated => {
                for c in self.controllers() {
                    c.borrow_mut().background();
                }
            }

            Event::ResetPosition => {
                info!("resetting ruler positions");
                // Parents first: resetting a parent drags its children along.
                let mut order = self.controllers();
                order.sort_by_key(|c| self.ctx.desktop.parent(c.borrow().window_id()).is_some());
                for c in order {
                    c.borrow().reset_position();
                }
            }

            Event::Quit => debug!("quit is handled by the event loop"),
        }
        self.deliver_window_events();
    }

    /// Run a key event through the local monitor chain.  Returns the event
    /// if no monitor consumed it.
    pub fn key_down(&self, event: KeyEvent) -> Option<KeyEvent> {
        let passed = self.ctx.key_monitors.dispatch(event);
        self.deliver_window_events();
        passed
    }

    /// Open or close the (process-wide) preferences panel.
    pub fn set_preferences_open(&mut self, open: bool) {
        if self.preferences_open == open {
            return;
        }
        info!("preferences panel {}", if open { "opened" } else { "closed" });
        self.preferences_open = open;
        for c in self.controllers() {
            c.borrow_mut().set_preferences_open(open);
        }
    }

    /// Current frames of the named rulers.
    pub fn positions(&self) -> SavedPositions {
        let mut positions = SavedPositions::new();
        for c in self.controllers() {
            let c = c.borrow();
            if let Some(name) = c.ruler().name() {
                positions.record(name, c.window().frame());
            }
        }
        positions
    }

    fn controller_for(&self, id: WindowId) -> Option<&Controller<B>> {
        self.controllers()
            .into_iter()
            .find(|c| c.borrow().window_id() == id)
    }

    fn deliver_window_events(&self) {
        while let Some(event) = self.ctx.desktop.poll_event() {
            let Some(controller) = self.controller_for(event.window()) else {
                debug!("dropping {:?} for unknown window", event);
                continue;
            };
            match event {
                WindowEvent::Moved(_) => controller.borrow().window_did_move(),
                WindowEvent::Resized(_) => controller.borrow().window_did_resize(),
                WindowEvent::BecameKey(_) => controller.borrow_mut().window_did_become_key(),
                WindowEvent::ResignedKey(_) => controller.borrow_mut().window_did_resign_key(),
            }
        }
    }
}
