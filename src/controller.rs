//! The per-ruler controller.
//!
//! A [`RulerController`] owns one [`RulerWindow`] and keeps it consistent
//! with four independently changing inputs:
//!
//! * the shared [`PreferenceStore`] (opacity levels, floating, grouping,
//!   shadow), observed through a [`Subscription`];
//! * focus changes of its own window, which attach and detach a
//!   [`KeyNudgeListener`];
//! * the grouping peer (`other_window`), which is attached below this
//!   window while grouping is on and this window is focused;
//! * the process-wide preferences panel, which suspends floating while open
//!   and resets the opacity to the foreground level when it closes.
//!
//! Every transition is an explicit method; there are no implicit hooks.
//! Each handler recomputes the derived state from its inputs, so any
//! interleaving of focus and preference events converges to the same
//! window state.

use crate::keys::{KeyMonitors, KeyNudgeListener};
use crate::prefs::{opacity_alpha, PrefKey, PreferenceStore, PreferenceSubscriber, Subscription};
use crate::ruler::{default_frame, Ruler, ScreenInfo};
use crate::traits::WindowBackend;
use crate::window::{Desktop, RulerWindow, WindowId};
use log::{debug, trace};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Shared collaborators every controller needs.
pub struct AppContext<B: WindowBackend> {
    pub desktop: Rc<Desktop<B>>,
    pub prefs: Rc<PreferenceStore>,
    pub key_monitors: Rc<KeyMonitors>,
    /// Screen the default ruler frames are computed for.
    pub screen: ScreenInfo,
}

impl<B: WindowBackend> Clone for AppContext<B> {
    fn clone(&self) -> Self {
        Self {
            desktop: Rc::clone(&self.desktop),
            prefs: Rc::clone(&self.prefs),
            key_monitors: Rc::clone(&self.key_monitors),
            screen: self.screen,
        }
    }
}

/// Which opacity preference the window currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpacityMode {
    Foreground,
    Background,
}

/// Reactive coordinator for one ruler window.
pub struct RulerController<B: WindowBackend + 'static> {
    ruler: Ruler,
    window: RulerWindow<B>,
    other_window: Option<WindowId>,
    ctx: AppContext<B>,
    focused: bool,
    preferences_open: bool,
    opacity_mode: OpacityMode,
    key_listener: Option<KeyNudgeListener>,
    subscription: Option<Subscription>,
}

impl<B: WindowBackend + 'static> RulerController<B> {
    /// Create the controller and its (hidden) window, and subscribe to every
    /// preference the window depends on.
    ///
    /// # Panics
    ///
    /// If `ruler` has an invalid frame.  [`Ruler::new`] never produces one,
    /// so this only fires on misuse.
    pub fn new(ruler: Ruler, ctx: &AppContext<B>) -> Rc<RefCell<Self>> {
        assert!(
            ruler.frame().is_valid(),
            "ruler controller needs a valid ruler, got {:?}",
            ruler
        );
        Rc::new_cyclic(|weak: &Weak<RefCell<Self>>| {
            let listener: Weak<RefCell<dyn PreferenceSubscriber>> = weak.clone();
            let subscription = ctx.prefs.register(listener);
            for key in PrefKey::ALL {
                subscription.subscribe(key);
            }
            let window = RulerWindow::create(&ctx.desktop, &ruler);
            let controller = Self {
                ruler,
                window,
                other_window: None,
                ctx: ctx.clone(),
                focused: false,
                preferences_open: false,
                opacity_mode: OpacityMode::Foreground,
                key_listener: None,
                subscription: Some(subscription),
            };
            controller.apply_opacity();
            controller.update_floating();
            controller.update_shadow();
            debug!(
                "controller for {} ruler created ({})",
                controller.ruler.orientation(),
                controller.window.id()
            );
            RefCell::new(controller)
        })
    }

    pub fn ruler(&self) -> &Ruler {
        &self.ruler
    }

    pub fn window(&self) -> &RulerWindow<B> {
        &self.window
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn other_window(&self) -> Option<WindowId> {
        self.other_window
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_preferences_open(&self) -> bool {
        self.preferences_open
    }

    pub fn opacity_mode(&self) -> OpacityMode {
        self.opacity_mode
    }

    pub fn has_key_listener(&self) -> bool {
        self.key_listener.is_some()
    }

    //  requests from the application

    /// Order the window in.
    pub fn show_window(&self) {
        self.window.order_front();
    }

    /// Order the window (and anything grouped under it) out.
    pub fn hide_window(&self) {
        self.window.order_out();
    }

    /// Set the grouping peer.  A link to the previous peer is removed first.
    pub fn set_other_window(&mut self, other: Option<WindowId>) {
        if self.other_window == other {
            return;
        }
        if let Some(previous) = self.other_window.take() {
            self.window.detach_child(previous);
        }
        self.other_window = other;
        self.update_child_window();
    }

    /// Show the foreground opacity level.
    pub fn foreground(&mut self) {
        self.opacity_mode = OpacityMode::Foreground;
        self.apply_opacity();
    }

    /// Show the background opacity level.
    pub fn background(&mut self) {
        self.opacity_mode = OpacityMode::Background;
        self.apply_opacity();
    }

    /// Move the window back to the default frame for its orientation.
    pub fn reset_position(&self) {
        let frame = default_frame(self.ruler.orientation(), &self.ctx.screen);
        debug!("{}: reset to {:?}", self.window.id(), frame);
        self.window.set_frame(frame);
    }

    /// The preferences panel opened (`true`) or closed (`false`).
    ///
    /// Floating is suspended while the panel is open.  Closing the panel
    /// always returns to the foreground opacity, undoing any background
    /// preview made while it was open.
    pub fn set_preferences_open(&mut self, open: bool) {
        self.preferences_open = open;
        self.update_floating();
        if !open {
            self.foreground();
        }
    }

    //  window notifications

    pub fn window_did_become_key(&mut self) {
        self.focused = true;
        self.update_child_window();
        self.start_key_listener();
    }

    pub fn window_did_resign_key(&mut self) {
        self.focused = false;
        self.update_child_window();
        self.stop_key_listener();
    }

    pub fn window_will_move(&self) {
        trace!("{} will move", self.window.id());
    }

    /// Shadows are cached and go stale on programmatic and drag moves alike.
    pub fn window_did_move(&self) {
        self.window.invalidate_visual_shadow();
    }

    pub fn window_did_resize(&self) {
        trace!("{} resized to {:?}", self.window.id(), self.window.frame());
    }

    pub fn window_will_start_live_resize(&self) {
        trace!("{} live resize started", self.window.id());
    }

    pub fn window_did_end_live_resize(&self) {
        trace!("{} live resize ended", self.window.id());
    }

    //  derived state

    fn update_child_window(&self) {
        let Some(other) = self.other_window else {
            return;
        };
        if self.ctx.prefs.group_rulers() && self.focused {
            self.window.attach_child(other);
        } else {
            self.window.detach_child(other);
        }
    }

    fn update_floating(&self) {
        self.window
            .set_floating(self.ctx.prefs.float_rulers() && !self.preferences_open);
    }

    fn update_shadow(&self) {
        self.window.set_shadow(self.ctx.prefs.ruler_shadow());
    }

    fn apply_opacity(&self) {
        let percent = match self.opacity_mode {
            OpacityMode::Foreground => self.ctx.prefs.foreground_opacity(),
            OpacityMode::Background => self.ctx.prefs.background_opacity(),
        };
        self.window.set_opacity(opacity_alpha(percent));
    }

    fn start_key_listener(&mut self) {
        if self.key_listener.is_some() {
            debug!("{}: key listener already attached", self.window.id());
            return;
        }
        self.key_listener = Some(KeyNudgeListener::attach(
            &self.ctx.key_monitors,
            &self.ctx.desktop,
            self.window.id(),
        ));
        debug!("{}: key listener attached", self.window.id());
    }

    fn stop_key_listener(&mut self) {
        if let Some(listener) = self.key_listener.take() {
            debug!("{}: key listener detached", listener.window());
        }
    }
}

impl<B: WindowBackend + 'static> PreferenceSubscriber for RulerController<B> {
    fn preference_changed(&mut self, key: PrefKey) {
        trace!("{}: preference {} changed", self.window.id(), key);
        match key {
            PrefKey::GroupRulers => self.update_child_window(),
            PrefKey::FloatRulers => self.update_floating(),
            PrefKey::RulerShadow => self.update_shadow(),
            PrefKey::ForegroundOpacity => {
                if self.opacity_mode == OpacityMode::Foreground {
                    self.apply_opacity();
                }
            }
            PrefKey::BackgroundOpacity => {
                if self.opacity_mode == OpacityMode::Background {
                    self.apply_opacity();
                }
            }
        }
    }
}

impl<B: WindowBackend + 'static> Drop for RulerController<B> {
    fn drop(&mut self) {
        self.stop_key_listener();
        self.subscription.take();
        debug!(
            "controller for {} ruler torn down ({})",
            self.ruler.orientation(),
            self.window.id()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{Key, KeyEvent, Modifier};
    use crate::prefs::{PrefValue, Preferences};
    use crate::ruler::{Orientation, Rect};
    use crate::testing::{BackendCall, RecorderBackend};

    type Ctrl = Rc<RefCell<RulerController<RecorderBackend>>>;

    fn context(prefs: Preferences) -> AppContext<RecorderBackend> {
        AppContext {
            desktop: Desktop::new(RecorderBackend::default()),
            prefs: PreferenceStore::new(prefs),
            key_monitors: KeyMonitors::new(),
            screen: ScreenInfo::default(),
        }
    }

    fn ruler(orientation: Orientation) -> Ruler {
        let frame = match orientation {
            Orientation::Horizontal => Rect::new(100.0, 100.0, 400.0, 40.0),
            Orientation::Vertical => Rect::new(100.0, 140.0, 40.0, 400.0),
        };
        Ruler::new(orientation, None, frame).unwrap()
    }

    fn pair(ctx: &AppContext<RecorderBackend>) -> (Ctrl, Ctrl) {
        let a = RulerController::new(ruler(Orientation::Horizontal), ctx);
        let b = RulerController::new(ruler(Orientation::Vertical), ctx);
        let (ida, idb) = (a.borrow().window_id(), b.borrow().window_id());
        a.borrow_mut().set_other_window(Some(idb));
        b.borrow_mut().set_other_window(Some(ida));
        (a, b)
    }

    fn opacity(c: &Ctrl) -> f64 {
        c.borrow().window().opacity()
    }

    fn set(ctx: &AppContext<RecorderBackend>, key: PrefKey, value: PrefValue) {
        ctx.prefs.set(key, value).unwrap();
    }

    fn add_child_calls(ctx: &AppContext<RecorderBackend>) -> usize {
        ctx.desktop
            .backend()
            .count(|c| matches!(c, BackendCall::AddChild(..)))
    }

    fn remove_child_calls(ctx: &AppContext<RecorderBackend>) -> usize {
        ctx.desktop
            .backend()
            .count(|c| matches!(c, BackendCall::RemoveChild(..)))
    }

    #[test]
    fn initial_state_follows_preferences() {
        let ctx = context(Preferences {
            ruler_shadow: true,
            ..Preferences::default()
        });
        let c = RulerController::new(ruler(Orientation::Horizontal), &ctx);
        let c = c.borrow();
        assert_eq!(c.window().opacity(), 0.9);
        assert!(c.window().is_floating());
        assert!(c.window().has_shadow());
        assert!(!c.is_focused());
        assert!(!c.has_key_listener());
        assert!(c.window().children().is_empty());
        assert_eq!(ctx.prefs.listener_count(), 1);
        for key in PrefKey::ALL {
            assert_eq!(ctx.prefs.subscriber_count(key), 1);
        }
    }

    #[test]
    fn scenario_background_mode_ignores_foreground_changes() {
        let ctx = context(Preferences {
            foreground_opacity: 90,
            background_opacity: 30,
            ..Preferences::default()
        });
        let c = RulerController::new(ruler(Orientation::Horizontal), &ctx);
        assert_eq!(opacity(&c), 0.9);

        c.borrow_mut().background();
        assert_eq!(opacity(&c), 0.3);

        set(&ctx, PrefKey::ForegroundOpacity, PrefValue::Percent(70));
        assert_eq!(opacity(&c), 0.3);

        c.borrow_mut().foreground();
        assert_eq!(opacity(&c), 0.7);
    }

    #[test]
    fn background_opacity_change_applies_in_background_mode() {
        let ctx = context(Preferences::default());
        let c = RulerController::new(ruler(Orientation::Horizontal), &ctx);
        set(&ctx, PrefKey::BackgroundOpacity, PrefValue::Percent(20));
        assert_eq!(opacity(&c), 0.9);
        c.borrow_mut().background();
        assert_eq!(opacity(&c), 0.2);
        set(&ctx, PrefKey::BackgroundOpacity, PrefValue::Percent(40));
        assert_eq!(opacity(&c), 0.4);
    }

    #[test]
    fn key_listener_tracks_focus() {
        let ctx = context(Preferences::default());
        let c = RulerController::new(ruler(Orientation::Horizontal), &ctx);
        let sequence = [true, true, false, false, true, false, true];
        for gained in sequence {
            if gained {
                c.borrow_mut().window_did_become_key();
            } else {
                c.borrow_mut().window_did_resign_key();
            }
            assert_eq!(c.borrow().has_key_listener(), gained);
            assert_eq!(ctx.key_monitors.len(), usize::from(gained));
        }
    }

    #[test]
    fn grouping_requires_preference_focus_and_peer() {
        for group in [false, true] {
            for focused in [false, true] {
                let ctx = context(Preferences {
                    group_rulers: group,
                    ..Preferences::default()
                });
                let (a, b) = pair(&ctx);
                if focused {
                    a.borrow_mut().window_did_become_key();
                }
                let linked = a.borrow().window().children() == vec![b.borrow().window_id()];
                assert_eq!(linked, group && focused, "group={group} focused={focused}");
            }
        }
    }

    #[test]
    fn toggling_group_preference_flips_link_once() {
        let ctx = context(Preferences::default());
        let (a, b) = pair(&ctx);
        a.borrow_mut().window_did_become_key();
        assert_eq!(add_child_calls(&ctx), 1);

        set(&ctx, PrefKey::GroupRulers, PrefValue::Bool(false));
        assert!(a.borrow().window().children().is_empty());
        assert_eq!(remove_child_calls(&ctx), 1);

        set(&ctx, PrefKey::GroupRulers, PrefValue::Bool(true));
        assert_eq!(a.borrow().window().children(), vec![b.borrow().window_id()]);
        assert_eq!(add_child_calls(&ctx), 2);
        assert_eq!(remove_child_calls(&ctx), 1);
    }

    #[test]
    fn group_change_while_unfocused_waits_for_focus() {
        let ctx = context(Preferences {
            group_rulers: false,
            ..Preferences::default()
        });
        let (a, _b) = pair(&ctx);
        set(&ctx, PrefKey::GroupRulers, PrefValue::Bool(true));
        assert!(a.borrow().window().children().is_empty());
        assert_eq!(add_child_calls(&ctx), 0);
        a.borrow_mut().window_did_become_key();
        assert_eq!(add_child_calls(&ctx), 1);
    }

    #[test]
    fn scenario_focus_moves_grouping_between_peers() {
        let ctx = context(Preferences::default());
        let (a, b) = pair(&ctx);
        let (ida, idb) = (a.borrow().window_id(), b.borrow().window_id());

        a.borrow_mut().window_did_become_key();
        assert_eq!(ctx.desktop.children(ida), vec![idb]);

        a.borrow_mut().window_did_resign_key();
        b.borrow_mut().window_did_become_key();
        assert!(ctx.desktop.children(ida).is_empty());
        assert_eq!(ctx.desktop.children(idb), vec![ida]);
        let calls = ctx.desktop.backend().calls.borrow();
        let tail: Vec<_> = calls.iter().rev().take(2).rev().cloned().collect();
        assert_eq!(
            tail,
            vec![BackendCall::RemoveChild(ida, idb), BackendCall::AddChild(idb, ida)]
        );
    }

    #[test]
    fn missing_peer_short_circuits() {
        let ctx = context(Preferences::default());
        let a = RulerController::new(ruler(Orientation::Horizontal), &ctx);
        let b = RulerController::new(ruler(Orientation::Vertical), &ctx);
        let idb = b.borrow().window_id();
        a.borrow_mut().set_other_window(Some(idb));
        drop(b);
        a.borrow_mut().window_did_become_key();
        assert!(a.borrow().window().children().is_empty());
        assert_eq!(add_child_calls(&ctx), 0);
    }

    #[test]
    fn changing_peer_detaches_previous() {
        let ctx = context(Preferences::default());
        let (a, b) = pair(&ctx);
        let c = RulerController::new(ruler(Orientation::Vertical), &ctx);
        a.borrow_mut().window_did_become_key();
        let idc = c.borrow().window_id();
        a.borrow_mut().set_other_window(Some(idc));
        assert_eq!(a.borrow().window().children(), vec![idc]);
        assert_eq!(ctx.desktop.parent(b.borrow().window_id()), None);
        a.borrow_mut().set_other_window(None);
        assert!(a.borrow().window().children().is_empty());
    }

    #[test]
    fn scenario_preferences_panel_suspends_floating() {
        let ctx = context(Preferences::default());
        let c = RulerController::new(ruler(Orientation::Horizontal), &ctx);
        assert!(c.borrow().window().is_floating());

        c.borrow_mut().set_preferences_open(true);
        assert!(!c.borrow().window().is_floating());

        // Turning floating on while the panel is open changes nothing yet.
        set(&ctx, PrefKey::FloatRulers, PrefValue::Bool(false));
        set(&ctx, PrefKey::FloatRulers, PrefValue::Bool(true));
        assert!(!c.borrow().window().is_floating());

        c.borrow_mut().set_preferences_open(false);
        assert!(c.borrow().window().is_floating());
    }

    #[test]
    fn closing_panel_restores_current_float_preference() {
        let ctx = context(Preferences::default());
        let c = RulerController::new(ruler(Orientation::Horizontal), &ctx);
        c.borrow_mut().set_preferences_open(true);
        set(&ctx, PrefKey::FloatRulers, PrefValue::Bool(false));
        c.borrow_mut().set_preferences_open(false);
        assert!(!c.borrow().window().is_floating());
    }

    #[test]
    fn closing_panel_resets_background_preview() {
        let ctx = context(Preferences {
            foreground_opacity: 80,
            background_opacity: 25,
            ..Preferences::default()
        });
        let c = RulerController::new(ruler(Orientation::Horizontal), &ctx);
        c.borrow_mut().set_preferences_open(true);
        c.borrow_mut().background();
        assert_eq!(opacity(&c), 0.25);
        assert_eq!(c.borrow().opacity_mode(), OpacityMode::Background);

        c.borrow_mut().set_preferences_open(false);
        assert_eq!(opacity(&c), 0.8);
        assert_eq!(c.borrow().opacity_mode(), OpacityMode::Foreground);
    }

    #[test]
    fn opening_panel_keeps_opacity_mode() {
        let ctx = context(Preferences::default());
        let c = RulerController::new(ruler(Orientation::Horizontal), &ctx);
        c.borrow_mut().background();
        c.borrow_mut().set_preferences_open(true);
        assert_eq!(c.borrow().opacity_mode(), OpacityMode::Background);
        assert_eq!(opacity(&c), 0.5);
    }

    #[test]
    fn shadow_preference_is_live() {
        let ctx = context(Preferences::default());
        let c = RulerController::new(ruler(Orientation::Horizontal), &ctx);
        assert!(!c.borrow().window().has_shadow());
        set(&ctx, PrefKey::RulerShadow, PrefValue::Bool(true));
        assert!(c.borrow().window().has_shadow());
    }

    #[test]
    fn scenario_shift_arrow_nudges_focused_window() {
        let ctx = context(Preferences::default());
        let c = RulerController::new(ruler(Orientation::Horizontal), &ctx);
        c.borrow_mut().window_did_become_key();
        let before = c.borrow().window().frame();

        let shift_right = KeyEvent::new(Key::RightArrow).with_modifier(Modifier::Shift);
        assert_eq!(ctx.key_monitors.dispatch(shift_right), None);
        assert_eq!(c.borrow().window().frame().x, before.x + 10.0);

        let a = KeyEvent::new(Key::Char('a'));
        assert_eq!(ctx.key_monitors.dispatch(a.clone()), Some(a));
        assert_eq!(c.borrow().window().frame().x, before.x + 10.0);
    }

    #[test]
    fn arrows_pass_through_when_unfocused() {
        let ctx = context(Preferences::default());
        let c = RulerController::new(ruler(Orientation::Horizontal), &ctx);
        let before = c.borrow().window().frame();
        let left = KeyEvent::new(Key::LeftArrow);
        assert_eq!(ctx.key_monitors.dispatch(left.clone()), Some(left));
        assert_eq!(c.borrow().window().frame(), before);
    }

    #[test]
    fn did_move_invalidates_shadow() {
        let ctx = context(Preferences::default());
        let c = RulerController::new(ruler(Orientation::Horizontal), &ctx);
        let id = c.borrow().window_id();
        c.borrow().window_did_move();
        assert_eq!(
            ctx.desktop
                .backend()
                .count(|call| *call == BackendCall::InvalidateShadow(id)),
            1
        );
    }

    #[test]
    fn reset_position_applies_default_frame() {
        let ctx = context(Preferences::default());
        let c = RulerController::new(ruler(Orientation::Vertical), &ctx);
        c.borrow().window().move_by(300.0, 300.0);
        c.borrow().reset_position();
        assert_eq!(
            c.borrow().window().frame(),
            default_frame(Orientation::Vertical, &ctx.screen)
        );
    }

    #[test]
    fn show_and_hide_window() {
        let ctx = context(Preferences::default());
        let c = RulerController::new(ruler(Orientation::Horizontal), &ctx);
        c.borrow().show_window();
        assert!(c.borrow().window().is_visible());
        c.borrow().hide_window();
        assert!(!c.borrow().window().is_visible());
    }

    #[test]
    fn teardown_releases_listener_subscription_and_window() {
        let ctx = context(Preferences::default());
        let (a, b) = pair(&ctx);
        let ida = a.borrow().window_id();
        let idb = b.borrow().window_id();
        a.borrow_mut().window_did_become_key();
        assert_eq!(ctx.key_monitors.len(), 1);
        assert_eq!(ctx.desktop.children(ida), vec![idb]);

        drop(a);
        assert!(ctx.key_monitors.is_empty());
        assert_eq!(ctx.prefs.listener_count(), 1);
        assert!(!ctx.desktop.contains(ida));
        assert_eq!(ctx.desktop.parent(idb), None);

        // The survivor keeps working and simply has no peer to group.
        set(&ctx, PrefKey::GroupRulers, PrefValue::Bool(false));
        b.borrow_mut().window_did_become_key();
        assert!(b.borrow().window().children().is_empty());
    }
}
