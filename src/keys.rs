//! Keyboard events and the focus-scoped nudge listener.
//!
//! [`KeyMonitors`] is the application's chain of *local* key monitors: every
//! key press the application receives is offered to each monitor in
//! registration order, and a monitor either hands the event on (returns
//! `Some`) or consumes it (returns `None`).  Monitors are registered through
//! an RAII [`KeyMonitor`] token; dropping the token removes the monitor.
//!
//! [`KeyNudgeListener`] is the monitor a focused ruler installs: arrow keys
//! nudge the ruler window (further with Shift held) and are consumed, every
//! other key passes through untouched.

use crate::event::{parse_direction, Direction};
use crate::traits::WindowBackend;
use crate::window::{Desktop, WindowId};
use log::trace;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::{Rc, Weak};

//  Keys

/// Virtual keycodes of the arrow keys.
pub mod keycode {
    pub const LEFT_ARROW: u16 = 0x7B;
    pub const RIGHT_ARROW: u16 = 0x7C;
    pub const DOWN_ARROW: u16 = 0x7D;
    pub const UP_ARROW: u16 = 0x7E;
}

/// A non-modifier key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    LeftArrow,
    RightArrow,
    UpArrow,
    DownArrow,
    Escape,
    Return,
    Tab,
    Space,
    /// A printable character, stored lowercase.
    Char(char),
    /// Any other key, by virtual keycode.
    Code(u16),
}

impl Key {
    /// Map a virtual keycode to a key.  Non-arrow codes stay opaque.
    pub fn from_code(code: u16) -> Self {
        match code {
            keycode::LEFT_ARROW => Key::LeftArrow,
            keycode::RIGHT_ARROW => Key::RightArrow,
            keycode::DOWN_ARROW => Key::DownArrow,
            keycode::UP_ARROW => Key::UpArrow,
            other => Key::Code(other),
        }
    }

    /// Parse a key spec: arrow names (`left`, `right`, …), a few named keys,
    /// a single character, or a hex keycode such as `0x7b`.
    pub fn from_spec(s: &str) -> Option<Self> {
        if s == " " {
            return Some(Key::Space);
        }
        let lower = s.trim().to_lowercase();
        if let Some(dir) = parse_direction(&lower) {
            return Some(Self::arrow(dir));
        }
        match lower.as_str() {
            "esc" | "escape" => return Some(Key::Escape),
            "return" | "enter" => return Some(Key::Return),
            "tab" => return Some(Key::Tab),
            "space" => return Some(Key::Space),
            _ => {}
        }
        if let Some(hex) = lower.strip_prefix("0x") {
            return u16::from_str_radix(hex, 16).ok().map(Key::from_code);
        }
        let mut chars = lower.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(Key::Char(c)),
            _ => None,
        }
    }

    /// Canonical spec string, accepted by [`Key::from_spec`].
    pub fn to_spec(&self) -> String {
        match self {
            Key::LeftArrow => "left".into(),
            Key::RightArrow => "right".into(),
            Key::UpArrow => "up".into(),
            Key::DownArrow => "down".into(),
            Key::Escape => "escape".into(),
            Key::Return => "return".into(),
            Key::Tab => "tab".into(),
            Key::Space => "space".into(),
            Key::Char(c) => c.to_string(),
            Key::Code(code) => format!("0x{:02x}", code),
        }
    }

    fn arrow(dir: Direction) -> Self {
        match dir {
            Direction::Left => Key::LeftArrow,
            Direction::Right => Key::RightArrow,
            Direction::Up => Key::UpArrow,
            Direction::Down => Key::DownArrow,
        }
    }

    /// The nudge direction of an arrow key.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Key::LeftArrow => Some(Direction::Left),
            Key::RightArrow => Some(Direction::Right),
            Key::UpArrow => Some(Direction::Up),
            Key::DownArrow => Some(Direction::Down),
            _ => None,
        }
    }
}

/// Modifier keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Modifier {
    Command,
    Option,
    Control,
    Shift,
}

impl Modifier {
    /// Parse a modifier spec (case-insensitive, with the usual aliases).
    pub fn from_spec(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cmd" | "command" | "super" => Some(Modifier::Command),
            "opt" | "option" | "alt" => Some(Modifier::Option),
            "ctrl" | "control" => Some(Modifier::Control),
            "shift" => Some(Modifier::Shift),
            _ => None,
        }
    }

    pub fn to_spec(&self) -> &'static str {
        match self {
            Modifier::Command => "cmd",
            Modifier::Option => "opt",
            Modifier::Control => "ctrl",
            Modifier::Shift => "shift",
        }
    }
}

/// A key press: one key plus the modifiers held with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: BTreeSet<Modifier>,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: BTreeSet::new(),
        }
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.insert(modifier);
        self
    }

    pub fn shift(&self) -> bool {
        self.modifiers.contains(&Modifier::Shift)
    }

    /// Parse a chord spec of the form `"shift+right"`.
    ///
    /// Components are separated by `+`; the last one is the key, the rest
    /// are modifiers.  Case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts: Vec<&str> = s.split('+').collect();
        let key_raw = parts.pop()?;
        let key = Key::from_spec(key_raw)?;
        let mut modifiers = BTreeSet::new();
        for m in parts {
            modifiers.insert(Modifier::from_spec(m)?);
        }
        Some(Self { key, modifiers })
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{}+", m.to_spec())?;
        }
        write!(f, "{}", self.key.to_spec())
    }
}

impl Serialize for KeyEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for KeyEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        KeyEvent::parse(&s).ok_or_else(|| DeError::custom(format!("invalid key chord: {:?}", s)))
    }
}

//  Local monitor chain

/// Identifier of a registered key monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonitorId(u64);

type Handler = Rc<RefCell<dyn FnMut(KeyEvent) -> Option<KeyEvent>>>;

#[derive(Default)]
struct MonitorList {
    next_id: u64,
    monitors: Vec<(MonitorId, Handler)>,
}

/// The application's ordered chain of local key monitors.
#[derive(Default)]
pub struct KeyMonitors {
    inner: RefCell<MonitorList>,
}

impl KeyMonitors {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Register `handler` at the end of the chain.
    ///
    /// The handler returns the event to pass it on, or `None` to consume it.
    /// It stays registered until the returned token is dropped.
    pub fn add_local_monitor<F>(self: &Rc<Self>, handler: F) -> KeyMonitor
    where
        F: FnMut(KeyEvent) -> Option<KeyEvent> + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = MonitorId(inner.next_id);
        inner.next_id += 1;
        let handler: Handler = Rc::new(RefCell::new(handler));
        inner.monitors.push((id, handler));
        trace!("key monitor {:?} added ({} active)", id, inner.monitors.len());
        KeyMonitor {
            id,
            monitors: Rc::downgrade(self),
        }
    }

    /// Remove a monitor.  Removing an unknown monitor is a no-op.
    pub fn remove(&self, id: MonitorId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.monitors.len();
        inner.monitors.retain(|(m, _)| *m != id);
        let removed = inner.monitors.len() != before;
        if removed {
            trace!("key monitor {:?} removed ({} active)", id, inner.monitors.len());
        }
        removed
    }

    /// Offer `event` to every monitor in order.
    ///
    /// Returns `None` if some monitor consumed the event, otherwise the
    /// (possibly rewritten) event for the next handler in the application.
    pub fn dispatch(&self, event: KeyEvent) -> Option<KeyEvent> {
        // Snapshot so handlers may add or remove monitors while running.
        let handlers: Vec<Handler> = self
            .inner
            .borrow()
            .monitors
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        let mut event = event;
        for handler in handlers {
            let mut f = handler.borrow_mut();
            event = (&mut *f)(event)?;
        }
        Some(event)
    }

    /// Number of registered monitors.
    pub fn len(&self) -> usize {
        self.inner.borrow().monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registration token for a key monitor; removes the monitor when dropped.
pub struct KeyMonitor {
    id: MonitorId,
    monitors: Weak<KeyMonitors>,
}

impl KeyMonitor {
    pub fn id(&self) -> MonitorId {
        self.id
    }
}

impl Drop for KeyMonitor {
    fn drop(&mut self) {
        if let Some(monitors) = self.monitors.upgrade() {
            monitors.remove(self.id);
        }
    }
}

//  Nudge listener

/// What a key press means to a nudge listener: a direction and whether the
/// big step applies.  `None` for keys that are not arrows.
pub fn nudge_for(event: &KeyEvent) -> Option<(Direction, bool)> {
    event.key.direction().map(|dir| (dir, event.shift()))
}

/// Arrow-key monitor bound to one ruler window.
///
/// Exists only while its window is key; the owning controller creates it on
/// focus and drops it on focus loss or teardown.
pub struct KeyNudgeListener {
    window: WindowId,
    _monitor: KeyMonitor,
}

impl KeyNudgeListener {
    /// Install a nudge monitor for `window` on `monitors`.
    pub fn attach<B: WindowBackend + 'static>(
        monitors: &Rc<KeyMonitors>,
        desktop: &Rc<Desktop<B>>,
        window: WindowId,
    ) -> Self {
        let desktop = Rc::downgrade(desktop);
        let monitor = monitors.add_local_monitor(move |event| {
            let Some((direction, big_step)) = nudge_for(&event) else {
                return Some(event);
            };
            let Some(desktop) = desktop.upgrade() else {
                return Some(event);
            };
            if desktop.nudge(window, direction, big_step) {
                None
            } else {
                Some(event)
            }
        });
        Self {
            window,
            _monitor: monitor,
        }
    }

    pub fn window(&self) -> WindowId {
        self.window
    }
}
