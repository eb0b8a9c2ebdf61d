//! Events and shared vocabulary.
//!
//! [`Event`] enumerates every input the [`RulerApp`](crate::app::RulerApp)
//! reacts to: window-system notifications (focus, moves, resizes, key
//! presses), the process-wide preferences-panel broadcasts, preference
//! changes and requests from the surrounding application.  Events are
//! produced by [`EventSource`](crate::traits::EventSource) implementations
//! and arrive as JSON on the wire.

use crate::keys::KeyEvent;
use crate::ruler::{Orientation, Rect};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Direction of a keyboard nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Unit vector for this direction in screen coordinates (y grows down).
    pub fn unit(self) -> (f64, f64) {
        match self {
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// Parse a direction string (case-insensitive).
pub fn parse_direction(s: &str) -> Option<Direction> {
    match s.trim().to_lowercase().as_str() {
        "left" => Some(Direction::Left),
        "right" => Some(Direction::Right),
        "up" => Some(Direction::Up),
        "down" => Some(Direction::Down),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_direction(&s).ok_or_else(|| DeError::custom(format!("invalid direction: {:?}", s)))
    }
}

/// Payload of [`Event::Drag`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragDelta {
    pub ruler: Orientation,
    pub dx: f64,
    pub dy: f64,
}

/// Payload of [`Event::Resize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeTarget {
    pub ruler: Orientation,
    pub frame: Rect,
}

/// Payload of [`Event::SetPreference`].
///
/// The name is kept as a string on the wire so that an unknown preference
/// can be logged and ignored instead of rejecting the whole message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceUpdate {
    pub name: String,
    pub value: serde_json::Value,
}

/// Every input the ruler application reacts to.
///
/// Rulers are addressed by [`Orientation`]: the application runs exactly
/// one horizontal and one vertical ruler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Bring every ruler window to the front.
    ShowRulers,

    /// Order a ruler (and anything grouped under it) out.
    Hide(Orientation),

    /// The window system made this ruler the key window.  Whichever ruler
    /// was key before resigns first.
    Focus(Orientation),

    /// The ruler stopped being the key window.
    ResignFocus(Orientation),

    /// The user started dragging a ruler.
    WillMove(Orientation),

    /// The user dragged a ruler by `(dx, dy)` pixels.
    Drag(DragDelta),

    /// The user resized a ruler to `frame` (clamped to its size limits).
    Resize(ResizeTarget),

    /// A live resize started.
    StartLiveResize(Orientation),

    /// A live resize ended.
    EndLiveResize(Orientation),

    /// A key was pressed while the application is active.
    ///
    /// On the wire this is a chord spec such as `"shift+right"`.
    KeyDown(KeyEvent),

    /// The preferences panel was opened.
    PreferencesOpened,

    /// The preferences panel was closed.
    PreferencesClosed,

    /// A preference value changed.
    SetPreference(PreferenceUpdate),

    /// Switch every ruler to its foreground opacity.
    Foreground,

    /// Switch every ruler to its background opacity (also used by the
    /// preferences panel to preview the background level).
    Background,

    /// The application became active.
    AppActivated,

    /// The application resigned active.
    AppDeactivated,

    /// Move every ruler back to its default frame.
    ResetPosition,

    /// Stop the event loop; ruler positions are saved on the way out.
    Quit,
}
