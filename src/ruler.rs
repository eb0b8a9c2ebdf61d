//! Ruler descriptors and screen geometry.
//!
//! A [`Ruler`] is the immutable description of one on-screen ruler: its
//! [`Orientation`], an optional display name (used as the key under which
//! its position is persisted) and the frame it starts with.  Everything that
//! changes at runtime lives in the [`Desktop`](crate::window::Desktop).
//!
//! Coordinates use a top-left origin: `x` grows to the right and `y` grows
//! downwards, matching the screen layout reported by [`ScreenInfo`].

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

//  Size constants

/// Thickness of a ruler across its measuring axis (pixels).
pub const RULER_THICKNESS: f64 = 40.0;
/// Shortest length a ruler can be resized to.
pub const MIN_LENGTH: f64 = 100.0;
/// Longest length a ruler can be resized to.
pub const MAX_LENGTH: f64 = 10_000.0;
/// Length used by [`default_frame`].
pub const DEFAULT_LENGTH: f64 = 600.0;

/// Which axis a ruler measures along.  Fixed for the lifetime of a ruler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Horizontal => write!(f, "horizontal"),
            Orientation::Vertical => write!(f, "vertical"),
        }
    }
}

impl FromStr for Orientation {
    type Err = RulerError;

    /// Case-insensitive; accepts `h` / `v` shorthands.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "horizontal" | "h" => Ok(Orientation::Horizontal),
            "vertical" | "v" => Ok(Orientation::Vertical),
            _ => Err(RulerError::UnknownOrientation(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Orientation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(DeError::custom)
    }
}

/// A window frame: origin plus size, in screen pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Finite coordinates and a strictly positive size.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }

    /// The same rect translated by `(dx, dy)`.
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// The usable area of the screen rulers are placed on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenInfo {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for ScreenInfo {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1920.0,
            height: 1080.0,
        }
    }
}

impl ScreenInfo {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Minimum and maximum window size for a ruler of a given orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeLimits {
    pub min_width: f64,
    pub min_height: f64,
    pub max_width: f64,
    pub max_height: f64,
}

impl SizeLimits {
    /// Limits for `orientation`: the length is resizable, the thickness is not.
    pub fn for_orientation(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Horizontal => Self {
                min_width: MIN_LENGTH,
                min_height: RULER_THICKNESS,
                max_width: MAX_LENGTH,
                max_height: RULER_THICKNESS,
            },
            Orientation::Vertical => Self {
                min_width: RULER_THICKNESS,
                min_height: MIN_LENGTH,
                max_width: RULER_THICKNESS,
                max_height: MAX_LENGTH,
            },
        }
    }

    /// Clamp the size of `frame`, keeping its origin.
    pub fn clamp(&self, frame: Rect) -> Rect {
        Rect {
            width: frame.width.clamp(self.min_width, self.max_width),
            height: frame.height.clamp(self.min_height, self.max_height),
            ..frame
        }
    }
}

/// Default frame for a ruler of `orientation` on `screen`.
///
/// The two defaults form an "L": the horizontal ruler sits directly above
/// the vertical one, both left-aligned, and the pair is centred on screen.
/// Lengths shrink to fit screens smaller than [`DEFAULT_LENGTH`].
pub fn default_frame(orientation: Orientation, screen: &ScreenInfo) -> Rect {
    let (cx, cy) = screen.center();
    let h_len = DEFAULT_LENGTH.min(screen.width).max(MIN_LENGTH);
    let v_len = DEFAULT_LENGTH.min(screen.height - RULER_THICKNESS).max(MIN_LENGTH);
    let left = cx - h_len / 2.0;
    let top = cy - (v_len + RULER_THICKNESS) / 2.0;
    match orientation {
        Orientation::Horizontal => Rect::new(left, top, h_len, RULER_THICKNESS),
        Orientation::Vertical => Rect::new(left, top + RULER_THICKNESS, RULER_THICKNESS, v_len),
    }
}

/// Immutable description of one ruler.
#[derive(Debug, Clone, PartialEq)]
pub struct Ruler {
    orientation: Orientation,
    name: Option<String>,
    frame: Rect,
}

impl Ruler {
    /// Build a descriptor.  The frame must be valid (see [`Rect::is_valid`]);
    /// its size is clamped to the orientation's [`SizeLimits`].
    pub fn new(
        orientation: Orientation,
        name: Option<String>,
        frame: Rect,
    ) -> Result<Self, RulerError> {
        if !frame.is_valid() {
            return Err(RulerError::InvalidFrame(frame));
        }
        Ok(Self {
            orientation,
            name,
            frame: SizeLimits::for_orientation(orientation).clamp(frame),
        })
    }

    /// A ruler placed at its [`default_frame`] on `screen`.
    pub fn with_default_frame(
        orientation: Orientation,
        name: Option<String>,
        screen: &ScreenInfo,
    ) -> Result<Self, RulerError> {
        Self::new(orientation, name, default_frame(orientation, screen))
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Display name, also the key its position is persisted under.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The frame the ruler was created with.
    pub fn frame(&self) -> Rect {
        self.frame
    }

    pub fn size_limits(&self) -> SizeLimits {
        SizeLimits::for_orientation(self.orientation)
    }
}

/// Errors from building ruler descriptors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RulerError {
    #[error("invalid ruler frame: {0:?}")]
    InvalidFrame(Rect),
    #[error("unknown orientation: {0:?}")]
    UnknownOrientation(String),
}
