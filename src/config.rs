//! Application configuration.
//!
//! The configuration is loaded from `$XDG_CONFIG_HOME/screen-ruler/config.json`.
//! Every section is optional; a missing file or a minimal `{}` file falls
//! back to the compiled-in defaults.
//!
//! # Example
//!
//! ```json
//! {
//!   "preferences": {
//!     "groupRulers": true,
//!     "floatRulers": true,
//!     "foregroundOpacity": 90,
//!     "backgroundOpacity": 50,
//!     "rulerShadow": false
//!   },
//!   "screen": { "x": 0, "y": 25, "width": 1440, "height": 875 },
//!   "socket_path": "/run/user/1000/screen-ruler.sock"
//! }
//! ```

use crate::prefs::Preferences;
use crate::ruler::ScreenInfo;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Initial preference values.  Opacities above 100 are clamped.
    #[serde(default)]
    pub preferences: Preferences,

    /// Visible screen frame the default ruler frames are laid out on.
    #[serde(default)]
    pub screen: ScreenInfo,

    /// Socket the event listener binds; defaults to
    /// `$XDG_RUNTIME_DIR/screen-ruler.sock`.
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))
    }

    fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(contents)?;
        config.preferences = config.preferences.normalized();
        Ok(config)
    }
}

/// `$XDG_CONFIG_HOME/screen-ruler`, falling back to `$HOME/.config`.
pub fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("screen-ruler")
}

/// `$XDG_RUNTIME_DIR/screen-ruler.sock`, falling back to `/tmp`.
pub fn default_socket_path() -> PathBuf {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(runtime).join("screen-ruler.sock")
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
