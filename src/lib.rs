//! **screen-ruler**: window-state synchronization for on-screen rulers.
//!
//! The application shows a horizontal and a vertical ruler.  Each ruler
//! window is kept consistent with the shared preferences (opacity levels,
//! floating, grouping, shadow), with keyboard focus (arrow keys nudge the
//! focused ruler; grouping carries the other ruler along) and with the
//! process-wide preferences panel.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::WindowBackend`]: the presentation layer.  The
//!   [`window::Desktop`] owns all window state and reports effective changes
//!   to it, so the controller logic is not coupled to any window system.
//! * [`traits::EventSource`]: abstracts the transport that delivers
//!   [`event::Event`]s (a Unix socket, a native event loop, a test harness)
//!   so the main loop is not coupled to any specific IPC mechanism.
//!
//! [`controller::RulerController`] is the per-window coordinator and
//! [`app::RulerApp`] routes events to the two controllers.  A headless
//! backend lives in [`backend`] and the socket event source in [`ipc`].

pub mod app;
pub mod backend;
pub mod config;
pub mod controller;
pub mod event;
pub mod ipc;
pub mod keys;
pub mod positions;
pub mod prefs;
pub mod ruler;
pub mod traits;
pub mod window;

#[cfg(test)]
pub(crate) mod testing;
