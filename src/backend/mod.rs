//! Concrete [`WindowBackend`](crate::traits::WindowBackend) implementations.
//!
//! Drawing the ruler artwork is outside this crate; a backend only receives
//! the presentation changes the desktop decides on.

pub mod headless;
