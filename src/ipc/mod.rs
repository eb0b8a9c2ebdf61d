//! IPC listener that accepts ruler events over a Unix socket.
//!
//! External tools (scripts, a native front end, integration tests) can
//! connect to the socket and send newline-delimited JSON events.

pub mod listener;
