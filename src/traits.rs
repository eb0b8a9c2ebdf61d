//! Core traits that decouple the ruler logic from any specific window system
//! or event transport.
//!
//! The [`Desktop`](crate::window::Desktop) owns all presentation state and
//! reports every *effective* change to a [`WindowBackend`]; the backend only
//! draws.  Inputs reach the [`RulerApp`](crate::app::RulerApp) through an
//! [`EventSource`].

use crate::event::Event;
use crate::ruler::{Orientation, Rect};
use crate::window::WindowId;
use std::sync::mpsc;

/// The presentation layer that puts ruler windows on screen.
///
/// The desktop calls these methods only when the corresponding state
/// actually changes, so a backend never sees redundant updates (setting a
/// value that is already current, or detaching a link that does not exist,
/// does not reach the backend at all).
///
/// Presentation updates have no failure path: a backend that cannot apply
/// an update logs it and carries on.
pub trait WindowBackend {
    /// A ruler window was created with its initial frame.  It starts hidden.
    fn window_created(&self, id: WindowId, orientation: Orientation, frame: Rect);

    /// A ruler window was destroyed.  Its links were removed beforehand.
    fn window_destroyed(&self, id: WindowId);

    /// The window's frame (origin and/or size) changed.
    fn set_frame(&self, id: WindowId, frame: Rect);

    /// The window's transparency changed; `alpha` is in `[0.0, 1.0]`.
    fn set_alpha(&self, id: WindowId, alpha: f64);

    /// The window's always-on-top flag changed.
    fn set_floating(&self, id: WindowId, floating: bool);

    /// The window's drop shadow was turned on or off.
    fn set_shadow(&self, id: WindowId, shadow: bool);

    /// The cached shadow geometry of the window is stale and must be
    /// recomputed.
    fn invalidate_shadow(&self, id: WindowId);

    /// `child` was attached to `parent`, ordered below it.
    fn add_child_below(&self, parent: WindowId, child: WindowId);

    /// The link between `parent` and `child` was removed.
    fn remove_child(&self, parent: WindowId, child: WindowId);

    /// The window was ordered in (`true`) or out (`false`).
    fn set_visible(&self, id: WindowId, visible: bool);
}

/// A source of [`Event`]s.
///
/// Implementations listen on some transport (a Unix socket, a native event
/// loop, a test harness, …) and forward decoded events into the provided
/// [`mpsc::Sender`].  The application consumes them on its single event
/// thread, in the order they were sent.
///
/// # Contract
///
/// * [`run`](EventSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received event must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait EventSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Event`] into `sink`.
    fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ruler::Orientation;

    #[derive(Debug, thiserror::Error)]
    #[error("mock error")]
    struct MockError;

    /// A test double that emits a fixed sequence of events.
    struct MockSource {
        events: Vec<Event>,
    }

    impl EventSource for MockSource {
        type Error = MockError;

        fn run(&mut self, sink: mpsc::Sender<Event>) -> Result<(), MockError> {
            for event in self.events.drain(..) {
                let _ = sink.send(event);
            }
            Ok(())
        }
    }

    #[test]
    fn mock_source_emits_events_in_order() {
        let mut src = MockSource {
            events: vec![
                Event::Focus(Orientation::Horizontal),
                Event::PreferencesOpened,
                Event::ResignFocus(Orientation::Horizontal),
            ],
        };
        let (tx, rx) = mpsc::channel();
        src.run(tx).unwrap();
        let events: Vec<Event> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                Event::Focus(Orientation::Horizontal),
                Event::PreferencesOpened,
                Event::ResignFocus(Orientation::Horizontal),
            ]
        );
    }
}
