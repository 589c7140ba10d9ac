//! Interface to the live playback engine.
//!
//! The playback engine itself (connection, decoding, transport) is an
//! external collaborator. The timeline subsystem only pushes state into it:
//! breakpoint sets, the trim range, and seek requests. State-change events
//! flow the other way through the application layer, which forwards them to
//! [`crate::timeline::ReviewSession::playback_state_changed`].
//!
//! Calls may block briefly (they cross into the engine); callers must not
//! invoke them from a context that cannot tolerate blocking. No cancellation
//! or timeout is defined at this boundary.

use std::time::Duration;

pub use crate::models::PlaybackState;

/// Sink half of a live playback session.
///
/// All times are relative to the start of the capture. Implementations use
/// interior mutability; the subsystem only ever holds `Rc<dyn PlaybackSink>`.
pub trait PlaybackSink {
    /// Replace the engine's breakpoint set.
    fn set_pause_points_by_relative_time(&self, times: Vec<Duration>);

    /// Set the trim range's in point.
    fn set_in_point_by_relative_time(&self, t: Duration);

    /// Set the trim range's out point.
    fn set_out_point_by_relative_time(&self, t: Duration);

    /// Seek the transport.
    fn seek_by_relative_time(&self, t: Duration);

    /// The transport's current position.
    fn current_relative_time(&self) -> Duration;
}
