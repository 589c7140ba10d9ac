//! The timeline subsystem: event indexing and point annotations.
//!
//! This is the heart of the review tool. Per stream, an [`EventIndex`] maps
//! irregular event timestamps onto a stable, ordered index that supports
//! seeking, stepping, and down-sampled strip rendering. On top of the same
//! relative-time domain sit three point tracks:
//! - [`MarkerTrack`]: named annotations persisted inside the capture file
//! - [`PausePointTrack`]: breakpoints persisted in the sidecar store
//! - [`RangeTrack`]: the two-endpoint trim window, also sidecar-persisted
//!
//! A [`ReviewSession`] ties the tracks to one open capture, owns the
//! marker/pause-point coupling map, and keeps everything synchronized with a
//! live playback engine. All of it assumes exclusive single-threaded access
//! from the UI control thread.

mod event_index;
mod markers;
mod pause_points;
mod point;
mod range;
mod session;
mod snapshot;
mod time;
mod track;

pub use event_index::{EventIndex, EventRecord};
pub use markers::MarkerTrack;
pub use pause_points::PausePointTrack;
pub use point::{Marker, PausePoint, PointChange, PointCore, RangeEndpoint, TimelinePoint};
pub use range::RangeTrack;
pub use session::ReviewSession;
pub use snapshot::{
    AnnotationSnapshot, MarkerSnapshot, PausePointSnapshot, RangeSnapshot, SnapshotManager,
};
pub use track::{PointTrack, TrackEvent};

use crate::models::{MarkerId, PointId};
use crate::settings::SettingsError;

/// Errors that can occur in the timeline subsystem.
///
/// These are the fail-fast cases (caller bugs). Out-of-range times are
/// clamped, not errors; lookup misses are `None`/skips.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// A marker name was empty.
    #[error("Marker name must not be empty")]
    EmptyMarkerName,

    /// A marker can hold at most one coupled pause point.
    #[error("{0} already has a coupled pause point")]
    MarkerAlreadyCoupled(MarkerId),

    /// The marker handle does not exist in this capture.
    #[error("No {0} in this capture")]
    UnknownMarker(MarkerId),

    /// The point handle does not exist in this track.
    #[error("No {0} in this track")]
    UnknownPoint(PointId),

    /// Sidecar settings failure.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Result type for timeline operations.
pub type TimelineResult<T> = Result<T, TimelineError>;
