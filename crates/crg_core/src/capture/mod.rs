//! Interfaces to the recording engine's capture files.
//!
//! The capture/compression engine is an external collaborator; this module
//! defines the narrow surface the timeline subsystem consumes from it:
//! - [`Capture`]: an open capture file (duration, marker list access)
//! - [`MarkerStore`]: the capture file's own marker list
//! - [`EventStream`]: one stream's raw event headers and nearest-before lookup
//!
//! All handles are single-threaded (`Rc`) per the UI-bound access model;
//! implementations use interior mutability where they need it.

use std::rc::Rc;
use std::time::Duration;

use crate::models::{CaptureId, MarkerId};

/// A raw event header as stored in a stream.
///
/// `offset` is relative to the start of the capture. `tag` is the opaque
/// per-event tag payload; when the stream declares at least four tag bytes,
/// the first four are interpreted as a little-endian frame number.
#[derive(Debug, Clone)]
pub struct RawEventHeader {
    /// Offset from the start of the capture.
    pub offset: Duration,
    /// Opaque tag payload (may be empty).
    pub tag: Vec<u8>,
}

impl RawEventHeader {
    /// Create a header with no tag payload.
    pub fn new(offset: Duration) -> Self {
        Self {
            offset,
            tag: Vec::new(),
        }
    }

    /// Create a header carrying a tag payload.
    pub fn with_tag(offset: Duration, tag: Vec<u8>) -> Self {
        Self { offset, tag }
    }
}

/// One stream of a capture: a time-ordered sequence of event headers.
pub trait EventStream {
    /// The stream's declared total duration, if the file records one.
    fn duration(&self) -> Option<Duration>;

    /// Declared tag payload size in bytes per event (0 = untagged stream).
    ///
    /// The declaration is per-stream; individual events never override it.
    fn tag_size(&self) -> usize;

    /// All raw event headers, ordered by offset ascending.
    fn headers(&self) -> Vec<RawEventHeader>;

    /// Nearest-before lookup provided by the engine's own stream index.
    ///
    /// Returns the index and offset of the last event at or before `t`,
    /// or `None` when `t` precedes the first event (or the stream is empty).
    fn find_event(&self, t: Duration) -> Option<(u32, Duration)>;
}

/// A marker record as stored in the capture file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerRecord {
    /// File-assigned identity.
    pub id: MarkerId,
    /// Display name.
    pub name: String,
    /// Offset from the start of the capture.
    pub time: Duration,
}

/// The capture file's own marker list.
///
/// Markers are first-class records inside the file, visible to any tool that
/// reads it. Mutations are applied to the file immediately; `flush_index`
/// rewrites the file's marker index so external readers see a consistent
/// list.
pub trait MarkerStore {
    /// Append a marker and return the file-assigned record.
    fn add(&self, name: &str, time: Duration) -> MarkerRecord;

    /// Remove a marker record.
    fn remove(&self, id: MarkerId);

    /// Remove every marker record.
    fn clear(&self);

    /// Rename a marker record.
    fn rename(&self, id: MarkerId, name: &str);

    /// Update a marker record's time.
    fn set_time(&self, id: MarkerId, time: Duration);

    /// Rewrite the file's marker index.
    fn flush_index(&self);

    /// Current records, in file order.
    fn records(&self) -> Vec<MarkerRecord>;
}

/// An open capture file.
pub trait Capture {
    /// The capture's identity (keys sidecar settings and snapshots).
    fn id(&self) -> &CaptureId;

    /// Total capture duration.
    fn duration(&self) -> Duration;

    /// Handle to the file's marker list.
    fn markers(&self) -> Rc<dyn MarkerStore>;
}
