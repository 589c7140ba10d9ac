//! Shared test doubles for the external collaborators.
//!
//! A scripted event stream, an in-memory capture/marker store, and a
//! recording playback sink. Test-only; the real implementations live in the
//! recording/playback engine.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::capture::{Capture, EventStream, MarkerRecord, MarkerStore, RawEventHeader};
use crate::models::{CaptureId, MarkerId};
use crate::playback::PlaybackSink;

/// Event stream with a fixed set of offsets and optional frame tags.
pub(crate) struct ScriptedStream {
    offsets: Vec<Duration>,
    tags: Vec<Vec<u8>>,
    tag_size: usize,
    duration: Option<Duration>,
}

impl ScriptedStream {
    pub fn from_offsets(offsets: Vec<Duration>, duration: Option<Duration>) -> Self {
        let tags = vec![Vec::new(); offsets.len()];
        Self {
            offsets,
            tags,
            tag_size: 0,
            duration,
        }
    }

    /// Declare 4 tag bytes per event and attach the given frame numbers.
    pub fn with_frame_tags(mut self, frames: &[u32]) -> Self {
        assert_eq!(frames.len(), self.offsets.len());
        self.tag_size = 4;
        self.tags = frames.iter().map(|f| f.to_le_bytes().to_vec()).collect();
        self
    }

    /// Override the declared tag size (keeping any tag bytes).
    pub fn with_tag_size(mut self, tag_size: usize) -> Self {
        self.tag_size = tag_size;
        self
    }
}

impl EventStream for ScriptedStream {
    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn tag_size(&self) -> usize {
        self.tag_size
    }

    fn headers(&self) -> Vec<RawEventHeader> {
        self.offsets
            .iter()
            .zip(&self.tags)
            .map(|(offset, tag)| RawEventHeader::with_tag(*offset, tag.clone()))
            .collect()
    }

    fn find_event(&self, t: Duration) -> Option<(u32, Duration)> {
        self.offsets
            .iter()
            .enumerate()
            .rev()
            .find(|(_, offset)| **offset <= t)
            .map(|(i, offset)| (i as u32, *offset))
    }
}

/// In-memory stand-in for a capture file's marker list.
pub(crate) struct MemoryMarkerStore {
    inner: RefCell<MarkerList>,
    flushes: Cell<usize>,
}

struct MarkerList {
    next_id: u64,
    records: Vec<MarkerRecord>,
}

impl MemoryMarkerStore {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(MarkerList {
                next_id: 1,
                records: Vec::new(),
            }),
            flushes: Cell::new(0),
        }
    }

    /// Pre-populate a record, as if written by an earlier session.
    pub fn seed(&self, name: &str, time: Duration) -> MarkerId {
        self.add(name, time).id
    }

    /// Number of flush_index calls observed.
    pub fn flush_count(&self) -> usize {
        self.flushes.get()
    }
}

impl MarkerStore for MemoryMarkerStore {
    fn add(&self, name: &str, time: Duration) -> MarkerRecord {
        let mut inner = self.inner.borrow_mut();
        let record = MarkerRecord {
            id: MarkerId::new(inner.next_id),
            name: name.to_string(),
            time,
        };
        inner.next_id += 1;
        inner.records.push(record.clone());
        record
    }

    fn remove(&self, id: MarkerId) {
        self.inner.borrow_mut().records.retain(|r| r.id != id);
    }

    fn clear(&self) {
        self.inner.borrow_mut().records.clear();
    }

    fn rename(&self, id: MarkerId, name: &str) {
        if let Some(record) = self
            .inner
            .borrow_mut()
            .records
            .iter_mut()
            .find(|r| r.id == id)
        {
            record.name = name.to_string();
        }
    }

    fn set_time(&self, id: MarkerId, time: Duration) {
        if let Some(record) = self
            .inner
            .borrow_mut()
            .records
            .iter_mut()
            .find(|r| r.id == id)
        {
            record.time = time;
        }
    }

    fn flush_index(&self) {
        self.flushes.set(self.flushes.get() + 1);
    }

    fn records(&self) -> Vec<MarkerRecord> {
        self.inner.borrow().records.clone()
    }
}

/// In-memory capture.
pub(crate) struct MemoryCapture {
    id: CaptureId,
    duration: Duration,
    markers: Rc<MemoryMarkerStore>,
}

impl MemoryCapture {
    pub fn new(id: &str, duration: Duration) -> Self {
        Self {
            id: CaptureId::new(id),
            duration,
            markers: Rc::new(MemoryMarkerStore::new()),
        }
    }

    pub fn marker_store(&self) -> &Rc<MemoryMarkerStore> {
        &self.markers
    }
}

impl Capture for MemoryCapture {
    fn id(&self) -> &CaptureId {
        &self.id
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn markers(&self) -> Rc<dyn MarkerStore> {
        self.markers.clone()
    }
}

/// Playback sink that records every call.
pub(crate) struct RecordingSink {
    pause_sets: RefCell<Vec<Vec<Duration>>>,
    in_points: RefCell<Vec<Duration>>,
    out_points: RefCell<Vec<Duration>>,
    seeks: RefCell<Vec<Duration>>,
    position: Cell<Duration>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            pause_sets: RefCell::new(Vec::new()),
            in_points: RefCell::new(Vec::new()),
            out_points: RefCell::new(Vec::new()),
            seeks: RefCell::new(Vec::new()),
            position: Cell::new(Duration::ZERO),
        }
    }

    pub fn pause_set_count(&self) -> usize {
        self.pause_sets.borrow().len()
    }

    pub fn last_pause_set(&self) -> Option<Vec<Duration>> {
        self.pause_sets.borrow().last().cloned()
    }

    pub fn last_in_point(&self) -> Option<Duration> {
        self.in_points.borrow().last().copied()
    }

    pub fn last_out_point(&self) -> Option<Duration> {
        self.out_points.borrow().last().copied()
    }

    pub fn last_seek(&self) -> Option<Duration> {
        self.seeks.borrow().last().copied()
    }
}

impl PlaybackSink for RecordingSink {
    fn set_pause_points_by_relative_time(&self, times: Vec<Duration>) {
        self.pause_sets.borrow_mut().push(times);
    }

    fn set_in_point_by_relative_time(&self, t: Duration) {
        self.in_points.borrow_mut().push(t);
    }

    fn set_out_point_by_relative_time(&self, t: Duration) {
        self.out_points.borrow_mut().push(t);
    }

    fn seek_by_relative_time(&self, t: Duration) {
        self.seeks.borrow_mut().push(t);
        self.position.set(t);
    }

    fn current_relative_time(&self) -> Duration {
        self.position.get()
    }
}
