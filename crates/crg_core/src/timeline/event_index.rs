//! Per-stream event index for seeking, stepping, and strip rendering.
//!
//! Built lazily from a stream's raw event headers on first access, then
//! immutable (only the scrub selection changes). Each record covers the span
//! from its own start to the next record's start; the last record's span
//! comes from the declared stream duration, or a synthetic 1/30 s when the
//! stream has no end marker.

use std::rc::Rc;
use std::time::Duration;

use crate::capture::EventStream;

use super::time::{
    from_timeline_ticks, to_timeline_ticks, SYNTHETIC_LAST_SPAN_TICKS,
};

/// One indexed event: position in the stream, optional frame number, and its
/// span in the tick domain.
#[derive(Debug, Clone)]
pub struct EventRecord {
    index: u32,
    frame_number: Option<u32>,
    start_tick: u64,
    duration_tick: u64,
    selected: bool,
}

impl EventRecord {
    /// Position of the event within its stream.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Frame number from the event's tag payload, for tagged streams.
    pub fn frame_number(&self) -> Option<u32> {
        self.frame_number
    }

    /// Offset of the event from the start of the capture.
    pub fn start(&self) -> Duration {
        from_timeline_ticks(self.start_tick)
    }

    /// Span covered by this event (up to the next event's start).
    pub fn span(&self) -> Duration {
        from_timeline_ticks(self.duration_tick)
    }

    /// Whether this record is the current scrub position.
    pub fn selected(&self) -> bool {
        self.selected
    }

    fn end_tick(&self) -> u64 {
        self.start_tick.saturating_add(self.duration_tick)
    }

    fn covers(&self, tick: u64) -> bool {
        tick >= self.start_tick && tick < self.end_tick()
    }
}

/// Lazily built index over one stream's events.
pub struct EventIndex {
    stream: Rc<dyn EventStream>,
    records: Vec<EventRecord>,
    built: bool,
    selected: Option<u32>,
    selection_listener: Option<Box<dyn Fn(Option<u32>)>>,
}

impl EventIndex {
    /// Create an index for a stream. Nothing is read until first access.
    pub fn new(stream: Rc<dyn EventStream>) -> Self {
        Self {
            stream,
            records: Vec::new(),
            built: false,
            selected: None,
            selection_listener: None,
        }
    }

    /// Register the listener fired when the scrub selection changes.
    ///
    /// Fires exactly once per actual change, with the newly selected index
    /// (or `None` on deselect).
    pub fn set_selection_listener(&mut self, listener: impl Fn(Option<u32>) + 'static) {
        self.selection_listener = Some(Box::new(listener));
    }

    /// Number of indexed events.
    pub fn len(&mut self) -> usize {
        self.ensure_built();
        self.records.len()
    }

    /// Whether the stream has no events.
    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    /// Iterate all records in start order. Restartable: call again for a
    /// fresh pass.
    pub fn nodes(&mut self) -> impl Iterator<Item = &EventRecord> {
        self.ensure_built();
        self.records.iter()
    }

    /// The record at a given stream position.
    pub fn record(&mut self, index: u32) -> Option<&EventRecord> {
        self.ensure_built();
        self.records.get(index as usize)
    }

    /// Currently selected (scrub) position, if any.
    pub fn selected_index(&self) -> Option<u32> {
        self.selected
    }

    /// Move the scrub selection to the event at or nearest before `t`,
    /// using the stream's own nearest-before lookup.
    ///
    /// Returns the resolved index, or `None` when `t` precedes the first
    /// event (which deselects). Re-selecting the same record is a no-op.
    pub fn update_time(&mut self, t: Duration) -> Option<u32> {
        self.ensure_built();
        let found = self
            .stream
            .find_event(t)
            .map(|(index, _)| index)
            .filter(|&index| (index as usize) < self.records.len());
        self.select(found);
        found
    }

    /// Deselect the scrub position. No-op when nothing is selected.
    pub fn clear_time(&mut self) {
        self.select(None);
    }

    fn select(&mut self, index: Option<u32>) {
        if index == self.selected {
            return;
        }
        if let Some(old) = self.selected {
            self.records[old as usize].selected = false;
        }
        if let Some(new) = index {
            self.records[new as usize].selected = true;
        }
        self.selected = index;
        if let Some(listener) = &self.selection_listener {
            listener(index);
        }
    }

    /// Find the record with the greatest start `<= t`.
    ///
    /// Returns `None` when `t` precedes the first record or the stream is
    /// empty. Exact equality matches that record, not the one before it.
    pub fn find_node(&mut self, t: Duration) -> Option<&EventRecord> {
        self.ensure_built();
        let tick = to_timeline_ticks(t);
        let pos = match self
            .records
            .binary_search_by(|r| r.start_tick.cmp(&tick))
        {
            Ok(pos) => pos,
            Err(0) => return None,
            Err(pos) => pos - 1,
        };
        self.records.get(pos)
    }

    /// Fill a render lane: for each slot `k`, the record whose span covers
    /// `start_time + k * stride`.
    ///
    /// Sweeps forward from the binary-search anchor of `start_time`; the
    /// cursor only ever advances, so filling m slots costs O(log n + n + m)
    /// rather than m independent searches. Slots past the last record's end
    /// (and slots before the first record) are left untouched.
    pub fn populate_lane<'a>(
        &'a mut self,
        start_time: Duration,
        stride: Duration,
        out: &mut [Option<&'a EventRecord>],
    ) {
        self.ensure_built();
        if self.records.is_empty() {
            return;
        }

        let start_tick = to_timeline_ticks(start_time);
        let stride_tick = to_timeline_ticks(stride);
        let records = &self.records;
        let mut cursor = match records.binary_search_by(|r| r.start_tick.cmp(&start_tick)) {
            Ok(pos) => pos,
            Err(0) => 0,
            Err(pos) => pos - 1,
        };

        for (k, slot) in out.iter_mut().enumerate() {
            let pos = start_tick.saturating_add(stride_tick.saturating_mul(k as u64));
            while cursor + 1 < records.len() && records[cursor + 1].start_tick <= pos {
                cursor += 1;
            }
            if records[cursor].covers(pos) {
                *slot = Some(&records[cursor]);
            } else if cursor + 1 == records.len() && pos >= records[cursor].end_tick() {
                // Swept past the end of the stream.
                break;
            }
            // Otherwise the sample precedes the first record; leave unset.
        }
    }

    fn ensure_built(&mut self) {
        if self.built {
            return;
        }
        self.built = true;

        let headers = self.stream.headers();
        if headers.is_empty() {
            tracing::debug!("Event index built over empty stream");
            return;
        }

        // Tag interpretation is a per-stream declaration, not per-event.
        let tagged = self.stream.tag_size() >= 4;
        let stream_end = self.stream.duration().map(to_timeline_ticks);

        let count = headers.len();
        let mut records = Vec::with_capacity(count);
        for (i, header) in headers.iter().enumerate() {
            let start_tick = to_timeline_ticks(header.offset);
            let duration_tick = if i + 1 < count {
                to_timeline_ticks(headers[i + 1].offset).saturating_sub(start_tick)
            } else {
                match stream_end {
                    Some(end) if end > start_tick => end - start_tick,
                    _ => SYNTHETIC_LAST_SPAN_TICKS,
                }
            };
            let frame_number = if tagged {
                header
                    .tag
                    .get(0..4)
                    .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            } else {
                None
            };
            records.push(EventRecord {
                index: i as u32,
                frame_number,
                start_tick,
                duration_tick,
                selected: false,
            });
        }
        self.records = records;
        tracing::debug!("Built event index: {} records", count);
    }
}
