//! Review session: one open capture's tracks and their coordination.
//!
//! The session brackets the sidecar settings lifetime (load on open, flush
//! on close), owns the three tracks, and runs the cross-track cascades:
//! marker removal takes the coupled pause point with it, marker drags drive
//! the coupled point, and a drag on a coupled pause point is redirected
//! into a marker drag. It also relays playback state into range enablement.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::capture::Capture;
use crate::models::{MarkerId, PlaybackState, PointId, TargetAlias};
use crate::playback::PlaybackSink;
use crate::settings::SettingsStore;

use super::event_index::EventIndex;
use super::markers::MarkerTrack;
use super::pause_points::PausePointTrack;
use super::range::RangeTrack;
use super::snapshot::{
    AnnotationSnapshot, MarkerSnapshot, PausePointSnapshot, RangeSnapshot,
};
use super::time::clamp_to_capture;
use super::{TimelineError, TimelineResult};

/// Sidecar element keys owned by the timeline tracks.
const PAUSE_POINTS_KEY: &str = "pausePoints";
const RANGE_KEY: &str = "range";

/// One open capture under review.
pub struct ReviewSession {
    capture: Rc<dyn Capture>,
    alias: Option<TargetAlias>,
    store: Rc<RefCell<SettingsStore>>,
    markers: MarkerTrack,
    pause_points: PausePointTrack,
    range: RangeTrack,
    playback: Option<Rc<dyn PlaybackSink>>,
    playback_state: PlaybackState,
    autosave: bool,
    closed: bool,
}

impl ReviewSession {
    /// Open a capture for review.
    ///
    /// Loads the sidecar settings, mirrors the file's markers, rebuilds the
    /// pause points (re-linking couplings), and seeds the range.
    pub fn open(
        capture: Rc<dyn Capture>,
        alias: Option<TargetAlias>,
        store: Rc<RefCell<SettingsStore>>,
        autosave: bool,
    ) -> TimelineResult<Self> {
        let duration = capture.duration();
        let (pause_element, range_element) = {
            let mut store = store.borrow_mut();
            store.load_settings(capture.id(), alias.as_ref())?;
            (
                store.get_settings(capture.id(), alias.as_ref(), PAUSE_POINTS_KEY)?,
                store.get_settings(capture.id(), alias.as_ref(), RANGE_KEY)?,
            )
        };

        let markers = MarkerTrack::new(capture.markers(), duration);
        let mut pause_points = PausePointTrack::new(pause_element, duration);
        pause_points.load(&markers);
        let range = RangeTrack::new(range_element, duration);

        tracing::debug!("Opened review session for '{}'", capture.id());
        Ok(Self {
            capture,
            alias,
            store,
            markers,
            pause_points,
            range,
            playback: None,
            playback_state: PlaybackState::Idle,
            autosave,
            closed: false,
        })
    }

    /// Total capture duration.
    pub fn duration(&self) -> Duration {
        self.capture.duration()
    }

    /// The marker track.
    pub fn markers(&self) -> &MarkerTrack {
        &self.markers
    }

    /// The pause-point track.
    pub fn pause_points(&self) -> &PausePointTrack {
        &self.pause_points
    }

    /// The range track.
    pub fn range(&self) -> &RangeTrack {
        &self.range
    }

    /// Last observed playback state.
    pub fn playback_state(&self) -> PlaybackState {
        self.playback_state
    }

    // ---- markers ----------------------------------------------------------

    /// Add a marker to the capture file.
    pub fn add_marker(&mut self, time: Duration, name: &str) -> TimelineResult<MarkerId> {
        self.markers.add_at(time, name)
    }

    /// Remove a marker; a coupled pause point goes with it.
    pub fn remove_marker(&mut self, id: MarkerId) -> TimelineResult<()> {
        self.markers.remove(id)?;
        let saved = self.pause_points.remove_for_marker(id);
        self.flush_if(saved)
    }

    /// Remove every marker (and every coupled pause point).
    pub fn remove_all_markers(&mut self) -> TimelineResult<()> {
        let removed = self.markers.remove_all();
        let mut any_saved = false;
        for marker in removed {
            any_saved |= self.pause_points.remove_for_marker(marker.id());
        }
        self.flush_if(any_saved)
    }

    /// Rename a marker; a coupled pause point's persisted name follows.
    pub fn rename_marker(&mut self, id: MarkerId, name: &str) -> TimelineResult<()> {
        self.markers.rename(id, name)?;
        let saved = self.pause_points.update_marker_name(id, name);
        self.flush_if(saved)
    }

    /// Move a marker; a coupled pause point follows.
    pub fn set_marker_time(&mut self, id: MarkerId, t: Duration) -> TimelineResult<()> {
        let change = self.markers.set_time(id, t)?;
        if change.is_none() {
            return Ok(());
        }
        let time = self
            .markers
            .get(id)
            .map(|m| m.time())
            .ok_or(TimelineError::UnknownMarker(id))?;
        let saved = self.pause_points.drive_marker_time(id, time);
        self.flush_if(saved)
    }

    /// Begin or end a marker drag; a coupled pause point floats with it.
    ///
    /// Returns whether the marker moved during the drag, so callers can
    /// discard a click-created marker that was never actually dragged.
    pub fn set_marker_floating(&mut self, id: MarkerId, floating: bool) -> TimelineResult<bool> {
        let moved = self.markers.moved_since_float(id)?;
        let change = self.markers.set_floating(id, floating)?;
        let saved = self.pause_points.drive_marker_float(id, floating);
        if change.is_some() {
            self.flush_if(saved)?;
        }
        Ok(moved)
    }

    // ---- pause points -----------------------------------------------------

    /// Add an un-coupled pause point (last write wins at a timestamp).
    pub fn add_pause_point(&mut self, time: Duration) -> TimelineResult<PointId> {
        let id = self.pause_points.add_at(time);
        self.flush_if(true)?;
        Ok(id)
    }

    /// Add a pause point coupled to a marker, at the marker's time.
    pub fn add_pause_point_for_marker(&mut self, marker: MarkerId) -> TimelineResult<PointId> {
        let marker = self
            .markers
            .get(marker)
            .cloned()
            .ok_or(TimelineError::UnknownMarker(marker))?;
        let id = self.pause_points.couple_to_marker(&marker)?;
        self.flush_if(true)?;
        Ok(id)
    }

    /// Remove a pause point (decoupling it from any marker first).
    pub fn remove_pause_point(&mut self, id: PointId) -> TimelineResult<()> {
        self.pause_points.remove(id)?;
        self.flush_if(true)
    }

    /// Detach a pause point from its marker, keeping both alive.
    pub fn decouple_pause_point(&mut self, id: PointId) -> TimelineResult<()> {
        self.pause_points.decouple(id)?;
        self.flush_if(true)
    }

    /// Move a pause point.
    ///
    /// A coupled point's time belongs to its marker, so the write is
    /// redirected into a marker move.
    pub fn set_pause_point_time(&mut self, id: PointId, t: Duration) -> TimelineResult<()> {
        if let Some(marker) = self.pause_points.marker_for(id) {
            return self.set_marker_time(marker, t);
        }
        let saved = self.pause_points.set_time(id, t)?;
        self.flush_if(saved)
    }

    /// Toggle a pause point's enabled flag.
    pub fn set_pause_point_enabled(&mut self, id: PointId, enabled: bool) -> TimelineResult<()> {
        let saved = self.pause_points.set_enabled(id, enabled)?;
        self.flush_if(saved)
    }

    /// Begin or end a pause-point drag.
    ///
    /// Coupled points redirect into a marker drag. Returns whether the
    /// point moved during the drag (callers discard click-created points
    /// that never moved).
    pub fn set_pause_point_floating(&mut self, id: PointId, floating: bool) -> TimelineResult<bool> {
        if let Some(marker) = self.pause_points.marker_for(id) {
            return self.set_marker_floating(marker, floating);
        }
        let moved = self.pause_points.moved_since_float(id)?;
        let saved = self.pause_points.set_floating(id, floating)?;
        self.flush_if(saved)?;
        Ok(moved)
    }

    /// Enable every pause point.
    pub fn enable_all_pause_points(&mut self) -> TimelineResult<()> {
        let saved = self.pause_points.enable_all();
        self.flush_if(saved)
    }

    /// Disable every pause point.
    pub fn disable_all_pause_points(&mut self) -> TimelineResult<()> {
        let saved = self.pause_points.disable_all();
        self.flush_if(saved)
    }

    // ---- range ------------------------------------------------------------

    /// Move the in point.
    pub fn set_range_in(&mut self, t: Duration) -> TimelineResult<()> {
        let saved = self.range.set_in_time(t);
        self.flush_if(saved)
    }

    /// Move the out point.
    pub fn set_range_out(&mut self, t: Duration) -> TimelineResult<()> {
        let saved = self.range.set_out_time(t);
        self.flush_if(saved)
    }

    /// Begin or end a drag on the endpoint currently playing a role.
    pub fn set_range_floating(&mut self, is_in: bool, floating: bool) -> TimelineResult<()> {
        let id = self.range.endpoint_id(is_in);
        let saved = self.range.set_endpoint_floating(id, floating)?;
        self.flush_if(saved)
    }

    // ---- playback ---------------------------------------------------------

    /// Attach to (or detach from) a live playback session.
    ///
    /// The tracks re-push their state to the new engine; detaching
    /// re-enables everything.
    pub fn attach_playback(&mut self, playback: Option<Rc<dyn PlaybackSink>>) {
        self.playback = playback.clone();
        self.pause_points.attach_playback(playback.clone());
        self.range.attach_playback(playback);
        if self.playback.is_none() {
            self.playback_state = PlaybackState::Idle;
            self.range.set_enabled(true);
        }
    }

    /// Relay a playback state change from the engine.
    ///
    /// The range is editable exactly while the engine is at rest.
    pub fn playback_state_changed(&mut self, state: PlaybackState) {
        if state == self.playback_state {
            return;
        }
        tracing::trace!("Playback state: {:?} -> {:?}", self.playback_state, state);
        self.playback_state = state;
        self.range.set_enabled(state.is_resting());
    }

    /// Seek the engine to a relative time (clamped).
    pub fn seek(&self, t: Duration) {
        if let Some(playback) = &self.playback {
            playback.seek_by_relative_time(clamp_to_capture(t, self.capture.duration()));
        }
    }

    /// Resolve `t` against a stream's index, select the hit, and seek the
    /// engine to the event's start.
    ///
    /// Returns the selected event index, or `None` when `t` precedes the
    /// stream's first event.
    pub fn seek_to_event(&self, index: &mut EventIndex, t: Duration) -> Option<u32> {
        let found = index.update_time(t)?;
        let start = index.record(found).map(|r| r.start())?;
        self.seek(start);
        Some(found)
    }

    // ---- persistence ------------------------------------------------------

    /// Capture the current annotation state as a snapshot.
    pub fn snapshot(&self) -> AnnotationSnapshot {
        AnnotationSnapshot {
            capture: self.capture.id().to_string(),
            saved_at: chrono::Utc::now().to_rfc3339(),
            markers: self
                .markers
                .iter()
                .map(|m| MarkerSnapshot {
                    name: m.name().to_string(),
                    time_ns: m.time().as_nanos() as u64,
                })
                .collect(),
            pause_points: self
                .pause_points
                .iter()
                .map(|(id, p)| PausePointSnapshot {
                    time_ns: p.time().as_nanos() as u64,
                    enabled: p.enabled(),
                    marker: self
                        .pause_points
                        .marker_for(id)
                        .and_then(|m| self.markers.get(m))
                        .map(|m| m.name().to_string()),
                })
                .collect(),
            range: RangeSnapshot {
                in_ns: self.range.in_time().as_nanos() as u64,
                out_ns: self.range.out_time().as_nanos() as u64,
            },
        }
    }

    /// Close the session: write pending saves and unload the sidecar.
    pub fn close(mut self) -> TimelineResult<()> {
        self.pause_points.save();
        self.range.save();
        self.store
            .borrow_mut()
            .unload_settings(self.capture.id(), self.alias.as_ref())?;
        self.closed = true;
        tracing::debug!("Closed review session for '{}'", self.capture.id());
        Ok(())
    }

    fn flush_if(&self, saved: bool) -> TimelineResult<()> {
        if saved && self.autosave {
            self.store
                .borrow()
                .flush(self.capture.id(), self.alias.as_ref())?;
        }
        Ok(())
    }
}

impl Drop for ReviewSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        // Best-effort flush when the session is dropped without close().
        if let Ok(mut store) = self.store.try_borrow_mut() {
            if let Err(e) = store.unload_settings(self.capture.id(), self.alias.as_ref()) {
                tracing::warn!("Failed to flush sidecar on drop: {}", e);
            }
        }
    }
}
