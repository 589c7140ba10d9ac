//! Pause-point track: sidecar-persisted breakpoints for the playback engine.
//!
//! Pause points live in the capture's sidecar settings, scoped by capture
//! identity (and target alias). Each one may be coupled 1:1 to a marker, in
//! which case the marker drives its time and the persisted record carries
//! the marker's name so the pair can be re-linked on the next load. Names
//! are not unique within a capture file, so re-linking is best effort:
//! exact name+time match first, then name-only, then a bare point.

use std::collections::HashMap;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use crate::models::{MarkerId, PointId};
use crate::playback::PlaybackSink;
use crate::settings::{ElementHandle, SettingsElement};

use super::markers::MarkerTrack;
use super::point::{Marker, PausePoint, TimelinePoint};
use super::time::clamp_to_capture;
use super::track::{PointTrack, TrackEvent};
use super::{TimelineError, TimelineResult};

/// Persisted element names.
const POINT_ELEMENT: &str = "point";
const TIME_ATTR: &str = "time";
const ENABLED_ATTR: &str = "enabled";
const MARKER_ATTR: &str = "marker";

/// The marker side of a coupling, denormalized with the name used for
/// persistence and re-linking.
#[derive(Debug, Clone)]
struct CoupledMarker {
    id: MarkerId,
    name: String,
}

/// Track of pause points for one open capture.
pub struct PausePointTrack {
    base: PointTrack<PausePoint>,
    element: ElementHandle,
    couplings: HashMap<PointId, CoupledMarker>,
    playback: Option<Rc<dyn PlaybackSink>>,
    capture_duration: Duration,
    has_enabled: bool,
    has_disabled: bool,
}

impl PausePointTrack {
    pub(crate) fn new(element: ElementHandle, capture_duration: Duration) -> Self {
        Self {
            base: PointTrack::new(),
            element,
            couplings: HashMap::new(),
            playback: None,
            capture_duration,
            has_enabled: false,
            has_disabled: false,
        }
    }

    /// Iterate pause points in insertion/promotion order.
    pub fn iter(&self) -> impl Iterator<Item = (PointId, &PausePoint)> {
        self.base.iter()
    }

    /// Number of pause points.
    pub fn len(&self) -> usize {
        self.base.len()
    }

    /// Whether the track has no pause points.
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Look up a pause point by handle.
    pub fn get(&self, id: PointId) -> Option<&PausePoint> {
        self.base.get(id)
    }

    /// Whether any point is enabled.
    pub fn has_enabled(&self) -> bool {
        self.has_enabled
    }

    /// Whether any point is disabled.
    pub fn has_disabled(&self) -> bool {
        self.has_disabled
    }

    /// Whether unsaved changes are pending.
    pub fn is_dirty(&self) -> bool {
        self.base.is_dirty()
    }

    /// Register the UI-facing change listener.
    pub fn set_listener(&mut self, listener: impl Fn(TrackEvent) + 'static) {
        self.base.set_listener(listener);
    }

    /// The marker a point is coupled to, if any.
    pub fn marker_for(&self, id: PointId) -> Option<MarkerId> {
        self.couplings.get(&id).map(|c| c.id)
    }

    /// The point coupled to a marker, if any.
    pub fn point_for_marker(&self, marker: MarkerId) -> Option<PointId> {
        self.couplings
            .iter()
            .find(|(_, c)| c.id == marker)
            .map(|(id, _)| *id)
    }

    /// Whether a marker already holds a coupled pause point.
    pub fn is_marker_coupled(&self, marker: MarkerId) -> bool {
        self.point_for_marker(marker).is_some()
    }

    /// Rebuild the collection from the sidecar element.
    ///
    /// Records with a marker name try to re-link: an un-coupled marker with
    /// that name at that exact time, else any un-coupled marker with that
    /// name, else a bare point at the persisted time. Out-of-range or
    /// matchless records are dropped with a warning.
    pub(crate) fn load(&mut self, markers: &MarkerTrack) {
        let records = self.read_records();
        {
            let _batch = self.base.begin_batch();
            self.base.clear();
            self.couplings.clear();

            let mut claimed: HashSet<MarkerId> = HashSet::new();
            for record in records {
                match &record.marker {
                    Some(name) => {
                        let found = markers
                            .find_by_name_at(name, record.time, &claimed)
                            .or_else(|| markers.find_by_name(name, &claimed));
                        if let Some(marker_id) = found {
                            // Coupled points sit at the marker's own time.
                            let time = markers
                                .get(marker_id)
                                .map(|m| m.time())
                                .unwrap_or(record.time);
                            claimed.insert(marker_id);
                            let id = self.insert_point(time, record.enabled, true);
                            self.couplings.insert(
                                id,
                                CoupledMarker {
                                    id: marker_id,
                                    name: name.clone(),
                                },
                            );
                        } else if record.time <= self.capture_duration {
                            self.insert_point(record.time, record.enabled, false);
                        } else {
                            tracing::warn!(
                                "Dropping pause point for missing marker '{}' at {:?}",
                                name,
                                record.time
                            );
                        }
                    }
                    None if record.time <= self.capture_duration => {
                        self.insert_point(record.time, record.enabled, false);
                    }
                    None => {
                        tracing::warn!(
                            "Dropping out-of-range pause point at {:?}",
                            record.time
                        );
                    }
                }
            }
            self.recompute_aggregates();
        }
        self.base.clear_dirty();
        self.push_to_playback();
        self.base.emit(TrackEvent::Reloaded);
        tracing::debug!(
            "Loaded {} pause points ({} coupled)",
            self.base.len(),
            self.couplings.len()
        );
    }

    /// Write the collection into the sidecar element.
    ///
    /// No-op while a bulk operation is running or when nothing is dirty.
    /// Returns whether a write happened.
    pub(crate) fn save(&mut self) -> bool {
        if !self.base.is_dirty() || self.base.in_batch() {
            return false;
        }
        {
            let mut element = self.element.lock();
            element.remove_children(POINT_ELEMENT);
            for (id, point) in self.base.iter() {
                let mut child = SettingsElement::new(POINT_ELEMENT);
                child.set_duration_attribute(TIME_ATTR, point.time());
                child.set_bool_attribute(ENABLED_ATTR, point.enabled());
                if let Some(coupled) = self.couplings.get(&id) {
                    child.set_attribute(MARKER_ATTR, coupled.name.clone());
                }
                element.add_child(child);
            }
        }
        self.base.clear_dirty();
        tracing::debug!("Saved {} pause points", self.base.len());
        true
    }

    /// Add an un-coupled pause point.
    ///
    /// Last write wins at a timestamp: an existing un-coupled point at
    /// exactly this (clamped) time is removed first.
    pub fn add_at(&mut self, time: Duration) -> PointId {
        let time = clamp_to_capture(time, self.capture_duration);
        let duplicates: Vec<PointId> = self
            .base
            .iter()
            .filter(|(id, p)| p.time() == time && !self.couplings.contains_key(id))
            .map(|(id, _)| id)
            .collect();
        for id in duplicates {
            self.base.remove(id);
            self.base.emit(TrackEvent::Removed(id));
        }

        let id = self.insert_point(time, true, false);
        self.base.emit(TrackEvent::Added(id));
        self.base.mark_dirty();
        self.recompute_aggregates();
        self.push_to_playback();
        self.save();
        id
    }

    /// Add a pause point 1:1-coupled to a marker, at the marker's time.
    ///
    /// A marker holds at most one coupled pause point; a second coupling is
    /// a caller bug.
    pub fn couple_to_marker(&mut self, marker: &Marker) -> TimelineResult<PointId> {
        if self.is_marker_coupled(marker.id()) {
            return Err(TimelineError::MarkerAlreadyCoupled(marker.id()));
        }

        let id = {
            // Construction side effects must not trigger a premature save.
            let _batch = self.base.begin_batch();
            let time = clamp_to_capture(marker.time(), self.capture_duration);
            let id = self.insert_point(time, true, true);
            self.couplings.insert(
                id,
                CoupledMarker {
                    id: marker.id(),
                    name: marker.name().to_string(),
                },
            );
            self.recompute_aggregates();
            id
        };
        self.base.emit(TrackEvent::Added(id));
        self.base.mark_dirty();
        self.push_to_playback();
        self.save();
        Ok(id)
    }

    /// Remove a pause point (decoupling it first if needed).
    pub fn remove(&mut self, id: PointId) -> TimelineResult<()> {
        self.base
            .remove(id)
            .ok_or(TimelineError::UnknownPoint(id))?;
        self.couplings.remove(&id);
        self.base.emit(TrackEvent::Removed(id));
        self.base.mark_dirty();
        self.recompute_aggregates();
        self.push_to_playback();
        self.save();
        Ok(())
    }

    /// Detach a point from its marker, keeping both alive.
    pub fn decouple(&mut self, id: PointId) -> TimelineResult<()> {
        if self.couplings.remove(&id).is_none() {
            return Ok(());
        }
        if let Some(point) = self.base.get_mut(id) {
            point.core_mut().set_read_only(false);
        }
        self.base.emit(TrackEvent::Changed(id));
        self.base.mark_dirty();
        self.save();
        Ok(())
    }

    /// Cascade from a marker removal: drop its coupled point, if any.
    ///
    /// Returns whether a save was written.
    pub(crate) fn remove_for_marker(&mut self, marker: MarkerId) -> bool {
        match self.point_for_marker(marker) {
            Some(id) => self.remove(id).is_ok(),
            None => false,
        }
    }

    /// Keep the persisted name in sync when a coupled marker is renamed.
    ///
    /// Returns whether a save was written.
    pub(crate) fn update_marker_name(&mut self, marker: MarkerId, name: &str) -> bool {
        let Some(id) = self.point_for_marker(marker) else {
            return false;
        };
        if let Some(coupled) = self.couplings.get_mut(&id) {
            coupled.name = name.to_string();
        }
        self.base.mark_dirty();
        self.save()
    }

    /// Enable every point, as one batch with a single push and save.
    pub fn enable_all(&mut self) -> bool {
        self.set_all_enabled(true)
    }

    /// Disable every point, as one batch with a single push and save.
    pub fn disable_all(&mut self) -> bool {
        self.set_all_enabled(false)
    }

    fn set_all_enabled(&mut self, enabled: bool) -> bool {
        {
            let _batch = self.base.begin_batch();
            for id in self.base.ids() {
                let change = self
                    .base
                    .get_mut(id)
                    .and_then(|p| p.core_mut().set_enabled(enabled));
                if let Some(change) = change {
                    self.base.note_change(id, change);
                }
            }
            self.recompute_aggregates();
        }
        self.push_to_playback();
        self.save()
    }

    /// Move an un-coupled pause point.
    ///
    /// Coupled points refuse direct writes (their time belongs to the
    /// marker; the session redirects such drags into a marker float).
    /// Returns whether a save was written.
    pub fn set_time(&mut self, id: PointId, t: Duration) -> TimelineResult<bool> {
        self.base
            .get(id)
            .ok_or(TimelineError::UnknownPoint(id))?;
        let capture_duration = self.capture_duration;
        let change = self
            .base
            .get_mut(id)
            .and_then(|p| p.core_mut().set_time(t, capture_duration));
        Ok(self.apply_change(id, change))
    }

    /// Toggle one point's enabled flag. Returns whether a save was written.
    pub fn set_enabled(&mut self, id: PointId, enabled: bool) -> TimelineResult<bool> {
        self.base
            .get(id)
            .ok_or(TimelineError::UnknownPoint(id))?;
        let change = self
            .base
            .get_mut(id)
            .and_then(|p| p.core_mut().set_enabled(enabled));
        let saved = self.apply_change(id, change);
        if change.is_some() {
            self.recompute_aggregates();
        }
        Ok(saved)
    }

    /// Begin or end a drag on an un-coupled point. Returns whether a save
    /// was written.
    pub fn set_floating(&mut self, id: PointId, floating: bool) -> TimelineResult<bool> {
        self.base
            .get(id)
            .ok_or(TimelineError::UnknownPoint(id))?;
        let change = self
            .base
            .get_mut(id)
            .and_then(|p| p.core_mut().set_floating(floating));
        Ok(self.apply_change(id, change))
    }

    /// Whether the point moved during its current/last drag.
    pub fn moved_since_float(&self, id: PointId) -> TimelineResult<bool> {
        self.base
            .get(id)
            .map(|p| p.core().moved_since_float())
            .ok_or(TimelineError::UnknownPoint(id))
    }

    /// Marker cascade: drive a coupled point's time (bypasses read-only).
    ///
    /// Returns whether a save was written.
    pub(crate) fn drive_marker_time(&mut self, marker: MarkerId, t: Duration) -> bool {
        let Some(id) = self.point_for_marker(marker) else {
            return false;
        };
        let capture_duration = self.capture_duration;
        let change = self
            .base
            .get_mut(id)
            .and_then(|p| p.core_mut().drive_time(t, capture_duration));
        self.apply_change(id, change)
    }

    /// Marker cascade: float/unfloat a coupled point with its marker.
    ///
    /// Returns whether a save was written.
    pub(crate) fn drive_marker_float(&mut self, marker: MarkerId, floating: bool) -> bool {
        let Some(id) = self.point_for_marker(marker) else {
            return false;
        };
        let change = self
            .base
            .get_mut(id)
            .and_then(|p| p.core_mut().set_floating(floating));
        self.apply_change(id, change)
    }

    /// Attach to (or detach from) a live playback session.
    ///
    /// Attaching pushes the current set; detaching re-enables every point,
    /// since without an engine there is nothing to pause.
    pub fn attach_playback(&mut self, playback: Option<Rc<dyn PlaybackSink>>) {
        let attached = playback.is_some();
        self.playback = playback;
        if attached {
            self.push_to_playback();
        } else {
            self.enable_all();
        }
    }

    /// Push the enabled breakpoint times to the engine, if attached.
    fn push_to_playback(&self) {
        if self.base.in_batch() {
            return;
        }
        let Some(playback) = &self.playback else {
            return;
        };
        let times: Vec<Duration> = self
            .base
            .iter()
            .filter(|(_, p)| p.enabled())
            .map(|(_, p)| p.time())
            .collect();
        tracing::trace!("Pushing {} pause points to playback", times.len());
        playback.set_pause_points_by_relative_time(times);
    }

    fn apply_change(&mut self, id: PointId, change: Option<super::point::PointChange>) -> bool {
        let Some(change) = change else {
            return false;
        };
        self.base.note_change(id, change);
        self.push_to_playback();
        if change.save {
            self.save()
        } else {
            false
        }
    }

    fn insert_point(&mut self, time: Duration, enabled: bool, coupled: bool) -> PointId {
        let mut point = PausePoint::new(time);
        if !enabled {
            point.core_mut().set_enabled(false);
        }
        if coupled {
            point.core_mut().set_read_only(true);
        }
        self.base.insert(point)
    }

    fn recompute_aggregates(&mut self) {
        self.has_enabled = self.base.iter().any(|(_, p)| p.enabled());
        self.has_disabled = self.base.iter().any(|(_, p)| !p.enabled());
    }

    fn read_records(&self) -> Vec<PersistedPausePoint> {
        let element = self.element.lock();
        element
            .children_named(POINT_ELEMENT)
            .into_iter()
            .filter_map(|child| {
                let child = child.lock();
                let time = child.duration_attribute(TIME_ATTR)?;
                Some(PersistedPausePoint {
                    time,
                    enabled: child.bool_attribute(ENABLED_ATTR).unwrap_or(true),
                    marker: child.attribute(MARKER_ATTR).map(str::to_string),
                })
            })
            .collect()
    }
}

/// One persisted pause-point record.
struct PersistedPausePoint {
    time: Duration,
    enabled: bool,
    marker: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsElement;
    use crate::test_util::{MemoryMarkerStore, RecordingSink};

    fn secs(v: u64) -> Duration {
        Duration::from_secs(v)
    }

    fn element() -> ElementHandle {
        SettingsElement::new("pausePoints").into_handle()
    }

    fn track() -> PausePointTrack {
        PausePointTrack::new(element(), secs(10))
    }

    fn marker_track() -> MarkerTrack {
        MarkerTrack::new(Rc::new(MemoryMarkerStore::new()), secs(10))
    }

    #[test]
    fn add_at_same_time_replaces() {
        let mut track = track();
        let first = track.add_at(secs(3));
        let second = track.add_at(secs(3));

        assert_eq!(track.len(), 1);
        assert!(track.get(first).is_none());
        assert_eq!(track.get(second).unwrap().time(), secs(3));
        assert!(track.marker_for(second).is_none());
    }

    #[test]
    fn add_at_clamps_then_dedups() {
        let mut track = track();
        track.add_at(secs(10));
        track.add_at(secs(25)); // clamps to 10s, replacing the first
        assert_eq!(track.len(), 1);
    }

    #[test]
    fn save_load_roundtrip() {
        let element = element();
        let markers = marker_track();

        let mut track = PausePointTrack::new(element.clone(), secs(10));
        track.add_at(secs(2));
        let disabled = track.add_at(secs(5));
        track.set_enabled(disabled, false).unwrap();

        let mut reloaded = PausePointTrack::new(element, secs(10));
        reloaded.load(&markers);

        assert_eq!(reloaded.len(), 2);
        let times: Vec<Duration> = reloaded.iter().map(|(_, p)| p.time()).collect();
        assert_eq!(times, vec![secs(2), secs(5)]);
        let enabled: Vec<bool> = reloaded.iter().map(|(_, p)| p.enabled()).collect();
        assert_eq!(enabled, vec![true, false]);
        assert!(!reloaded.is_dirty());
    }

    #[test]
    fn coupling_is_exclusive() {
        let mut markers = marker_track();
        let marker_id = markers.add_at(secs(4), "lap").unwrap();
        let marker = markers.get(marker_id).unwrap().clone();

        let mut track = track();
        let point = track.couple_to_marker(&marker).unwrap();
        assert_eq!(track.marker_for(point), Some(marker_id));
        assert_eq!(track.get(point).unwrap().time(), secs(4));

        assert!(matches!(
            track.couple_to_marker(&marker),
            Err(TimelineError::MarkerAlreadyCoupled(_))
        ));
    }

    #[test]
    fn coupled_point_refuses_direct_moves() {
        let mut markers = marker_track();
        let marker_id = markers.add_at(secs(4), "lap").unwrap();
        let marker = markers.get(marker_id).unwrap().clone();

        let mut track = track();
        let point = track.couple_to_marker(&marker).unwrap();

        assert!(!track.set_time(point, secs(7)).unwrap());
        assert_eq!(track.get(point).unwrap().time(), secs(4));

        // The marker cascade still moves it.
        assert!(track.drive_marker_time(marker_id, secs(7)));
        assert_eq!(track.get(point).unwrap().time(), secs(7));
    }

    #[test]
    fn decouple_keeps_point_alive() {
        let mut markers = marker_track();
        let marker_id = markers.add_at(secs(4), "lap").unwrap();
        let marker = markers.get(marker_id).unwrap().clone();

        let mut track = track();
        let point = track.couple_to_marker(&marker).unwrap();
        track.decouple(point).unwrap();

        assert!(track.marker_for(point).is_none());
        assert!(track.get(point).is_some());
        // Decoupled: direct moves work again.
        assert!(track.set_time(point, secs(8)).unwrap());
    }

    #[test]
    fn remove_for_marker_cascades() {
        let mut markers = marker_track();
        let marker_id = markers.add_at(secs(4), "lap").unwrap();
        let marker = markers.get(marker_id).unwrap().clone();

        let mut track = track();
        let point = track.couple_to_marker(&marker).unwrap();
        assert!(track.remove_for_marker(marker_id));
        assert!(track.get(point).is_none());
        assert!(!track.remove_for_marker(marker_id));
    }

    #[test]
    fn bulk_toggle_pushes_and_saves_once() {
        let sink = Rc::new(RecordingSink::new());
        let mut track = track();
        track.add_at(secs(1));
        track.add_at(secs(2));
        track.add_at(secs(3));
        track.attach_playback(Some(sink.clone()));
        let pushes_before = sink.pause_set_count();

        track.disable_all();
        assert_eq!(sink.pause_set_count(), pushes_before + 1);
        assert_eq!(sink.last_pause_set(), Some(vec![]));
        assert!(!track.has_enabled());
        assert!(track.has_disabled());

        track.enable_all();
        assert_eq!(sink.pause_set_count(), pushes_before + 2);
        assert_eq!(
            sink.last_pause_set(),
            Some(vec![secs(1), secs(2), secs(3)])
        );
    }

    #[test]
    fn only_enabled_points_reach_playback() {
        let sink = Rc::new(RecordingSink::new());
        let mut track = track();
        let a = track.add_at(secs(1));
        track.add_at(secs(2));
        track.attach_playback(Some(sink.clone()));

        track.set_enabled(a, false).unwrap();
        assert_eq!(sink.last_pause_set(), Some(vec![secs(2)]));
    }

    #[test]
    fn detach_reenables_all_points() {
        let sink = Rc::new(RecordingSink::new());
        let mut track = track();
        let a = track.add_at(secs(1));
        track.attach_playback(Some(sink));
        track.set_enabled(a, false).unwrap();

        track.attach_playback(None);
        assert!(track.get(a).unwrap().enabled());
        assert!(track.has_enabled());
    }

    #[test]
    fn float_produces_single_save_with_final_position() {
        let element = element();
        let markers = marker_track();
        let mut track = PausePointTrack::new(element.clone(), secs(10));
        let id = track.add_at(secs(2));

        track.set_floating(id, true).unwrap();
        for s in 3..7 {
            assert!(!track.set_time(id, secs(s)).unwrap());
        }
        // Element still holds the pre-drag state.
        {
            let persisted = element.lock().children_named(POINT_ELEMENT);
            assert_eq!(
                persisted[0].lock().duration_attribute(TIME_ATTR),
                Some(secs(2))
            );
        }

        assert!(track.set_floating(id, false).unwrap());
        let persisted = element.lock().children_named(POINT_ELEMENT);
        assert_eq!(
            persisted[0].lock().duration_attribute(TIME_ATTR),
            Some(secs(6))
        );
    }

    #[test]
    fn unmoved_float_saves_nothing() {
        let mut track = track();
        let id = track.add_at(secs(2));

        track.set_floating(id, true).unwrap();
        assert!(!track.set_floating(id, false).unwrap());
        assert!(!track.moved_since_float(id).unwrap());
    }

    #[test]
    fn load_relinks_by_name_and_time() {
        let store = Rc::new(MemoryMarkerStore::new());
        store.seed("lap", secs(3));
        store.seed("lap", secs(6));
        let markers = MarkerTrack::new(store, secs(10));

        let element = element();
        {
            let mut el = element.lock();
            for (time, name) in [(secs(6), "lap"), (secs(3), "lap")] {
                let mut child = SettingsElement::new(POINT_ELEMENT);
                child.set_duration_attribute(TIME_ATTR, time);
                child.set_bool_attribute(ENABLED_ATTR, true);
                child.set_attribute(MARKER_ATTR, name);
                el.add_child(child);
            }
        }

        let mut track = PausePointTrack::new(element, secs(10));
        track.load(&markers);

        // Each record claimed its exact-time marker despite the shared name.
        assert_eq!(track.len(), 2);
        let marker_ids: Vec<Option<MarkerId>> =
            track.iter().map(|(id, _)| track.marker_for(id)).collect();
        assert!(marker_ids.iter().all(Option::is_some));
        let times: Vec<Duration> = track.iter().map(|(_, p)| p.time()).collect();
        assert_eq!(times, vec![secs(6), secs(3)]);
    }

    #[test]
    fn load_falls_back_to_name_only_match() {
        let store = Rc::new(MemoryMarkerStore::new());
        store.seed("lap", secs(7));
        let markers = MarkerTrack::new(store, secs(10));

        let element = element();
        {
            let mut el = element.lock();
            let mut child = SettingsElement::new(POINT_ELEMENT);
            // Persisted at 2s, but the marker has since moved to 7s.
            child.set_duration_attribute(TIME_ATTR, secs(2));
            child.set_attribute(MARKER_ATTR, "lap");
            el.add_child(child);
        }

        let mut track = PausePointTrack::new(element, secs(10));
        track.load(&markers);

        assert_eq!(track.len(), 1);
        let (id, point) = track.iter().next().unwrap();
        // Re-linked, and snapped to the marker's current time.
        assert!(track.marker_for(id).is_some());
        assert_eq!(point.time(), secs(7));
    }

    #[test]
    fn load_falls_back_to_bare_point() {
        let markers = marker_track();
        let element = element();
        {
            let mut el = element.lock();
            let mut child = SettingsElement::new(POINT_ELEMENT);
            child.set_duration_attribute(TIME_ATTR, secs(2));
            child.set_attribute(MARKER_ATTR, "gone");
            el.add_child(child);

            let mut out_of_range = SettingsElement::new(POINT_ELEMENT);
            out_of_range.set_duration_attribute(TIME_ATTR, secs(99));
            el.add_child(out_of_range);
        }

        let mut track = PausePointTrack::new(element, secs(10));
        track.load(&markers);

        // Matchless-in-range record became a bare point; out-of-range
        // record was dropped.
        assert_eq!(track.len(), 1);
        let (id, point) = track.iter().next().unwrap();
        assert!(track.marker_for(id).is_none());
        assert_eq!(point.time(), secs(2));
    }

    #[test]
    fn persisted_marker_name_survives_roundtrip() {
        let store = Rc::new(MemoryMarkerStore::new());
        store.seed("lap", secs(3));
        let markers = MarkerTrack::new(store, secs(10));
        let marker = markers.iter().next().unwrap().clone();

        let element = element();
        let mut track = PausePointTrack::new(element.clone(), secs(10));
        track.couple_to_marker(&marker).unwrap();

        let mut reloaded = PausePointTrack::new(element, secs(10));
        reloaded.load(&markers);
        let (id, _) = reloaded.iter().next().unwrap();
        assert_eq!(reloaded.marker_for(id), Some(marker.id()));
    }
}
