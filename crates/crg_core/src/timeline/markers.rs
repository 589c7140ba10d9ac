//! Marker track: named annotations living inside the capture file.
//!
//! Unlike the sidecar-backed tracks, markers have no load/save cycle of
//! their own. The capture file's marker list is the single source of truth;
//! every mutation is forwarded to it immediately, and structural changes
//! flush the file's marker index so external readers stay consistent.

use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use crate::capture::MarkerStore;
use crate::models::{MarkerId, PointId};

use super::point::{Marker, PointChange, TimelinePoint};
use super::time::clamp_to_capture;
use super::track::{PointTrack, TrackEvent};
use super::{TimelineError, TimelineResult};

/// Track of the capture file's markers.
pub struct MarkerTrack {
    base: PointTrack<Marker>,
    store: Rc<dyn MarkerStore>,
    capture_duration: Duration,
}

impl MarkerTrack {
    /// Mirror the capture file's current marker list.
    pub(crate) fn new(store: Rc<dyn MarkerStore>, capture_duration: Duration) -> Self {
        let mut base = PointTrack::new();
        for record in store.records() {
            let time = clamp_to_capture(record.time, capture_duration);
            base.insert(Marker::new(record.id, record.name, time));
        }
        tracing::debug!("Marker track mirrors {} file markers", base.len());
        Self {
            base,
            store,
            capture_duration,
        }
    }

    /// Iterate markers in insertion/promotion order.
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.base.iter().map(|(_, m)| m)
    }

    /// Number of markers.
    pub fn len(&self) -> usize {
        self.base.len()
    }

    /// Whether the capture has no markers.
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// Look up a marker by its file identity.
    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.base.iter().find(|(_, m)| m.id() == id).map(|(_, m)| m)
    }

    /// Register the UI-facing change listener.
    pub fn set_listener(&mut self, listener: impl Fn(TrackEvent) + 'static) {
        self.base.set_listener(listener);
    }

    /// Add a marker to the capture file.
    pub fn add_at(&mut self, time: Duration, name: &str) -> TimelineResult<MarkerId> {
        if name.is_empty() {
            return Err(TimelineError::EmptyMarkerName);
        }
        let time = clamp_to_capture(time, self.capture_duration);
        let record = self.store.add(name, time);
        self.store.flush_index();

        let id = record.id;
        let point_id = self.base.insert(Marker::new(id, record.name, record.time));
        self.base.emit(TrackEvent::Added(point_id));
        tracing::debug!("Added {} '{}' at {:?}", id, name, time);
        Ok(id)
    }

    /// Remove a marker from the capture file.
    ///
    /// Returns the removed marker so the caller can cascade (a coupled
    /// pause point goes with it).
    pub fn remove(&mut self, id: MarkerId) -> TimelineResult<Marker> {
        let point_id = self
            .point_id_of(id)
            .ok_or(TimelineError::UnknownMarker(id))?;
        self.store.remove(id);
        self.store.flush_index();

        let marker = self
            .base
            .remove(point_id)
            .ok_or(TimelineError::UnknownMarker(id))?;
        self.base.emit(TrackEvent::Removed(point_id));
        tracing::debug!("Removed {}", id);
        Ok(marker)
    }

    /// Clear the file's marker list and the local collection together.
    pub fn remove_all(&mut self) -> Vec<Marker> {
        self.store.clear();
        self.store.flush_index();

        let removed: Vec<Marker> = {
            let ids = self.base.ids();
            ids.into_iter()
                .filter_map(|pid| self.base.remove(pid))
                .collect()
        };
        self.base.emit(TrackEvent::Reloaded);
        tracing::debug!("Cleared {} markers", removed.len());
        removed
    }

    /// Rename a marker; flushes the file index.
    pub fn rename(&mut self, id: MarkerId, name: &str) -> TimelineResult<()> {
        if name.is_empty() {
            return Err(TimelineError::EmptyMarkerName);
        }
        let point_id = self
            .point_id_of(id)
            .ok_or(TimelineError::UnknownMarker(id))?;
        self.store.rename(id, name);
        self.store.flush_index();

        if let Some(marker) = self.base.get_mut(point_id) {
            marker.set_name(name);
        }
        self.base.emit(TrackEvent::Changed(point_id));
        Ok(())
    }

    /// Move a marker, committing per the point protocol.
    ///
    /// Commits are forwarded to the file record immediately.
    pub fn set_time(&mut self, id: MarkerId, t: Duration) -> TimelineResult<Option<PointChange>> {
        let point_id = self
            .point_id_of(id)
            .ok_or(TimelineError::UnknownMarker(id))?;
        let capture_duration = self.capture_duration;
        let change = self
            .base
            .get_mut(point_id)
            .and_then(|m| m.core_mut().set_time(t, capture_duration));
        if let Some(change) = change {
            if change.save {
                self.forward_time(id, point_id);
            }
            self.base.note_change(point_id, change);
        }
        Ok(change)
    }

    /// Toggle a marker's enabled flag.
    pub fn set_enabled(&mut self, id: MarkerId, enabled: bool) -> TimelineResult<Option<PointChange>> {
        let point_id = self
            .point_id_of(id)
            .ok_or(TimelineError::UnknownMarker(id))?;
        let change = self
            .base
            .get_mut(point_id)
            .and_then(|m| m.core_mut().set_enabled(enabled));
        if let Some(change) = change {
            self.base.note_change(point_id, change);
        }
        Ok(change)
    }

    /// Begin or end a marker drag.
    ///
    /// Ending the drag is the commit point; the final position reaches the
    /// file record then.
    pub fn set_floating(&mut self, id: MarkerId, floating: bool) -> TimelineResult<Option<PointChange>> {
        let point_id = self
            .point_id_of(id)
            .ok_or(TimelineError::UnknownMarker(id))?;
        let change = self
            .base
            .get_mut(point_id)
            .and_then(|m| m.core_mut().set_floating(floating));
        if let Some(change) = change {
            if change.save {
                self.forward_time(id, point_id);
            }
            self.base.note_change(point_id, change);
        }
        Ok(change)
    }

    /// Whether the marker moved during its current/last drag.
    pub fn moved_since_float(&self, id: MarkerId) -> TimelineResult<bool> {
        self.get(id)
            .map(|m| m.core().moved_since_float())
            .ok_or(TimelineError::UnknownMarker(id))
    }

    /// Find a marker by name at an exact time, skipping excluded handles.
    ///
    /// Used by the pause-point re-linking heuristic; names are not unique
    /// within a file, so the caller excludes markers it already claimed.
    pub(crate) fn find_by_name_at(
        &self,
        name: &str,
        time: Duration,
        excluded: &HashSet<MarkerId>,
    ) -> Option<MarkerId> {
        self.iter()
            .find(|m| m.name() == name && m.time() == time && !excluded.contains(&m.id()))
            .map(|m| m.id())
    }

    /// Find any marker by name, skipping excluded handles.
    pub(crate) fn find_by_name(&self, name: &str, excluded: &HashSet<MarkerId>) -> Option<MarkerId> {
        self.iter()
            .find(|m| m.name() == name && !excluded.contains(&m.id()))
            .map(|m| m.id())
    }

    fn point_id_of(&self, id: MarkerId) -> Option<PointId> {
        self.base
            .iter()
            .find(|(_, m)| m.id() == id)
            .map(|(pid, _)| pid)
    }

    fn forward_time(&self, id: MarkerId, point_id: PointId) {
        if let Some(marker) = self.base.get(point_id) {
            self.store.set_time(id, marker.time());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::MemoryMarkerStore;

    fn secs(v: u64) -> Duration {
        Duration::from_secs(v)
    }

    fn track() -> (MarkerTrack, Rc<MemoryMarkerStore>) {
        let store = Rc::new(MemoryMarkerStore::new());
        let track = MarkerTrack::new(store.clone(), secs(10));
        (track, store)
    }

    #[test]
    fn add_forwards_to_file_and_flushes() {
        let (mut track, store) = track();
        let id = track.add_at(secs(3), "lap 1").unwrap();

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].time, secs(3));
        assert_eq!(store.flush_count(), 1);
    }

    #[test]
    fn empty_name_is_refused() {
        let (mut track, _) = track();
        assert!(matches!(
            track.add_at(secs(1), ""),
            Err(TimelineError::EmptyMarkerName)
        ));
        assert!(track.is_empty());
    }

    #[test]
    fn add_clamps_into_capture() {
        let (mut track, _) = track();
        let id = track.add_at(secs(60), "late").unwrap();
        assert_eq!(track.get(id).unwrap().time(), secs(10));
    }

    #[test]
    fn remove_clears_file_record() {
        let (mut track, store) = track();
        let id = track.add_at(secs(2), "a").unwrap();
        track.remove(id).unwrap();

        assert!(store.records().is_empty());
        assert!(track.is_empty());
        assert!(matches!(
            track.remove(id),
            Err(TimelineError::UnknownMarker(_))
        ));
    }

    #[test]
    fn commit_reaches_file_record() {
        let (mut track, store) = track();
        let id = track.add_at(secs(2), "a").unwrap();
        track.set_time(id, secs(4)).unwrap();
        assert_eq!(store.records()[0].time, secs(4));
    }

    #[test]
    fn float_defers_file_write_until_release() {
        let (mut track, store) = track();
        let id = track.add_at(secs(2), "a").unwrap();

        track.set_floating(id, true).unwrap();
        track.set_time(id, secs(5)).unwrap();
        track.set_time(id, secs(6)).unwrap();
        assert_eq!(store.records()[0].time, secs(2)); // not yet committed

        track.set_floating(id, false).unwrap();
        assert_eq!(store.records()[0].time, secs(6));
        assert!(track.moved_since_float(id).unwrap());
    }

    #[test]
    fn mirrors_existing_file_markers() {
        let store = Rc::new(MemoryMarkerStore::new());
        store.seed("pre", secs(1));
        store.seed("existing", secs(5));
        let track = MarkerTrack::new(store, secs(10));
        assert_eq!(track.len(), 2);
        assert_eq!(track.iter().map(|m| m.name()).collect::<Vec<_>>(), vec![
            "pre",
            "existing"
        ]);
    }

    #[test]
    fn rename_updates_local_and_file() {
        let (mut track, store) = track();
        let id = track.add_at(secs(2), "old").unwrap();
        track.rename(id, "new").unwrap();
        assert_eq!(track.get(id).unwrap().name(), "new");
        assert_eq!(store.records()[0].name, "new");
        assert!(matches!(
            track.rename(id, ""),
            Err(TimelineError::EmptyMarkerName)
        ));
    }
}
