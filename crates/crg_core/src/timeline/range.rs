//! Range track: the two-endpoint trim window.
//!
//! Exactly two endpoints exist, one playing the "in" role and one the "out"
//! role. When a commit leaves the "in" endpoint past the "out" endpoint the
//! role flags swap between the two objects; the objects themselves (and any
//! drag the UI has in progress on them) stay where they are.

use std::rc::Rc;
use std::time::Duration;

use crate::models::PointId;
use crate::playback::PlaybackSink;
use crate::settings::ElementHandle;

use super::point::{PointChange, RangeEndpoint, TimelinePoint};
use super::time::clamp_to_capture;
use super::track::{PointTrack, TrackEvent};
use super::{TimelineError, TimelineResult};

const IN_ATTR: &str = "inPoint";
const OUT_ATTR: &str = "outPoint";

/// Track holding the in/out trim endpoints for one open capture.
pub struct RangeTrack {
    base: PointTrack<RangeEndpoint>,
    element: ElementHandle,
    playback: Option<Rc<dyn PlaybackSink>>,
    capture_duration: Duration,
}

impl RangeTrack {
    /// Seed the two endpoints from the sidecar element.
    ///
    /// Missing attributes default to `0` and the capture duration; values
    /// are clamped, and swapped if persisted inconsistently.
    pub(crate) fn new(element: ElementHandle, capture_duration: Duration) -> Self {
        let (mut in_time, mut out_time) = {
            let el = element.lock();
            (
                el.duration_attribute(IN_ATTR)
                    .map(|t| clamp_to_capture(t, capture_duration))
                    .unwrap_or(Duration::ZERO),
                el.duration_attribute(OUT_ATTR)
                    .map(|t| clamp_to_capture(t, capture_duration))
                    .unwrap_or(capture_duration),
            )
        };
        if in_time > out_time {
            tracing::warn!(
                "Persisted range is inverted ({:?} > {:?}), swapping",
                in_time,
                out_time
            );
            std::mem::swap(&mut in_time, &mut out_time);
        }

        let mut base = PointTrack::new();
        base.insert(RangeEndpoint::new(in_time, true));
        base.insert(RangeEndpoint::new(out_time, false));
        Self {
            base,
            element,
            playback: None,
            capture_duration,
        }
    }

    /// The endpoint currently playing the "in" role.
    pub fn in_point(&self) -> &RangeEndpoint {
        self.endpoint(true)
    }

    /// The endpoint currently playing the "out" role.
    pub fn out_point(&self) -> &RangeEndpoint {
        self.endpoint(false)
    }

    /// Start of the trim window.
    pub fn in_time(&self) -> Duration {
        self.in_point().time()
    }

    /// End of the trim window.
    pub fn out_time(&self) -> Duration {
        self.out_point().time()
    }

    /// Handle of the endpoint currently playing the given role.
    ///
    /// The handle stays with the object through role swaps, so a drag keeps
    /// addressing the same endpoint even after it crosses over.
    pub fn endpoint_id(&self, is_in: bool) -> PointId {
        self.base
            .iter()
            .find(|(_, p)| p.is_in() == is_in)
            .map(|(id, _)| id)
            .unwrap_or_else(|| unreachable!("range track always holds both roles"))
    }

    /// Whether the range is editable (mirrors the endpoints' lockstep flag).
    pub fn is_enabled(&self) -> bool {
        self.base.iter().any(|(_, p)| p.enabled())
    }

    /// Whether unsaved changes are pending.
    pub fn is_dirty(&self) -> bool {
        self.base.is_dirty()
    }

    /// Register the UI-facing change listener.
    pub fn set_listener(&mut self, listener: impl Fn(TrackEvent) + 'static) {
        self.base.set_listener(listener);
    }

    /// Move the "in" endpoint. Returns whether a save was written.
    pub fn set_in_time(&mut self, t: Duration) -> bool {
        let id = self.endpoint_id(true);
        self.set_endpoint_time(id, t).unwrap_or(false)
    }

    /// Move the "out" endpoint. Returns whether a save was written.
    pub fn set_out_time(&mut self, t: Duration) -> bool {
        let id = self.endpoint_id(false);
        self.set_endpoint_time(id, t).unwrap_or(false)
    }

    /// Move an endpoint by handle. Returns whether a save was written.
    pub fn set_endpoint_time(&mut self, id: PointId, t: Duration) -> TimelineResult<bool> {
        self.base.get(id).ok_or(TimelineError::UnknownPoint(id))?;
        let capture_duration = self.capture_duration;
        let change = self
            .base
            .get_mut(id)
            .and_then(|p| p.core_mut().set_time(t, capture_duration));
        Ok(self.apply_change(id, change))
    }

    /// Begin or end a drag on an endpoint. Returns whether a save was
    /// written.
    pub fn set_endpoint_floating(&mut self, id: PointId, floating: bool) -> TimelineResult<bool> {
        self.base.get(id).ok_or(TimelineError::UnknownPoint(id))?;
        let change = self
            .base
            .get_mut(id)
            .and_then(|p| p.core_mut().set_floating(floating));
        Ok(self.apply_change(id, change))
    }

    /// Whether the endpoint moved during its current/last drag.
    pub fn moved_since_float(&self, id: PointId) -> TimelineResult<bool> {
        self.base
            .get(id)
            .map(|p| p.core().moved_since_float())
            .ok_or(TimelineError::UnknownPoint(id))
    }

    /// Toggle both endpoints in lockstep.
    ///
    /// Driven by the playback-state listener: enabled exactly while the
    /// engine is at rest. Nothing here is persisted (the sidecar stores
    /// only the two times).
    pub fn set_enabled(&mut self, enabled: bool) {
        let was_dirty = self.base.is_dirty();
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
        // Enabled is session state, not sidecar state.
        if !was_dirty {
            self.base.clear_dirty();
        }
    }

    /// Attach to (or detach from) a live playback session.
    pub fn attach_playback(&mut self, playback: Option<Rc<dyn PlaybackSink>>) {
        self.playback = playback;
        if self.playback.is_some() {
            self.push_to_playback();
        }
    }

    /// Write the two times into the sidecar element. Returns whether a
    /// write happened.
    pub(crate) fn save(&mut self) -> bool {
        if !self.base.is_dirty() || self.base.in_batch() {
            return false;
        }
        {
            let mut element = self.element.lock();
            element.set_duration_attribute(IN_ATTR, self.in_time());
            element.set_duration_attribute(OUT_ATTR, self.out_time());
        }
        self.base.clear_dirty();
        tracing::debug!("Saved range {:?}..{:?}", self.in_time(), self.out_time());
        true
    }

    fn endpoint(&self, is_in: bool) -> &RangeEndpoint {
        self.base
            .iter()
            .find(|(_, p)| p.is_in() == is_in)
            .map(|(_, p)| p)
            .unwrap_or_else(|| unreachable!("range track always holds both roles"))
    }

    fn apply_change(&mut self, id: PointId, change: Option<PointChange>) -> bool {
        let Some(change) = change else {
            return false;
        };
        self.base.note_change(id, change);
        if !change.save {
            return false;
        }
        self.normalize_roles();
        self.push_to_playback();
        self.save()
    }

    /// Crossover swap: after a commit, the smaller time must hold the "in"
    /// role. Only the role flags move between the two objects.
    fn normalize_roles(&mut self) {
        if self.in_time() <= self.out_time() {
            return;
        }
        tracing::trace!("Range endpoints crossed, swapping roles");
        for id in self.base.ids() {
            if let Some(point) = self.base.get_mut(id) {
                let flipped = !point.is_in();
                point.set_is_in(flipped);
            }
        }
    }

    fn push_to_playback(&self) {
        if self.base.in_batch() {
            return;
        }
        if let Some(playback) = &self.playback {
            playback.set_in_point_by_relative_time(self.in_time());
            playback.set_out_point_by_relative_time(self.out_time());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsElement;
    use crate::test_util::RecordingSink;

    fn secs(v: u64) -> Duration {
        Duration::from_secs(v)
    }

    fn element() -> ElementHandle {
        SettingsElement::new("range").into_handle()
    }

    #[test]
    fn seeds_defaults_from_empty_element() {
        let track = RangeTrack::new(element(), secs(10));
        assert_eq!(track.in_time(), Duration::ZERO);
        assert_eq!(track.out_time(), secs(10));
    }

    #[test]
    fn seeds_from_persisted_values() {
        let el = element();
        {
            let mut el = el.lock();
            el.set_duration_attribute(IN_ATTR, secs(2));
            el.set_duration_attribute(OUT_ATTR, secs(8));
        }
        let track = RangeTrack::new(el, secs(10));
        assert_eq!(track.in_time(), secs(2));
        assert_eq!(track.out_time(), secs(8));
    }

    #[test]
    fn inverted_persisted_values_are_swapped_and_clamped() {
        let el = element();
        {
            let mut el = el.lock();
            el.set_duration_attribute(IN_ATTR, secs(30));
            el.set_duration_attribute(OUT_ATTR, secs(4));
        }
        let track = RangeTrack::new(el, secs(10));
        assert_eq!(track.in_time(), secs(4));
        assert_eq!(track.out_time(), secs(10)); // 30s clamped to duration
    }

    #[test]
    fn ordering_invariant_holds_after_any_sets() {
        let mut track = RangeTrack::new(element(), secs(10));
        track.set_in_time(secs(3));
        track.set_out_time(secs(7));
        track.set_in_time(secs(9)); // crosses the out point
        assert!(track.in_time() <= track.out_time());
        assert_eq!(track.in_time(), secs(7));
        assert_eq!(track.out_time(), secs(9));

        track.set_out_time(secs(1)); // crosses back
        assert!(track.in_time() <= track.out_time());
        assert_eq!(track.in_time(), secs(1));
        assert_eq!(track.out_time(), secs(7));
    }

    #[test]
    fn crossover_swaps_roles_not_objects() {
        let mut track = RangeTrack::new(element(), secs(10));
        track.set_in_time(secs(3));
        track.set_out_time(secs(5));

        let dragged = track.endpoint_id(true);
        track.set_endpoint_time(dragged, secs(8)).unwrap();

        // The dragged object kept its handle but now plays the "out" role.
        assert_eq!(track.endpoint_id(false), dragged);
        assert_eq!(track.out_time(), secs(8));
        assert_eq!(track.in_time(), secs(5));
    }

    #[test]
    fn commit_pushes_and_persists() {
        let el = element();
        let sink = Rc::new(RecordingSink::new());
        let mut track = RangeTrack::new(el.clone(), secs(10));
        track.attach_playback(Some(sink.clone()));

        assert!(track.set_in_time(secs(2)));
        assert_eq!(sink.last_in_point(), Some(secs(2)));
        assert_eq!(el.lock().duration_attribute(IN_ATTR), Some(secs(2)));
        assert_eq!(el.lock().duration_attribute(OUT_ATTR), Some(secs(10)));
    }

    #[test]
    fn float_commits_once_on_release() {
        let el = element();
        let mut track = RangeTrack::new(el.clone(), secs(10));
        let id = track.endpoint_id(true);

        track.set_endpoint_floating(id, true).unwrap();
        track.set_endpoint_time(id, secs(2)).unwrap();
        track.set_endpoint_time(id, secs(4)).unwrap();
        assert_eq!(el.lock().duration_attribute(IN_ATTR), None); // nothing persisted yet

        assert!(track.set_endpoint_floating(id, false).unwrap());
        assert_eq!(el.lock().duration_attribute(IN_ATTR), Some(secs(4)));
    }

    #[test]
    fn crossover_during_float_resolves_at_release() {
        let mut track = RangeTrack::new(element(), secs(10));
        track.set_out_time(secs(5));
        let id = track.endpoint_id(true);

        track.set_endpoint_floating(id, true).unwrap();
        track.set_endpoint_time(id, secs(9)).unwrap();
        // Mid-drag the roles haven't swapped yet.
        assert_eq!(track.endpoint_id(true), id);

        track.set_endpoint_floating(id, false).unwrap();
        assert_eq!(track.endpoint_id(false), id);
        assert!(track.in_time() <= track.out_time());
    }

    #[test]
    fn enabled_follows_lockstep_without_persisting() {
        let mut track = RangeTrack::new(element(), secs(10));
        assert!(track.is_enabled());
        track.set_enabled(false);
        assert!(!track.is_enabled());
        assert!(!track.is_dirty());
        track.set_enabled(true);
        assert!(track.is_enabled());
    }
}
