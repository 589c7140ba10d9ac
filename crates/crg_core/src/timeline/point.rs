//! Time points and the commit protocol.
//!
//! A time point is a relative time plus edit-state flags. Three concrete
//! kinds exist: markers, pause points, and range endpoints. Mutations go
//! through [`PointCore`], which clamps writes and reports what the owning
//! track must do about them as a [`PointChange`].
//!
//! Drag semantics: while a point is "floating" (mid-drag), time changes are
//! visual only. Releasing the drag commits once, and marks the change as
//! persistable only if the point actually moved during the float.

use std::time::Duration;

use crate::models::MarkerId;

use super::time::clamp_to_capture;

/// What an applied point mutation requires of the owning track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointChange {
    /// The track has unsaved state.
    pub dirty: bool,
    /// Move the point to the end of the track's iteration order.
    pub promote: bool,
    /// Ask the track to save (the save itself is still dirty-gated).
    pub save: bool,
}

impl PointChange {
    /// A visual-only change (mid-drag).
    fn observe() -> Self {
        Self {
            dirty: false,
            promote: false,
            save: false,
        }
    }
}

/// Common state and commit protocol for all point kinds.
#[derive(Debug, Clone)]
pub struct PointCore {
    relative_time: Duration,
    enabled: bool,
    floating: bool,
    moved_since_float: bool,
    read_only: bool,
}

impl PointCore {
    /// Create an enabled, non-floating point.
    pub(crate) fn new(relative_time: Duration) -> Self {
        Self {
            relative_time,
            enabled: true,
            floating: false,
            moved_since_float: false,
            read_only: false,
        }
    }

    /// Offset from the start of the capture.
    pub fn time(&self) -> Duration {
        self.relative_time
    }

    /// Whether the point participates in playback control.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the point is mid-drag.
    pub fn floating(&self) -> bool {
        self.floating
    }

    /// Whether the point moved since the current/last float began.
    pub fn moved_since_float(&self) -> bool {
        self.moved_since_float
    }

    /// Whether direct time writes are refused (e.g., a coupled pause point,
    /// whose time is always driven by its marker).
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    pub(crate) fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Write the time, honoring the read-only flag.
    ///
    /// Returns `None` when nothing changed (same value after clamping, or
    /// the point is read-only).
    pub(crate) fn set_time(
        &mut self,
        t: Duration,
        capture_duration: Duration,
    ) -> Option<PointChange> {
        if self.read_only {
            return None;
        }
        self.drive_time(t, capture_duration)
    }

    /// Write the time, bypassing the read-only flag.
    ///
    /// Used by the coupling cascade: a coupled pause point refuses direct
    /// writes but still follows its marker.
    pub(crate) fn drive_time(
        &mut self,
        t: Duration,
        capture_duration: Duration,
    ) -> Option<PointChange> {
        let t = clamp_to_capture(t, capture_duration);
        if t == self.relative_time {
            return None;
        }
        self.relative_time = t;
        if self.floating {
            self.moved_since_float = true;
            Some(PointChange::observe())
        } else {
            Some(PointChange {
                dirty: true,
                promote: false,
                save: true,
            })
        }
    }

    /// Toggle the enabled flag.
    ///
    /// An enabled change always commits, even mid-float.
    pub(crate) fn set_enabled(&mut self, enabled: bool) -> Option<PointChange> {
        if enabled == self.enabled {
            return None;
        }
        self.enabled = enabled;
        Some(PointChange {
            dirty: true,
            promote: true,
            save: true,
        })
    }

    /// Toggle the floating flag.
    ///
    /// Starting a float resets the moved flag and reports nothing; ending
    /// one is the commit-on-release point. The release is marked dirty only
    /// when the point moved during the float, so an untouched drag never
    /// reaches persistence.
    pub(crate) fn set_floating(&mut self, floating: bool) -> Option<PointChange> {
        if floating == self.floating {
            return None;
        }
        self.floating = floating;
        if floating {
            self.moved_since_float = false;
            None
        } else {
            Some(PointChange {
                dirty: self.moved_since_float,
                promote: true,
                save: true,
            })
        }
    }
}

/// Access to a point's common core.
pub trait TimelinePoint {
    /// The point's common state.
    fn core(&self) -> &PointCore;

    /// Mutable access for the owning track.
    fn core_mut(&mut self) -> &mut PointCore;
}

/// A persistent, named point-in-time annotation stored in the capture file.
#[derive(Debug, Clone)]
pub struct Marker {
    core: PointCore,
    id: MarkerId,
    name: String,
}

impl Marker {
    pub(crate) fn new(id: MarkerId, name: impl Into<String>, time: Duration) -> Self {
        Self {
            core: PointCore::new(time),
            id,
            name: name.into(),
        }
    }

    /// File-assigned identity.
    pub fn id(&self) -> MarkerId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Offset from the start of the capture.
    pub fn time(&self) -> Duration {
        self.core.time()
    }

    /// Whether the point is mid-drag.
    pub fn floating(&self) -> bool {
        self.core.floating()
    }
}

impl TimelinePoint for Marker {
    fn core(&self) -> &PointCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PointCore {
        &mut self.core
    }
}

/// A breakpoint consumed by the playback engine.
///
/// Coupling to a marker is tracked by the owning [`super::PausePointTrack`],
/// not by the point itself; a coupled point is read-only because its time is
/// driven by the marker.
#[derive(Debug, Clone)]
pub struct PausePoint {
    core: PointCore,
}

impl PausePoint {
    pub(crate) fn new(time: Duration) -> Self {
        Self {
            core: PointCore::new(time),
        }
    }

    /// Offset from the start of the capture.
    pub fn time(&self) -> Duration {
        self.core.time()
    }

    /// Whether the breakpoint is active.
    pub fn enabled(&self) -> bool {
        self.core.enabled()
    }

    /// Whether the point is mid-drag.
    pub fn floating(&self) -> bool {
        self.core.floating()
    }
}

impl TimelinePoint for PausePoint {
    fn core(&self) -> &PointCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PointCore {
        &mut self.core
    }
}

/// One end of the trim range.
///
/// The role flag can swap between the two endpoints when they cross; the
/// objects themselves never trade places.
#[derive(Debug, Clone)]
pub struct RangeEndpoint {
    core: PointCore,
    is_in: bool,
}

impl RangeEndpoint {
    pub(crate) fn new(time: Duration, is_in: bool) -> Self {
        Self {
            core: PointCore::new(time),
            is_in,
        }
    }

    /// Whether this endpoint currently plays the "in" role.
    pub fn is_in(&self) -> bool {
        self.is_in
    }

    pub(crate) fn set_is_in(&mut self, is_in: bool) {
        self.is_in = is_in;
    }

    /// Offset from the start of the capture.
    pub fn time(&self) -> Duration {
        self.core.time()
    }

    /// Whether the endpoint is editable (engine at rest).
    pub fn enabled(&self) -> bool {
        self.core.enabled()
    }
}

impl TimelinePoint for RangeEndpoint {
    fn core(&self) -> &PointCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PointCore {
        &mut self.core
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: Duration = Duration::from_secs(10);

    #[test]
    fn plain_write_commits() {
        let mut core = PointCore::new(Duration::from_secs(1));
        let change = core.set_time(Duration::from_secs(2), CAP).unwrap();
        assert!(change.dirty);
        assert!(change.save);
        assert!(!change.promote);
        assert_eq!(core.time(), Duration::from_secs(2));
    }

    #[test]
    fn same_value_write_is_silent() {
        let mut core = PointCore::new(Duration::from_secs(1));
        assert!(core.set_time(Duration::from_secs(1), CAP).is_none());
    }

    #[test]
    fn writes_clamp_to_capture() {
        let mut core = PointCore::new(Duration::from_secs(1));
        core.set_time(Duration::from_secs(99), CAP).unwrap();
        assert_eq!(core.time(), CAP);
        // Writing the over-range value again resolves to the same clamped
        // time, so nothing changes.
        assert!(core.set_time(Duration::from_secs(42), CAP).is_none());
    }

    #[test]
    fn floating_writes_do_not_persist() {
        let mut core = PointCore::new(Duration::from_secs(1));
        assert!(core.set_floating(true).is_none());
        for s in 2..5 {
            let change = core.set_time(Duration::from_secs(s), CAP).unwrap();
            assert!(!change.dirty);
            assert!(!change.save);
        }
        assert!(core.moved_since_float());

        let release = core.set_floating(false).unwrap();
        assert!(release.dirty);
        assert!(release.promote);
        assert!(release.save);
        assert_eq!(core.time(), Duration::from_secs(4));
    }

    #[test]
    fn unmoved_float_releases_clean() {
        let mut core = PointCore::new(Duration::from_secs(1));
        core.set_floating(true);
        let release = core.set_floating(false).unwrap();
        assert!(!release.dirty);
        assert!(release.save);
        assert!(!core.moved_since_float());
    }

    #[test]
    fn float_reset_on_next_drag() {
        let mut core = PointCore::new(Duration::from_secs(1));
        core.set_floating(true);
        core.set_time(Duration::from_secs(3), CAP);
        core.set_floating(false);
        assert!(core.moved_since_float());

        core.set_floating(true);
        assert!(!core.moved_since_float());
    }

    #[test]
    fn enabled_toggle_commits_even_while_floating() {
        let mut core = PointCore::new(Duration::from_secs(1));
        core.set_floating(true);
        let change = core.set_enabled(false).unwrap();
        assert!(change.dirty);
        assert!(change.promote);
        assert!(change.save);
        assert!(core.set_enabled(false).is_none());
    }

    #[test]
    fn read_only_refuses_direct_writes() {
        let mut core = PointCore::new(Duration::from_secs(1));
        core.set_read_only(true);
        assert!(core.set_time(Duration::from_secs(2), CAP).is_none());
        assert_eq!(core.time(), Duration::from_secs(1));

        // The coupling cascade still drives it.
        assert!(core.drive_time(Duration::from_secs(2), CAP).is_some());
        assert_eq!(core.time(), Duration::from_secs(2));
    }
}
