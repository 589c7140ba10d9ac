//! Identity newtypes for type-safe handles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a capture (a recorded or live multi-stream session).
///
/// The identity is owned by the recording engine; the core treats it as an
/// opaque string and uses it to key sidecar settings and snapshots.
///
/// # Examples
///
/// ```
/// use crg_core::models::CaptureId;
///
/// let id = CaptureId::new("bench-run-2024-11-02");
/// assert_eq!(id.as_str(), "bench-run-2024-11-02");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaptureId(String);

impl CaptureId {
    /// Create a new capture identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaptureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Optional alias for the target a capture was recorded from.
///
/// Some captures are reviewed against a specific device/target; sidecar
/// settings can be scoped by this alias so the same capture reviewed against
/// two targets keeps independent pause points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetAlias(String);

impl TargetAlias {
    /// Create a new target alias.
    pub fn new(alias: impl Into<String>) -> Self {
        Self(alias.into())
    }

    /// Get the underlying alias string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies a marker inside a capture file.
///
/// Marker identity is assigned by the capture file's marker list, not by
/// this crate; it stays valid for the lifetime of the file entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(u64);

impl MarkerId {
    /// Wrap a raw marker identity from the capture file.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw identity value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

/// Track-local handle for a point (pause point or range endpoint).
///
/// Handles are assigned by the owning track and are never reused within a
/// track's lifetime, so a stale handle fails lookup instead of aliasing a
/// newer point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointId(u64);

impl PointId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "point#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_id_display() {
        let id = CaptureId::new("run-01");
        assert_eq!(id.to_string(), "run-01");
    }

    #[test]
    fn marker_id_roundtrip() {
        let id = MarkerId::new(7);
        assert_eq!(id.raw(), 7);
        assert_eq!(id.to_string(), "marker#7");
    }

    #[test]
    fn point_ids_compare() {
        assert!(PointId::new(1) < PointId::new(2));
        assert_eq!(PointId::new(3), PointId::new(3));
    }
}
