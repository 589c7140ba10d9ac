//! Annotation snapshots: JSON export/import of a capture's review state.
//!
//! Markers live in the capture file and pause points in the sidecar; a
//! snapshot flattens both (plus the trim range) into one JSON document that
//! other tools can consume, keyed by capture identity like the sidecars.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::CaptureId;
use crate::settings::sanitize_file_stem;

/// A marker entry in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerSnapshot {
    /// Display name.
    pub name: String,
    /// Offset from the start of the capture, in nanoseconds.
    pub time_ns: u64,
}

/// A pause-point entry in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PausePointSnapshot {
    /// Offset from the start of the capture, in nanoseconds.
    pub time_ns: u64,
    /// Whether the breakpoint is active.
    pub enabled: bool,
    /// Name of the coupled marker, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub marker: Option<String>,
}

/// The trim range in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSnapshot {
    /// Start of the trim window, in nanoseconds.
    pub in_ns: u64,
    /// End of the trim window, in nanoseconds.
    pub out_ns: u64,
}

/// Full annotation state of one capture at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSnapshot {
    /// Capture identity the snapshot belongs to.
    pub capture: String,
    /// RFC 3339 timestamp of when the snapshot was taken.
    pub saved_at: String,
    /// All markers.
    pub markers: Vec<MarkerSnapshot>,
    /// All pause points.
    pub pause_points: Vec<PausePointSnapshot>,
    /// The trim range.
    pub range: RangeSnapshot,
}

/// Manager for snapshot files.
#[derive(Debug)]
pub struct SnapshotManager {
    /// Directory where snapshots are stored.
    snapshots_dir: PathBuf,
}

impl SnapshotManager {
    /// Create a new snapshot manager.
    pub fn new(snapshots_dir: &Path) -> Self {
        Self {
            snapshots_dir: snapshots_dir.to_path_buf(),
        }
    }

    fn snapshot_path(&self, capture: &CaptureId) -> PathBuf {
        self.snapshots_dir
            .join(format!("{}_annotations.json", sanitize_file_stem(capture.as_str())))
    }

    /// Save a snapshot for a capture (atomic write).
    pub fn save_snapshot(
        &self,
        capture: &CaptureId,
        snapshot: &AnnotationSnapshot,
    ) -> Result<(), std::io::Error> {
        fs::create_dir_all(&self.snapshots_dir)?;

        let path = self.snapshot_path(capture);
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &json)?;
        fs::rename(&temp_path, &path)?;

        tracing::debug!("Saved snapshot for '{}' to {}", capture, path.display());
        Ok(())
    }

    /// Load a capture's snapshot, if one exists.
    pub fn load_snapshot(
        &self,
        capture: &CaptureId,
    ) -> Result<Option<AnnotationSnapshot>, std::io::Error> {
        let path = self.snapshot_path(capture);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let snapshot: AnnotationSnapshot = serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        Ok(Some(snapshot))
    }

    /// Delete a capture's snapshot.
    pub fn delete_snapshot(&self, capture: &CaptureId) -> Result<(), std::io::Error> {
        let path = self.snapshot_path(capture);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// List capture stems that have a saved snapshot.
    pub fn list_snapshots(&self) -> Result<Vec<String>, std::io::Error> {
        if !self.snapshots_dir.exists() {
            return Ok(Vec::new());
        }

        let mut stems = Vec::new();
        for entry in fs::read_dir(&self.snapshots_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(stem) = name.strip_suffix("_annotations.json") {
                stems.push(stem.to_string());
            }
        }
        stems.sort();
        Ok(stems)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(capture: &str) -> AnnotationSnapshot {
        AnnotationSnapshot {
            capture: capture.to_string(),
            saved_at: "2024-11-02T10:00:00Z".to_string(),
            markers: vec![MarkerSnapshot {
                name: "lap 1".to_string(),
                time_ns: 3_000_000_000,
            }],
            pause_points: vec![PausePointSnapshot {
                time_ns: 3_000_000_000,
                enabled: true,
                marker: Some("lap 1".to_string()),
            }],
            range: RangeSnapshot {
                in_ns: 0,
                out_ns: 10_000_000_000,
            },
        }
    }

    #[test]
    fn snapshot_roundtrip() {
        let dir = tempdir().unwrap();
        let manager = SnapshotManager::new(dir.path());
        let capture = CaptureId::new("run-01");

        let snapshot = sample("run-01");
        manager.save_snapshot(&capture, &snapshot).unwrap();

        let loaded = manager.load_snapshot(&capture).unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn missing_snapshot_is_none() {
        let dir = tempdir().unwrap();
        let manager = SnapshotManager::new(dir.path());
        assert!(manager
            .load_snapshot(&CaptureId::new("nope"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn list_and_delete() {
        let dir = tempdir().unwrap();
        let manager = SnapshotManager::new(dir.path());
        let a = CaptureId::new("run-a");
        let b = CaptureId::new("run b"); // sanitized stem

        manager.save_snapshot(&a, &sample("run-a")).unwrap();
        manager.save_snapshot(&b, &sample("run b")).unwrap();
        assert_eq!(manager.list_snapshots().unwrap(), vec!["run-a", "run_b"]);

        manager.delete_snapshot(&a).unwrap();
        assert_eq!(manager.list_snapshots().unwrap(), vec!["run_b"]);
    }

    #[test]
    fn uncoupled_point_omits_marker_field() {
        let json = serde_json::to_string(&PausePointSnapshot {
            time_ns: 1,
            enabled: true,
            marker: None,
        })
        .unwrap();
        assert!(!json.contains("marker"));
    }
}
