//! Sidecar file management: one settings file per capture/target pair.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::{CaptureId, TargetAlias};

use super::element::{ElementHandle, SettingsElement};
use super::{SettingsError, SettingsResult};

/// Root element name of a sidecar document.
const ROOT_ELEMENT: &str = "captureSettings";

/// A loaded sidecar document.
struct LoadedSettings {
    path: PathBuf,
    root: ElementHandle,
}

/// Store of per-capture sidecar settings files.
///
/// Files live under a single folder; the file name is derived from the
/// capture identity and optional target alias. Concurrent opens of the same
/// capture identity are not supported; the store assumes single-owner
/// access.
pub struct SettingsStore {
    root_dir: PathBuf,
    loaded: HashMap<String, LoadedSettings>,
}

impl SettingsStore {
    /// Create a store rooted at the given sidecar folder.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            loaded: HashMap::new(),
        }
    }

    /// The sidecar folder.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Whether settings for the capture/target pair are currently loaded.
    pub fn is_loaded(&self, capture: &CaptureId, alias: Option<&TargetAlias>) -> bool {
        self.loaded.contains_key(&settings_key(capture, alias))
    }

    /// Load the sidecar for a capture/target pair.
    ///
    /// Missing files seed an empty tree. A file that exists but fails to
    /// parse is logged and replaced with a fresh tree on the next flush
    /// rather than failing the whole open.
    pub fn load_settings(
        &mut self,
        capture: &CaptureId,
        alias: Option<&TargetAlias>,
    ) -> SettingsResult<()> {
        let key = settings_key(capture, alias);
        if self.loaded.contains_key(&key) {
            return Ok(());
        }

        let path = self.root_dir.join(format!("{}.xml", key));
        let root = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match roxmltree::Document::parse(&content) {
                Ok(doc) if doc.root_element().tag_name().name() == ROOT_ELEMENT => {
                    SettingsElement::from_xml_node(doc.root_element())
                }
                Ok(_) => {
                    tracing::warn!(
                        "Sidecar {} has unexpected root element, starting fresh",
                        path.display()
                    );
                    SettingsElement::new(ROOT_ELEMENT)
                }
                Err(e) => {
                    tracing::warn!("Sidecar {} is malformed ({}), starting fresh", path.display(), e);
                    SettingsElement::new(ROOT_ELEMENT)
                }
            }
        } else {
            SettingsElement::new(ROOT_ELEMENT)
        };

        tracing::debug!("Loaded sidecar settings for '{}' from {}", capture, path.display());
        self.loaded.insert(
            key,
            LoadedSettings {
                path,
                root: root.into_handle(),
            },
        );
        Ok(())
    }

    /// Get (creating if absent) the keyed element of a loaded sidecar.
    ///
    /// `load_settings` must have been called for the pair first.
    pub fn get_settings(
        &mut self,
        capture: &CaptureId,
        alias: Option<&TargetAlias>,
        key: &str,
    ) -> SettingsResult<ElementHandle> {
        let loaded = self
            .loaded
            .get(&settings_key(capture, alias))
            .ok_or_else(|| SettingsError::NotLoaded(capture.to_string()))?;
        Ok(loaded.root.lock().ensure_child(key))
    }

    /// Write a loaded sidecar to disk atomically.
    pub fn flush(&self, capture: &CaptureId, alias: Option<&TargetAlias>) -> SettingsResult<()> {
        let loaded = self
            .loaded
            .get(&settings_key(capture, alias))
            .ok_or_else(|| SettingsError::NotLoaded(capture.to_string()))?;

        let content = {
            let mut root = loaded.root.lock();
            root.set_attribute("savedAt", chrono::Utc::now().to_rfc3339());
            root.to_xml()
        };
        atomic_write(&loaded.path, &content)?;
        tracing::debug!("Flushed sidecar settings to {}", loaded.path.display());
        Ok(())
    }

    /// Flush and drop a loaded sidecar.
    pub fn unload_settings(
        &mut self,
        capture: &CaptureId,
        alias: Option<&TargetAlias>,
    ) -> SettingsResult<()> {
        let key = settings_key(capture, alias);
        if !self.loaded.contains_key(&key) {
            return Ok(());
        }
        self.flush(capture, alias)?;
        self.loaded.remove(&key);
        Ok(())
    }
}

/// File stem for a capture/target pair.
fn settings_key(capture: &CaptureId, alias: Option<&TargetAlias>) -> String {
    match alias {
        Some(alias) => format!(
            "{}@{}",
            sanitize_file_stem(capture.as_str()),
            sanitize_file_stem(alias.as_str())
        ),
        None => sanitize_file_stem(capture.as_str()),
    }
}

/// Replace path-hostile characters so any capture identity maps to a file name.
pub(crate) fn sanitize_file_stem(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Write content to a file atomically (temp file + rename).
fn atomic_write(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("xml.tmp");
    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}
