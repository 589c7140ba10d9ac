//! Configuration sections and defaults.

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;

/// All application settings, grouped into sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Folder locations.
    pub paths: PathSettings,
    /// Logging behavior.
    pub logging: LoggingSettings,
    /// Review/annotation behavior.
    pub review: ReviewSettings,
}

/// Folder locations for generated files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Folder for per-capture sidecar settings files.
    pub sidecar_folder: String,
    /// Folder for log files.
    pub logs_folder: String,
    /// Folder for exported annotation snapshots.
    pub snapshots_folder: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            sidecar_folder: "sidecars".to_string(),
            logs_folder: "logs".to_string(),
            snapshots_folder: "snapshots".to_string(),
        }
    }
}

/// Logging behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Minimum level when `RUST_LOG` is not set.
    pub level: LogLevel,
    /// Also write a daily-rolled log file under the logs folder.
    pub log_to_file: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            log_to_file: false,
        }
    }
}

/// Review/annotation behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSettings {
    /// Flush the sidecar store after every track save instead of only when
    /// the capture is closed.
    pub autosave: bool,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self { autosave: true }
    }
}

/// Identifies one section for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    /// The `[paths]` section.
    Paths,
    /// The `[logging]` section.
    Logging,
    /// The `[review]` section.
    Review,
}

impl ConfigSection {
    /// TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Review => "review",
        }
    }

    /// Comment line written above this section.
    pub(crate) fn comment(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "# Sidecar, log, and snapshot locations",
            ConfigSection::Logging => "# Logging configuration",
            ConfigSection::Review => "# Review and annotation behavior",
        }
    }

    /// All sections, in file order.
    pub(crate) fn all() -> [ConfigSection; 3] {
        [
            ConfigSection::Paths,
            ConfigSection::Logging,
            ConfigSection::Review,
        ]
    }
}
