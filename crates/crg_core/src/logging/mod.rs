//! Logging infrastructure for Capture Replay GUI.
//!
//! Modules in this crate log through the `tracing` macros; this module owns
//! subscriber setup. Two initializers are provided (call exactly one at
//! application startup): stderr-only, or stderr plus a daily-rolled log file
//! under the configured logs folder.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level debugging (very verbose).
    Trace,
    /// Debug information.
    Debug,
    /// General information.
    #[default]
    Info,
    /// Warnings.
    Warn,
    /// Errors.
    Error,
}

impl LogLevel {
    /// Convert to a tracing level.
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }

    /// Env-filter directive for this level.
    fn filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Initialize global tracing output to stderr.
///
/// Respects `RUST_LOG` when set, falling back to the provided default level.
/// Should be called once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(env_filter(default_level))
        .init();
}

/// Initialize global tracing output to stderr plus a daily log file.
///
/// The returned guard must be kept alive for the duration of the
/// application; dropping it stops the background writer and loses buffered
/// lines.
pub fn init_tracing_with_file(
    default_level: LogLevel,
    logs_folder: &Path,
) -> tracing_appender::non_blocking::WorkerGuard {
    let appender = tracing_appender::rolling::daily(logs_folder, "capture-replay.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter(default_level))
        .init();

    guard
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.filter_str()))
}
