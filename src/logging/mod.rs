//! Diagnostic text log for glucochat.
//!
//! Appends timestamped lines to `~/.glucochat/gateway.log`. Best-effort:
//! a failed write is dropped and never surfaces to the caller. Settings are
//! installed once by [`init`]; before that, `info` and above are written.

use std::fmt;
use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::Utc;

use crate::config::schema::LoggingConfig;

/// Severity of a diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Parse a configured level name. Unknown names fall back to `Info`.
    pub fn parse(val: &str) -> Self {
        match val.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Self::Debug,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    enabled: bool,
    min_level: Level,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_level: Level::Info,
        }
    }
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Install logging settings for the process. Later calls are ignored.
pub fn init(config: &LoggingConfig) {
    let _ = SETTINGS.set(Settings {
        enabled: config.enabled,
        min_level: Level::parse(&config.level),
    });
}

fn settings() -> Settings {
    SETTINGS.get().copied().unwrap_or_default()
}

/// Whether diagnostics and exchange records should be written at all.
pub fn enabled() -> bool {
    settings().enabled
}

/// Write one diagnostic line if `level` passes the configured threshold.
pub fn log(level: Level, message: &str) {
    let settings = settings();
    if !settings.enabled || level < settings.min_level {
        return;
    }

    let Some(path) = gateway_log_path() else {
        return;
    };

    if let Some(parent) = path.parent()
        && create_dir_all(parent).is_err()
    {
        return;
    }

    let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };

    let _ = writeln!(file, "{}", format_line(level, message));
}

pub fn debug(message: &str) {
    log(Level::Debug, message);
}

pub fn info(message: &str) {
    log(Level::Info, message);
}

pub fn warn(message: &str) {
    log(Level::Warn, message);
}

pub fn error(message: &str) {
    log(Level::Error, message);
}

fn format_line(level: Level, message: &str) -> String {
    let flat = message.replace(['\r', '\n'], " ");
    format!("{} {:<5} {}", Utc::now().to_rfc3339(), level, flat)
}

/// Disable all file output for the rest of the process. Unit tests call this
/// before exercising code that logs.
#[cfg(test)]
pub(crate) fn quiet() {
    init(&LoggingConfig {
        enabled: false,
        ..LoggingConfig::default()
    });
}

/// Path to the diagnostic log file.
pub fn gateway_log_path() -> Option<PathBuf> {
    crate::config::data_dir().map(|dir| dir.join("gateway.log"))
}
