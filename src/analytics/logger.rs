use std::fmt;
use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Exchange outcome
// ---------------------------------------------------------------------------

/// How a proxied request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Backend answered 2xx and the body was relayed.
    Relayed,
    /// Backend answered non-2xx; status relayed with a `detail` envelope.
    BackendError,
    /// Backend could not be reached.
    TransportError,
    /// Inbound body was rejected before forwarding.
    BadRequest,
    /// Backend URL unset or invalid.
    Misconfigured,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relayed => write!(f, "relayed"),
            Self::BackendError => write!(f, "backend_error"),
            Self::TransportError => write!(f, "transport_error"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::Misconfigured => write!(f, "misconfigured"),
        }
    }
}

// ---------------------------------------------------------------------------
// Exchange log entry (JSONL analytics)
// ---------------------------------------------------------------------------

/// A single entry in `~/.glucochat/exchange-log.jsonl`, one per proxied
/// request. Read back by the reporter for `glucochat stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeLogEntry {
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub status: u16,
    pub outcome: Outcome,
    /// Backend round-trip time; absent when no call was made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    /// Length of the user's message in characters.
    #[serde(default)]
    pub message_chars: usize,
}

impl ExchangeLogEntry {
    pub fn new(session_id: Option<&str>, status: u16, outcome: Outcome) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            session_id: session_id.map(str::to_string),
            status,
            outcome,
            latency_ms: None,
            message_chars: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging functions
// ---------------------------------------------------------------------------

/// Append an exchange record. Best-effort; failures are ignored.
pub fn log_exchange(entry: &ExchangeLogEntry) {
    if !crate::logging::enabled() {
        return;
    }
    let _ = append_log_entry(entry);
}

// ---------------------------------------------------------------------------
// Reading log entries
// ---------------------------------------------------------------------------

/// Read all exchange records. Malformed lines are skipped; a missing file
/// yields an empty vec.
pub fn read_all_entries() -> Vec<ExchangeLogEntry> {
    let Some(path) = exchange_log_path() else {
        return Vec::new();
    };

    let Ok(file) = fs::File::open(path) else {
        return Vec::new();
    };

    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| serde_json::from_str::<ExchangeLogEntry>(&line).ok())
        .collect()
}

/// Read exchange records from the last `days` days (all when `None`).
pub fn read_entries_since_days(days: Option<u32>) -> Vec<ExchangeLogEntry> {
    filter_since_days(read_all_entries(), days)
}

pub(crate) fn filter_since_days(
    entries: Vec<ExchangeLogEntry>,
    days: Option<u32>,
) -> Vec<ExchangeLogEntry> {
    let Some(days) = days else {
        return entries;
    };

    let cutoff = (Utc::now() - chrono::Duration::days(i64::from(days))).to_rfc3339();

    entries
        .into_iter()
        .filter(|e| e.timestamp >= cutoff)
        .collect()
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

fn append_log_entry(entry: &ExchangeLogEntry) -> Result<()> {
    let Some(path) = exchange_log_path() else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

/// Return the path to the exchange log file.
pub fn exchange_log_path() -> Option<PathBuf> {
    crate::config::data_dir().map(|dir| dir.join("exchange-log.jsonl"))
}
