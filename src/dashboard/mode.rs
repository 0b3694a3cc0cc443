//! View-mode derivation.
//!
//! Priority: explicit backend `mode` → typed sources → answer keywords. The
//! keyword path is a deprecated fallback gated by
//! `dashboard.keyword_heuristics` and disabled under the strict policy.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::reply::BackendReply;
use super::source::Source;
use crate::config::schema::{DashboardConfig, ModePolicy};

/// Auxiliary panel shown next to the transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Plain conversation, no panel.
    #[default]
    Response,
    /// Kraft curve chart and bio-age gauge.
    Analysis,
    /// Vendor recommendation cards.
    Solution,
}

impl ViewMode {
    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().as_str() {
            "response" => Some(Self::Response),
            "analysis" => Some(Self::Analysis),
            "solution" => Some(Self::Solution),
            _ => None,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Response => write!(f, "response"),
            Self::Analysis => write!(f, "analysis"),
            Self::Solution => write!(f, "solution"),
        }
    }
}

/// Where a mode decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSignal {
    Explicit(ViewMode),
    Sources(ViewMode),
    Keyword(ViewMode),
}

impl ModeSignal {
    pub fn mode(self) -> ViewMode {
        match self {
            Self::Explicit(m) | Self::Sources(m) | Self::Keyword(m) => m,
        }
    }
}

static SOLUTION_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)specialist|vendor|clinic|provider").expect("solution keyword regex must compile")
});

static ANALYSIS_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)graph|chart|curve|glucose|insulin|kraft|pattern|spike|crash")
        .expect("analysis keyword regex must compile")
});

/// Find the strongest signal in a reply, if any.
pub fn detect_signal(reply: &BackendReply, keyword_heuristics: bool) -> Option<ModeSignal> {
    if let Some(mode) = reply.mode {
        return Some(ModeSignal::Explicit(mode));
    }

    if reply.sources.iter().any(|s| matches!(s, Source::VendorCard(_))) {
        return Some(ModeSignal::Sources(ViewMode::Solution));
    }
    if reply.sources.iter().any(|s| matches!(s, Source::GraphData(_))) {
        return Some(ModeSignal::Sources(ViewMode::Analysis));
    }

    if !keyword_heuristics {
        return None;
    }
    keyword_mode(&reply.answer).map(ModeSignal::Keyword)
}

/// Substring heuristic over answer text. Solution terms win over analysis
/// terms.
pub fn keyword_mode(text: &str) -> Option<ViewMode> {
    if SOLUTION_KEYWORDS.is_match(text) {
        Some(ViewMode::Solution)
    } else if ANALYSIS_KEYWORDS.is_match(text) {
        Some(ViewMode::Analysis)
    } else {
        None
    }
}

/// Mode after `reply`, given the mode currently shown.
pub fn next_mode(current: ViewMode, reply: &BackendReply, config: &DashboardConfig) -> ViewMode {
    let heuristics = config.keyword_heuristics && config.mode_policy == ModePolicy::Sticky;

    match (detect_signal(reply, heuristics), config.mode_policy) {
        (Some(signal), _) => signal.mode(),
        (None, ModePolicy::Sticky) => current,
        (None, ModePolicy::Strict) => ViewMode::Response,
    }
}
