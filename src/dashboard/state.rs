//! Serializable dashboard state and its reducer.
//!
//! All changes go through [`DashboardState::reduce`], which is pure: it never
//! performs I/O besides best-effort diagnostics and never edits transcript
//! entries that are already present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::graph::{self, BioAgeMetric, GraphDataPoint};
use super::mode::{self, ViewMode};
use super::reply::BackendReply;
use super::source::{Citation, Source, VendorCard};
use crate::config::schema::DashboardConfig;
use crate::logging;

/// Assistant text shown when a send fails.
pub const FALLBACK_MESSAGE: &str =
    "I'm having trouble connecting right now. Please try again in a moment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp,
            citations: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp,
            citations: Vec::new(),
        }
    }
}

/// Something that happened to the conversation.
#[derive(Debug, Clone)]
pub enum Event {
    /// The user sent `text`; a reply is now pending.
    Sent { text: String, at: DateTime<Utc> },
    /// The backend answered.
    Replied { reply: BackendReply, at: DateTime<Utc> },
    /// The send failed before a usable reply arrived.
    Failed { at: DateTime<Utc> },
}

/// Everything the chat page renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub mode: ViewMode,
    #[serde(default = "graph::default_series")]
    pub chart: Vec<GraphDataPoint>,
    #[serde(default)]
    pub bio_age: Option<BioAgeMetric>,
    #[serde(default)]
    pub vendors: Vec<VendorCard>,
    #[serde(default)]
    pub pending: bool,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl DashboardState {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            mode: ViewMode::default(),
            chart: graph::default_series(),
            bio_age: None,
            vendors: Vec::new(),
            pending: false,
        }
    }

    /// Apply one event and return the next state.
    pub fn reduce(mut self, event: Event, config: &DashboardConfig) -> Self {
        match event {
            Event::Sent { text, at } => {
                self.messages.push(ChatMessage::user(text, at));
                self.pending = true;
            }
            Event::Failed { at } => {
                self.messages.push(ChatMessage::assistant(FALLBACK_MESSAGE, at));
                self.pending = false;
            }
            Event::Replied { reply, at } => {
                self.apply_reply(&reply, at, config);
                self.pending = false;
            }
        }
        self
    }

    fn apply_reply(&mut self, reply: &BackendReply, at: DateTime<Utc>, config: &DashboardConfig) {
        if let Some(id) = &reply.session_id {
            self.session_id = id.clone();
        }

        let mut message = ChatMessage::assistant(reply.answer.clone(), at);
        message.citations = reply
            .sources
            .iter()
            .filter_map(|s| match s {
                Source::Content(c) => Some(c.clone()),
                _ => None,
            })
            .collect();
        self.messages.push(message);

        self.mode = mode::next_mode(self.mode, reply, config);

        let vendors: Vec<VendorCard> = reply
            .sources
            .iter()
            .filter_map(|s| match s {
                Source::VendorCard(v) => Some(v.clone()),
                _ => None,
            })
            .collect();
        if !vendors.is_empty() {
            self.vendors = vendors;
        }

        let graph_source = reply.sources.iter().find_map(|s| match s {
            Source::GraphData(g) => Some(g),
            _ => None,
        });
        if let Some(source) = graph_source {
            match graph::parse_payload(&source.payload, config.kraft_interval_minutes) {
                Ok(update) => {
                    if let Some(series) = update.series {
                        self.chart = series;
                    }
                    if let Some(records) = update.bio_age_records {
                        self.bio_age = BioAgeMetric::from_records(&records);
                    }
                }
                Err(e) => {
                    logging::warn(&format!("ignoring graph_data payload: {e:#}"));
                }
            }
        }
    }

    /// Vendor cards for the solution panel, or a single placeholder.
    pub fn solution_panel(&self) -> Vec<VendorCard> {
        if self.vendors.is_empty() {
            vec![VendorCard::placeholder()]
        } else {
            self.vendors.clone()
        }
    }

    /// Bio-age gauge text, `--` when unknown.
    pub fn bio_age_display(&self) -> String {
        BioAgeMetric::display(self.bio_age.as_ref())
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}
