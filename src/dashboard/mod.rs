//! Conversation and dashboard logic.
//!
//! Turns backend replies into what the chat page shows: the transcript, the
//! auxiliary panel mode, chart series, bio-age metric, and vendor cards.
//! State lives in one serializable [`DashboardState`] and changes only
//! through its reducer.

pub mod controller;
pub mod graph;
pub mod mode;
pub mod reply;
pub mod session;
pub mod source;
pub mod state;

pub use controller::{ChatTransport, Controller, HttpTransport};
pub use mode::ViewMode;
pub use reply::BackendReply;
pub use state::{ChatMessage, DashboardState, Event, Role};

/// Canned prompts offered as one-click chips.
pub const ACTION_CHIPS: &[&str] = &[
    "Analyze my Kraft Curve",
    "Find a Specialist",
    "Check my Biological Age",
];
