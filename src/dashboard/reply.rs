//! Normalizes every accepted backend reply shape into one type.
//!
//! Canonical fields are `answer`, `session_id`, `retrieved_sources`, and an
//! optional `mode`. Legacy replies use `response` for the answer and
//! `sources` for the source list.

use anyhow::Result;
use serde_json::Value;

use super::mode::ViewMode;
use super::source::Source;

/// A backend chat reply in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    pub answer: String,
    pub session_id: Option<String>,
    pub sources: Vec<Source>,
    /// Explicit mode hint; unrecognized values are dropped.
    pub mode: Option<ViewMode>,
}

impl BackendReply {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            session_id: None,
            sources: Vec::new(),
            mode: None,
        }
    }

    /// Adapt a raw backend JSON body.
    ///
    /// Fails only when the body is not an object or carries no answer text;
    /// every other field is optional.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Some(obj) = value.as_object() else {
            anyhow::bail!("backend reply is not a JSON object");
        };

        let answer = ["answer", "response"]
            .iter()
            .filter_map(|key| obj.get(*key))
            .find_map(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("backend reply has no 'answer' or 'response' text"))?
            .to_string();

        let session_id = obj
            .get("session_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let sources = ["retrieved_sources", "sources"]
            .iter()
            .filter_map(|key| obj.get(*key))
            .find_map(Value::as_array)
            .map(|items| Source::from_values(items))
            .unwrap_or_default();

        let mode = obj
            .get("mode")
            .and_then(Value::as_str)
            .and_then(ViewMode::parse);

        Ok(Self {
            answer,
            session_id,
            sources,
            mode,
        })
    }

    /// Adapt a raw backend body given as text.
    pub fn from_json(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(&value)
    }
}
