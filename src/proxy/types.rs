//! Wire types shared by the proxy endpoint and its clients.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Inbound request
// ---------------------------------------------------------------------------

/// Canonical chat request accepted by `POST /api/chat`.
///
/// `message` is the canonical field; `query` is accepted as a legacy alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(alias = "query")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, session_id: Option<String>) -> Self {
        Self {
            message: message.into(),
            session_id,
        }
    }

    /// Validate a raw inbound body.
    ///
    /// Rejects non-JSON, non-object bodies, and bodies without a non-empty
    /// `message`/`query` string. The error is the client-facing detail.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|_| "Request body must be valid JSON.".to_string())?;

        let Some(object) = value.as_object() else {
            return Err("Request body must be a JSON object.".to_string());
        };

        let message = ["message", "query"]
            .iter()
            .filter_map(|key| object.get(*key))
            .filter_map(Value::as_str)
            .find(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                "Request body must include a non-empty 'message' (or 'query') string."
                    .to_string()
            })?;

        let session_id = object
            .get("session_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Ok(Self::new(message, session_id))
    }
}

// ---------------------------------------------------------------------------
// Reply
// ---------------------------------------------------------------------------

/// Status and JSON body returned to the caller of the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ProxyReply {
    /// Body relayed unchanged.
    pub fn relay(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// `{ "detail": message }` envelope.
    pub fn detail(status: u16, message: impl Into<String>) -> Self {
        let body = serde_json::json!({ "detail": message.into() }).to_string();
        Self {
            status,
            body: body.into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Best-effort detail for a failed backend response.
///
/// Prefers the JSON `detail` field (non-string values are serialized, which
/// covers validation-error arrays), then the raw text, then a generic
/// message naming the status.
pub fn extract_detail(status: u16, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body)
        && let Some(detail) = map.get("detail")
    {
        match detail {
            Value::String(text) if !text.trim().is_empty() => return text.clone(),
            Value::Null | Value::String(_) => {}
            other => return other.to_string(),
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("Backend request failed with status {status}")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_canonical_and_alias() {
        let req = ChatRequest::parse(r#"{"message":"hi","session_id":"s1"}"#).unwrap();
        assert_eq!(req.message, "hi");
        assert_eq!(req.session_id.as_deref(), Some("s1"));

        let req = ChatRequest::parse(r#"{"query":"hello"}"#).unwrap();
        assert_eq!(req.message, "hello");
        assert_eq!(req.session_id, None);
    }

    #[test]
    fn parse_falls_back_to_query_when_message_blank() {
        let req = ChatRequest::parse(r#"{"message":"  ","query":"real"}"#).unwrap();
        assert_eq!(req.message, "real");
    }

    #[test]
    fn parse_rejects_missing_or_bad_message() {
        for raw in [
            "{}",
            r#"{"message":""}"#,
            r#"{"message":42}"#,
            r#"{"session_id":"s1"}"#,
            "[1,2]",
            "not json",
            "",
        ] {
            let err = ChatRequest::parse(raw).unwrap_err();
            assert!(!err.is_empty(), "empty detail for {raw:?}");
        }
    }

    #[test]
    fn detail_envelope_is_json() {
        let reply = ProxyReply::detail(400, "nope");
        let value: Value = serde_json::from_slice(&reply.body).unwrap();
        assert_eq!(value["detail"], "nope");
        assert!(!reply.is_success());
    }

    #[test]
    fn extract_detail_prefers_json_detail() {
        assert_eq!(extract_detail(404, r#"{"detail":"Session not found"}"#), "Session not found");
        assert_eq!(
            extract_detail(422, r#"{"detail":[{"msg":"field required"}]}"#),
            r#"[{"msg":"field required"}]"#
        );
    }

    #[test]
    fn extract_detail_falls_back_to_text_then_generic() {
        assert_eq!(extract_detail(502, "Bad Gateway\n"), "Bad Gateway");
        assert_eq!(extract_detail(500, r#"{"error":"boom"}"#), r#"{"error":"boom"}"#);
        assert_eq!(extract_detail(503, ""), "Backend request failed with status 503");
    }
}
