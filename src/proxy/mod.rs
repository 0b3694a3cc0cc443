//! Proxy gateway: relays one chat request to the external backend.
//!
//! A pure pass-through. One outbound POST per inbound request, no retries,
//! no timeout beyond the `ureq` defaults. Every failure is folded into a
//! [`ProxyReply`] carrying a `{ "detail": … }` body, so the HTTP layer never
//! sees an error from here.

pub mod types;

use std::io::Read;
use std::time::Instant;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::analytics::logger::{self, ExchangeLogEntry, Outcome};
use crate::config::schema::{BackendConfig, MessageField};
use crate::logging;

pub use types::{ChatRequest, ProxyReply, extract_detail};

const NOT_CONFIGURED: &str = "Chat backend is not configured.";
const UNREACHABLE: &str = "Failed to reach the chat backend.";

/// Stateless relay built from the `[backend]` config section.
#[derive(Debug, Clone)]
pub struct ProxyGateway {
    backend: BackendConfig,
}

impl ProxyGateway {
    pub fn from_config(backend: &BackendConfig) -> Self {
        Self {
            backend: backend.clone(),
        }
    }

    /// Full backend chat endpoint.
    ///
    /// Fails when the base URL is unset or not `http(s)`, unless `chat_path`
    /// is itself an absolute URL.
    pub fn endpoint(&self) -> Result<String> {
        let path = self.backend.chat_path.trim();
        if is_http_url(path) {
            return Ok(path.to_string());
        }

        let base = self.backend.url.trim();
        if base.is_empty() {
            anyhow::bail!("backend.url is not set (GLUCOCHAT_BACKEND_URL)");
        }
        if !is_http_url(base) {
            anyhow::bail!("backend.url must be an http(s) URL, got '{base}'");
        }

        let base = base.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            Ok(base.to_string())
        } else {
            Ok(format!("{base}/{path}"))
        }
    }

    pub fn message_field(&self) -> MessageField {
        self.backend.message_field
    }

    /// Handle one raw inbound body and produce the reply to send back.
    pub fn forward(&self, raw_body: &str) -> ProxyReply {
        let request = match ChatRequest::parse(raw_body) {
            Ok(request) => request,
            Err(detail) => {
                logging::info(&format!("rejected chat request: {detail}"));
                logger::log_exchange(&ExchangeLogEntry::new(None, 400, Outcome::BadRequest));
                return ProxyReply::detail(400, detail);
            }
        };

        let session_id = request.session_id.as_deref();
        let mut entry = ExchangeLogEntry::new(session_id, 500, Outcome::Misconfigured);
        entry.message_chars = request.message.chars().count();

        let url = match self.endpoint() {
            Ok(url) => url,
            Err(e) => {
                logging::error(&format!("proxy misconfigured: {e:#}"));
                logger::log_exchange(&entry);
                return ProxyReply::detail(500, NOT_CONFIGURED);
            }
        };

        let started = Instant::now();
        let result = self.send(&url, &request);
        entry.latency_ms = Some(started.elapsed().as_millis() as u64);

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                logging::error(&format!("backend unreachable at {url}: {e:#}"));
                entry.outcome = Outcome::TransportError;
                logger::log_exchange(&entry);
                return ProxyReply::detail(500, UNREACHABLE);
            }
        };

        entry.status = reply.status;
        entry.outcome = if reply.is_success() {
            Outcome::Relayed
        } else {
            Outcome::BackendError
        };
        logging::debug(&format!(
            "backend replied status={} bytes={} session={}",
            reply.status,
            reply.body.len(),
            session_id.unwrap_or("-"),
        ));
        logger::log_exchange(&entry);

        reply
    }

    /// Issue the outbound POST. `Err` only for transport-level failures;
    /// any HTTP status from the backend becomes an `Ok` reply.
    fn send(&self, url: &str, request: &ChatRequest) -> Result<ProxyReply> {
        let body = outbound_body(request, self.backend.message_field);

        match ureq::post(url).send_json(&body) {
            Ok(resp) => {
                let status = resp.status();
                let mut bytes = Vec::new();
                resp.into_reader()
                    .read_to_end(&mut bytes)
                    .context("failed reading backend response body")?;

                if (200..300).contains(&status) {
                    Ok(ProxyReply::relay(status, bytes))
                } else {
                    let text = String::from_utf8_lossy(&bytes);
                    Ok(ProxyReply::detail(status, extract_detail(status, &text)))
                }
            }
            Err(ureq::Error::Status(status, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                logging::warn(&format!("backend returned {status}: {}", text.trim()));
                Ok(ProxyReply::detail(status, extract_detail(status, &text)))
            }
            Err(e) => Err(e).context("backend request failed"),
        }
    }
}

/// JSON body sent to the backend: `{ <field>: text, session_id? }`.
pub fn outbound_body(request: &ChatRequest, field: MessageField) -> Value {
    let mut map = Map::new();
    map.insert(
        field.as_str().to_string(),
        Value::String(request.message.clone()),
    );
    if let Some(id) = &request.session_id {
        map.insert("session_id".to_string(), Value::String(id.clone()));
    }
    Value::Object(map)
}

fn is_http_url(val: &str) -> bool {
    let lower = val.to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .any(|scheme| lower.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(url: &str, chat_path: &str) -> ProxyGateway {
        logging::quiet();
        ProxyGateway::from_config(&BackendConfig {
            url: url.to_string(),
            chat_path: chat_path.to_string(),
            message_field: MessageField::Query,
        })
    }

    #[test]
    fn endpoint_joins_base_and_path() {
        assert_eq!(
            gateway("http://localhost:8000/", "/chat").endpoint().unwrap(),
            "http://localhost:8000/chat"
        );
        assert_eq!(
            gateway("https://api.example.com/v1", "chat").endpoint().unwrap(),
            "https://api.example.com/v1/chat"
        );
    }

    #[test]
    fn endpoint_uses_absolute_chat_path() {
        assert_eq!(
            gateway("", "https://chat.example.com/chat").endpoint().unwrap(),
            "https://chat.example.com/chat"
        );
    }

    #[test]
    fn endpoint_rejects_unset_or_invalid_base() {
        assert!(gateway("", "/chat").endpoint().is_err());
        assert!(gateway("   ", "/chat").endpoint().is_err());
        assert!(gateway("undefined", "/chat").endpoint().is_err());
        assert!(gateway("ftp://host", "/chat").endpoint().is_err());
        assert!(gateway("http://", "/chat").endpoint().is_err());
    }

    #[test]
    fn outbound_body_uses_configured_field() {
        let req = ChatRequest::new("hi", Some("s1".to_string()));
        let body = outbound_body(&req, MessageField::Query);
        assert_eq!(body, serde_json::json!({ "query": "hi", "session_id": "s1" }));

        let req = ChatRequest::new("hi", None);
        let body = outbound_body(&req, MessageField::Message);
        assert_eq!(body, serde_json::json!({ "message": "hi" }));
    }

    #[test]
    fn unconfigured_gateway_returns_500_without_calling_out() {
        let reply = gateway("", "/chat").forward(r#"{"message":"hello"}"#);
        assert_eq!(reply.status, 500);
        assert!(reply.body_text().contains(NOT_CONFIGURED));
    }

    #[test]
    fn bad_body_is_rejected_before_config_check() {
        let reply = gateway("", "/chat").forward(r#"{"session_id":"s1"}"#);
        assert_eq!(reply.status, 400);
    }
}
