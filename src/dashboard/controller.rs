//! Conversation controller: owns the state and performs sends.

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;

use super::reply::BackendReply;
use super::state::{DashboardState, Event};
use crate::config::schema::DashboardConfig;
use crate::logging;
use crate::proxy::{ChatRequest, extract_detail};

/// Delivers one chat request and returns the raw reply body.
pub trait ChatTransport {
    fn send(&self, request: &ChatRequest) -> Result<Value>;
}

/// Sends through a running proxy's `POST /api/chat`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    url: String,
}

impl HttpTransport {
    /// `proxy_base` is the server root, e.g. `http://127.0.0.1:8787`.
    pub fn new(proxy_base: &str) -> Self {
        Self {
            url: format!("{}/api/chat", proxy_base.trim_end_matches('/')),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the proxy answers at all, with a short timeout.
    pub fn is_reachable(&self) -> bool {
        let health = self.url.replace("/api/chat", "/api/health");
        ureq::get(&health)
            .timeout(Duration::from_secs(3))
            .call()
            .is_ok()
    }
}

impl ChatTransport for HttpTransport {
    fn send(&self, request: &ChatRequest) -> Result<Value> {
        match ureq::post(&self.url).send_json(request) {
            Ok(resp) => resp.into_json().context("proxy reply is not JSON"),
            Err(ureq::Error::Status(status, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                anyhow::bail!("proxy returned {status}: {}", extract_detail(status, &text))
            }
            Err(e) => Err(e).context("proxy request failed"),
        }
    }
}

/// Drives a [`DashboardState`] through send/reply cycles.
///
/// `send` takes `&mut self`, so there is at most one request in flight.
pub struct Controller<T: ChatTransport> {
    state: DashboardState,
    transport: T,
    config: DashboardConfig,
}

impl<T: ChatTransport> Controller<T> {
    pub fn new(transport: T, config: DashboardConfig, state: DashboardState) -> Self {
        Self {
            state,
            transport,
            config,
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn into_state(self) -> DashboardState {
        self.state
    }

    /// Send `text` and fold the outcome into the state. Blank input is
    /// ignored.
    pub fn send(&mut self, text: &str) -> &DashboardState {
        let text = text.trim();
        if text.is_empty() {
            return &self.state;
        }

        self.apply(Event::Sent {
            text: text.to_string(),
            at: Utc::now(),
        });

        let session_id = Some(self.state.session_id.clone()).filter(|id| !id.is_empty());
        let request = ChatRequest::new(text, session_id);

        let outcome = self
            .transport
            .send(&request)
            .and_then(|body| BackendReply::from_value(&body));

        let event = match outcome {
            Ok(reply) => Event::Replied {
                reply,
                at: Utc::now(),
            },
            Err(e) => {
                logging::warn(&format!("chat send failed: {e:#}"));
                Event::Failed { at: Utc::now() }
            }
        };
        self.apply(event);

        &self.state
    }

    fn apply(&mut self, event: Event) {
        let state = std::mem::take(&mut self.state);
        self.state = state.reduce(event, &self.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::mode::ViewMode;
    use crate::dashboard::state::FALLBACK_MESSAGE;
    use serde_json::json;
    use std::cell::RefCell;

    struct Scripted {
        replies: RefCell<Vec<Result<Value>>>,
        seen: RefCell<Vec<ChatRequest>>,
    }

    impl Scripted {
        fn new(mut replies: Vec<Result<Value>>) -> Self {
            logging::quiet();
            replies.reverse();
            Self {
                replies: RefCell::new(replies),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl ChatTransport for Scripted {
        fn send(&self, request: &ChatRequest) -> Result<Value> {
            self.seen.borrow_mut().push(request.clone());
            self.replies
                .borrow_mut()
                .pop()
                .unwrap_or_else(|| Err(anyhow::anyhow!("no scripted reply")))
        }
    }

    #[test]
    fn send_attaches_session_and_applies_reply() {
        let transport = Scripted::new(vec![Ok(json!({
            "answer": "Your curve shows a spike.",
            "session_id": "s1"
        }))]);
        let mut controller =
            Controller::new(transport, DashboardConfig::default(), DashboardState::new("s1"));

        let state = controller.send("  Analyze my Kraft Curve ");
        assert_eq!(state.mode, ViewMode::Analysis);
        assert_eq!(state.messages[0].content, "Analyze my Kraft Curve");

        let seen = controller.transport.seen.borrow();
        assert_eq!(seen[0].session_id.as_deref(), Some("s1"));
    }

    #[test]
    fn transport_error_appends_fallback() {
        let transport = Scripted::new(vec![Err(anyhow::anyhow!("connection refused"))]);
        let mut controller =
            Controller::new(transport, DashboardConfig::default(), DashboardState::new("s1"));

        let state = controller.send("hello");
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].content, FALLBACK_MESSAGE);
        assert!(!state.pending);
    }

    #[test]
    fn unusable_reply_counts_as_failure() {
        let transport = Scripted::new(vec![Ok(json!({ "detail": "oops" }))]);
        let mut controller =
            Controller::new(transport, DashboardConfig::default(), DashboardState::new(""));

        let state = controller.send("hello");
        assert_eq!(state.last_message().unwrap().content, FALLBACK_MESSAGE);
        assert!(controller.transport.seen.borrow()[0].session_id.is_none());
    }

    #[test]
    fn into_state_hands_back_the_conversation() {
        let transport = Scripted::new(vec![
            Ok(json!({ "answer": "Here is a provider.", "mode": "solution" })),
            Ok(json!({ "answer": "Anything else?" })),
        ]);
        let mut controller =
            Controller::new(transport, DashboardConfig::default(), DashboardState::new("s1"));
        controller.send("Find a Specialist");
        controller.send("thanks");

        let state = controller.into_state();
        assert_eq!(state.messages.len(), 4);
        assert_eq!(state.mode, ViewMode::Solution);
        assert!(!state.pending);
    }

    #[test]
    fn blank_input_is_ignored() {
        let transport = Scripted::new(Vec::new());
        let mut controller =
            Controller::new(transport, DashboardConfig::default(), DashboardState::new("s1"));
        assert!(controller.send("   ").messages.is_empty());
        assert!(controller.transport.seen.borrow().is_empty());
    }

    #[test]
    fn http_transport_targets_chat_route() {
        assert_eq!(
            HttpTransport::new("http://127.0.0.1:8787/").url(),
            "http://127.0.0.1:8787/api/chat"
        );
    }
}
