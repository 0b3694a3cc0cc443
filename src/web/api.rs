//! JSON API handlers for the web server.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tiny_http::{Response, StatusCode};

use crate::analytics::logger::exchange_log_path;
use crate::dashboard::session::new_session_id;
use crate::dashboard::{ACTION_CHIPS, BackendReply, DashboardState, Event};
use crate::logging;

use super::{HttpResponse, WebContext, content_type_json};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /api/reduce`.
#[derive(Deserialize)]
struct ReduceRequest {
    /// Current state; a fresh one is created when absent.
    #[serde(default)]
    state: Option<DashboardState>,
    /// Session for a fresh state; generated when absent.
    #[serde(default)]
    session_id: Option<String>,
    event: WireEvent,
}

/// Reducer events as sent by the page.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireEvent {
    Sent { text: String },
    Replied { body: Value },
    Failed,
}

#[derive(Serialize)]
struct ChipsResponse {
    chips: &'static [&'static str],
}

#[derive(Serialize)]
struct HealthResponse {
    backend_configured: bool,
    backend_endpoint: Option<String>,
    message_field: String,
    mode_policy: String,
    keyword_heuristics: bool,
    exchange_log_exists: bool,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn json_response<T: Serialize>(data: &T) -> Result<HttpResponse> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200)))
}

/// `{ "detail": message }` with the given status.
pub(crate) fn detail_response(status: u16, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "detail": message }).to_string();
    Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(status))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /api/chat`: relay to the backend.
pub fn post_chat(ctx: &WebContext, body: &str) -> HttpResponse {
    let reply = ctx.gateway.forward(body);
    Response::from_data(reply.body)
        .with_header(content_type_json())
        .with_status_code(StatusCode(reply.status))
}

/// `POST /api/reduce`: apply one event to a state and return the result.
///
/// A `replied` event whose body cannot be adapted is applied as `failed`.
pub fn post_reduce(ctx: &WebContext, body: &str) -> Result<HttpResponse> {
    let req: ReduceRequest = match serde_json::from_str(body) {
        Ok(req) => req,
        Err(e) => {
            logging::info(&format!("rejected reduce request: {e}"));
            return Ok(detail_response(400, "Invalid reduce request."));
        }
    };

    let state = req.state.unwrap_or_else(|| {
        DashboardState::new(
            req.session_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(new_session_id),
        )
    });

    let at = Utc::now();
    let event = match req.event {
        WireEvent::Sent { text } => Event::Sent { text, at },
        WireEvent::Failed => Event::Failed { at },
        WireEvent::Replied { body } => match BackendReply::from_value(&body) {
            Ok(reply) => Event::Replied { reply, at },
            Err(e) => {
                logging::warn(&format!("unusable backend reply: {e:#}"));
                Event::Failed { at }
            }
        },
    };

    json_response(&state.reduce(event, &ctx.dashboard))
}

/// `GET /api/chips`: canned prompts.
pub fn get_chips() -> Result<HttpResponse> {
    json_response(&ChipsResponse {
        chips: ACTION_CHIPS,
    })
}

/// `GET /api/health`: configuration summary.
pub fn get_health(ctx: &WebContext) -> Result<HttpResponse> {
    let endpoint = ctx.gateway.endpoint().ok();

    json_response(&HealthResponse {
        backend_configured: endpoint.is_some(),
        backend_endpoint: endpoint,
        message_field: ctx.gateway.message_field().to_string(),
        mode_policy: ctx.dashboard.mode_policy.to_string(),
        keyword_heuristics: ctx.dashboard.keyword_heuristics,
        exchange_log_exists: exchange_log_path().is_some_and(|p| p.exists()),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
