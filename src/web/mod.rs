//! Embedded web server for glucochat.
//!
//! A `tiny_http` server that serves:
//! - The single-page chat/dashboard UI
//! - `POST /api/chat`, the proxy gateway to the external backend
//! - `POST /api/reduce`, the dashboard reducer
//! - `GET /api/chips` and `GET /api/health`
//!
//! Launched via `glucochat serve` (default: `http://127.0.0.1:8787`).

mod api;
mod frontend;

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::config::GlucochatConfig;
use crate::config::schema::DashboardConfig;
use crate::logging;
use crate::proxy::ProxyGateway;

pub type HttpResponse = Response<Cursor<Vec<u8>>>;

/// Shared, read-only handler context.
#[derive(Debug, Clone)]
pub struct WebContext {
    pub gateway: ProxyGateway,
    pub dashboard: DashboardConfig,
}

impl WebContext {
    pub fn from_config(config: &GlucochatConfig) -> Self {
        Self {
            gateway: ProxyGateway::from_config(&config.backend),
            dashboard: config.dashboard.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Start the server on `addr` and block.
///
/// Each request runs on its own thread so a slow backend call only holds up
/// its own caller.
pub fn serve(addr: &str, ctx: WebContext, open: bool) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    match ctx.gateway.endpoint() {
        Ok(endpoint) => println!("forwarding chat to {endpoint}"),
        Err(e) => println!("warning: {e:#}; /api/chat will answer 500"),
    }
    println!("glucochat running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");
    logging::info(&format!("server listening on {addr}"));

    if open {
        let _ = open_browser(&format!("http://{addr}"));
    }

    run(server, Arc::new(ctx));
    Ok(())
}

/// Accept loop over an already-bound server.
pub fn run(server: Server, ctx: Arc<WebContext>) {
    for request in server.incoming_requests() {
        let ctx = Arc::clone(&ctx);
        thread::spawn(move || handle(request, &ctx));
    }
}

fn handle(mut request: Request, ctx: &WebContext) {
    let method = request.method().clone();
    let url = request.url().to_string();

    let body = if matches!(method, Method::Put | Method::Post | Method::Patch) {
        let mut buf = String::new();
        if let Err(e) = request.as_reader().read_to_string(&mut buf) {
            logging::warn(&format!("failed reading request body for {url}: {e}"));
        }
        Some(buf)
    } else {
        None
    };

    let resp = match dispatch(ctx, &method, &url, body.as_deref()) {
        Ok(resp) => resp,
        Err(e) => {
            logging::error(&format!("{method} {url} failed: {e:#}"));
            api::detail_response(500, "Internal server error")
        }
    };
    let status = resp.status_code().0;

    let _ = request.respond(resp);

    println!(
        "{} {} {} {}",
        method,
        url,
        status,
        chrono::Local::now().format("%H:%M:%S")
    );
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn dispatch(
    ctx: &WebContext,
    method: &Method,
    url: &str,
    body: Option<&str>,
) -> Result<HttpResponse> {
    let path = url.split('?').next().unwrap_or(url);

    match (method, path) {
        (&Method::Get, "/") | (&Method::Get, "/index.html") => Ok(serve_frontend()),

        (&Method::Post, "/api/chat") => Ok(api::post_chat(ctx, body.unwrap_or(""))),
        (&Method::Post, "/api/reduce") => api::post_reduce(ctx, body.unwrap_or("")),
        (&Method::Get, "/api/chips") => api::get_chips(),
        (&Method::Get, "/api/health") => api::get_health(ctx),

        (_, "/api/chat") | (_, "/api/reduce") => Ok(api::detail_response(405, "Method not allowed")),
        _ => Ok(not_found()),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn serve_frontend() -> HttpResponse {
    Response::from_data(frontend::INDEX_HTML.as_bytes().to_vec())
        .with_header(content_type_html())
        .with_status_code(StatusCode(200))
}

fn not_found() -> HttpResponse {
    api::detail_response(404, "Not found")
}

/// JSON content type header.
pub(crate) fn content_type_json() -> Header {
    Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap()
}

fn content_type_html() -> Header {
    Header::from_bytes("Content-Type", "text/html; charset=utf-8").unwrap()
}

/// Attempt to open a URL in the system default browser.
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(url)
            .spawn()
            .context("failed to open browser")?;
    }

    Ok(())
}
