/// Proxy gateway tests against a throwaway local backend.
///
/// Each test binds a `tiny_http` server on an ephemeral port, answers one
/// request with a canned status and body, and hands back what it received.
use std::io::Read;
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;

use glucochat::config::schema::{BackendConfig, LoggingConfig, MessageField};
use glucochat::logging;
use glucochat::proxy::ProxyGateway;
use serde_json::{Value, json};
use tiny_http::{Header, Response, Server, StatusCode};

struct Received {
    url: String,
    body: Value,
}

fn quiet() {
    logging::init(&LoggingConfig {
        enabled: false,
        ..LoggingConfig::default()
    });
}

/// Start a backend that answers one request, returning its base URL and a
/// receiver for the request it saw.
fn fake_backend(status: u16, body: &'static str, json: bool) -> (String, mpsc::Receiver<Received>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let Ok(mut request) = server.recv() else {
            return;
        };
        let mut raw = String::new();
        request.as_reader().read_to_string(&mut raw).unwrap();
        let _ = tx.send(Received {
            url: request.url().to_string(),
            body: serde_json::from_str(&raw).unwrap_or(Value::Null),
        });

        let content_type = if json { "application/json" } else { "text/plain" };
        let response = Response::from_string(body)
            .with_status_code(StatusCode(status))
            .with_header(Header::from_bytes("Content-Type", content_type).unwrap());
        let _ = request.respond(response);
    });

    (format!("http://{addr}"), rx)
}

fn gateway(url: &str, field: MessageField) -> ProxyGateway {
    ProxyGateway::from_config(&BackendConfig {
        url: url.to_string(),
        chat_path: "/chat".to_string(),
        message_field: field,
    })
}

fn detail(body: &[u8]) -> String {
    let value: Value = serde_json::from_slice(body).unwrap();
    value["detail"].as_str().unwrap().to_string()
}

// ---------------------------------------------------------------------------
// Success relay
// ---------------------------------------------------------------------------

#[test]
fn success_body_is_relayed_byte_for_byte() {
    quiet();
    let backend_body = r#"{"answer":"Your curve looks flat.","session_id":"s9","retrieved_sources":[]}"#;
    let (url, rx) = fake_backend(200, backend_body, true);

    let reply = gateway(&url, MessageField::Query)
        .forward(r#"{"message":"Analyze my Kraft Curve","session_id":"s9"}"#);

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, backend_body.as_bytes());

    let seen = rx.recv().unwrap();
    assert_eq!(seen.url, "/chat");
    assert_eq!(
        seen.body,
        json!({ "query": "Analyze my Kraft Curve", "session_id": "s9" })
    );
}

#[test]
fn outbound_field_follows_config() {
    quiet();
    let (url, rx) = fake_backend(200, r#"{"answer":"ok"}"#, true);

    let reply = gateway(&url, MessageField::Message).forward(r#"{"query":"hello"}"#);
    assert_eq!(reply.status, 200);

    let seen = rx.recv().unwrap();
    assert_eq!(seen.body, json!({ "message": "hello" }));
}

// ---------------------------------------------------------------------------
// Backend errors
// ---------------------------------------------------------------------------

#[test]
fn backend_status_and_detail_are_relayed() {
    quiet();
    let (url, _rx) = fake_backend(503, r#"{"detail":"Model is warming up"}"#, true);

    let reply = gateway(&url, MessageField::Query).forward(r#"{"message":"hi"}"#);

    assert_eq!(reply.status, 503);
    assert_eq!(detail(&reply.body), "Model is warming up");
}

#[test]
fn non_json_error_text_becomes_detail() {
    quiet();
    let (url, _rx) = fake_backend(502, "upstream exploded\n", false);

    let reply = gateway(&url, MessageField::Query).forward(r#"{"message":"hi"}"#);

    assert_eq!(reply.status, 502);
    assert_eq!(detail(&reply.body), "upstream exploded");
}

#[test]
fn empty_error_body_gets_generic_detail() {
    quiet();
    let (url, _rx) = fake_backend(500, "", false);

    let reply = gateway(&url, MessageField::Query).forward(r#"{"message":"hi"}"#);

    assert_eq!(reply.status, 500);
    assert_eq!(detail(&reply.body), "Backend request failed with status 500");
}

// ---------------------------------------------------------------------------
// Local failures
// ---------------------------------------------------------------------------

#[test]
fn missing_message_is_rejected_without_contacting_backend() {
    quiet();
    let (url, rx) = fake_backend(200, r#"{"answer":"unused"}"#, true);

    let reply = gateway(&url, MessageField::Query).forward(r#"{"session_id":"s1"}"#);

    assert_eq!(reply.status, 400);
    assert!(detail(&reply.body).contains("message"));
    assert!(rx.try_recv().is_err());
}

#[test]
fn unconfigured_backend_is_500() {
    quiet();
    let reply = gateway("", MessageField::Query).forward(r#"{"message":"hi"}"#);

    assert_eq!(reply.status, 500);
    assert_eq!(detail(&reply.body), "Chat backend is not configured.");
}

#[test]
fn unreachable_backend_is_500() {
    quiet();
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let reply = gateway(&format!("http://127.0.0.1:{port}"), MessageField::Query)
        .forward(r#"{"message":"hi"}"#);

    assert_eq!(reply.status, 500);
    assert_eq!(detail(&reply.body), "Failed to reach the chat backend.");
}
