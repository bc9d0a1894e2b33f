//! End-to-end exchanges with the main loop over in-memory channels.

use crossbeam_channel::{Receiver, Sender};
use glint_service::{Coordinator, DefaultFrontEnd, FileState};
use lsp_server::{Message, Notification, Request, RequestId, Response};
use lsp_types::{DiagnosticSeverity, PublishDiagnosticsParams};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);
const URI: &str = "file:///work/main.glx";

struct Client {
    tx: Sender<Message>,
    rx: Receiver<Message>,
    server: JoinHandle<()>,
}

impl Client {
    fn start() -> Self {
        Self::start_with(Coordinator::new(Arc::new(DefaultFrontEnd::default())))
    }

    fn start_with(coordinator: Coordinator) -> Self {
        let (client_tx, server_rx) = crossbeam_channel::unbounded();
        let (server_tx, client_rx) = crossbeam_channel::unbounded();
        let server = thread::spawn(move || {
            glint_lsp::run_main_loop_with(server_rx, server_tx, coordinator);
        });
        Self {
            tx: client_tx,
            rx: client_rx,
            server,
        }
    }

    fn notify(&self, method: &str, params: serde_json::Value) {
        let notification = Notification::new(method.to_string(), params);
        self.tx.send(Message::Notification(notification)).unwrap();
    }

    fn request(&self, id: i32, method: &str, params: serde_json::Value) -> Response {
        let request = Request::new(RequestId::from(id), method.to_string(), params);
        self.tx.send(Message::Request(request)).unwrap();
        loop {
            match self.rx.recv_timeout(TIMEOUT).expect("response") {
                Message::Response(response) if response.id == RequestId::from(id) => {
                    return response;
                }
                _ => {}
            }
        }
    }

    /// Wait for diagnostics published for `version`.
    fn diagnostics(&self, version: i32) -> PublishDiagnosticsParams {
        loop {
            if let Message::Notification(n) = self.rx.recv_timeout(TIMEOUT).expect("diagnostics") {
                if n.method == "textDocument/publishDiagnostics" {
                    let params: PublishDiagnosticsParams =
                        serde_json::from_value(n.params).unwrap();
                    if params.version == Some(version) {
                        return params;
                    }
                }
            }
        }
    }

    fn open(&self, text: &str, version: i32) {
        self.notify(
            "textDocument/didOpen",
            json!({
                "textDocument": {
                    "uri": URI,
                    "languageId": "glint",
                    "version": version,
                    "text": text,
                }
            }),
        );
    }

    fn shutdown(self) {
        let response = self.request(900, "shutdown", json!(null));
        assert_eq!(response.result, Some(json!(null)));
        self.notify("exit", json!(null));
        self.server.join().expect("main loop exits");
    }
}

fn position(line: u32, character: u32) -> serde_json::Value {
    json!({
        "textDocument": { "uri": URI },
        "position": { "line": line, "character": character },
    })
}

#[test]
fn test_open_publishes_diagnostics() {
    let client = Client::start();
    client.open("let x = 1\nlet y = z", 1);

    let published = client.diagnostics(1);
    assert_eq!(published.uri.as_str(), URI);
    let error = published
        .diagnostics
        .iter()
        .find(|d| d.severity == Some(DiagnosticSeverity::ERROR))
        .expect("undefined name reported");
    assert_eq!(error.range.start, lsp_types::Position::new(1, 8));
    assert_eq!(error.source.as_deref(), Some("glint"));

    client.shutdown();
}

#[test]
fn test_change_republishes_for_new_version() {
    let client = Client::start();
    client.open("let x = 1\nlet y = z", 1);
    client.notify(
        "textDocument/didChange",
        json!({
            "textDocument": { "uri": URI, "version": 2 },
            "contentChanges": [{ "text": "let x = 1\nlet y = x" }],
        }),
    );

    let published = client.diagnostics(2);
    assert!(published
        .diagnostics
        .iter()
        .all(|d| d.severity != Some(DiagnosticSeverity::ERROR)));

    client.shutdown();
}

#[test]
fn test_save_reanalyzes_unchanged_text() {
    let coordinator = Coordinator::new(Arc::new(DefaultFrontEnd::default()));
    let client = Client::start_with(coordinator.clone());
    let path = Path::new("/work/main.glx");

    client.open("let x = 1\nlet y = z", 1);
    client.diagnostics(1);
    assert_eq!(coordinator.version(path), Some(1));

    client.notify(
        "textDocument/didSave",
        json!({ "textDocument": { "uri": URI } }),
    );
    let published = client.diagnostics(1);
    assert!(published
        .diagnostics
        .iter()
        .any(|d| d.severity == Some(DiagnosticSeverity::ERROR)));
    assert_eq!(coordinator.version(path), Some(2));
    assert_eq!(coordinator.state(path), FileState::Ready);

    client.shutdown();
}

#[test]
fn test_positions_count_utf16_units() {
    let client = Client::start();
    client.open("let s = \"\u{1F600}\" + z", 1);

    let published = client.diagnostics(1);
    let error = published
        .diagnostics
        .iter()
        .find(|d| d.code == Some(lsp_types::NumberOrString::String("E0039".to_string())))
        .expect("undefined name reported");
    assert_eq!(error.range.start, lsp_types::Position::new(0, 15));
    assert_eq!(error.range.end, lsp_types::Position::new(0, 16));

    client.shutdown();
}

#[test]
fn test_hover_and_completion_requests() {
    let client = Client::start();
    client.open("let count = 3\nlet next = count + 1", 1);

    let hover = client.request(1, "textDocument/hover", position(1, 12));
    let value = hover.result.expect("hover result");
    assert_eq!(
        value["contents"]["value"],
        json!("```glint\nval count : int\n```")
    );

    let completion = client.request(2, "textDocument/completion", position(1, 13));
    let labels: Vec<String> = completion
        .result
        .and_then(|r| serde_json::from_value::<Vec<lsp_types::CompletionItem>>(r).ok())
        .expect("completion items")
        .into_iter()
        .map(|item| item.label)
        .collect();
    assert!(labels.contains(&"count".to_string()), "{labels:?}");

    client.shutdown();
}

#[test]
fn test_hover_on_unknown_document_is_null() {
    let client = Client::start();
    let hover = client.request(1, "textDocument/hover", position(0, 0));
    assert_eq!(hover.result, Some(json!(null)));
    client.shutdown();
}

#[test]
fn test_unknown_request_is_method_not_found() {
    let client = Client::start();
    let response = client.request(1, "textDocument/rename", json!({}));
    let error = response.error.expect("error");
    assert_eq!(error.code, lsp_server::ErrorCode::MethodNotFound as i32);
    client.shutdown();
}

#[test]
fn test_requests_after_shutdown_are_rejected() {
    let client = Client::start();
    let response = client.request(1, "shutdown", json!(null));
    assert!(response.error.is_none());

    let late = client.request(2, "textDocument/hover", position(0, 0));
    let error = late.error.expect("error");
    assert_eq!(error.code, lsp_server::ErrorCode::InvalidRequest as i32);

    client.notify("exit", json!(null));
    client.server.join().expect("main loop exits");
}
