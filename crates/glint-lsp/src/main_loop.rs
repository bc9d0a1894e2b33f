//! Main event loop for the LSP server.
//!
//! Notifications are applied in order on the loop thread. Checking happens on
//! the analysis worker, whose results come back as [`Task`] events; requests
//! answer from the newest ready result and block only when a document has
//! never been analyzed.

use crate::analysis::{self, AnalysisRequest, Analyzed};
use crate::handlers::completion::handle_completion;
use crate::handlers::diagnostics::to_lsp_diagnostics;
use crate::handlers::hover::handle_hover;
use crate::handlers::signature_help::handle_signature_help;
use crate::vfs::Vfs;
use crossbeam_channel::{select, Receiver, Sender};
use glint_checker::TypedCheckResult;
use glint_service::{Coordinator, DefaultFrontEnd, Readiness};
use lsp_types::notification::{
    DidChangeTextDocument, DidCloseTextDocument, DidOpenTextDocument, DidSaveTextDocument, Exit,
    Initialized, Notification, PublishDiagnostics,
};
use lsp_types::request::{Completion, HoverRequest, Request, Shutdown, SignatureHelpRequest};
use lsp_types::{CompletionParams, HoverParams, PublishDiagnosticsParams, SignatureHelpParams, Uri};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Convert a URI to a file path.
#[cfg(not(windows))]
fn uri_to_path(uri: &Uri) -> Option<PathBuf> {
    uri.as_str().strip_prefix("file://").map(PathBuf::from)
}

/// Convert a URI to a file path (Windows version).
#[cfg(windows)]
fn uri_to_path(uri: &Uri) -> Option<PathBuf> {
    uri.as_str()
        .strip_prefix("file://")
        // file:///C:/...
        .map(|p| p.strip_prefix('/').unwrap_or(p))
        .map(PathBuf::from)
}

/// Events processed by the main loop.
#[derive(Debug)]
pub enum Event {
    /// LSP message from the client.
    Message(lsp_server::Message),
    /// Completion of background work.
    Task(Task),
}

/// Background work reported to the main loop.
#[derive(Debug)]
pub enum Task {
    /// A document version finished analysis.
    Analyzed(Analyzed),
}

/// State managed by the main loop.
pub struct MainLoopState {
    /// Open documents as the editor has them.
    vfs: Vfs,
    /// Per-file analysis.
    coordinator: Coordinator,
    /// Sender for outgoing LSP messages.
    sender: Sender<lsp_server::Message>,
    /// Queue of the analysis worker.
    analysis: Sender<AnalysisRequest>,
    /// Last published diagnostics per document.
    diagnostics: HashMap<Uri, Vec<lsp_types::Diagnostic>>,
    /// Whether shutdown was requested.
    shutdown_requested: bool,
}

impl MainLoopState {
    /// Create a new main loop state.
    pub fn new(
        sender: Sender<lsp_server::Message>,
        coordinator: Coordinator,
        analysis: Sender<AnalysisRequest>,
    ) -> Self {
        Self {
            vfs: Vfs::new(),
            coordinator,
            sender,
            analysis,
            diagnostics: HashMap::new(),
            shutdown_requested: false,
        }
    }

    /// Handle an incoming event.
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Message(lsp_server::Message::Request(req)) => self.handle_request(req),
            Event::Message(lsp_server::Message::Notification(notif)) => {
                self.handle_notification(notif);
            }
            Event::Message(lsp_server::Message::Response(_)) => {
                // We don't send requests to the client
            }
            Event::Task(Task::Analyzed(analyzed)) => self.on_analyzed(analyzed),
        }
    }

    /// Handle an LSP request (expects response).
    fn handle_request(&mut self, req: lsp_server::Request) {
        let id = req.id.clone();

        if self.shutdown_requested {
            let response = lsp_server::Response::new_err(
                id,
                lsp_server::ErrorCode::InvalidRequest as i32,
                "Server is shutting down".to_string(),
            );
            self.send(lsp_server::Message::Response(response));
            return;
        }

        let result = match req.method.as_str() {
            Shutdown::METHOD => {
                self.shutdown_requested = true;
                Ok(serde_json::Value::Null)
            }
            HoverRequest::METHOD => self.handle_hover_request(req),
            Completion::METHOD => self.handle_completion_request(req),
            SignatureHelpRequest::METHOD => self.handle_signature_help_request(req),
            _ => {
                tracing::warn!("Unhandled request: {}", req.method);
                Err(format!("Unhandled request: {}", req.method))
            }
        };

        let response = match result {
            Ok(value) => lsp_server::Response::new_ok(id, value),
            Err(msg) => {
                let error_code = if msg.starts_with("Unhandled request") {
                    lsp_server::ErrorCode::MethodNotFound
                } else {
                    lsp_server::ErrorCode::InternalError
                };
                lsp_server::Response::new_err(id, error_code as i32, msg)
            }
        };

        self.send(lsp_server::Message::Response(response));
    }

    /// Current text and the best available result for a document.
    fn document_data(&self, uri: &Uri) -> Option<(String, Arc<TypedCheckResult>)> {
        let path = uri_to_path(uri)?;
        let text = self.vfs.get_content(&path)?;
        let result = self.analysis_for(&path, &text)?;
        Some((text, result))
    }

    /// A result for `text`: fresh when ready, else the last published one.
    /// Blocks only when the document has no published result at all.
    fn analysis_for(&self, path: &Path, text: &str) -> Option<Arc<TypedCheckResult>> {
        match self.coordinator.try_check_file(path, text) {
            Readiness::Ready(result) => Some(result),
            Readiness::NotReady => self.coordinator.latest(path).or_else(|| {
                self.coordinator
                    .check_file(path, text)
                    .map_err(|e| tracing::error!(path = %path.display(), "analysis failed: {e}"))
                    .ok()
            }),
            Readiness::Failed(failure) => {
                tracing::warn!(path = %path.display(), "analysis failed: {failure}");
                self.coordinator.latest(path)
            }
        }
    }

    /// Handle the textDocument/hover request.
    fn handle_hover_request(&self, req: lsp_server::Request) -> Result<serde_json::Value, String> {
        let params: HoverParams = serde_json::from_value(req.params).map_err(|e| e.to_string())?;

        let uri = &params.text_document_position_params.text_document.uri;
        let Some((text, result)) = self.document_data(uri) else {
            return Ok(serde_json::Value::Null);
        };

        let response = handle_hover(&params, &text, &result, &**self.coordinator.front_end());

        serde_json::to_value(response).map_err(|e| e.to_string())
    }

    /// Handle the textDocument/completion request.
    fn handle_completion_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: CompletionParams =
            serde_json::from_value(req.params).map_err(|e| e.to_string())?;

        let uri = &params.text_document_position.text_document.uri;
        let Some((text, result)) = self.document_data(uri) else {
            return Ok(serde_json::Value::Null);
        };

        let response = handle_completion(&params, &text, &result);

        serde_json::to_value(response).map_err(|e| e.to_string())
    }

    /// Handle the textDocument/signatureHelp request.
    fn handle_signature_help_request(
        &self,
        req: lsp_server::Request,
    ) -> Result<serde_json::Value, String> {
        let params: SignatureHelpParams =
            serde_json::from_value(req.params).map_err(|e| e.to_string())?;

        let uri = &params.text_document_position_params.text_document.uri;
        let Some((text, result)) = self.document_data(uri) else {
            return Ok(serde_json::Value::Null);
        };

        let response = handle_signature_help(&params, &text, &result);

        serde_json::to_value(response).map_err(|e| e.to_string())
    }

    /// Handle an LSP notification (no response expected).
    fn handle_notification(&mut self, notif: lsp_server::Notification) {
        match notif.method.as_str() {
            DidOpenTextDocument::METHOD => {
                if let Ok(params) =
                    serde_json::from_value::<lsp_types::DidOpenTextDocumentParams>(notif.params)
                {
                    self.on_did_open(params);
                }
            }
            DidChangeTextDocument::METHOD => {
                if let Ok(params) =
                    serde_json::from_value::<lsp_types::DidChangeTextDocumentParams>(notif.params)
                {
                    self.on_did_change(params);
                }
            }
            DidSaveTextDocument::METHOD => {
                if let Ok(params) =
                    serde_json::from_value::<lsp_types::DidSaveTextDocumentParams>(notif.params)
                {
                    self.on_did_save(params);
                }
            }
            DidCloseTextDocument::METHOD => {
                if let Ok(params) =
                    serde_json::from_value::<lsp_types::DidCloseTextDocumentParams>(notif.params)
                {
                    self.on_did_close(params);
                }
            }
            Initialized::METHOD => {
                tracing::info!("Client initialized");
            }
            _ => {
                tracing::debug!("Unhandled notification: {}", notif.method);
            }
        }
    }

    /// Handle textDocument/didOpen notification.
    fn on_did_open(&mut self, params: lsp_types::DidOpenTextDocumentParams) {
        let doc = params.text_document;
        tracing::info!("Document opened: {}", doc.uri.as_str());

        let Some(path) = uri_to_path(&doc.uri) else {
            tracing::warn!("Not a file URI: {}", doc.uri.as_str());
            return;
        };
        self.vfs.open(path.clone(), &doc.text, doc.version);
        self.schedule(doc.uri, path, doc.text, doc.version);
    }

    /// Handle textDocument/didChange notification.
    fn on_did_change(&mut self, params: lsp_types::DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // Full sync: the last change holds the whole text.
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        let Some(path) = uri_to_path(&uri) else {
            return;
        };
        tracing::debug!("Document changed: {} (version {version})", uri.as_str());

        self.vfs.update(&path, &change.text, version);
        self.schedule(uri, path, change.text, version);
    }

    /// Handle textDocument/didSave notification.
    ///
    /// Referenced files may have changed on disk, so the document is
    /// re-analyzed even though its text is unchanged.
    fn on_did_save(&mut self, params: lsp_types::DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        let Some(path) = uri_to_path(&uri) else {
            return;
        };
        let Some(doc) = self.vfs.get(&path) else {
            return;
        };
        let (text, version) = (doc.text(), doc.version());
        tracing::debug!("Document saved: {} (version {version})", uri.as_str());

        self.coordinator.mark_dirty(&path);
        self.schedule(uri, path, text, version);
    }

    /// Handle textDocument/didClose notification.
    fn on_did_close(&mut self, params: lsp_types::DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        tracing::info!("Document closed: {}", uri.as_str());

        if let Some(path) = uri_to_path(&uri) {
            self.vfs.close(&path);
            self.coordinator.close(&path);
        }

        self.diagnostics.remove(&uri);
        self.send_diagnostics(&uri, Vec::new(), None);
    }

    /// Queue a document version for analysis.
    fn schedule(&self, uri: Uri, path: PathBuf, text: String, version: i32) {
        let request = AnalysisRequest {
            uri,
            path,
            text,
            version,
        };
        if let Err(e) = self.analysis.send(request) {
            tracing::error!("Analysis worker unavailable: {}", e);
        }
    }

    /// Publish the diagnostics of a finished analysis if the document has not
    /// moved on since.
    fn on_analyzed(&mut self, analyzed: Analyzed) {
        let Analyzed {
            uri,
            version,
            outcome,
        } = analyzed;

        let current = uri_to_path(&uri)
            .and_then(|path| self.vfs.get(&path).map(crate::vfs::Document::version));
        if current != Some(version) {
            tracing::debug!(
                "Dropping analysis of {} version {version}, document is at {current:?}",
                uri.as_str()
            );
            return;
        }

        match outcome {
            Ok(result) => {
                let diagnostics =
                    to_lsp_diagnostics(&result.all_diagnostics(), result.tree().source());
                tracing::debug!(
                    "Publishing {} diagnostics for {}",
                    diagnostics.len(),
                    uri.as_str()
                );
                self.diagnostics.insert(uri.clone(), diagnostics.clone());
                self.send_diagnostics(&uri, diagnostics, Some(version));
            }
            Err(failure) => {
                // The previous diagnostics stay up.
                tracing::error!("Analysis of {} failed: {failure}", uri.as_str());
            }
        }
    }

    /// Send diagnostics to the client.
    fn send_diagnostics(
        &self,
        uri: &Uri,
        diagnostics: Vec<lsp_types::Diagnostic>,
        version: Option<i32>,
    ) {
        let params = PublishDiagnosticsParams {
            uri: uri.clone(),
            diagnostics,
            version,
        };

        let notif = lsp_server::Notification::new(PublishDiagnostics::METHOD.to_string(), params);

        self.send(lsp_server::Message::Notification(notif));
    }

    /// Send a message to the client.
    fn send(&self, msg: lsp_server::Message) {
        if let Err(e) = self.sender.send(msg) {
            tracing::error!("Failed to send message: {}", e);
        }
    }
}

/// Run the main event loop with the default front end.
pub fn run_main_loop(receiver: Receiver<lsp_server::Message>, sender: Sender<lsp_server::Message>) {
    let coordinator = Coordinator::new(Arc::new(DefaultFrontEnd::default()));
    run_main_loop_with(receiver, sender, coordinator);
}

/// Run the main event loop until the client sends `exit` or disconnects.
pub fn run_main_loop_with(
    receiver: Receiver<lsp_server::Message>,
    sender: Sender<lsp_server::Message>,
    coordinator: Coordinator,
) {
    let (request_tx, request_rx) = crossbeam_channel::unbounded();
    let (result_tx, result_rx) = crossbeam_channel::unbounded();
    let worker = match analysis::spawn(coordinator.clone(), request_rx, result_tx) {
        Ok(worker) => worker,
        Err(e) => {
            tracing::error!("Failed to start analysis worker: {}", e);
            return;
        }
    };
    let mut state = MainLoopState::new(sender, coordinator, request_tx);

    tracing::info!("Main loop started");

    loop {
        let event = select! {
            recv(receiver) -> msg => match msg {
                Ok(lsp_server::Message::Notification(notif)) if notif.method == Exit::METHOD => {
                    if !state.shutdown_requested {
                        tracing::warn!("Exit without shutdown");
                    }
                    break;
                }
                Ok(msg) => Event::Message(msg),
                Err(_) => break,
            },
            recv(result_rx) -> analyzed => match analyzed {
                Ok(analyzed) => Event::Task(Task::Analyzed(analyzed)),
                Err(_) => break,
            },
        };
        state.handle_event(event);
    }

    drop(state);
    if worker.join().is_err() {
        tracing::error!("Analysis worker panicked");
    }

    tracing::info!("Main loop ended");
}
