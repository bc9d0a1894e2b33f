//! Background analysis worker.
//!
//! Document changes are queued here rather than checked on the main loop.
//! When several versions of a document are waiting, only the newest is
//! checked.

use crossbeam_channel::{Receiver, Sender};
use glint_checker::TypedCheckResult;
use glint_service::{CheckerFailure, Coordinator};
use lsp_types::Uri;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A document version to analyze.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    /// Document URI.
    pub uri: Uri,
    /// Path the URI maps to.
    pub path: PathBuf,
    /// Full document text.
    pub text: String,
    /// Editor version of `text`.
    pub version: i32,
}

/// Outcome of an analysis, delivered back to the main loop.
#[derive(Debug)]
pub struct Analyzed {
    /// Document URI.
    pub uri: Uri,
    /// Editor version that was analyzed.
    pub version: i32,
    /// The checked result, or why checking failed.
    pub outcome: Result<Arc<TypedCheckResult>, CheckerFailure>,
}

/// Spawn the worker. It exits when `requests` is disconnected or the main
/// loop stops receiving.
pub fn spawn(
    coordinator: Coordinator,
    requests: Receiver<AnalysisRequest>,
    results: Sender<Analyzed>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("glint-analysis".to_string())
        .spawn(move || run(&coordinator, &requests, &results))
}

fn run(coordinator: &Coordinator, requests: &Receiver<AnalysisRequest>, results: &Sender<Analyzed>) {
    while let Ok(first) = requests.recv() {
        for request in coalesce(first, requests) {
            tracing::debug!(uri = request.uri.as_str(), version = request.version, "analyzing");
            let outcome = coordinator.check_file(&request.path, &request.text);
            let analyzed = Analyzed {
                uri: request.uri,
                version: request.version,
                outcome,
            };
            if results.send(analyzed).is_err() {
                return;
            }
        }
    }
    tracing::debug!("analysis worker stopped");
}

/// Drain the queue, keeping the newest request per document in arrival order.
fn coalesce(first: AnalysisRequest, requests: &Receiver<AnalysisRequest>) -> Vec<AnalysisRequest> {
    let mut order: Vec<Uri> = Vec::new();
    let mut latest: HashMap<Uri, AnalysisRequest> = HashMap::new();
    for request in std::iter::once(first).chain(requests.try_iter()) {
        if !latest.contains_key(&request.uri) {
            order.push(request.uri.clone());
        }
        latest.insert(request.uri.clone(), request);
    }
    order
        .into_iter()
        .filter_map(|uri| latest.remove(&uri))
        .collect()
}
