//! Completion handler for scope names and members.

use glint_checker::TypedCheckResult;
use glint_core::SymbolKind;
use glint_service::{completion_path, QueryEngine};
use lsp_types::{CompletionItem, CompletionItemKind, CompletionParams, CompletionResponse};

use super::utils::{line_text, to_position};

/// Trigger characters for completion.
pub const TRIGGER_CHARACTERS: &[&str] = &["."];

/// Handle a completion request.
pub fn handle_completion(
    params: &CompletionParams,
    text: &str,
    result: &TypedCheckResult,
) -> Option<CompletionResponse> {
    let position = to_position(params.text_document_position.position, text);
    let line = line_text(text, position.line)?;
    let (qualifying, partial) = completion_path(line, position.character);

    let engine = QueryEngine::new(result);
    let stale = engine.is_stale(position, line);
    let member_access = !qualifying.is_empty() || line_ends_with_dot(line, position.character);

    let items: Vec<CompletionItem> = engine
        .completions(position, line, &qualifying, &partial, stale)
        .map(|item| CompletionItem {
            kind: Some(completion_kind(item.kind, member_access)),
            detail: Some(item.detail),
            label: item.name,
            ..Default::default()
        })
        .collect();

    tracing::debug!(
        count = items.len(),
        partial = %partial,
        stale,
        "completion"
    );
    Some(CompletionResponse::Array(items))
}

fn line_ends_with_dot(line: &str, column: u32) -> bool {
    line.chars()
        .take(column as usize)
        .last()
        .is_some_and(|c| c == '.')
}

const fn completion_kind(kind: SymbolKind, member_access: bool) -> CompletionItemKind {
    match kind {
        SymbolKind::Value if member_access => CompletionItemKind::PROPERTY,
        SymbolKind::Value => CompletionItemKind::VARIABLE,
        SymbolKind::Function if member_access => CompletionItemKind::METHOD,
        SymbolKind::Function => CompletionItemKind::FUNCTION,
        SymbolKind::Type => CompletionItemKind::CLASS,
        SymbolKind::Module => CompletionItemKind::MODULE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_service::{CompilerFrontEnd, DefaultFrontEnd};
    use std::path::Path;
    use std::sync::Arc;

    fn analyze(source: &str) -> TypedCheckResult {
        let front_end = DefaultFrontEnd::default();
        let path = Path::new("/work/complete.glx");
        let context = front_end.context(path, source);
        let tree = front_end.parse(path, source, &context);
        front_end
            .check(Arc::new(tree), Arc::new(context))
            .expect("check")
    }

    fn params(line: u32, character: u32) -> CompletionParams {
        CompletionParams {
            text_document_position: lsp_types::TextDocumentPositionParams {
                text_document: lsp_types::TextDocumentIdentifier {
                    uri: "file:///work/complete.glx".parse().unwrap(),
                },
                position: lsp_types::Position::new(line, character),
            },
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
            context: None,
        }
    }

    fn items(response: Option<CompletionResponse>) -> Vec<CompletionItem> {
        match response {
            Some(CompletionResponse::Array(items)) => items,
            other => panic!("unexpected completion response {other:?}"),
        }
    }

    #[test]
    fn test_member_completions() {
        let source = "let msg = \"hello\"\nlet n = msg.";
        let result = analyze(source);
        let items = items(handle_completion(&params(1, 12), source, &result));

        let upper = items
            .iter()
            .find(|item| item.label == "ToUpper")
            .expect("ToUpper");
        assert_eq!(upper.kind, Some(CompletionItemKind::METHOD));
    }

    #[test]
    fn test_scope_completions() {
        let source = "let total = 1\nlet t = to";
        let result = analyze(source);
        let items = items(handle_completion(&params(1, 10), source, &result));

        let total = items
            .iter()
            .find(|item| item.label == "total")
            .expect("total");
        assert_eq!(total.kind, Some(CompletionItemKind::VARIABLE));
        assert_eq!(total.detail.as_deref(), Some("int"));
    }

    #[test]
    fn test_completion_past_last_line() {
        let source = "let total = 1";
        let result = analyze(source);
        assert!(handle_completion(&params(4, 0), source, &result).is_none());
    }
}
