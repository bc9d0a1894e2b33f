//! Hover handler showing types, overloads and documentation.

use glint_checker::TypedCheckResult;
use glint_core::LineIndex;
use glint_service::{CompilerFrontEnd, QueryContext, QueryEngine, TooltipText};
use lsp_types::{Hover, HoverContents, HoverParams, MarkupContent, MarkupKind};

use super::utils::{line_text, to_position};

/// Handle a hover request.
///
/// `text` is the editor's current text; `result` may have been computed from
/// an older version of it.
pub fn handle_hover(
    params: &HoverParams,
    text: &str,
    result: &TypedCheckResult,
    front_end: &dyn CompilerFrontEnd,
) -> Option<Hover> {
    let position = to_position(params.text_document_position_params.position, text);
    let line = line_text(text, position.line)?;

    let index = LineIndex::new(text);
    let token = front_end.classify(&index, position);
    let context = QueryContext::from_line(line, position.character, token);

    let tooltip = QueryEngine::new(result).tooltip(position, &context);
    let value = to_markdown(tooltip)?;

    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value,
        }),
        range: None,
    })
}

/// Render a tooltip as a code block followed by its documentation.
fn to_markdown(tooltip: TooltipText) -> Option<String> {
    let (code, doc) = match tooltip {
        TooltipText::NoInfo => return None,
        TooltipText::Symbol {
            name,
            symbol_kind,
            signature,
            doc,
        } => (
            TooltipText::Symbol {
                name,
                symbol_kind,
                signature,
                doc: None,
            },
            doc,
        ),
        TooltipText::OverloadGroup {
            name, overloads, doc, ..
        } => (
            TooltipText::OverloadGroup {
                name,
                overloads,
                doc: None,
            },
            doc,
        ),
        literal @ TooltipText::Literal { .. } => (literal, None),
    };

    let mut value = format!("```glint\n{code}\n```");
    if let Some(doc) = doc {
        value.push_str("\n\n---\n\n");
        value.push_str(&doc);
    }
    Some(value)
}
