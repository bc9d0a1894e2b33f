//! Signature help handler for method calls.
//!
//! The call under the cursor is found by scanning the current line, so the
//! popup tracks the editor even when the checked result is one edit behind.

use glint_checker::TypedCheckResult;
use glint_core::Signature;
use glint_service::{name_path_at, QueryEngine};
use lsp_types::{
    ParameterInformation, ParameterLabel, SignatureHelp, SignatureHelpParams, SignatureInformation,
};

use super::utils::{line_text, to_position};

/// Trigger characters for signature help.
pub const TRIGGER_CHARACTERS: &[&str] = &["(", ","];

/// Handle a signature help request.
pub fn handle_signature_help(
    params: &SignatureHelpParams,
    text: &str,
    result: &TypedCheckResult,
) -> Option<SignatureHelp> {
    let position = to_position(params.text_document_position_params.position, text);
    let line = line_text(text, position.line)?;
    let (name, active_parameter) = call_context(line, position.character)?;

    let qualified = (!name.is_empty()).then_some(name.as_slice());
    let group = QueryEngine::new(result).method_overloads(position, line, qualified);
    if group.is_empty() {
        return None;
    }

    let active_signature = group
        .overloads
        .iter()
        .position(|o| accepts(o, active_parameter))
        .unwrap_or(0);
    let signatures = group
        .overloads
        .iter()
        .map(|o| signature_information(&group.name, o))
        .collect();

    Some(SignatureHelp {
        signatures,
        active_signature: Some(active_signature as u32),
        active_parameter: Some(active_parameter),
    })
}

/// The name before the innermost open parenthesis left of `column`, and the
/// index of the argument the cursor is in.
pub fn call_context(line: &str, column: u32) -> Option<(Vec<String>, u32)> {
    let chars: Vec<char> = line.chars().take(column as usize).collect();
    let mut open: Vec<(usize, u32)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => open.push((i, 0)),
            ')' => {
                open.pop();
            }
            ',' => {
                if let Some((_, commas)) = open.last_mut() {
                    *commas += 1;
                }
            }
            _ => {}
        }
    }

    let (paren, commas) = open.pop()?;
    let mut end = paren;
    while end > 0 && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    let prefix: String = chars[..end].iter().collect();
    Some((name_path_at(&prefix, end as u32), commas))
}

/// Whether `signature` has a parameter at `index`.
fn accepts(signature: &Signature, index: u32) -> bool {
    let index = index as usize;
    index < signature.parameters.len()
        || signature.parameters.last().is_some_and(|p| p.variadic)
}

fn signature_information(name: &str, signature: &Signature) -> SignatureInformation {
    let parameters = signature
        .parameters
        .iter()
        .map(|p| ParameterInformation {
            label: ParameterLabel::Simple(p.to_string()),
            documentation: None,
        })
        .collect();
    SignatureInformation {
        label: signature.render(name),
        documentation: None,
        parameters: Some(parameters),
        active_parameter: None,
    }
}
