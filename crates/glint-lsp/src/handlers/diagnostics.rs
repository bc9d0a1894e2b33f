//! Conversion of analysis diagnostics for publishing.

use glint_core::Severity;
use lsp_types::{Diagnostic, DiagnosticSeverity, DiagnosticTag, NumberOrString};

use super::utils::to_lsp_range;

/// Code of the unused-binding warning, rendered faded by clients.
const UNUSED_BINDING: &str = "W1182";

/// Convert analysis diagnostics to LSP diagnostics. `text` is the text they
/// were computed from.
pub fn to_lsp_diagnostics(diagnostics: &[glint_core::Diagnostic], text: &str) -> Vec<Diagnostic> {
    diagnostics
        .iter()
        .map(|d| to_lsp_diagnostic(d, text))
        .collect()
}

/// Convert a single diagnostic.
pub fn to_lsp_diagnostic(diagnostic: &glint_core::Diagnostic, text: &str) -> Diagnostic {
    let severity = match diagnostic.severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Info => DiagnosticSeverity::INFORMATION,
    };
    let tags = (diagnostic.code == UNUSED_BINDING).then(|| vec![DiagnosticTag::UNNECESSARY]);

    Diagnostic {
        range: to_lsp_range(diagnostic.range, text),
        severity: Some(severity),
        code: Some(NumberOrString::String(diagnostic.code.clone())),
        source: Some("glint".to_string()),
        message: diagnostic.message.clone(),
        related_information: None,
        tags,
        code_description: None,
        data: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_core::{LineIndex, Span};

    #[test]
    fn test_diagnostic_conversion() {
        let text = "let x = 1\nlet y = z";
        let index = LineIndex::new(text);
        let unresolved = glint_core::Diagnostic::new(
            "E0039",
            Severity::Error,
            "the value or constructor 'z' is not defined",
            Span::new(18, 19),
            &index,
        );
        let unused = glint_core::Diagnostic::new(
            "W1182",
            Severity::Warning,
            "the value 'x' is unused",
            Span::new(4, 5),
            &index,
        );

        let converted = to_lsp_diagnostics(&[unresolved, unused], text);
        assert_eq!(converted.len(), 2);

        assert_eq!(converted[0].severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(converted[0].range.start, lsp_types::Position::new(1, 8));
        assert_eq!(
            converted[0].code,
            Some(NumberOrString::String("E0039".to_string()))
        );
        assert_eq!(converted[0].source.as_deref(), Some("glint"));
        assert!(converted[0].tags.is_none());

        assert_eq!(converted[1].severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(converted[1].tags, Some(vec![DiagnosticTag::UNNECESSARY]));
    }

    #[test]
    fn test_diagnostic_range_in_utf16() {
        let text = "let s = \"\u{1F600}\" + z";
        let index = LineIndex::new(text);
        let start = text.find('z').unwrap();
        let diagnostic = glint_core::Diagnostic::new(
            "E0039",
            Severity::Error,
            "the value or constructor 'z' is not defined",
            Span::new(start, start + 1),
            &index,
        );
        let converted = to_lsp_diagnostic(&diagnostic, text);
        assert_eq!(converted.range.start, lsp_types::Position::new(0, 15));
        assert_eq!(converted.range.end, lsp_types::Position::new(0, 16));
    }
}
