//! Caller-supplied project metadata.

use glint_core::SourceKind;
use std::path::PathBuf;

/// Project settings layered under the directives a file declares itself.
///
/// Everything defaults to "standalone script": no extra references, no
/// defines, warnings reported as warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectOptions {
    /// Extra `#r`-style references, resolved like directive arguments.
    pub references: Vec<String>,
    /// Conditional compilation symbols.
    pub defines: Vec<String>,
    /// Warning codes to suppress.
    pub nowarn: Vec<String>,
    /// Report warnings as errors.
    pub warnings_as_errors: bool,
    /// Override the kind inferred from the file extension.
    pub kind: Option<SourceKind>,
    /// Directory relative references resolve against. Defaults to the
    /// file's parent directory.
    pub base_dir: Option<PathBuf>,
}

impl ProjectOptions {
    /// Create default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.references.push(reference.into());
        self
    }

    /// Add a conditional compilation symbol.
    #[must_use]
    pub fn with_define(mut self, symbol: impl Into<String>) -> Self {
        self.defines.push(symbol.into());
        self
    }

    /// Suppress a warning code (`"20"` or `"W0020"`).
    #[must_use]
    pub fn with_nowarn(mut self, code: impl Into<String>) -> Self {
        self.nowarn.push(code.into());
        self
    }

    /// Report warnings as errors.
    #[must_use]
    pub const fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    /// Force script or module mode.
    #[must_use]
    pub const fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Resolve relative references against `dir`.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accumulates() {
        let options = ProjectOptions::new()
            .with_reference("System.Text")
            .with_reference("lib/Extra.dll")
            .with_define("DEBUG")
            .with_nowarn("20")
            .with_warnings_as_errors(true)
            .with_kind(SourceKind::Module);

        assert_eq!(options.references, vec!["System.Text", "lib/Extra.dll"]);
        assert_eq!(options.defines, vec!["DEBUG"]);
        assert_eq!(options.nowarn, vec!["20"]);
        assert!(options.warnings_as_errors);
        assert_eq!(options.kind, Some(SourceKind::Module));
        assert_eq!(options.base_dir, None);
    }
}
