//! Source kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// How a file is compiled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A standalone script: directives allowed, no module header required.
    #[default]
    Script,
    /// A module file, optionally starting with a `module Name` header.
    Module,
}

impl SourceKind {
    /// Infer the kind from a file extension: `.gl` is a module, anything else
    /// is a script.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gl") => Self::Module,
            _ => Self::Script,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script => write!(f, "script"),
            Self::Module => write!(f, "module"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(SourceKind::from_path(Path::new("a/b.gl")), SourceKind::Module);
        assert_eq!(SourceKind::from_path(Path::new("b.GL")), SourceKind::Module);
        assert_eq!(SourceKind::from_path(Path::new("b.glx")), SourceKind::Script);
        assert_eq!(SourceKind::from_path(Path::new("README")), SourceKind::Script);
    }
}
