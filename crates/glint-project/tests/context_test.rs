//! Integration tests for compilation context resolution.

use glint_core::SourceKind;
use glint_project::{resolve, resolve_with, ProblemKind, ProjectOptions, Reference};
use proptest::prelude::*;
use std::path::{Path, PathBuf};

fn library(name: &str) -> Reference {
    Reference::Library(name.to_string())
}

// ============================================================================
// Mode and implicit references
// ============================================================================

#[test]
fn test_standalone_script_defaults() {
    let context = resolve(Path::new("scratch.glx"), "");
    assert_eq!(context.kind, SourceKind::Script);
    assert_eq!(context.references, vec![library("Core"), library("System")]);
    assert!(context.defines.is_empty());
    assert!(context.nowarn.is_empty());
    assert!(!context.warnings_as_errors);
    assert!(context.unresolved.is_empty());
}

#[test]
fn test_kind_from_extension_and_override() {
    assert_eq!(resolve(Path::new("a/b.gl"), "").kind, SourceKind::Module);
    assert_eq!(resolve(Path::new("a/b.GL"), "").kind, SourceKind::Module);
    assert_eq!(resolve(Path::new("a/b"), "").kind, SourceKind::Script);
    assert_eq!(resolve(Path::new("a/b.txt"), "").kind, SourceKind::Script);

    let options = ProjectOptions::new().with_kind(SourceKind::Module);
    assert_eq!(resolve_with(Path::new("b.glx"), "", &options).kind, SourceKind::Module);
}

// ============================================================================
// Directives
// ============================================================================

#[test]
fn test_reference_directives_dedupe_in_order() {
    let source = "#r \"System.Text\"\n#r \"System\"\n#r \"System.Text\"\n#r \"lib/Extra.dll\"";
    let context = resolve(Path::new("/proj/main.glx"), source);
    assert_eq!(
        context.references,
        vec![
            library("Core"),
            library("System"),
            library("System.Text"),
            Reference::Path(PathBuf::from("/proj/lib/Extra.dll")),
        ]
    );
    let names: Vec<&str> = context.library_names().collect();
    assert_eq!(names, vec!["Core", "System", "System.Text", "Extra"]);
}

#[test]
fn test_options_layer_under_directives() {
    let options = ProjectOptions::new()
        .with_reference("System.IO")
        .with_define("TRACE")
        .with_nowarn("W1182")
        .with_warnings_as_errors(true)
        .with_base_dir("/elsewhere");
    let source = "#nowarn \"20\" \"1182\"\n#load \"util.glx\"";
    let context = resolve_with(Path::new("/proj/main.glx"), source, &options);

    assert_eq!(context.references[2], library("System.IO"));
    assert_eq!(context.defines, vec!["TRACE"]);
    assert_eq!(context.nowarn, vec!["W1182", "W0020"]);
    assert!(context.suppresses("W0020"));
    assert!(!context.suppresses("W0064"));
    assert!(context.warnings_as_errors);
    assert_eq!(context.loads, vec![PathBuf::from("/elsewhere/util.glx")]);
}

#[test]
fn test_define_and_conditional_regions() {
    let source = "\
#define FAST
#if FAST
#r \"System.Text\"
#else
#r \"System.IO\"
#endif
#if SLOW
#nowarn \"64\"
#endif";
    let context = resolve(Path::new("main.glx"), source);
    assert_eq!(context.defines, vec!["FAST"]);
    assert!(context.references.contains(&library("System.Text")));
    assert!(!context.references.contains(&library("System.IO")));
    assert!(context.nowarn.is_empty());
}

#[test]
fn test_define_from_options_selects_region() {
    let source = "#if DEBUG\n#r \"System.IO\"\n#endif";
    let plain = resolve(Path::new("main.glx"), source);
    assert!(!plain.references.contains(&library("System.IO")));

    let options = ProjectOptions::new().with_define("DEBUG");
    let debug = resolve_with(Path::new("main.glx"), source, &options);
    assert!(debug.references.contains(&library("System.IO")));
}

#[test]
fn test_module_files_ignore_script_directives() {
    let context = resolve(Path::new("lib.gl"), "#r \"System.IO\"\n#load \"x.glx\"");
    assert_eq!(context.references.len(), 2);
    assert!(context.loads.is_empty());
    assert!(context.unresolved.is_empty());
}

#[test]
fn test_malformed_directives_are_recorded() {
    let source = "#r\n#r System\n#nowarn \"abc\"\n#define \"X\"\n#light\nlet x = 1";
    let context = resolve(Path::new("main.glx"), source);

    let kinds: Vec<(&str, &ProblemKind)> = context
        .unresolved
        .iter()
        .map(|p| (p.directive.as_str(), &p.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("#r", &ProblemKind::MalformedArguments),
            ("#r", &ProblemKind::MalformedArguments),
            ("#nowarn", &ProblemKind::InvalidWarningCode),
            ("#define", &ProblemKind::MalformedArguments),
            ("#light", &ProblemKind::UnknownDirective),
        ]
    );
    // The bad warning code points at its argument.
    let bad = &context.unresolved[2];
    assert_eq!(bad.span.text(source), "\"abc\"");
    assert_eq!(bad.to_string(), "#nowarn: 'abc' is not a warning number");
    assert_eq!(context.references.len(), 2);
}

#[test]
fn test_parse_options_follow_context() {
    let options = ProjectOptions::new().with_define("DEBUG");
    let context = resolve_with(Path::new("m.gl"), "#define EXTRA", &options);
    let parse = context.parse_options();
    assert_eq!(parse.kind, SourceKind::Module);
    assert_eq!(parse.defines, vec!["DEBUG", "EXTRA"]);
}

#[test]
fn test_context_serializes() {
    let context = resolve(Path::new("main.glx"), "#r \"System.Text\"");
    let json = serde_json::to_value(&context).unwrap();
    assert_eq!(json["kind"], "script");
    assert_eq!(json["references"][2]["kind"], "library");
    assert_eq!(json["references"][2]["target"], "System.Text");
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_resolve_never_fails(source in "\\PC{0,120}") {
        let context = resolve(Path::new("main.glx"), &source);
        prop_assert!(context.references.len() >= 2);
        for problem in &context.unresolved {
            prop_assert!(problem.span.end <= source.len());
        }
    }

    #[test]
    fn prop_resolve_is_deterministic(source in "(#r \"[A-Za-z.]{1,8}\"\n|#nowarn \"[0-9]{1,3}\"\n|let x = 1\n){0,6}") {
        let a = resolve(Path::new("main.glx"), &source);
        let b = resolve(Path::new("main.glx"), &source);
        prop_assert_eq!(a, b);
    }
}
