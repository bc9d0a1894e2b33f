//! Tests running the `glint-check` and `glint-query` binaries.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, source: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, source).unwrap();
    path
}

fn glint_check(args: &[&str], files: &[&Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_glint-check"))
        .args(files)
        .args(args)
        .output()
        .expect("failed to run glint-check")
}

fn glint_query(file: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_glint-query"))
        .arg(file)
        .args(args)
        .output()
        .expect("failed to run glint-query")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

const UNUSED_LOCAL: &str = "let f () =\n    let unused = 1\n    2";

#[test]
fn test_clean_file_exits_zero() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "clean.glx", "let a = 1\nlet b = a + 1");

    let output = glint_check(&[], &[&file]);
    assert_eq!(output.status.code(), Some(0), "{}", stdout(&output));
    assert!(stdout(&output).contains("No errors found"));
}

#[test]
fn test_errors_exit_one_with_json() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "broken.glx", "let y = missing + 1");

    let output = glint_check(&["--format", "json"], &[&file]);
    assert_eq!(output.status.code(), Some(1));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["error_count"], 1);
    let diagnostic = &json["diagnostics"][0];
    assert_eq!(diagnostic["code"], "E0039");
    assert_eq!(diagnostic["line"], 1);
    assert_eq!(diagnostic["column"], 9);
}

#[test]
fn test_text_output_renders_source() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "broken.glx", "let y = missing + 1");

    let output = glint_check(&[], &[&file]);
    let text = stdout(&output);
    assert!(text.contains("E0039"), "{text}");
    assert!(text.contains("let y = missing + 1"), "{text}");
    assert!(text.contains("1 error"), "{text}");
    // stdout is a pipe here
    assert!(!text.contains('\x1b'), "{text:?}");
}

#[test]
fn test_warning_options() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "unused.glx", UNUSED_LOCAL);

    let output = glint_check(&["--format", "json"], &[&file]);
    assert_eq!(output.status.code(), Some(0));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["warning_count"], 1);

    let output = glint_check(&["--format", "json", "--nowarn", "W1182"], &[&file]);
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["warning_count"], 0);

    let output = glint_check(&["--warn-as-error", "-q"], &[&file]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
}

#[test]
fn test_checks_several_files() {
    let dir = TempDir::new().unwrap();
    let good = write(&dir, "good.glx", "let a = 1");
    let bad = write(&dir, "bad.glx", "let b = nope");

    let output = glint_check(&["--format", "json"], &[&good, &bad]);
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let files: Vec<&str> = json["diagnostics"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["file"].as_str())
        .collect();
    assert!(files.iter().all(|f| f.ends_with("bad.glx")), "{files:?}");
}

#[test]
fn test_missing_file_exits_two() {
    let output = glint_check(&[], &[Path::new("/nonexistent/missing.glx")]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read"));
}

#[test]
fn test_query_completions() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "complete.glx", "let msg = \"hello\"\nlet n = msg.To");

    let output = glint_query(&file, &["complete", "2", "15"]);
    assert_eq!(output.status.code(), Some(0));
    let items: Vec<serde_json::Value> = serde_json::from_str(&stdout(&output)).unwrap();
    let names: Vec<&str> = items.iter().filter_map(|i| i["name"].as_str()).collect();
    assert!(names.contains(&"ToUpper"), "{names:?}");
    assert!(names.iter().all(|n| n.to_lowercase().starts_with("to")));
}

#[test]
fn test_query_tooltip() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "tooltip.glx", "let foo() = 42\nlet x = foo ()");

    let output = glint_query(&file, &["tooltip", "2", "10"]);
    assert_eq!(output.status.code(), Some(0));
    let tooltip: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(tooltip["kind"], "symbol");
    assert_eq!(tooltip["signature"], "unit -> int");
}
