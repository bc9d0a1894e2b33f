//! Virtual File System for document management.
//!
//! The VFS holds the editor's view of every open document. Analysis results
//! live in the coordinator; the VFS only answers "what does the editor have
//! now, and at which version".

use ropey::Rope;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A document in the virtual file system.
#[derive(Debug)]
pub struct Document {
    content: Rope,
    version: i32,
}

impl Document {
    /// Create a new document with the given content.
    pub fn new(content: &str, version: i32) -> Self {
        Self {
            content: Rope::from_str(content),
            version,
        }
    }

    /// The document content as a string.
    pub fn text(&self) -> String {
        self.content.to_string()
    }

    /// The editor's version of the document.
    pub const fn version(&self) -> i32 {
        self.version
    }

    /// Text of a line without its terminator.
    pub fn line(&self, line: u32) -> Option<String> {
        let slice = self.content.get_line(line as usize)?;
        let text = slice.to_string();
        let text = text.strip_suffix('\n').unwrap_or(&text);
        Some(text.strip_suffix('\r').unwrap_or(text).to_string())
    }

    /// Replace the content.
    pub fn update(&mut self, content: &str, version: i32) {
        self.content = Rope::from_str(content);
        self.version = version;
    }
}

/// Open documents indexed by path.
#[derive(Debug, Default)]
pub struct Vfs {
    documents: HashMap<PathBuf, Document>,
}

impl Vfs {
    /// Create a new empty VFS.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a document.
    pub fn open(&mut self, path: PathBuf, content: &str, version: i32) {
        self.documents.insert(path, Document::new(content, version));
    }

    /// Close a document.
    pub fn close(&mut self, path: &Path) {
        self.documents.remove(path);
    }

    /// Get a document by path.
    pub fn get(&self, path: &Path) -> Option<&Document> {
        self.documents.get(path)
    }

    /// Get document content as a string.
    pub fn get_content(&self, path: &Path) -> Option<String> {
        self.documents.get(path).map(Document::text)
    }

    /// Update a document's content. Unknown paths are opened.
    pub fn update(&mut self, path: &Path, content: &str, version: i32) {
        match self.documents.get_mut(path) {
            Some(doc) => doc.update(content, version),
            None => self.open(path.to_path_buf(), content, version),
        }
    }

    /// Get all open document paths.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.documents.keys()
    }
}
