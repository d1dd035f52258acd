//! Markdown documents and the corpus loader.
//!
//! A corpus is a flat folder of `*.md` files. Each file becomes one
//! [`Document`] keyed by its filename. Files that cannot be read are
//! skipped and reported rather than aborting the load.

use crate::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A raw markdown document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// File name, unique within the corpus (e.g. "payments.md").
    pub filename: String,
    /// Raw markdown text.
    pub content: String,
}

impl Document {
    /// Create a document from raw text content.
    pub fn new(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// Load a single markdown file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;

        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled.md")
            .to_string();

        Ok(Self { filename, content })
    }

    /// Number of characters in the document.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// A file that could not be loaded.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of loading a corpus folder.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    /// Successfully loaded documents, sorted by filename.
    pub documents: Vec<Document>,
    /// Files that were skipped.
    pub failures: Vec<LoadFailure>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Read every `*.md` file directly inside `dir`.
///
/// Subfolders are not searched. Unreadable files are logged, recorded in
/// [`Corpus::failures`] and skipped. A missing folder is an error.
pub fn load_documents(dir: &Path) -> Result<Corpus> {
    if !dir.is_dir() {
        return Err(RagError::InvalidCorpusPath(dir.to_path_buf()));
    }

    let mut corpus = Corpus::default();

    let entries = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                warn!("Skipping unreadable entry {}: {}", path.display(), e);
                corpus.failures.push(LoadFailure {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || !is_markdown(path) {
            continue;
        }

        match Document::from_file(path) {
            Ok(doc) => {
                debug!("Loaded {} ({} chars)", doc.filename, doc.char_count());
                corpus.documents.push(doc);
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                corpus.failures.push(LoadFailure {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(corpus)
}

fn is_markdown(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("md")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_document_new() {
        let doc = Document::new("a.md", "# T\nbody");
        assert_eq!(doc.filename, "a.md");
        assert_eq!(doc.char_count(), 8);
    }

    #[test]
    fn test_load_documents_reads_markdown_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.md"), "## B\nbee").unwrap();
        fs::write(dir.path().join("a.md"), "## A\nay").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.md"), "## C").unwrap();

        let corpus = load_documents(dir.path()).unwrap();

        let names: Vec<_> = corpus.documents.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
        assert!(corpus.failures.is_empty());
    }

    #[test]
    fn test_load_documents_skips_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("good.md"), "## Good\ntext").unwrap();
        fs::write(dir.path().join("bad.md"), [0xff, 0xfe, 0xfd]).unwrap();

        let corpus = load_documents(dir.path()).unwrap();

        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.documents[0].filename, "good.md");
        assert_eq!(corpus.failures.len(), 1);
        assert!(corpus.failures[0].path.ends_with("bad.md"));
    }

    #[test]
    fn test_load_documents_missing_dir() {
        let result = load_documents(Path::new("/nonexistent/corpus"));
        assert!(matches!(result, Err(RagError::InvalidCorpusPath(_))));
    }
}
