//! Error types for the RAG pipelines.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, RagError>;

/// Pipeline stage that talks to an external collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    Index,
    Generation,
    Judge,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Embedding => "embedding",
            Stage::Index => "index",
            Stage::Generation => "generation",
            Stage::Judge => "judge",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while ingesting, retrieving or evaluating.
#[derive(Error, Debug)]
pub enum RagError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The corpus directory does not exist or is not a directory.
    #[error("Corpus path '{0}' does not exist or is not a directory")]
    InvalidCorpusPath(PathBuf),

    /// No documents found in the corpus.
    #[error("No documents found in corpus at '{0}'")]
    EmptyCorpus(PathBuf),

    /// The requested collection has not been built.
    #[error("Collection '{0}' not found. Run 'ingest' first.")]
    CollectionNotFound(String),

    /// The evaluation has no test cases to run.
    #[error("Test set '{0}' contains no test cases")]
    EmptyTestSet(String),

    /// Vectors of different dimensionality were mixed in one collection.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedding backend error.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external call failed; the run was aborted at this stage.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<RagError>,
    },
}

impl RagError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Tag an error with the pipeline stage it came from.
    ///
    /// Already-tagged errors keep their original stage.
    pub fn at(self, stage: Stage) -> Self {
        match self {
            err @ RagError::Stage { .. } => err,
            other => RagError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The stage this error was tagged with, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RagError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::LlmParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_tagging() {
        let err = RagError::LlmApi("503".to_string()).at(Stage::Generation);
        assert_eq!(err.stage(), Some(Stage::Generation));
        assert!(err.to_string().starts_with("generation stage failed"));

        // Re-tagging keeps the innermost stage.
        let err = err.at(Stage::Judge);
        assert_eq!(err.stage(), Some(Stage::Generation));
    }

    #[test]
    fn test_untagged_error_has_no_stage() {
        let err = RagError::CollectionNotFound("docs".to_string());
        assert!(err.stage().is_none());
        assert!(err.to_string().contains("docs"));
    }
}
