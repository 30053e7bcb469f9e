//! Error types for loading and persisting documents.
//!
//! Per-file failures are typed so the batch runner can turn each class into
//! an outcome: a parse failure skips the file, a write failure fails it.
use std::path::PathBuf;

/// Source text that could not be loaded into the document model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{file}:{line}:{column}: {message}", file = .path.display())]
pub struct ParseError {
    pub path: PathBuf,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Syntax error before a path is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub(crate) line: usize,
    pub(crate) column: usize,
    pub(crate) message: String,
}

impl SyntaxError {
    pub(crate) fn at_path(self, path: impl Into<PathBuf>) -> ParseError {
        ParseError {
            path: path.into(),
            line: self.line,
            column: self.column,
            message: self.message,
        }
    }
}

/// Failure while processing one input file.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("read {file}: {source}", file = .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("write {file}: {source}", file = .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
