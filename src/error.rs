//! Structural failures.
//!
//! Problems inside a document (an unknown macro, a broken link) are never
//! errors; they are reported through [`crate::diagnostics::Diagnostics`] and
//! the run carries on. The variants here cover inputs the run cannot start
//! without.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocError>;

#[derive(Debug, Error)]
pub enum DocError {
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("{} is a directory, expected a file path", .0.display())]
    IsADirectory(PathBuf),

    #[error("document {} is not inside the root directory {}", .path.display(), .root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("{} was expected to be a {expected} file", .path.display())]
    InvalidExtension { path: PathBuf, expected: &'static str },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid file filter '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl DocError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocError::Io {
            path: path.into(),
            source,
        }
    }
}
