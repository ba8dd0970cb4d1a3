use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of a [`BooksError`], used when logging tool failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Locator,
    Extraction,
    Validation,
    Dispatch,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Locator => "locator",
            ErrorKind::Extraction => "extraction",
            ErrorKind::Validation => "validation",
            ErrorKind::Dispatch => "dispatch",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum BooksError {
    #[error("Directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Permission denied reading directory: {} (grant Full Disk Access to the client running this server)", .0.display())]
    DirectoryAccessDenied(PathBuf),

    #[error("Cannot access directory: {}: {source}", .dir.display())]
    DirectoryUnreadable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No SQLite database found in {}", .0.display())]
    NoDatabase(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Extraction {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl BooksError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BooksError::DirectoryNotFound(_)
            | BooksError::DirectoryAccessDenied(_)
            | BooksError::DirectoryUnreadable { .. }
            | BooksError::NoDatabase(_) => ErrorKind::Locator,
            BooksError::Extraction { .. } => ErrorKind::Extraction,
            BooksError::InvalidArgument(_) => ErrorKind::Validation,
            BooksError::UnknownTool(_) => ErrorKind::Dispatch,
            BooksError::Serialize(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, BooksError>;
