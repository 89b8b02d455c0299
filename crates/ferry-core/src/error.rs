//! Error types for transfer operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the ferry crates.
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors that can end a transfer step.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The archive container could not be read or written.
    #[error("Archive error at {path}: {message}")]
    Archive { path: PathBuf, message: String },

    /// An archive entry would be extracted outside of the destination.
    #[error("Unsafe archive entry: {name}")]
    UnsafeArchiveEntry { name: String },

    /// The plan cannot be built.
    #[error("Invalid plan: {message}")]
    InvalidPlan { message: String },

    /// A message catalog could not be parsed.
    #[error("Invalid message catalog: {message}")]
    InvalidCatalog { message: String },

    /// Cancellation was observed at a checkpoint.
    #[error("Cancelled by user")]
    Cancelled,

    /// The background worker could not be joined.
    #[error("Transfer worker failed: {message}")]
    Worker { message: String },
}

impl TransferError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid plan error.
    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Self::InvalidPlan {
            message: message.into(),
        }
    }

    /// Whether this error is the cancellation condition rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether this error comes from the filesystem.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied { .. }
                | Self::NotFound { .. }
                | Self::Io { .. }
                | Self::Archive { .. }
                | Self::UnsafeArchiveEntry { .. }
        )
    }
}
