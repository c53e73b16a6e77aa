//! Error types for mirror-sync.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from a sync pass.
///
/// Per-file variants end up in a [`crate::report::FileFailure`]; the rest
/// abort the pass and end up in [`crate::report::PassReport::failure`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source directory does not exist: {path}")]
    SourceMissing { path: PathBuf },

    #[error("not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Symbolic links are never followed in either tree.
    #[error("symbolic link not followed: {path}")]
    Symlink { path: PathBuf },

    /// Sockets, FIFOs, device nodes.
    #[error("unsupported file type: {path}")]
    Unsupported { path: PathBuf },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
