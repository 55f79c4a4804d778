//! Error types for ballast-sync.

use std::path::PathBuf;

use thiserror::Error;

use ballast_store::StoreError;

/// Errors surfaced by coordinator construction and by the internal
/// upload/restore passes.
///
/// The public coordinator operations never return these; they are folded
/// into [`crate::FlushOutcome`] / [`crate::RestoreOutcome`] and logged.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Bad credentials, unreachable bucket, or a root that is not a
    /// directory. Fatal at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("remote store error: {0}")]
    Store(#[from] StoreError),

    /// Some local entries could not be read; the manifest and the prune
    /// were withheld.
    #[error("{unreadable} local entries unreadable ({uploaded} uploaded); manifest not written")]
    Incomplete { unreadable: usize, uploaded: usize },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single bad item: logged, skipped, and the surrounding pass continues.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("unreadable file {path}: {source}")]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path is not valid UTF-8: {}", path.display())]
    NonUtf8Path { path: PathBuf },

    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
