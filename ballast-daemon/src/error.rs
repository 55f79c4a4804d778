use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the daemon runtime and its control protocol.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ballast_core::ConfigError),

    #[error("sync error: {0}")]
    Sync(#[from] ballast_sync::SyncError),

    #[error("control message encoding: {0}")]
    Json(#[from] serde_json::Error),

    /// A runtime task panicked or failed to start.
    #[error("daemon task '{task}' failed: {message}")]
    Task { task: &'static str, message: String },

    #[error("daemon protocol error: {0}")]
    Protocol(String),

    #[error("no daemon listening on {socket}")]
    DaemonNotRunning { socket: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
