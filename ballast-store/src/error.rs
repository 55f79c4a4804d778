//! Error types for ballast-store.

use thiserror::Error;

/// All errors a backend can report.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transient failure talking to the store (network, throttling, I/O on
    /// a mounted directory). Callers treat it as "retry later".
    #[error("{op} failed for '{key}': {message}")]
    Connectivity {
        op: &'static str,
        key: String,
        message: String,
    },

    /// Invalid credentials, missing bucket or directory. Fatal at startup.
    #[error("remote store misconfigured: {0}")]
    Configuration(String),
}

impl StoreError {
    pub fn connectivity(op: &'static str, key: impl Into<String>, message: impl ToString) -> Self {
        StoreError::Connectivity {
            op,
            key: key.into(),
            message: message.to_string(),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Connectivity { .. })
    }
}
