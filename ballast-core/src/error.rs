//! Error types for ballast-core.

use std::path::PathBuf;

use thiserror::Error;

/// Misconfiguration detected while loading or validating a [`crate::SyncConfig`].
///
/// These are fatal: they are raised at boot so a bad deployment is visible
/// before the first sync is attempted.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure while reading the config file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error; includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// An explicitly requested config file does not exist.
    #[error("config file not found at {path}")]
    NotFound { path: PathBuf },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.ballast/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    #[error("unsupported remote storage provider '{0}'; expected one of: none, r2, s3, dir")]
    UnsupportedProvider(String),

    #[error("{provider} provider requires `{setting}`")]
    MissingSetting {
        provider: &'static str,
        setting: &'static str,
    },

    #[error("invalid value for `{setting}`: '{value}'")]
    InvalidValue { setting: &'static str, value: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
