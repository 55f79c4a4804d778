//! Ballast core library: domain types, configuration and errors.
//!
//! - [`types`]: relative paths, digests, file entries, object listings
//! - [`config`]: [`SyncConfig`] loading from YAML + environment
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigFile, RemoteConfig, S3Settings, SyncConfig};
pub use error::ConfigError;
pub use types::{Digest, FileEntry, ObjectInfo, RelPath, TEMP_SUFFIX};
