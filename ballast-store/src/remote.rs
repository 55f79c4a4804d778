//! Namespaced view of a backend: data objects addressed by [`RelPath`],
//! plus the reserved manifest object.

use std::path::Path;
use std::sync::Arc;

use ballast_core::{RelPath, RemoteConfig, SyncConfig};

use crate::backend::{list_objects, ObjectBackend};
use crate::directory::DirectoryBackend;
use crate::error::StoreError;
use crate::keyspace::Keyspace;
use crate::s3::S3Backend;

/// Construct the backend selected by `remote`; `None` when sync is disabled.
///
/// Does not contact the store; see [`RemoteStore::connect`].
pub fn open_backend(remote: &RemoteConfig) -> Result<Option<Arc<dyn ObjectBackend>>, StoreError> {
    let backend: Arc<dyn ObjectBackend> = match remote {
        RemoteConfig::Disabled => return Ok(None),
        RemoteConfig::S3(settings) => Arc::new(S3Backend::new(settings)?),
        RemoteConfig::Directory { path } => Arc::new(DirectoryBackend::new(path)),
    };
    Ok(Some(backend))
}

#[derive(Clone)]
pub struct RemoteStore {
    backend: Arc<dyn ObjectBackend>,
    keyspace: Keyspace,
}

impl std::fmt::Debug for RemoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteStore")
            .field("backend", &self.backend.name())
            .field("prefix", &self.keyspace.prefix())
            .finish()
    }
}

impl RemoteStore {
    pub fn new(backend: Arc<dyn ObjectBackend>, keyspace: Keyspace) -> Self {
        Self { backend, keyspace }
    }

    /// Open the configured backend and verify it is reachable.
    ///
    /// Returns `Ok(None)` when sync is disabled and
    /// [`StoreError::Configuration`] when the store rejects us.
    pub fn connect(config: &SyncConfig) -> Result<Option<Self>, StoreError> {
        let Some(backend) = open_backend(&config.remote)? else {
            tracing::info!("remote sync disabled (provider=none)");
            return Ok(None);
        };
        backend.check_reachable()?;
        tracing::info!(
            backend = backend.name(),
            prefix = %config.prefix,
            "remote store reachable",
        );
        Ok(Some(Self::new(backend, Keyspace::new(&config.prefix))))
    }

    pub fn backend(&self) -> &dyn ObjectBackend {
        self.backend.as_ref()
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Lazily list data objects as `(relative path, size)`.
    ///
    /// Directory markers and keys that do not map to a safe local path are
    /// skipped (logged); a listing failure is yielded once and ends the
    /// iteration.
    pub fn list_data(&self) -> impl Iterator<Item = Result<(RelPath, u64), StoreError>> + '_ {
        list_objects(self.backend.as_ref(), &self.keyspace.data_prefix()).filter_map(
            move |item| match item {
                Err(err) => Some(Err(err)),
                Ok(object) if object.key.ends_with('/') => None,
                Ok(object) => match self.keyspace.relative(&object.key) {
                    Some(rel) => Some(Ok((rel, object.size))),
                    None => {
                        tracing::warn!(key = %object.key, "skipping remote key with no safe local path");
                        None
                    }
                },
            },
        )
    }

    pub fn get_data(&self, path: &RelPath) -> Result<Option<Vec<u8>>, StoreError> {
        self.backend.get_object(&self.keyspace.data_key(path))
    }

    pub fn put_data(&self, path: &RelPath, body: Vec<u8>) -> Result<(), StoreError> {
        self.backend.put_object(
            &self.keyspace.data_key(path),
            body,
            Some(content_type_for(path)),
        )
    }

    /// Delete data objects, chunked to the backend's batch limit.
    ///
    /// Stops at the first failed batch; returns the number of keys sent in
    /// successful batches.
    pub fn delete_data(&self, paths: &[RelPath]) -> Result<usize, StoreError> {
        let keys: Vec<String> = paths.iter().map(|p| self.keyspace.data_key(p)).collect();
        let batch = self.backend.max_delete_batch().max(1);
        let mut deleted = 0;
        for chunk in keys.chunks(batch) {
            self.backend.delete_batch(chunk)?;
            deleted += chunk.len();
        }
        Ok(deleted)
    }

    pub fn get_manifest(&self) -> Result<Option<Vec<u8>>, StoreError> {
        self.backend.get_object(&self.keyspace.manifest_key())
    }

    pub fn put_manifest(&self, body: Vec<u8>) -> Result<(), StoreError> {
        self.backend.put_object(
            &self.keyspace.manifest_key(),
            body,
            Some("application/json"),
        )
    }
}

/// Content-type hint from the file extension; the store treats it as metadata
/// only.
fn content_type_for(path: &RelPath) -> &'static str {
    let ext = Path::new(path.as_str())
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => "application/json",
        Some("jsonl") | Some("ndjson") => "application/x-ndjson",
        Some("txt") | Some("log") => "text/plain",
        Some("md") => "text/markdown",
        Some("csv") => "text/csv",
        Some("html") | Some("htm") => "text/html",
        Some("yaml") | Some("yml") => "application/yaml",
        Some("pdf") => "application/pdf",
        Some("parquet") => "application/vnd.apache.parquet",
        Some("sqlite") | Some("sqlite3") | Some("db") => "application/vnd.sqlite3",
        _ => "application/octet-stream",
    }
}
