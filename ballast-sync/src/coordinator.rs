//! Sync coordinator: one-time restore, dirty tracking, throttled flushes.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized ──ensure_local_copy──▶ Initialized(Clean) ⇄ Initialized(Dirty)
//!                                                 │
//!                                       flush() at shutdown
//! ```
//!
//! None of the public operations return an error. Failures are logged and
//! reported through [`RestoreOutcome`] / [`FlushOutcome`]; a failed flush
//! leaves the dirty flag set so the next interval retries.
//!
//! ## Locking
//!
//! `dirty` is an atomic so [`SyncCoordinator::mark_dirty`] never blocks.
//! The remaining state sits behind a short-lived mutex. Restore and flush
//! passes serialize on a separate operation lock, so a flush issued while
//! the restore runs waits for it.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use ballast_core::{Digest, RelPath, SyncConfig, TEMP_SUFFIX};
use ballast_store::{RemoteStore, StoreError};
use parking_lot::Mutex;
use serde::Serialize;

use crate::digest::{self, DirectorySnapshot};
use crate::error::{io_err, DataError, SyncError};
use crate::manifest;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Counters from one restore pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    /// Data objects in the remote listing.
    pub listed: usize,
    pub downloaded: usize,
    /// Local file already present with the remote size.
    pub skipped: usize,
    pub failed: usize,
}

/// Result of [`SyncCoordinator::ensure_local_copy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// No backend configured.
    Disabled,
    /// A previous call already ran; nothing done.
    AlreadyInitialized,
    /// Remote manifest digest equals the local digest; no transfer.
    UpToDate { digest: Digest },
    /// Remote holds no data objects; the local tree is left as is.
    RemoteEmpty,
    Restored(RestoreReport),
    /// The remote listing failed; local data is kept unchanged.
    ListFailed(String),
}

/// Counters from one upload pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub digest: Digest,
    pub file_count: usize,
    pub uploaded: usize,
    /// Remote object already had the local size.
    pub skipped: usize,
    pub deleted: usize,
    pub manifest_written: bool,
}

/// Result of [`SyncCoordinator::flush_if_needed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Disabled,
    /// [`SyncCoordinator::ensure_local_copy`] has not run; dirty flag kept.
    NotInitialized,
    /// Not forced and nothing marked dirty.
    Clean,
    /// Not forced and the minimum interval has not elapsed.
    Throttled { retry_in: Duration },
    /// Local root does not exist; dirty flag kept.
    RootMissing,
    /// Not forced and the local digest matches the last synced one.
    Unchanged,
    Flushed(FlushReport),
    /// The pass failed part way; dirty flag re-set for a retry.
    Failed(String),
}

impl FlushOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FlushOutcome::Failed(_))
    }

    /// Short label for logs and the control socket.
    pub fn label(&self) -> &'static str {
        match self {
            FlushOutcome::Disabled => "disabled",
            FlushOutcome::NotInitialized => "not-initialized",
            FlushOutcome::Clean => "clean",
            FlushOutcome::Throttled { .. } => "throttled",
            FlushOutcome::RootMissing => "root-missing",
            FlushOutcome::Unchanged => "unchanged",
            FlushOutcome::Flushed(_) => "flushed",
            FlushOutcome::Failed(_) => "failed",
        }
    }
}

/// Point-in-time view of coordinator state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub root: PathBuf,
    pub enabled: bool,
    pub backend: Option<String>,
    pub prefix: Option<String>,
    pub initialized: bool,
    pub dirty: bool,
    pub last_known_digest: Option<Digest>,
    /// Seconds since the last successful upload pass.
    pub last_flush_age_secs: Option<f64>,
}

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SyncState {
    initialized: bool,
    last_known_digest: Option<Digest>,
    last_flush: Option<Instant>,
    /// Digest the remote manifest is known to hold.
    remote_manifest: Option<Digest>,
}

/// Keeps one local tree consistent with its remote namespace.
///
/// `Send + Sync`; share it behind an `Arc`.
#[derive(Debug)]
pub struct SyncCoordinator {
    root: PathBuf,
    remote: Option<RemoteStore>,
    min_interval: Duration,
    dirty: AtomicBool,
    state: Mutex<SyncState>,
    op_lock: Mutex<()>,
}

impl SyncCoordinator {
    /// `min_interval` is used as given; config loading applies the floor.
    pub fn new(root: impl Into<PathBuf>, remote: Option<RemoteStore>, min_interval: Duration) -> Self {
        Self {
            root: root.into(),
            remote,
            min_interval,
            dirty: AtomicBool::new(false),
            state: Mutex::new(SyncState::default()),
            op_lock: Mutex::new(()),
        }
    }

    /// Coordinator with no backend: every operation is a no-op.
    pub fn disabled(root: impl Into<PathBuf>) -> Self {
        Self::new(root, None, Duration::ZERO)
    }

    /// Open and verify the configured backend.
    ///
    /// Misconfiguration (bad credentials, missing bucket, root that is not a
    /// directory) is returned here as [`SyncError::Configuration`] rather
    /// than at the first sync.
    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        match fs::metadata(&config.root) {
            Ok(meta) if !meta.is_dir() => {
                return Err(SyncError::Configuration(format!(
                    "sync root {} is not a directory",
                    config.root.display()
                )));
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(io_err(&config.root, err)),
        }
        let remote = RemoteStore::connect(config).map_err(|err| match err {
            StoreError::Configuration(message) => SyncError::Configuration(message),
            other => SyncError::Store(other),
        })?;
        Ok(Self::new(
            config.root.clone(),
            remote,
            config.min_flush_interval,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn remote(&self) -> Option<&RemoteStore> {
        self.remote.as_ref()
    }

    pub fn is_enabled(&self) -> bool {
        self.remote.is_some()
    }

    pub fn status(&self) -> SyncStatus {
        let state = self.state.lock();
        SyncStatus {
            root: self.root.clone(),
            enabled: self.remote.is_some(),
            backend: self.remote.as_ref().map(|r| r.backend().name().to_string()),
            prefix: self.remote.as_ref().map(|r| r.keyspace().prefix().to_string()),
            initialized: state.initialized,
            dirty: self.dirty.load(Ordering::Acquire),
            last_known_digest: state.last_known_digest.clone(),
            last_flush_age_secs: state.last_flush.map(|t| t.elapsed().as_secs_f64()),
        }
    }

    /// Flag that the local tree changed. Never blocks, never does I/O.
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Mark initialized without downloading anything.
    ///
    /// For one-shot upload tooling that treats the local tree as
    /// authoritative. Returns `false` if already initialized.
    pub fn skip_restore(&self) -> bool {
        let _op = self.op_lock.lock();
        let mut state = self.state.lock();
        !std::mem::replace(&mut state.initialized, true)
    }

    // -----------------------------------------------------------------------
    // Restore
    // -----------------------------------------------------------------------

    /// Bring the local tree up to date with the remote. Runs at most once.
    pub fn ensure_local_copy(&self) -> RestoreOutcome {
        let _op = self.op_lock.lock();
        {
            let mut state = self.state.lock();
            if state.initialized {
                return RestoreOutcome::AlreadyInitialized;
            }
            state.initialized = true;
        }
        let Some(remote) = &self.remote else {
            return RestoreOutcome::Disabled;
        };

        let manifest = manifest::fetch(remote)
            .map(|m| m.digest)
            .filter(|d| !d.is_empty());
        let local = digest::compute(&self.root);

        if let Some(remote_digest) = &manifest {
            let mut state = self.state.lock();
            state.remote_manifest = Some(remote_digest.clone());
            if *remote_digest == local {
                tracing::info!(digest = %local.short(), "local copy matches remote manifest");
                state.last_known_digest = Some(local.clone());
                return RestoreOutcome::UpToDate { digest: local };
            }
        }

        tracing::info!(root = %self.root.display(), "restoring local copy from remote");
        let report = match self.restore(remote) {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(error = %err, "remote listing failed; keeping local data");
                return RestoreOutcome::ListFailed(err.to_string());
            }
        };
        if report.listed == 0 {
            tracing::info!("remote holds no data objects");
            return RestoreOutcome::RemoteEmpty;
        }

        let known = manifest.unwrap_or_else(|| digest::compute(&self.root));
        self.state.lock().last_known_digest = Some(known);
        tracing::info!(
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            "restore complete",
        );
        RestoreOutcome::Restored(report)
    }

    /// Download every remote object whose local counterpart is missing or
    /// has a different size. Only a listing failure is an error.
    fn restore(&self, remote: &RemoteStore) -> Result<RestoreReport, SyncError> {
        let listing: Vec<(RelPath, u64)> = remote.list_data().collect::<Result<_, _>>()?;
        let mut report = RestoreReport {
            listed: listing.len(),
            ..RestoreReport::default()
        };

        for (rel, size) in listing {
            let destination = rel.to_path(&self.root);
            if local_size(&destination) == Some(size) {
                tracing::debug!(path = %rel, "size matches; skipping download");
                report.skipped += 1;
                continue;
            }
            match remote.get_data(&rel) {
                Ok(Some(body)) => match write_atomic(&destination, &body) {
                    Ok(()) => report.downloaded += 1,
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping download");
                        report.failed += 1;
                    }
                },
                Ok(None) => {
                    tracing::warn!(path = %rel, "object vanished after listing");
                    report.failed += 1;
                }
                Err(err) => {
                    tracing::warn!(path = %rel, error = %err, "download failed");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Flush
    // -----------------------------------------------------------------------

    /// Upload local changes when dirty, at most once per minimum interval.
    ///
    /// `force` bypasses the dirty check, the throttle and the digest
    /// short-circuit.
    pub fn flush_if_needed(&self, force: bool) -> FlushOutcome {
        let Some(remote) = &self.remote else {
            return FlushOutcome::Disabled;
        };
        if !force && !self.is_dirty() {
            return FlushOutcome::Clean;
        }

        let _op = self.op_lock.lock();
        let started = Instant::now();
        let (last_known, remote_manifest) = {
            let state = self.state.lock();
            if !state.initialized {
                return FlushOutcome::NotInitialized;
            }
            if !force {
                if let Some(last) = state.last_flush {
                    let elapsed = started.saturating_duration_since(last);
                    if elapsed < self.min_interval {
                        return FlushOutcome::Throttled {
                            retry_in: self.min_interval - elapsed,
                        };
                    }
                }
            }
            (state.last_known_digest.clone(), state.remote_manifest.clone())
        };

        // Cleared before hashing so a concurrent mark_dirty is not lost.
        let was_dirty = self.dirty.swap(false, Ordering::AcqRel);
        let Some(snapshot) = digest::snapshot(&self.root) else {
            tracing::warn!(root = %self.root.display(), "sync root missing; nothing to upload");
            if was_dirty {
                self.mark_dirty();
            }
            return FlushOutcome::RootMissing;
        };

        if !force && last_known.as_ref() == Some(snapshot.digest()) {
            tracing::debug!(digest = %snapshot.digest().short(), "local tree unchanged");
            return FlushOutcome::Unchanged;
        }

        self.finish_flush(remote, &snapshot, remote_manifest.as_ref(), started)
    }

    /// `flush_if_needed(true)`. Hosts call this from their shutdown path.
    pub fn flush(&self) -> FlushOutcome {
        self.flush_if_needed(true)
    }

    /// Run the upload pass for `snapshot` and record its result.
    fn finish_flush(
        &self,
        remote: &RemoteStore,
        snapshot: &DirectorySnapshot,
        remote_manifest: Option<&Digest>,
        started: Instant,
    ) -> FlushOutcome {
        match self.upload(remote, snapshot, remote_manifest) {
            Ok(report) => {
                let mut state = self.state.lock();
                state.last_known_digest = Some(report.digest.clone());
                state.last_flush = Some(started);
                tracing::info!(
                    uploaded = report.uploaded,
                    skipped = report.skipped,
                    deleted = report.deleted,
                    digest = %report.digest.short(),
                    "flush complete",
                );
                FlushOutcome::Flushed(report)
            }
            Err(err) => {
                self.mark_dirty();
                tracing::warn!(error = %err, "flush failed; will retry");
                FlushOutcome::Failed(err.to_string())
            }
        }
    }

    /// Upload changed files, then the manifest, then prune stale objects.
    ///
    /// If any local file could not be read, readable files are still
    /// uploaded but the manifest and the prune are withheld: the snapshot
    /// digest does not describe what the remote holds, and the remote copies
    /// of unreadable files are the only ones left.
    fn upload(
        &self,
        remote: &RemoteStore,
        snapshot: &DirectorySnapshot,
        remote_manifest: Option<&Digest>,
    ) -> Result<FlushReport, SyncError> {
        let index: HashMap<RelPath, u64> = remote.list_data().collect::<Result<_, _>>()?;

        let mut report = FlushReport {
            digest: snapshot.digest().clone(),
            file_count: snapshot.file_count(),
            uploaded: 0,
            skipped: 0,
            deleted: 0,
            manifest_written: false,
        };
        let mut local: HashSet<&RelPath> = HashSet::with_capacity(snapshot.file_count());
        let mut unreadable = snapshot.skipped().len();

        for entry in snapshot.entries() {
            local.insert(&entry.path);
            if index.get(&entry.path) == Some(&entry.size) {
                tracing::debug!(path = %entry.path, "size matches; skipping upload");
                report.skipped += 1;
                continue;
            }
            let path = entry.path.to_path(&self.root);
            let body = match fs::read(&path) {
                Ok(body) => body,
                Err(source) => {
                    let err = DataError::UnreadableFile { path, source };
                    tracing::warn!(error = %err, "skipping upload");
                    unreadable += 1;
                    continue;
                }
            };
            remote.put_data(&entry.path, body)?;
            report.uploaded += 1;
        }

        if unreadable > 0 {
            return Err(SyncError::Incomplete {
                unreadable,
                uploaded: report.uploaded,
            });
        }

        let mut stale: Vec<RelPath> = index
            .into_keys()
            .filter(|key| !local.contains(key))
            .collect();
        stale.sort();

        let manifest_current = report.uploaded == 0
            && stale.is_empty()
            && remote_manifest == Some(snapshot.digest());
        if !manifest_current {
            let count = u64::try_from(snapshot.file_count()).unwrap_or(u64::MAX);
            remote.put_manifest(manifest::build(snapshot.digest(), count))?;
            self.state.lock().remote_manifest = Some(snapshot.digest().clone());
            report.manifest_written = true;
        }

        if !stale.is_empty() {
            report.deleted = remote.delete_data(&stale)?;
        }
        Ok(report)
    }
}

fn local_size(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}

/// Write `body` to `path` via a sibling temp file and rename.
fn write_atomic(path: &Path, body: &[u8]) -> Result<(), DataError> {
    let failed = |source| DataError::WriteFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(failed)?;
    }
    let tmp = PathBuf::from(format!("{}{TEMP_SUFFIX}", path.display()));
    fs::write(&tmp, body).map_err(failed)?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(failed(err));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ballast_store::{Keyspace, MemoryBackend};
    use tempfile::TempDir;

    fn coordinator(root: &Path, backend: &MemoryBackend, min_interval: Duration) -> SyncCoordinator {
        let remote = RemoteStore::new(Arc::new(backend.clone()), Keyspace::new("ks"));
        SyncCoordinator::new(root, Some(remote), min_interval)
    }

    #[test]
    fn disabled_coordinator_is_inert() {
        let tmp = TempDir::new().unwrap();
        let sync = SyncCoordinator::disabled(tmp.path());
        assert_eq!(sync.ensure_local_copy(), RestoreOutcome::Disabled);
        sync.mark_dirty();
        assert_eq!(sync.flush(), FlushOutcome::Disabled);
        assert!(!sync.status().enabled);
    }

    #[test]
    fn ensure_local_copy_runs_once() {
        let tmp = TempDir::new().unwrap();
        let backend = MemoryBackend::new();
        let sync = coordinator(tmp.path(), &backend, Duration::ZERO);
        assert_eq!(sync.ensure_local_copy(), RestoreOutcome::RemoteEmpty);
        let requests = backend.counts().total();
        assert_eq!(sync.ensure_local_copy(), RestoreOutcome::AlreadyInitialized);
        assert_eq!(backend.counts().total(), requests);
    }

    #[test]
    fn flush_before_init_is_rejected_and_keeps_dirty() {
        let tmp = TempDir::new().unwrap();
        let backend = MemoryBackend::new();
        let sync = coordinator(tmp.path(), &backend, Duration::ZERO);
        sync.mark_dirty();
        assert_eq!(sync.flush_if_needed(false), FlushOutcome::NotInitialized);
        assert!(sync.is_dirty());
        assert_eq!(backend.counts().total(), 0);
    }

    #[test]
    fn skip_restore_initializes_without_requests() {
        let tmp = TempDir::new().unwrap();
        let backend = MemoryBackend::new();
        let sync = coordinator(tmp.path(), &backend, Duration::ZERO);
        assert!(sync.skip_restore());
        assert!(!sync.skip_restore());
        assert_eq!(sync.ensure_local_copy(), RestoreOutcome::AlreadyInitialized);
        assert_eq!(backend.counts().total(), 0);
    }

    #[test]
    fn missing_root_keeps_dirty() {
        let tmp = TempDir::new().unwrap();
        let backend = MemoryBackend::new();
        let sync = coordinator(&tmp.path().join("absent"), &backend, Duration::ZERO);
        sync.skip_restore();
        sync.mark_dirty();
        assert_eq!(sync.flush_if_needed(false), FlushOutcome::RootMissing);
        assert!(sync.is_dirty());
    }

    fn remote_manifest_digest(backend: &MemoryBackend) -> Option<Digest> {
        let body = backend.object("ks.manifest.json")?;
        manifest::Manifest::parse(&body).ok().map(|m| m.digest)
    }

    fn synced_pair(backend: &MemoryBackend) -> (TempDir, SyncCoordinator) {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), b"hello").unwrap();
        fs::create_dir_all(tmp.path().join("b")).unwrap();
        fs::write(tmp.path().join("b/c.txt"), b"world!").unwrap();
        let sync = coordinator(tmp.path(), backend, Duration::ZERO);
        sync.skip_restore();
        assert!(matches!(sync.flush(), FlushOutcome::Flushed(_)));
        (tmp, sync)
    }

    #[test]
    fn unreadable_file_keeps_remote_copy_and_manifest() {
        let backend = MemoryBackend::new();
        let (tmp, sync) = synced_pair(&backend);
        let synced = sync.status().last_known_digest;
        let manifest_before = remote_manifest_digest(&backend);
        fs::write(tmp.path().join("a.txt"), b"hi!").unwrap();

        let snap = digest::snapshot_with(tmp.path(), |path| {
            if path.ends_with("b/c.txt") {
                Err(DataError::UnreadableFile {
                    path: path.to_path_buf(),
                    source: std::io::Error::from(ErrorKind::PermissionDenied),
                })
            } else {
                digest::hash_file(path)
            }
        })
        .unwrap();
        let remote = sync.remote().unwrap();
        let outcome = sync.finish_flush(remote, &snap, manifest_before.as_ref(), Instant::now());

        assert!(outcome.is_failure());
        assert!(sync.is_dirty());
        assert_eq!(sync.status().last_known_digest, synced);
        assert_eq!(backend.object("ks/b/c.txt"), Some(b"world!".to_vec()));
        assert_eq!(backend.object("ks/a.txt"), Some(b"hi!".to_vec()));
        assert_eq!(remote_manifest_digest(&backend), manifest_before);
    }

    #[test]
    fn file_lost_between_hash_and_read_is_retried() {
        let backend = MemoryBackend::new();
        let (tmp, sync) = synced_pair(&backend);
        let synced = sync.status().last_known_digest;
        let manifest_before = remote_manifest_digest(&backend);

        let a = tmp.path().join("a.txt");
        fs::write(&a, b"hi").unwrap();
        let snap = digest::snapshot(tmp.path()).unwrap();
        fs::remove_file(&a).unwrap();
        let remote = sync.remote().unwrap();
        let outcome = sync.finish_flush(remote, &snap, manifest_before.as_ref(), Instant::now());

        assert!(outcome.is_failure());
        assert!(sync.is_dirty());
        assert_eq!(sync.status().last_known_digest, synced);
        assert_eq!(remote_manifest_digest(&backend), manifest_before);
        assert_eq!(backend.object("ks/a.txt"), Some(b"hello".to_vec()));

        // Readable again with the same content: the retry uploads it.
        fs::write(&a, b"hi").unwrap();
        assert!(matches!(sync.flush_if_needed(false), FlushOutcome::Flushed(_)));
        assert_eq!(backend.object("ks/a.txt"), Some(b"hi".to_vec()));
        assert_eq!(remote_manifest_digest(&backend), Some(snap.digest().clone()));
    }

    #[test]
    fn from_config_reports_file_root_as_configuration() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();
        let err = SyncCoordinator::from_config(&SyncConfig::disabled(&file)).unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[test]
    fn write_atomic_creates_parents_and_leaves_no_temp() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("x").join("y").join("z.txt");
        write_atomic(&target, b"data").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"data");
        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(TEMP_SUFFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn status_reflects_flush() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), b"hello").unwrap();
        let backend = MemoryBackend::new();
        let sync = coordinator(tmp.path(), &backend, Duration::ZERO);
        sync.ensure_local_copy();
        sync.mark_dirty();
        assert!(matches!(sync.flush_if_needed(false), FlushOutcome::Flushed(_)));

        let status = sync.status();
        assert!(status.initialized);
        assert!(!status.dirty);
        assert_eq!(status.backend.as_deref(), Some("memory"));
        assert_eq!(status.prefix.as_deref(), Some("ks"));
        assert_eq!(status.last_known_digest, Some(digest::compute(tmp.path())));
        assert!(status.last_flush_age_secs.is_some());
    }
}
