use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ballast_store::{DirectoryBackend, Keyspace, MemoryBackend, ObjectBackend, RemoteStore};
use ballast_sync::{
    digest, manifest, FlushOutcome, RestoreOutcome, RestoreReport, SyncCoordinator,
};
use rstest::rstest;
use tempfile::TempDir;

const PREFIX: &str = "ks";

fn remote_for(backend: Arc<dyn ObjectBackend>) -> RemoteStore {
    RemoteStore::new(backend, Keyspace::new(PREFIX))
}

fn coordinator(root: &Path, backend: &MemoryBackend, min_interval: Duration) -> SyncCoordinator {
    SyncCoordinator::new(root, Some(remote_for(Arc::new(backend.clone()))), min_interval)
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

fn populated() -> TempDir {
    let tmp = TempDir::new().expect("tmp");
    write(tmp.path(), "a.txt", "hello");
    write(tmp.path(), "b/c.txt", "world!");
    write(tmp.path(), "sessions/2024/s1.json", r#"{"turns":3}"#);
    tmp
}

#[test]
fn second_forced_flush_puts_nothing() {
    let local = populated();
    let backend = MemoryBackend::new();
    let sync = coordinator(local.path(), &backend, Duration::ZERO);
    sync.skip_restore();

    assert!(matches!(sync.flush(), FlushOutcome::Flushed(_)));
    backend.reset_counts();
    match sync.flush() {
        FlushOutcome::Flushed(report) => {
            assert_eq!(report.uploaded, 0);
            assert!(!report.manifest_written);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(backend.counts().puts, 0);
}

#[test]
fn round_trip_through_directory_backend() {
    let source = populated();
    let objects = TempDir::new().expect("objects");
    let backend: Arc<dyn ObjectBackend> = Arc::new(DirectoryBackend::new(objects.path()));

    let uploader = SyncCoordinator::new(source.path(), Some(remote_for(backend.clone())), Duration::ZERO);
    uploader.skip_restore();
    assert!(matches!(uploader.flush(), FlushOutcome::Flushed(_)));

    let target = TempDir::new().expect("target");
    let restore_root = target.path().join("restored");
    let downloader = SyncCoordinator::new(&restore_root, Some(remote_for(backend)), Duration::ZERO);
    assert_eq!(
        downloader.ensure_local_copy(),
        RestoreOutcome::Restored(RestoreReport {
            listed: 3,
            downloaded: 3,
            skipped: 0,
            failed: 0,
        })
    );

    for rel in ["a.txt", "b/c.txt", "sessions/2024/s1.json"] {
        assert_eq!(
            fs::read(source.path().join(rel)).expect("source"),
            fs::read(restore_root.join(rel)).expect("restored"),
            "{rel} differs"
        );
    }
    assert_eq!(digest::compute(source.path()), digest::compute(&restore_root));
    assert_eq!(
        downloader.status().last_known_digest,
        Some(digest::compute(source.path()))
    );
}

#[test]
fn matching_manifest_skips_all_transfer() {
    let local = populated();
    let backend = MemoryBackend::new();
    backend.insert(
        "ks.manifest.json",
        manifest::build(&digest::compute(local.path()), 3),
    );
    backend.insert("ks/a.txt", b"stale but ignored".to_vec());

    let sync = coordinator(local.path(), &backend, Duration::ZERO);
    assert!(matches!(sync.ensure_local_copy(), RestoreOutcome::UpToDate { .. }));
    assert_eq!(backend.counts().lists, 0);
    assert_eq!(fs::read_to_string(local.path().join("a.txt")).unwrap(), "hello");
}

#[test]
fn restore_skips_same_size_files_and_survives_one_failure() {
    let local = TempDir::new().expect("local");
    write(local.path(), "same.txt", "12345");
    let backend = MemoryBackend::new();
    backend.insert("ks/same.txt", b"abcde".to_vec());
    backend.insert("ks/good.txt", b"good".to_vec());
    backend.insert("ks/bad.txt", b"bad".to_vec());
    backend.fail_key("ks/bad.txt");

    let sync = coordinator(local.path(), &backend, Duration::ZERO);
    assert_eq!(
        sync.ensure_local_copy(),
        RestoreOutcome::Restored(RestoreReport {
            listed: 3,
            downloaded: 1,
            skipped: 1,
            failed: 1,
        })
    );
    // Size-only heuristic: same-size content is not re-downloaded.
    assert_eq!(fs::read_to_string(local.path().join("same.txt")).unwrap(), "12345");
    assert_eq!(fs::read_to_string(local.path().join("good.txt")).unwrap(), "good");
    assert!(!local.path().join("bad.txt").exists());
}

#[test]
fn restore_listing_failure_keeps_local_data() {
    let local = populated();
    let backend = MemoryBackend::new();
    backend.set_offline(true);
    let sync = coordinator(local.path(), &backend, Duration::ZERO);
    assert!(matches!(sync.ensure_local_copy(), RestoreOutcome::ListFailed(_)));
    assert_eq!(sync.status().last_known_digest, None);
    assert!(sync.status().initialized);
}

#[test]
fn incremental_upload_skips_matching_sizes() {
    let local = populated();
    let backend = MemoryBackend::new();
    backend.insert("ks/a.txt", b"HELLO".to_vec());
    backend.insert("ks/b/c.txt", b"WORLD!".to_vec());

    let sync = coordinator(local.path(), &backend, Duration::ZERO);
    sync.skip_restore();
    match sync.flush() {
        FlushOutcome::Flushed(report) => {
            assert_eq!(report.uploaded, 1, "only the missing session file");
            assert_eq!(report.skipped, 2);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(backend.object("ks/a.txt"), Some(b"HELLO".to_vec()));
}

#[test]
fn garbage_collection_never_touches_manifest() {
    let local = populated();
    let backend = MemoryBackend::new().with_max_delete_batch(2);
    for i in 0..5 {
        backend.insert(&format!("ks/old/{i}.bin"), vec![0]);
    }
    let sync = coordinator(local.path(), &backend, Duration::ZERO);
    sync.skip_restore();
    match sync.flush() {
        FlushOutcome::Flushed(report) => assert_eq!(report.deleted, 5),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(backend.counts().deletes, 3);
    let keys = backend.keys();
    assert!(keys.contains(&"ks.manifest.json".to_string()));
    assert!(keys.iter().all(|k| !k.starts_with("ks/old/")));
}

#[test]
fn throttled_flush_makes_no_requests() {
    let local = populated();
    let backend = MemoryBackend::new();
    let sync = coordinator(local.path(), &backend, Duration::from_secs(30));
    sync.skip_restore();

    sync.mark_dirty();
    assert!(matches!(sync.flush_if_needed(false), FlushOutcome::Flushed(_)));
    write(local.path(), "a.txt", "changed");
    sync.mark_dirty();
    backend.reset_counts();
    assert!(matches!(
        sync.flush_if_needed(false),
        FlushOutcome::Throttled { .. }
    ));
    assert_eq!(backend.counts().total(), 0);
    assert!(sync.is_dirty());

    // Forced flushes bypass the throttle.
    assert!(matches!(sync.flush(), FlushOutcome::Flushed(_)));
}

#[test]
fn clean_and_unchanged_fast_paths() {
    let local = populated();
    let backend = MemoryBackend::new();
    let sync = coordinator(local.path(), &backend, Duration::ZERO);
    sync.skip_restore();
    assert_eq!(sync.flush_if_needed(false), FlushOutcome::Clean);

    sync.mark_dirty();
    assert!(matches!(sync.flush_if_needed(false), FlushOutcome::Flushed(_)));
    backend.reset_counts();

    sync.mark_dirty();
    assert_eq!(sync.flush_if_needed(false), FlushOutcome::Unchanged);
    assert!(!sync.is_dirty());
    assert_eq!(backend.counts().total(), 0);
}

#[rstest]
#[case::list(true)]
#[case::put(false)]
fn failed_flush_resets_dirty_and_keeps_digest(#[case] offline: bool) {
    let local = populated();
    let backend = MemoryBackend::new();
    let sync = coordinator(local.path(), &backend, Duration::ZERO);
    sync.skip_restore();
    sync.mark_dirty();
    assert!(matches!(sync.flush_if_needed(false), FlushOutcome::Flushed(_)));
    let synced = sync.status().last_known_digest;

    write(local.path(), "a.txt", "a different length");
    if offline {
        backend.set_offline(true);
    } else {
        backend.fail_key("ks/a.txt");
    }
    sync.mark_dirty();

    assert!(sync.flush_if_needed(false).is_failure());
    assert!(sync.is_dirty());
    assert_eq!(sync.status().last_known_digest, synced);

    backend.set_offline(false);
    backend.clear_failures();
    assert!(matches!(sync.flush_if_needed(false), FlushOutcome::Flushed(_)));
    assert!(!sync.is_dirty());
    assert_eq!(
        backend.object("ks/a.txt"),
        Some(b"a different length".to_vec())
    );
}

#[test]
fn prune_failure_counts_as_failed_flush() {
    let local = populated();
    let backend = MemoryBackend::new();
    for i in 0..3 {
        backend.insert(&format!("ks/old/{i}"), vec![0]);
    }
    let remote = RemoteStore::new(Arc::new(RejectingDeletes(backend.clone())), Keyspace::new(PREFIX));
    let sync = SyncCoordinator::new(local.path(), Some(remote), Duration::ZERO);
    sync.skip_restore();

    assert!(sync.flush().is_failure());
    assert!(sync.is_dirty());
    assert_eq!(sync.status().last_known_digest, None);
    // Data and manifest were written before the prune step.
    assert!(backend.object("ks.manifest.json").is_some());
}

#[cfg(unix)]
#[test]
fn unreadable_directory_is_not_pruned() {
    use std::os::unix::fs::PermissionsExt;

    let local = populated();
    let backend = MemoryBackend::new();
    let sync = coordinator(local.path(), &backend, Duration::ZERO);
    sync.skip_restore();
    assert!(matches!(sync.flush(), FlushOutcome::Flushed(_)));
    let synced = sync.status().last_known_digest;
    let manifest_before = backend.object("ks.manifest.json");

    let locked = local.path().join("b");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("chmod");
    if fs::read_dir(&locked).is_ok() {
        // Mode bits do not apply to this user.
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("chmod");
        return;
    }
    sync.mark_dirty();
    let outcome = sync.flush();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).expect("chmod");

    assert!(outcome.is_failure(), "{outcome:?}");
    assert!(sync.is_dirty());
    assert_eq!(sync.status().last_known_digest, synced);
    assert_eq!(backend.object("ks/b/c.txt"), Some(b"world!".to_vec()));
    assert_eq!(backend.object("ks.manifest.json"), manifest_before);

    assert!(matches!(sync.flush(), FlushOutcome::Flushed(_)));
    assert!(!sync.is_dirty());
}

/// Memory store whose batch deletes always fail.
struct RejectingDeletes(MemoryBackend);

impl ObjectBackend for RejectingDeletes {
    fn name(&self) -> &str {
        "rejecting"
    }
    fn check_reachable(&self) -> Result<(), ballast_store::StoreError> {
        self.0.check_reachable()
    }
    fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ballast_store::ListPage, ballast_store::StoreError> {
        self.0.list_page(prefix, continuation)
    }
    fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, ballast_store::StoreError> {
        self.0.get_object(key)
    }
    fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), ballast_store::StoreError> {
        self.0.put_object(key, body, content_type)
    }
    fn delete_batch(&self, _keys: &[String]) -> Result<(), ballast_store::StoreError> {
        Err(ballast_store::StoreError::connectivity("delete", "", "rejected"))
    }
}

#[test]
fn concurrent_mark_dirty_is_never_lost() {
    let local = populated();
    let backend = MemoryBackend::new();
    let sync = Arc::new(coordinator(local.path(), &backend, Duration::ZERO));
    sync.skip_restore();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let sync = Arc::clone(&sync);
            thread::spawn(move || {
                for _ in 0..1000 {
                    sync.mark_dirty();
                }
            })
        })
        .collect();
    let flusher = {
        let sync = Arc::clone(&sync);
        thread::spawn(move || {
            for _ in 0..5 {
                let _ = sync.flush_if_needed(false);
            }
        })
    };
    for handle in handles {
        handle.join().expect("marker thread");
    }
    flusher.join().expect("flusher thread");

    sync.mark_dirty();
    assert!(sync.is_dirty());
    assert!(!matches!(sync.flush_if_needed(false), FlushOutcome::Clean));
}
