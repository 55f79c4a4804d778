//! Directory digest: one SHA-256 over every `(path, content hash)` pair.
//!
//! ```text
//! digest = sha256( for each file in sorted path order:
//!                    relative_path_bytes || 0x00 || hex(sha256(file bytes)) )
//! ```
//!
//! Paths are root-relative with `/` separators and sorted segment by
//! segment, so the result does not depend on walk order or host OS.
//! Modification times are not part of the input.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use ballast_core::{Digest, FileEntry, RelPath, TEMP_SUFFIX};
use sha2::{Digest as _, Sha256};
use walkdir::WalkDir;

use crate::error::DataError;

/// Files are hashed in chunks of this size; never buffered whole.
const CHUNK_SIZE: usize = 1024 * 1024;

/// Every regular file under a root at one point in time.
///
/// Entries are sorted in digest order. Nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySnapshot {
    root: PathBuf,
    entries: Vec<FileEntry>,
    digest: Digest,
    skipped: Vec<PathBuf>,
}

impl DirectorySnapshot {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn digest(&self) -> &Digest {
        &self.digest
    }

    pub fn file_count(&self) -> usize {
        self.entries.len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    /// Root-relative files and directories that could not be read.
    ///
    /// Their remote copies are neither current nor stale; the digest does
    /// not cover them.
    pub fn skipped(&self) -> &[PathBuf] {
        &self.skipped
    }

    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Hash `root` into a [`DirectorySnapshot`].
///
/// Returns `None` when `root` does not exist (or is not a directory).
/// Unreadable files and directories are logged, left out of the digest and
/// listed in [`DirectorySnapshot::skipped`]. Symlinks are not followed.
pub fn snapshot(root: &Path) -> Option<DirectorySnapshot> {
    snapshot_with(root, hash_file)
}

pub(crate) fn snapshot_with<F>(root: &Path, mut hash: F) -> Option<DirectorySnapshot>
where
    F: FnMut(&Path) -> Result<(String, u64), DataError>,
{
    if !root.is_dir() {
        return None;
    }

    let relative = |path: &Path| path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let mut entries = Vec::new();
    let mut skipped = Vec::new();
    for item in WalkDir::new(root).follow_links(false) {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                skipped.push(relative(&path));
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::new(ErrorKind::Other, "walk error"));
                let err = DataError::UnreadableFile { path, source };
                tracing::warn!(error = %err, "skipping during digest");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(rel) = path.strip_prefix(root).ok().and_then(RelPath::from_relative) else {
            // No remote key can name it, so nothing remote needs protecting.
            let err = DataError::NonUtf8Path {
                path: path.to_path_buf(),
            };
            tracing::warn!(error = %err, "skipping during digest");
            continue;
        };
        if rel.as_str().ends_with(TEMP_SUFFIX) {
            continue;
        }
        match hash(path) {
            Ok((content_hash, size)) => entries.push(FileEntry {
                path: rel,
                size,
                content_hash,
            }),
            Err(err) => {
                tracing::warn!(error = %err, "skipping during digest");
                skipped.push(relative(path));
            }
        }
    }

    entries.sort_by(|a, b| path_order(&a.path, &b.path));
    skipped.sort();
    let digest = fold(&entries);
    Some(DirectorySnapshot {
        root: root.to_path_buf(),
        entries,
        digest,
        skipped,
    })
}

/// Digest of `root`, or [`Digest::empty`] when it does not exist.
pub fn compute(root: &Path) -> Digest {
    snapshot(root)
        .map(|s| s.digest)
        .unwrap_or_else(Digest::empty)
}

/// Stream a file through SHA-256. Returns the hex hash and the bytes read.
pub fn hash_file(path: &Path) -> Result<(String, u64), DataError> {
    let unreadable = |source| DataError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(unreadable)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut size = 0u64;
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(unreadable(err)),
        };
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok((hex::encode(hasher.finalize()), size))
}

/// Segment-wise ordering: `a/x` sorts before `a.txt` because `a` < `a.txt`.
fn path_order(a: &RelPath, b: &RelPath) -> std::cmp::Ordering {
    a.as_str().split('/').cmp(b.as_str().split('/'))
}

fn fold(entries: &[FileEntry]) -> Digest {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.path.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(entry.content_hash.as_bytes());
    }
    Digest(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, SystemTime};

    use filetime::{set_file_mtime, FileTime};
    use sha2::Digest as _;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn scenario_tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.txt", b"hello");
        write(tmp.path(), "b/c.txt", b"world!");
        tmp
    }

    #[test]
    fn known_digest_for_scenario_tree() {
        let tmp = scenario_tree();
        assert_eq!(
            compute(tmp.path()).as_str(),
            "5316228123168b290a34001cabebf26b49f0eacfdd2a7404f611a770754a004e"
        );
    }

    #[test]
    fn missing_root_is_empty_sentinel() {
        let tmp = TempDir::new().unwrap();
        assert!(compute(&tmp.path().join("absent")).is_empty());
        assert!(snapshot(&tmp.path().join("absent")).is_none());
    }

    #[test]
    fn empty_directory_is_not_the_sentinel() {
        let tmp = TempDir::new().unwrap();
        let digest = compute(tmp.path());
        assert_eq!(
            digest.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(!digest.is_empty());
    }

    #[test]
    fn snapshot_lists_files_in_digest_order() {
        let tmp = scenario_tree();
        write(tmp.path(), "a/z.bin", b"z");
        let snap = snapshot(tmp.path()).unwrap();
        let paths: Vec<&str> = snap.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["a/z.bin", "a.txt", "b/c.txt"]);
        assert_eq!(snap.file_count(), 3);
        assert_eq!(snap.total_bytes(), 12);
    }

    #[test]
    fn single_byte_change_changes_digest() {
        let tmp = scenario_tree();
        let before = compute(tmp.path());
        write(tmp.path(), "b/c.txt", b"world?");
        assert_ne!(compute(tmp.path()), before);
    }

    #[test]
    fn rename_without_content_change_changes_digest() {
        let tmp = scenario_tree();
        let before = compute(tmp.path());
        fs::rename(tmp.path().join("a.txt"), tmp.path().join("a2.txt")).unwrap();
        assert_ne!(compute(tmp.path()), before);
    }

    #[test]
    fn mtime_only_touch_keeps_digest() {
        let tmp = scenario_tree();
        let before = compute(tmp.path());
        let old = FileTime::from_system_time(SystemTime::now() - Duration::from_secs(3600));
        set_file_mtime(tmp.path().join("a.txt"), old).unwrap();
        assert_eq!(compute(tmp.path()), before);
    }

    #[test]
    fn same_content_in_different_roots_agrees() {
        let first = scenario_tree();
        let second = TempDir::new().unwrap();
        // Reverse creation order.
        write(second.path(), "b/c.txt", b"world!");
        write(second.path(), "a.txt", b"hello");
        assert_eq!(compute(first.path()), compute(second.path()));
    }

    #[test]
    fn temp_files_are_ignored() {
        let tmp = scenario_tree();
        let before = compute(tmp.path());
        write(tmp.path(), &format!("a.txt{TEMP_SUFFIX}"), b"partial");
        assert_eq!(compute(tmp.path()), before);
    }

    #[test]
    fn hash_file_streams_large_content() {
        let tmp = TempDir::new().unwrap();
        let data = vec![7u8; CHUNK_SIZE * 2 + 3];
        write(tmp.path(), "big.bin", &data);
        let (hash, size) = hash_file(&tmp.path().join("big.bin")).unwrap();
        assert_eq!(size, data.len() as u64);
        assert_eq!(hash, hex::encode(Sha256::digest(&data)));
    }

    #[test]
    fn unreadable_file_is_skipped_and_recorded() {
        let tmp = scenario_tree();
        write(tmp.path(), "d/e.txt", b"locked");
        let snap = snapshot_with(tmp.path(), |path| {
            if path.ends_with("d/e.txt") {
                Err(DataError::UnreadableFile {
                    path: path.to_path_buf(),
                    source: std::io::Error::from(ErrorKind::PermissionDenied),
                })
            } else {
                hash_file(path)
            }
        })
        .unwrap();

        let paths: Vec<&str> = snap.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["a.txt", "b/c.txt"]);
        assert_eq!(snap.skipped(), [PathBuf::from("d/e.txt")]);
        assert!(!snap.is_complete());
        assert_eq!(
            snap.digest().as_str(),
            "5316228123168b290a34001cabebf26b49f0eacfdd2a7404f611a770754a004e"
        );
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_recorded() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = scenario_tree();
        let locked = tmp.path().join("b");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let privileged = fs::read_dir(&locked).is_ok();
        let snap = snapshot(tmp.path()).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        if privileged {
            // Mode bits do not apply to this user.
            return;
        }

        let paths: Vec<&str> = snap.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["a.txt"]);
        assert_eq!(snap.skipped(), [PathBuf::from("b")]);
    }

    #[test]
    fn readable_tree_is_complete() {
        let tmp = scenario_tree();
        assert!(snapshot(tmp.path()).unwrap().is_complete());
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed() {
        let tmp = scenario_tree();
        let before = compute(tmp.path());
        std::os::unix::fs::symlink(tmp.path().join("a.txt"), tmp.path().join("link.txt")).unwrap();
        assert_eq!(compute(tmp.path()), before);
    }
}
