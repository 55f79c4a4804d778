//! Domain types shared by the store, sync and daemon crates.
//!
//! Remote keys and manifest fields are plain strings; local paths stay
//! `PathBuf`. [`RelPath`] is the only bridge between the two.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Suffix of in-flight temp files written next to their final path.
///
/// Files ending in it are never hashed, uploaded or listed.
pub const TEMP_SUFFIX: &str = ".ballast.tmp";

// ---------------------------------------------------------------------------
// RelPath
// ---------------------------------------------------------------------------

/// Root-relative, `/`-separated path of a file inside the synchronized tree.
///
/// Always non-empty, never absolute, and free of `.`/`..`/empty segments, so
/// joining it onto a root can never escape that root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelPath(String);

impl RelPath {
    /// Parse a POSIX-style relative path, as found in a remote key suffix.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || raw.starts_with('/') || raw.contains('\\') || raw.contains('\0') {
            return None;
        }
        let safe = raw
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
        safe.then(|| Self(raw.to_owned()))
    }

    /// Build from a native path that is already relative to the root.
    ///
    /// Returns `None` for non-UTF-8 names or anything other than plain
    /// path components.
    pub fn from_relative(path: &Path) -> Option<Self> {
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(name) => segments.push(name.to_str()?),
                _ => return None,
            }
        }
        if segments.is_empty() {
            return None;
        }
        Self::parse(&segments.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Native location of this path under `root`.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, seg| acc.join(seg))
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for RelPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RelPath {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("not a safe relative path: '{value}'"))
    }
}

impl From<RelPath> for String {
    fn from(path: RelPath) -> Self {
        path.0
    }
}

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

/// Lowercase hex digest summarizing a whole directory tree.
///
/// The empty string is the sentinel for "no local data" (root missing), which
/// is distinct from the digest of an existing but empty directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Digest(pub String);

impl Digest {
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines and tables.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Digest {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Digest {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// One regular file of the local tree, read fresh from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: RelPath,
    pub size: u64,
    /// SHA-256 of the file bytes, lowercase hex.
    pub content_hash: String,
}

/// One object as reported by a remote listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
