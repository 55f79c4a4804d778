//! Key namespace for one synchronized tree.
//!
//! ```text
//! <prefix>/<relative_path>    one object per local file
//! <prefix>.manifest.json      reserved manifest, outside the data prefix
//! ```
//!
//! The manifest sits beside the data prefix rather than inside it, so no
//! local file (including one literally named `.manifest.json`) can map onto
//! the manifest key, and a `<prefix>/` listing never returns it.

use ballast_core::{config::normalize_prefix, RelPath};

const MANIFEST_SUFFIX: &str = ".manifest.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyspace {
    prefix: String,
}

impl Keyspace {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: normalize_prefix(prefix),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `<prefix>/`, the listing prefix for data objects.
    pub fn data_prefix(&self) -> String {
        format!("{}/", self.prefix)
    }

    pub fn manifest_key(&self) -> String {
        format!("{}{MANIFEST_SUFFIX}", self.prefix)
    }

    pub fn data_key(&self, path: &RelPath) -> String {
        format!("{}/{}", self.prefix, path)
    }

    /// Inverse of [`Keyspace::data_key`].
    ///
    /// `None` for keys outside the data prefix, directory markers, and
    /// suffixes that are not safe relative paths.
    pub fn relative(&self, key: &str) -> Option<RelPath> {
        let rest = key.strip_prefix(&self.prefix)?.strip_prefix('/')?;
        RelPath::parse(rest)
    }
}
