//! Object store backed by a plain directory (local disk or a network mount).
//!
//! Key `a/b/c` lives at `<base>/a/b/c`. Writes use the same `.tmp` + rename
//! pattern as the local restore path, so readers never observe a torn object.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use ballast_core::{ObjectInfo, RelPath, TEMP_SUFFIX};
use walkdir::WalkDir;

use crate::backend::{ListPage, ObjectBackend};
use crate::error::StoreError;

#[derive(Debug, Clone)]
pub struct DirectoryBackend {
    base: PathBuf,
    page_size: usize,
}

impl DirectoryBackend {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            page_size: 1000,
        }
    }

    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn object_path(&self, op: &'static str, key: &str) -> Result<PathBuf, StoreError> {
        RelPath::parse(key)
            .map(|rel| rel.to_path(&self.base))
            .ok_or_else(|| StoreError::connectivity(op, key, "key is not a valid object path"))
    }

    fn all_keys(&self) -> Result<Vec<(String, u64)>, StoreError> {
        let mut keys = Vec::new();
        for entry in WalkDir::new(&self.base).follow_links(false) {
            let entry = entry.map_err(|e| StoreError::connectivity("list", "", e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.base) else {
                continue;
            };
            let Some(rel) = RelPath::from_relative(relative) else {
                tracing::warn!(path = %entry.path().display(), "skipping non-UTF-8 object path");
                continue;
            };
            if rel.as_str().ends_with(TEMP_SUFFIX) {
                continue;
            }
            let size = entry
                .metadata()
                .map_err(|e| StoreError::connectivity("list", rel.as_str(), e))?
                .len();
            keys.push((String::from(rel), size));
        }
        keys.sort();
        Ok(keys)
    }

    /// Remove now-empty parent directories of `path`, stopping at the base.
    fn prune_empty_parents(&self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.base.as_path() || !dir.starts_with(&self.base) {
                break;
            }
            if fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

impl ObjectBackend for DirectoryBackend {
    fn name(&self) -> &str {
        "dir"
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        match fs::metadata(&self.base) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StoreError::Configuration(format!(
                "{} is not a directory",
                self.base.display()
            ))),
            Err(err) => Err(StoreError::Configuration(format!(
                "unable to access {}: {err}",
                self.base.display()
            ))),
        }
    }

    fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        let mut matching = self
            .all_keys()?
            .into_iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| continuation.map_or(true, |after| key.as_str() > after))
            .map(|(key, size)| ObjectInfo { key, size });

        let objects: Vec<ObjectInfo> = matching.by_ref().take(self.page_size).collect();
        let next = if matching.next().is_some() {
            objects.last().map(|o| o.key.clone())
        } else {
            None
        };
        Ok(ListPage { objects, next })
    }

    fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.object_path("get", key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::connectivity("get", key, err)),
        }
    }

    fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        let path = self.object_path("put", key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::connectivity("put", key, e))?;
        }
        let tmp = PathBuf::from(format!("{}{TEMP_SUFFIX}", path.display()));
        fs::write(&tmp, &body).map_err(|e| StoreError::connectivity("put", key, e))?;
        if let Err(err) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::connectivity("put", key, err));
        }
        Ok(())
    }

    fn delete_batch(&self, keys: &[String]) -> Result<(), StoreError> {
        for key in keys {
            let path = self.object_path("delete", key)?;
            match fs::remove_file(&path) {
                Ok(()) => self.prune_empty_parents(&path),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(StoreError::connectivity("delete", key, err)),
            }
        }
        Ok(())
    }
}
