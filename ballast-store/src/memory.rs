//! In-process object store.
//!
//! Used by tests and embedders that want the sync engine without a network.
//! Counts every request so callers can assert on round trips, and can be
//! told to fail to exercise retry paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ballast_core::ObjectInfo;
use parking_lot::RwLock;

use crate::backend::{ListPage, ObjectBackend, DEFAULT_MAX_DELETE_BATCH};
use crate::error::StoreError;

/// Snapshot of request counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounts {
    pub lists: usize,
    pub gets: usize,
    pub puts: usize,
    pub deletes: usize,
}

impl RequestCounts {
    pub fn total(&self) -> usize {
        self.lists + self.gets + self.puts + self.deletes
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    body: Vec<u8>,
    content_type: Option<String>,
}

struct Inner {
    objects: BTreeMap<String, StoredObject>,
    page_size: usize,
    max_delete_batch: usize,
    offline: bool,
    failing: HashSet<String>,
}

#[derive(Default)]
struct Counters {
    lists: AtomicUsize,
    gets: AtomicUsize,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

/// Cheap to clone; clones share the same objects and counters.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<RwLock<Inner>>,
    counters: Arc<Counters>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                objects: BTreeMap::new(),
                page_size: 1000,
                max_delete_batch: DEFAULT_MAX_DELETE_BATCH,
                offline: false,
                failing: HashSet::new(),
            })),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Cap listing pages at `size` keys (minimum 1).
    pub fn with_page_size(self, size: usize) -> Self {
        self.inner.write().page_size = size.max(1);
        self
    }

    pub fn with_max_delete_batch(self, size: usize) -> Self {
        self.inner.write().max_delete_batch = size.max(1);
        self
    }

    /// While offline every request fails with a connectivity error.
    pub fn set_offline(&self, offline: bool) {
        self.inner.write().offline = offline;
    }

    /// Make every get/put of `key` fail until [`MemoryBackend::clear_failures`].
    pub fn fail_key(&self, key: &str) {
        self.inner.write().failing.insert(key.to_string());
    }

    pub fn clear_failures(&self) {
        self.inner.write().failing.clear();
    }

    /// Seed an object without counting a request.
    pub fn insert(&self, key: &str, body: Vec<u8>) {
        self.inner.write().objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: None,
            },
        );
    }

    /// Read an object without counting a request.
    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.read().objects.get(key).map(|o| o.body.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.inner
            .read()
            .objects
            .get(key)
            .and_then(|o| o.content_type.clone())
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().objects.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> RequestCounts {
        RequestCounts {
            lists: self.counters.lists.load(Ordering::Relaxed),
            gets: self.counters.gets.load(Ordering::Relaxed),
            puts: self.counters.puts.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
        }
    }

    pub fn reset_counts(&self) {
        self.counters.lists.store(0, Ordering::Relaxed);
        self.counters.gets.store(0, Ordering::Relaxed);
        self.counters.puts.store(0, Ordering::Relaxed);
        self.counters.deletes.store(0, Ordering::Relaxed);
    }

    fn ensure_online(&self, op: &'static str, key: &str) -> Result<(), StoreError> {
        if self.inner.read().offline {
            return Err(StoreError::connectivity(op, key, "memory backend offline"));
        }
        Ok(())
    }

    fn ensure_not_failing(&self, op: &'static str, key: &str) -> Result<(), StoreError> {
        if self.inner.read().failing.contains(key) {
            return Err(StoreError::connectivity(op, key, "injected failure"));
        }
        Ok(())
    }
}

impl ObjectBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.inner.read().offline {
            return Err(StoreError::Configuration(
                "memory backend offline".to_string(),
            ));
        }
        Ok(())
    }

    fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        self.counters.lists.fetch_add(1, Ordering::Relaxed);
        self.ensure_online("list", prefix)?;

        let g = self.inner.read();
        let mut objects = Vec::new();
        let mut next = None;
        let candidates = g
            .objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| continuation.map_or(true, |after| key.as_str() > after));
        for (key, object) in candidates {
            if objects.len() == g.page_size {
                next = objects.last().map(|o: &ObjectInfo| o.key.clone());
                break;
            }
            objects.push(ObjectInfo {
                key: key.clone(),
                size: object.body.len() as u64,
            });
        }
        Ok(ListPage { objects, next })
    }

    fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.counters.gets.fetch_add(1, Ordering::Relaxed);
        self.ensure_online("get", key)?;
        self.ensure_not_failing("get", key)?;
        Ok(self.object(key))
    }

    fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StoreError> {
        self.counters.puts.fetch_add(1, Ordering::Relaxed);
        self.ensure_online("put", key)?;
        self.ensure_not_failing("put", key)?;
        self.inner.write().objects.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(())
    }

    fn delete_batch(&self, keys: &[String]) -> Result<(), StoreError> {
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        let first = keys.first().map(String::as_str).unwrap_or_default();
        self.ensure_online("delete", first)?;

        let mut g = self.inner.write();
        if keys.len() > g.max_delete_batch {
            return Err(StoreError::connectivity(
                "delete",
                first,
                format!("batch of {} exceeds limit {}", keys.len(), g.max_delete_batch),
            ));
        }
        for key in keys {
            g.objects.remove(key);
        }
        Ok(())
    }

    fn max_delete_batch(&self) -> usize {
        self.inner.read().max_delete_batch
    }
}
