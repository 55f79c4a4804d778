//! Backend capability trait and lazy paginated listing.

use std::fmt;

use ballast_core::ObjectInfo;

use crate::error::StoreError;

/// Most stores cap both listing pages and batch deletes at 1000 keys.
pub const DEFAULT_MAX_DELETE_BATCH: usize = 1000;

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub objects: Vec<ObjectInfo>,
    /// Opaque token for the following page; `None` on the last page.
    pub next: Option<String>,
}

/// A flat key/value object store.
///
/// Implementations are synchronous; every call is one round trip. "Not
/// found" is `Ok(None)`, never an error.
pub trait ObjectBackend: Send + Sync {
    /// Short provider label for logs.
    fn name(&self) -> &str;

    /// Verify credentials and the target container. Called once at startup;
    /// failures are [`StoreError::Configuration`].
    fn check_reachable(&self) -> Result<(), StoreError>;

    /// Fetch one page of keys starting with `prefix`.
    fn list_page(&self, prefix: &str, continuation: Option<&str>)
        -> Result<ListPage, StoreError>;

    fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Create or overwrite `key`.
    fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Delete up to [`ObjectBackend::max_delete_batch`] keys in one request.
    /// Missing keys are not an error.
    fn delete_batch(&self, keys: &[String]) -> Result<(), StoreError>;

    fn max_delete_batch(&self) -> usize {
        DEFAULT_MAX_DELETE_BATCH
    }
}

impl fmt::Debug for dyn ObjectBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectBackend({})", self.name())
    }
}

/// Lazily list every object under `prefix`, fetching pages on demand.
pub fn list_objects<'a>(backend: &'a dyn ObjectBackend, prefix: &str) -> ObjectListing<'a> {
    ObjectListing {
        backend,
        prefix: prefix.to_string(),
        buffered: Vec::new().into_iter(),
        continuation: None,
        done: false,
        pages: 0,
    }
}

/// Iterator returned by [`list_objects`].
///
/// Yields `Err` at most once; iteration stops after an error.
pub struct ObjectListing<'a> {
    backend: &'a dyn ObjectBackend,
    prefix: String,
    buffered: std::vec::IntoIter<ObjectInfo>,
    continuation: Option<String>,
    done: bool,
    pages: usize,
}

impl ObjectListing<'_> {
    /// Number of list requests issued so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }
}

impl Iterator for ObjectListing<'_> {
    type Item = Result<ObjectInfo, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(object) = self.buffered.next() {
                return Some(Ok(object));
            }
            if self.done {
                return None;
            }

            self.pages += 1;
            match self
                .backend
                .list_page(&self.prefix, self.continuation.as_deref())
            {
                Ok(page) => {
                    self.buffered = page.objects.into_iter();
                    self.continuation = page.next;
                    if self.continuation.is_none() {
                        self.done = true;
                    }
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    #[test]
    fn listing_follows_continuation_tokens_across_pages() {
        let backend = MemoryBackend::new().with_page_size(2);
        for i in 0..5 {
            backend.insert(&format!("p/file-{i}"), vec![0; i]);
        }
        backend.insert("other/file", vec![1]);

        let mut listing = list_objects(&backend, "p/");
        let keys: Vec<String> = listing
            .by_ref()
            .map(|r| r.expect("list").key)
            .collect();
        assert_eq!(
            keys,
            ["p/file-0", "p/file-1", "p/file-2", "p/file-3", "p/file-4"]
        );
        assert_eq!(listing.pages_fetched(), 3);
        assert_eq!(backend.counts().lists, 3);
    }

    #[test]
    fn listing_is_lazy() {
        let backend = MemoryBackend::new().with_page_size(2);
        for i in 0..6 {
            backend.insert(&format!("p/{i}"), vec![]);
        }
        let first = list_objects(&backend, "p/").next();
        assert!(matches!(first, Some(Ok(_))));
        assert_eq!(backend.counts().lists, 1, "only the first page is fetched");
    }

    #[test]
    fn listing_stops_after_error() {
        let backend = MemoryBackend::new();
        backend.insert("p/a", vec![1]);
        backend.set_offline(true);

        let mut listing = list_objects(&backend, "p/");
        assert!(matches!(listing.next(), Some(Err(StoreError::Connectivity { .. }))));
        assert!(listing.next().is_none());
    }

    #[test]
    fn empty_prefix_yields_nothing() {
        let backend = MemoryBackend::new();
        assert_eq!(list_objects(&backend, "p/").count(), 0);
    }
}
