//! Remote manifest: the last-synced digest, stored at the reserved key.
//!
//! Wire form is compact JSON with sorted keys, e.g.
//! `{"digest":"5316…","file_count":2,"generated_at":1718000000.25,"version":1}`.

use ballast_core::Digest;
use ballast_store::RemoteStore;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DataError;

pub const MANIFEST_VERSION: u32 = 1;

fn default_version() -> u32 {
    MANIFEST_VERSION
}

/// Fields are declared in key order so serialization is already sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub digest: Digest,
    #[serde(default)]
    pub file_count: u64,
    /// Unix timestamp in seconds, fractional.
    #[serde(default)]
    pub generated_at: f64,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl Manifest {
    /// Manifest for `digest`, stamped with the current time.
    pub fn new(digest: Digest, file_count: u64) -> Self {
        Self {
            digest,
            file_count,
            generated_at: Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            version: MANIFEST_VERSION,
        }
    }

    /// Canonical bytes: compact, keys sorted.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Value objects are BTreeMap-backed, so keys come out sorted.
        serde_json::json!({
            "digest": self.digest.as_str(),
            "file_count": self.file_count,
            "generated_at": self.generated_at,
            "version": self.version,
        })
        .to_string()
        .into_bytes()
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, DataError> {
        let manifest: Manifest = serde_json::from_slice(bytes)
            .map_err(|e| DataError::MalformedManifest(e.to_string()))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(DataError::MalformedManifest(format!(
                "unsupported version {}",
                manifest.version
            )));
        }
        Ok(manifest)
    }

    pub fn generated_at_utc(&self) -> Option<DateTime<Utc>> {
        let secs = self.generated_at.trunc() as i64;
        let nanos = (self.generated_at.fract() * 1e9) as u32;
        Utc.timestamp_opt(secs, nanos).single()
    }
}

/// Serialize a fresh manifest for `digest`.
pub fn build(digest: &Digest, file_count: u64) -> Vec<u8> {
    Manifest::new(digest.clone(), file_count).to_bytes()
}

/// Fetch and parse the remote manifest.
///
/// Absent, unreachable and unparsable all resolve to `None`; the caller
/// falls back to a full reconciliation.
pub fn fetch(remote: &RemoteStore) -> Option<Manifest> {
    let key = remote.keyspace().manifest_key();
    match remote.get_manifest() {
        Ok(Some(bytes)) => match Manifest::parse(&bytes) {
            Ok(manifest) => Some(manifest),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "ignoring remote manifest");
                None
            }
        },
        Ok(None) => {
            tracing::debug!(key = %key, "no remote manifest");
            None
        }
        Err(err) => {
            tracing::warn!(key = %key, error = %err, "manifest fetch failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ballast_store::{Keyspace, MemoryBackend};

    fn remote(backend: &MemoryBackend) -> RemoteStore {
        RemoteStore::new(Arc::new(backend.clone()), Keyspace::new("ks"))
    }

    #[test]
    fn bytes_are_compact_with_sorted_keys() {
        let manifest = Manifest {
            digest: Digest::from("abc"),
            file_count: 2,
            generated_at: 1_700_000_000.5,
            version: 1,
        };
        assert_eq!(
            String::from_utf8(manifest.to_bytes()).unwrap(),
            r#"{"digest":"abc","file_count":2,"generated_at":1700000000.5,"version":1}"#
        );
    }

    #[test]
    fn build_then_parse_keeps_digest_and_count() {
        let bytes = build(&Digest::from("d1"), 7);
        let parsed = Manifest::parse(&bytes).unwrap();
        assert_eq!(parsed.digest, Digest::from("d1"));
        assert_eq!(parsed.file_count, 7);
        assert!(parsed.generated_at > 0.0);
        assert!(parsed.generated_at_utc().is_some());
    }

    #[test]
    fn parse_tolerates_missing_optional_fields() {
        let parsed = Manifest::parse(br#"{"digest":"d"}"#).unwrap();
        assert_eq!(parsed.version, MANIFEST_VERSION);
        assert_eq!(parsed.file_count, 0);
    }

    #[test]
    fn parse_rejects_garbage_and_future_versions() {
        assert!(matches!(
            Manifest::parse(b"not json"),
            Err(DataError::MalformedManifest(_))
        ));
        assert!(Manifest::parse(br#"{"digest":"d","version":2}"#).is_err());
    }

    #[test]
    fn fetch_never_fails() {
        let backend = MemoryBackend::new();
        assert_eq!(fetch(&remote(&backend)), None);

        backend.insert("ks.manifest.json", b"{broken".to_vec());
        assert_eq!(fetch(&remote(&backend)), None);

        backend.insert("ks.manifest.json", build(&Digest::from("d"), 1));
        assert_eq!(fetch(&remote(&backend)).map(|m| m.digest), Some(Digest::from("d")));

        backend.set_offline(true);
        assert_eq!(fetch(&remote(&backend)), None);
    }
}
