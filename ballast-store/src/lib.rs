//! # ballast-store
//!
//! Remote object store abstraction.
//!
//! [`ObjectBackend`] is the raw capability (list page / get / put / batch
//! delete / reachability). [`RemoteStore`] layers the configured key
//! namespace on top and is what the sync engine talks to.

pub mod backend;
pub mod directory;
pub mod error;
pub mod keyspace;
pub mod memory;
pub mod remote;
pub mod s3;

pub use backend::{list_objects, ListPage, ObjectBackend, ObjectListing};
pub use directory::DirectoryBackend;
pub use error::StoreError;
pub use keyspace::Keyspace;
pub use memory::{MemoryBackend, RequestCounts};
pub use remote::{open_backend, RemoteStore};
pub use s3::S3Backend;
