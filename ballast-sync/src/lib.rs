//! # ballast-sync
//!
//! Content-addressed sync between a local directory and a remote object
//! namespace.
//!
//! - [`digest`] hashes a tree into one [`ballast_core::Digest`]
//! - [`manifest`] reads and writes the remote digest descriptor
//! - [`SyncCoordinator`] owns the restore / dirty / flush state machine
//!
//! Hosts call [`SyncCoordinator::ensure_local_copy`] once at startup,
//! [`SyncCoordinator::mark_dirty`] after every local mutation,
//! [`SyncCoordinator::flush_if_needed`] on a timer and
//! [`SyncCoordinator::flush`] at shutdown.

pub mod coordinator;
pub mod digest;
pub mod error;
pub mod manifest;

pub use coordinator::{
    FlushOutcome, FlushReport, RestoreOutcome, RestoreReport, SyncCoordinator, SyncStatus,
};
pub use digest::DirectorySnapshot;
pub use error::{DataError, SyncError};
pub use manifest::Manifest;
