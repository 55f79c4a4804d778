pub mod daemon;
pub mod digest;
pub mod pull;
pub mod push;
pub mod status;

use std::path::Path;

use anyhow::{Context, Result};
use ballast_core::SyncConfig;
use ballast_sync::SyncCoordinator;

pub(crate) fn load_config(explicit: Option<&Path>) -> Result<SyncConfig> {
    SyncConfig::load(explicit).context("failed to load ballast configuration")
}

/// Build a coordinator for a one-shot command; a disabled remote is an error.
pub(crate) fn connect(config: &SyncConfig) -> Result<SyncCoordinator> {
    tracing::debug!(
        provider = %config.remote.provider(),
        root = %config.root.display(),
        prefix = %config.prefix,
        "opening remote store",
    );
    let coordinator =
        SyncCoordinator::from_config(config).context("failed to open remote store")?;
    if !coordinator.is_enabled() {
        anyhow::bail!("remote sync is disabled; set `provider` in the config or BALLAST_PROVIDER");
    }
    Ok(coordinator)
}
