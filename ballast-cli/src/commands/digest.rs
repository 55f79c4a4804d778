//! `ballast digest`: content digest of a local directory, no remote access.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use ballast_core::Digest;
use ballast_sync::digest;

#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Directory to hash (default: the configured root).
    pub path: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct DigestJson {
    root: String,
    exists: bool,
    digest: Digest,
    file_count: usize,
    total_bytes: u64,
}

impl DigestArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        let root = match self.path {
            Some(path) => path,
            None => super::load_config(config_path)?.root,
        };

        let payload = match digest::snapshot(&root) {
            Some(snapshot) => DigestJson {
                root: root.display().to_string(),
                exists: true,
                digest: snapshot.digest().clone(),
                file_count: snapshot.file_count(),
                total_bytes: snapshot.total_bytes(),
            },
            None => DigestJson {
                root: root.display().to_string(),
                exists: false,
                digest: Digest::empty(),
                file_count: 0,
                total_bytes: 0,
            },
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to render digest JSON")?
            );
        } else {
            println!("{}  {} ({} files)", payload.digest, payload.root, payload.file_count);
        }
        Ok(())
    }
}
