//! `ballast pull`: restore the local root from the remote.

use std::path::Path;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use ballast_sync::RestoreOutcome;

use super::{connect, load_config};

#[derive(Args, Debug)]
pub struct PullArgs {}

impl PullArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        ballast_daemon::init_tracing();
        let config = load_config(config_path)?;
        let coordinator = connect(&config)?;

        match coordinator.ensure_local_copy() {
            RestoreOutcome::UpToDate { digest } => {
                println!("{} {} ({})", "up to date".green(), config.root.display(), digest.short());
            }
            RestoreOutcome::RemoteEmpty => {
                println!("{} nothing to restore", "remote empty".yellow());
            }
            RestoreOutcome::Restored(report) => {
                println!(
                    "{} {} objects listed, {} downloaded, {} skipped, {} failed",
                    "restored".green(),
                    report.listed,
                    report.downloaded,
                    report.skipped,
                    report.failed,
                );
                if report.failed > 0 {
                    anyhow::bail!("{} object(s) could not be restored", report.failed);
                }
            }
            RestoreOutcome::ListFailed(error) => {
                anyhow::bail!("remote listing failed: {error}");
            }
            RestoreOutcome::Disabled | RestoreOutcome::AlreadyInitialized => {}
        }
        Ok(())
    }
}
