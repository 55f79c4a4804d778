//! `ballast push`: one-shot upload of the local root.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use ballast_daemon::flush_payload;
use ballast_sync::FlushOutcome;

use super::{connect, load_config};

#[derive(Args, Debug)]
pub struct PushArgs {
    /// Emit the flush summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl PushArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        ballast_daemon::init_tracing();
        let config = load_config(config_path)?;
        let coordinator = connect(&config)?;

        // The local tree is authoritative; nothing is downloaded first.
        coordinator.skip_restore();
        let outcome = coordinator.flush();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&flush_payload(&outcome))
                    .context("failed to render flush JSON")?
            );
        }

        match outcome {
            FlushOutcome::Flushed(report) => {
                if !self.json {
                    println!(
                        "{} {} files ({}): {} uploaded, {} skipped, {} deleted",
                        "pushed".green(),
                        report.file_count,
                        report.digest.short(),
                        report.uploaded,
                        report.skipped,
                        report.deleted,
                    );
                }
                Ok(())
            }
            FlushOutcome::RootMissing => {
                anyhow::bail!("local root does not exist: {}", config.root.display())
            }
            FlushOutcome::Failed(error) => anyhow::bail!("push failed: {error}"),
            other => anyhow::bail!("push did not run: {}", other.label()),
        }
    }
}
