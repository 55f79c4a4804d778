//! `ballast daemon`: background sync lifecycle over the control socket.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;

use ballast_daemon::paths::socket_path;
use ballast_daemon::{request_flush, request_status, request_stop, start_blocking, DaemonError};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the daemon in the foreground (restore, watch, flush, serve).
    Start,
    /// Request graceful shutdown; the daemon flushes before exiting.
    Stop,
    /// Query daemon runtime status.
    Status,
    /// Ask the running daemon to flush now.
    Flush,
}

pub fn run(command: DaemonCommand, config_path: Option<&Path>) -> Result<()> {
    let home = dirs::home_dir().context("no home directory for ~/.ballast")?;

    match command {
        DaemonCommand::Start => {
            let config = super::load_config(config_path)?;
            start_blocking(&home, config).context("daemon exited with error")?;
        }
        DaemonCommand::Stop => match request_stop(&home) {
            Ok(()) => println!("stop sent; the daemon flushes once more before exiting"),
            Err(DaemonError::DaemonNotRunning { socket }) => {
                println!("no daemon running ({})", socket.display());
            }
            Err(err) => return Err(err).context("could not reach the daemon"),
        },
        DaemonCommand::Status => {
            let payload = match request_status(&home) {
                Ok(status) => status,
                Err(DaemonError::DaemonNotRunning { .. }) => serde_json::json!({
                    "running": false,
                    "socket": socket_path(&home).display().to_string(),
                }),
                Err(err) => return Err(err).context("daemon status query failed"),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("status is not valid JSON")?
            );
        }
        DaemonCommand::Flush => {
            let summary = request_flush(&home).context("daemon flush failed")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&summary)
                    .context("failed to render flush JSON")?
            );
        }
    }

    Ok(())
}
