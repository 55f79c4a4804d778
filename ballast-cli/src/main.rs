//! Ballast: mirror a local directory to a remote object store.
//!
//! # Usage
//!
//! ```text
//! ballast [--config <path>] pull
//! ballast [--config <path>] push [--json]
//! ballast [--config <path>] digest [PATH] [--json]
//! ballast [--config <path>] status [--json]
//! ballast [--config <path>] daemon start|stop|status|flush
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    daemon::DaemonCommand, digest::DigestArgs, pull::PullArgs, push::PushArgs, status::StatusArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "ballast",
    version,
    about = "Keep a local directory mirrored to a remote object store",
    long_about = None,
)]
struct Cli {
    /// Config file (default: ~/.ballast/config.yaml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download the remote copy into the local root.
    Pull(PullArgs),

    /// Upload the local root, treating it as authoritative.
    Push(PushArgs),

    /// Print the content digest of a local directory.
    Digest(DigestArgs),

    /// Compare the local digest with the remote manifest.
    Status(StatusArgs),

    /// Run or control the background sync daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    match cli.command {
        Commands::Pull(args) => args.run(config),
        Commands::Push(args) => args.run(config),
        Commands::Digest(args) => args.run(config),
        Commands::Status(args) => args.run(config),
        Commands::Daemon { command } => commands::daemon::run(command, config),
    }
}
