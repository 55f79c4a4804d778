//! `ballast status`: local digest against the remote manifest.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use ballast_core::{Digest, SyncConfig};
use ballast_store::RemoteStore;
use ballast_sync::{digest, manifest, Manifest};

/// Arguments for `ballast status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
enum SyncState {
    Disabled,
    InSync,
    Differs,
    NoManifest,
}

impl SyncState {
    fn label(self) -> &'static str {
        match self {
            SyncState::Disabled => "disabled",
            SyncState::InSync => "in-sync",
            SyncState::Differs => "differs",
            SyncState::NoManifest => "no-manifest",
        }
    }
}

#[derive(Serialize)]
struct StatusReport {
    root: String,
    provider: String,
    backend: Option<String>,
    prefix: String,
    state: SyncState,
    local: LocalSide,
    remote: Option<RemoteSide>,
}

#[derive(Serialize)]
struct LocalSide {
    exists: bool,
    digest: Digest,
    file_count: usize,
    total_bytes: u64,
}

#[derive(Serialize)]
struct RemoteSide {
    digest: Digest,
    file_count: u64,
    generated_at: Option<String>,
    #[serde(skip)]
    age: Option<String>,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "")]
    side: &'static str,
    #[tabled(rename = "digest")]
    digest: String,
    #[tabled(rename = "files")]
    files: String,
    #[tabled(rename = "detail")]
    detail: String,
}

impl StatusArgs {
    pub fn run(self, config_path: Option<&Path>) -> Result<()> {
        ballast_daemon::init_tracing();
        let config = super::load_config(config_path)?;
        let remote = RemoteStore::connect(&config).context("failed to open remote store")?;

        let report = build_report(&config, remote.as_ref());
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to render status JSON")?
            );
            return Ok(());
        }

        print_table(&report);
        Ok(())
    }
}

fn build_report(config: &SyncConfig, remote: Option<&RemoteStore>) -> StatusReport {
    let local = match digest::snapshot(&config.root) {
        Some(snapshot) => LocalSide {
            exists: true,
            digest: snapshot.digest().clone(),
            file_count: snapshot.file_count(),
            total_bytes: snapshot.total_bytes(),
        },
        None => LocalSide {
            exists: false,
            digest: Digest::empty(),
            file_count: 0,
            total_bytes: 0,
        },
    };

    let remote_side = remote.and_then(manifest::fetch).map(describe_manifest);
    let state = match (remote, &remote_side) {
        (None, _) => SyncState::Disabled,
        (Some(_), None) => SyncState::NoManifest,
        (Some(_), Some(side)) if side.digest == local.digest => SyncState::InSync,
        (Some(_), Some(_)) => SyncState::Differs,
    };

    StatusReport {
        root: config.root.display().to_string(),
        provider: config.remote.provider().to_string(),
        backend: remote.map(|r| r.backend().name().to_string()),
        prefix: config.prefix.clone(),
        state,
        local,
        remote: remote_side,
    }
}

fn describe_manifest(manifest: Manifest) -> RemoteSide {
    let generated = manifest.generated_at_utc();
    RemoteSide {
        generated_at: generated.map(|at| at.to_rfc3339()),
        age: generated.map(format_age),
        digest: manifest.digest,
        file_count: manifest.file_count,
    }
}

fn format_age(at: DateTime<Utc>) -> String {
    let secs = Utc::now().signed_duration_since(at).num_seconds().max(0);
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

fn print_table(report: &StatusReport) {
    let mut rows = vec![StatusRow {
        side: "local",
        digest: report.local.digest.short().to_string(),
        files: report.local.file_count.to_string(),
        detail: if report.local.exists {
            report.root.clone()
        } else {
            format!("{} (missing)", report.root)
        },
    }];
    match &report.remote {
        Some(remote) => rows.push(StatusRow {
            side: "remote",
            digest: remote.digest.short().to_string(),
            files: remote.file_count.to_string(),
            detail: match (&remote.generated_at, &remote.age) {
                (Some(at), Some(age)) => format!("{at} ({age})"),
                _ => "-".to_string(),
            },
        }),
        None => rows.push(StatusRow {
            side: "remote",
            digest: "-".to_string(),
            files: "-".to_string(),
            detail: format!("{} / {}", report.provider, report.prefix),
        }),
    }

    println!("{}", Table::new(rows).with(Style::rounded()));

    let state = match report.state {
        SyncState::InSync => report.state.label().green(),
        SyncState::Differs => report.state.label().yellow(),
        SyncState::NoManifest => report.state.label().yellow(),
        SyncState::Disabled => report.state.label().dimmed(),
    };
    println!("state: {state}");
}
