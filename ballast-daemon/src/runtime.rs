use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;

use ballast_core::{SyncConfig, TEMP_SUFFIX};
use ballast_sync::{FlushOutcome, RestoreOutcome, SyncCoordinator};

use crate::error::{io_err, DaemonError};
use crate::paths::{ballast_dir, socket_path};
use crate::protocol::{ControlCommand, ControlReply};

/// Cadence and deadlines for one daemon run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// Interval between non-forced flush attempts.
    pub flush_every: Duration,
    /// Upper bound on the final flush at shutdown.
    pub shutdown_timeout: Duration,
}

impl RuntimeSettings {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            flush_every: config.flush_every,
            shutdown_timeout: config.shutdown_timeout,
        }
    }
}

/// Last flush that did something worth reporting.
#[derive(Debug, Clone, Serialize)]
struct FlushRecord {
    outcome: &'static str,
    source: &'static str,
    at_unix: u64,
}

#[derive(Clone)]
struct DaemonContext {
    home: PathBuf,
    coordinator: Arc<SyncCoordinator>,
    last_flush: Arc<RwLock<Option<FlushRecord>>>,
    shutdown_tx: broadcast::Sender<()>,
    started_at_unix: u64,
}

/// Build a multi-thread runtime, run the daemon on it and block until exit.
pub fn start_blocking(home: &Path, config: SyncConfig) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio runtime", e))?;
    let result = runtime.block_on(run(home.to_path_buf(), config));
    // A final flush that overran its deadline may still hold a blocking
    // thread; abandon it instead of waiting.
    runtime.shutdown_timeout(Duration::from_secs(1));
    result
}

/// Build the coordinator from `config` and run until stopped.
///
/// Backend misconfiguration fails here, before anything is served.
pub async fn run(home: PathBuf, config: SyncConfig) -> Result<(), DaemonError> {
    let settings = RuntimeSettings::from_config(&config);
    let coordinator = tokio::task::spawn_blocking(move || SyncCoordinator::from_config(&config))
        .await
        .map_err(|err| DaemonError::Task {
            task: "startup",
            message: err.to_string(),
        })??;
    run_with(home, Arc::new(coordinator), settings).await
}

/// Run the daemon around an existing coordinator.
///
/// Order: restore, then the watcher, flush, control and interrupt tasks.
/// When any of them ends the rest are told to stop, and one forced flush
/// runs under `settings.shutdown_timeout`.
pub async fn run_with(
    home: PathBuf,
    coordinator: Arc<SyncCoordinator>,
    settings: RuntimeSettings,
) -> Result<(), DaemonError> {
    let state_dir = ballast_dir(&home);
    fs::create_dir_all(&state_dir).map_err(|e| io_err(&state_dir, e))?;

    let restore = {
        let coordinator = coordinator.clone();
        tokio::task::spawn_blocking(move || coordinator.ensure_local_copy())
            .await
            .map_err(|err| DaemonError::Task {
                task: "restore",
                message: err.to_string(),
            })?
    };
    log_restore(&restore);

    let (shutdown_tx, _) = broadcast::channel::<()>(16);
    let ctx = DaemonContext {
        home,
        coordinator: coordinator.clone(),
        last_flush: Arc::new(RwLock::new(None)),
        shutdown_tx: shutdown_tx.clone(),
        started_at_unix: now_unix(),
    };

    let watcher = spawn_linked(
        &shutdown_tx,
        watch_root_task(
            coordinator.root().to_path_buf(),
            coordinator.clone(),
            shutdown_tx.subscribe(),
        ),
    );
    let flusher = spawn_linked(
        &shutdown_tx,
        flush_task(ctx.clone(), settings.flush_every, shutdown_tx.subscribe()),
    );
    let control = spawn_linked(
        &shutdown_tx,
        control_server(ctx.clone(), shutdown_tx.subscribe()),
    );
    let interrupt = spawn_linked(&shutdown_tx, wait_for_interrupt(shutdown_tx.subscribe()));

    let (watcher, flusher, control, interrupt) =
        tokio::join!(watcher, flusher, control, interrupt);

    final_flush(&ctx, settings.shutdown_timeout).await;

    for (task, joined) in [
        ("watcher", watcher),
        ("flush", flusher),
        ("control", control),
        ("interrupt", interrupt),
    ] {
        joined.map_err(|err| DaemonError::Task {
            task,
            message: err.to_string(),
        })??;
    }
    Ok(())
}

/// Spawn `task`; when it finishes, for any reason, broadcast shutdown.
fn spawn_linked<F>(shutdown: &broadcast::Sender<()>, task: F) -> JoinHandle<Result<(), DaemonError>>
where
    F: Future<Output = Result<(), DaemonError>> + Send + 'static,
{
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        let result = task.await;
        let _ = shutdown.send(());
        result
    })
}

async fn wait_for_interrupt(mut shutdown_rx: broadcast::Receiver<()>) -> Result<(), DaemonError> {
    tokio::select! {
        _ = shutdown_rx.recv() => Ok(()),
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| io_err("ctrl-c handler", e))?;
            tracing::info!("interrupt received; stopping daemon");
            Ok(())
        }
    }
}

fn log_restore(outcome: &RestoreOutcome) {
    match outcome {
        RestoreOutcome::Disabled => tracing::info!("remote sync disabled; serving local data only"),
        RestoreOutcome::AlreadyInitialized => {}
        RestoreOutcome::UpToDate { digest } => {
            tracing::info!(digest = %digest.short(), "local copy already current")
        }
        RestoreOutcome::RemoteEmpty => tracing::info!("remote is empty; nothing restored"),
        RestoreOutcome::Restored(report) => tracing::info!(
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            "restored local copy",
        ),
        RestoreOutcome::ListFailed(error) => {
            tracing::warn!(error = %error, "restore skipped; continuing with local data")
        }
    }
}

// ---------------------------------------------------------------------------
// Watcher
// ---------------------------------------------------------------------------

async fn watch_root_task(
    root: PathBuf,
    coordinator: Arc<SyncCoordinator>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;

    // FSEvents reports canonical paths (/private/var/... on macOS).
    let mut root = fs::canonicalize(&root).unwrap_or(root);
    let mut root_watched = watch_root(&mut watcher, &root)?;

    loop {
        let event = tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = event_rx.recv() => match event {
                Some(Ok(event)) => event,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "file watcher reported an error");
                    continue;
                }
                None => break,
            },
        };
        if !touches_content(&event.kind) {
            continue;
        }
        if !root_watched && root.is_dir() {
            root = fs::canonicalize(&root).unwrap_or(root);
            root_watched = watch_root(&mut watcher, &root)?;
        }
        if event.paths.iter().any(|path| is_sync_path(path, &root)) {
            tracing::trace!(paths = ?event.paths, "local change");
            coordinator.mark_dirty();
        }
    }

    Ok(())
}

/// Watch `root` recursively, or its nearest existing ancestor until it
/// appears. Returns whether `root` itself is watched.
fn watch_root(watcher: &mut RecommendedWatcher, root: &Path) -> Result<bool, DaemonError> {
    if root.is_dir() {
        watcher.watch(root, RecursiveMode::Recursive)?;
        tracing::debug!(path = %root.display(), "watching sync root");
        return Ok(true);
    }
    if let Some(anchor) = root.ancestors().skip(1).find(|dir| dir.is_dir()) {
        watcher.watch(anchor, RecursiveMode::NonRecursive)?;
        tracing::info!(
            root = %root.display(),
            anchor = %anchor.display(),
            "sync root missing; waiting for it to appear",
        );
    }
    Ok(false)
}

fn touches_content(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

fn is_sync_path(path: &Path, root: &Path) -> bool {
    let own_temp_file = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(TEMP_SUFFIX));
    path.starts_with(root) && !own_temp_file
}

// ---------------------------------------------------------------------------
// Flushing
// ---------------------------------------------------------------------------

async fn flush_task(
    ctx: DaemonContext,
    every: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    // `interval` rejects a zero period.
    let mut ticker = tokio::time::interval(every.max(Duration::from_millis(100)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => return Ok(()),
            _ = ticker.tick() => {
                if let Err(err) = run_flush(&ctx, false, "interval").await {
                    tracing::error!(error = %err, "interval flush did not run");
                }
            }
        }
    }
}

async fn run_flush(
    ctx: &DaemonContext,
    force: bool,
    source: &'static str,
) -> Result<FlushOutcome, DaemonError> {
    let coordinator = ctx.coordinator.clone();
    let outcome = tokio::task::spawn_blocking(move || coordinator.flush_if_needed(force))
        .await
        .map_err(|err| DaemonError::Task {
            task: "flush",
            message: err.to_string(),
        })?;

    if matches!(
        outcome,
        FlushOutcome::Flushed(_) | FlushOutcome::Failed(_) | FlushOutcome::Unchanged
    ) {
        *ctx.last_flush.write().await = Some(FlushRecord {
            outcome: outcome.label(),
            source,
            at_unix: now_unix(),
        });
    }
    Ok(outcome)
}

async fn final_flush(ctx: &DaemonContext, deadline: Duration) {
    match tokio::time::timeout(deadline, run_flush(ctx, true, "shutdown")).await {
        Ok(Ok(outcome)) => tracing::info!(outcome = outcome.label(), "final flush finished"),
        Ok(Err(err)) => tracing::error!(error = %err, "final flush did not run"),
        Err(_) => tracing::warn!(
            deadline_secs = deadline.as_secs_f64(),
            "final flush exceeded shutdown deadline; remote may be partially updated",
        ),
    }
}

/// JSON summary of a flush, as sent over the control socket.
pub fn flush_payload(outcome: &FlushOutcome) -> Value {
    let mut payload = json!({ "outcome": outcome.label() });
    match outcome {
        FlushOutcome::Flushed(report) => payload["report"] = json!(report),
        FlushOutcome::Throttled { retry_in } => {
            payload["retry_in_secs"] = json!(retry_in.as_secs_f64())
        }
        FlushOutcome::Failed(message) => payload["error"] = json!(message),
        _ => {}
    }
    payload
}

// ---------------------------------------------------------------------------
// Control socket
// ---------------------------------------------------------------------------

async fn control_server(
    ctx: DaemonContext,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let socket = socket_path(&ctx.home);
    let listener = bind_control_socket(&socket)?;
    tracing::info!(socket = %socket.display(), "control socket listening");

    let result = loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break Ok(()),
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let ctx = ctx.clone();
                    tokio::spawn(async move {
                        if let Err(err) = serve_client(stream, ctx).await {
                            tracing::warn!(error = %err, "control client dropped");
                        }
                    });
                }
                Err(err) => break Err(io_err(&socket, err)),
            },
        }
    };

    let _ = fs::remove_file(&socket);
    result
}

/// Bind `socket`, replacing a stale file left by a crashed daemon.
fn bind_control_socket(socket: &Path) -> Result<UnixListener, DaemonError> {
    if socket.exists() {
        if StdUnixStream::connect(socket).is_ok() {
            return Err(DaemonError::Protocol(format!(
                "another daemon is already listening on {}",
                socket.display()
            )));
        }
        tracing::warn!(socket = %socket.display(), "replacing stale control socket");
        match fs::remove_file(socket) {
            Err(err) if err.kind() != ErrorKind::NotFound => return Err(io_err(socket, err)),
            _ => {}
        }
    }

    let listener = UnixListener::bind(socket).map_err(|e| io_err(socket, e))?;
    fs::set_permissions(socket, fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(socket, e))?;
    Ok(listener)
}

async fn serve_client(stream: UnixStream, ctx: DaemonContext) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("control socket", e))?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (reply, stop) = match serde_json::from_str::<ControlCommand>(line) {
            Ok(command) => (
                handle_command(command, &ctx).await,
                command == ControlCommand::Stop,
            ),
            Err(err) => (ControlReply::failure(format!("unrecognised request: {err}")), false),
        };

        let mut encoded = serde_json::to_vec(&reply)?;
        encoded.push(b'\n');
        writer
            .write_all(&encoded)
            .await
            .map_err(|e| io_err("control socket", e))?;
        if stop {
            break;
        }
    }

    Ok(())
}

async fn handle_command(command: ControlCommand, ctx: &DaemonContext) -> ControlReply {
    match command {
        ControlCommand::Status => ControlReply::success(status_payload(ctx).await),
        ControlCommand::Flush => match run_flush(ctx, true, "control").await {
            Ok(FlushOutcome::Failed(message)) => {
                ControlReply::failure(format!("flush failed: {message}"))
            }
            Ok(outcome) => ControlReply::success(flush_payload(&outcome)),
            Err(err) => ControlReply::failure(err.to_string()),
        },
        ControlCommand::Stop => {
            let _ = ctx.shutdown_tx.send(());
            ControlReply::success(json!({ "stopping": true }))
        }
    }
}

async fn status_payload(ctx: &DaemonContext) -> Value {
    let last_flush = ctx.last_flush.read().await.clone();
    json!({
        "running": true,
        "pid": std::process::id(),
        "started_at_unix": ctx.started_at_unix,
        "socket": socket_path(&ctx.home).display().to_string(),
        "sync": ctx.coordinator.status(),
        "last_flush": last_flush,
    })
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

/// Install the stderr subscriber (`RUST_LOG`, default `info`). Idempotent.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
