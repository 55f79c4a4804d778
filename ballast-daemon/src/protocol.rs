//! Control socket protocol: one JSON object per line in each direction.
//!
//! Requests look like `{"cmd":"status"}`; replies carry `ok` plus either
//! `data` or `error`.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{io_err, DaemonError};
use crate::paths::socket_path;

/// Commands understood by the control socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum ControlCommand {
    Status,
    Flush,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ControlReply {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// `data` on success, the daemon's message as a protocol error otherwise.
    pub fn into_result(self) -> Result<Value, DaemonError> {
        match (self.ok, self.error) {
            (true, _) => Ok(self.data.unwrap_or(Value::Null)),
            (false, Some(message)) => Err(DaemonError::Protocol(message)),
            (false, None) => Err(DaemonError::Protocol("daemon reported an error".into())),
        }
    }
}

/// Send one command to the daemon under `home` and wait for its reply.
pub fn send_command(home: &Path, command: ControlCommand) -> Result<ControlReply, DaemonError> {
    let socket = socket_path(home);
    let stream = connect(&socket)?;

    let mut request = serde_json::to_vec(&command)?;
    request.push(b'\n');
    (&stream)
        .write_all(&request)
        .map_err(|e| io_err(&socket, e))?;

    let mut line = String::new();
    let read = BufReader::new(&stream)
        .read_line(&mut line)
        .map_err(|e| io_err(&socket, e))?;
    if read == 0 {
        return Err(DaemonError::Protocol(format!(
            "no reply to {command:?} before the daemon hung up"
        )));
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

fn connect(socket: &Path) -> Result<UnixStream, DaemonError> {
    let not_running = || DaemonError::DaemonNotRunning {
        socket: PathBuf::from(socket),
    };
    if !socket.exists() {
        return Err(not_running());
    }
    UnixStream::connect(socket).map_err(|err| match err.kind() {
        ErrorKind::NotFound | ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset => {
            not_running()
        }
        _ => io_err(socket, err),
    })
}

/// Query status. A daemon that is still binding its socket gets a few
/// short grace periods.
pub fn request_status(home: &Path) -> Result<Value, DaemonError> {
    for _ in 0..4 {
        match send_command(home, ControlCommand::Status) {
            Err(DaemonError::DaemonNotRunning { .. }) => sleep(Duration::from_millis(100)),
            other => return other?.into_result(),
        }
    }
    send_command(home, ControlCommand::Status)?.into_result()
}

pub fn request_stop(home: &Path) -> Result<(), DaemonError> {
    send_command(home, ControlCommand::Stop)?
        .into_result()
        .map(drop)
}

/// Ask the running daemon for a forced flush; returns its summary.
pub fn request_flush(home: &Path) -> Result<Value, DaemonError> {
    send_command(home, ControlCommand::Flush)?.into_result()
}
