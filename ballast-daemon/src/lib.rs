//! Host runtime for the sync engine: startup restore, filesystem watcher,
//! periodic flush, control socket, and a bounded final flush at shutdown.

mod error;
pub mod paths;
pub mod protocol;
mod runtime;

pub use error::DaemonError;
pub use protocol::{
    request_flush, request_status, request_stop, send_command, ControlCommand, ControlReply,
};
pub use runtime::{flush_payload, init_tracing, run, run_with, start_blocking, RuntimeSettings};
