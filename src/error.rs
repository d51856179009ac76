use std::io;
use std::time::Duration;
use thiserror::Error;

/// The error type for simulator sessions and dataset generation.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection to the simulator failed.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),
    /// The simulator sent bytes that do not form a valid TraCI message.
    #[error("malformed TraCI message: {0}")]
    Protocol(String),
    /// The simulator answered a command with an error status.
    #[error("command {command:#04x} refused: {description}")]
    Command { command: u8, description: String },
    /// The simulator never opened its TraCI port.
    #[error("no simulator accepted a connection on {addr} within {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    /// The simulator binary could not be started.
    #[error("could not launch {program}: {source}")]
    Spawn { program: String, source: io::Error },
    /// The flat duration list does not cover the configured phases.
    #[error("expected {expected} green phase durations, got {got}")]
    PhaseCount { expected: usize, got: usize },
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Every configured traffic light failed the controlled-lanes query.
    #[error("no traffic light reported any controlled lanes")]
    EmptyRegistry,
}

pub type Result<T> = std::result::Result<T, Error>;
