//! Client side of the command socket, used by the CLI.

use crate::command::CommandResult;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

/// Errors produced while talking to a running daemon.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("daemon closed the connection without answering")]
    NoResponse,
}

/// Send one request line to the daemon at `path` and wait for its result.
pub fn send(path: &Path, request: &str) -> Result<CommandResult, ClientError> {
    let mut stream = UnixStream::connect(path)?;
    stream.write_all(request.trim().as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()?;

    let mut response = String::new();
    BufReader::new(stream).read_line(&mut response)?;
    if response.trim().is_empty() {
        return Err(ClientError::NoResponse);
    }
    Ok(serde_json::from_str(&response)?)
}
