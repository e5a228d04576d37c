//! Unix-socket [`CommandSource`] implementation.
//!
//! Binds a Unix stream socket and accepts one connection at a time.
//! Each line received is one request; each request gets exactly one
//! JSON-encoded [`CommandResult`] line back.
//!
//! # Wire format
//!
//! Requests are either plain text or JSON:
//!
//! ```text
//! go-to-workspace 3
//! move-to-workspace-silent 1
//! focus-next-monitor
//! {"go-to-workspace":"3"}
//! "move-to-next-monitor"
//! shutdown
//! ```
//!
//! Responses:
//!
//! ```json
//! {"handled":true,"success":true,"message":"ok"}
//! {"handled":false,"success":false,"message":"unknown command: workspace"}
//! ```

use crate::command::{Command, CommandResult};
use crate::traits::{CommandSource, Message};
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Request line that stops the daemon.
pub const SHUTDOWN_REQUEST: &str = "shutdown";

/// A [`CommandSource`] that listens on a Unix stream socket for commands
/// and answers each with a [`CommandResult`].
///
/// Each accepted connection can send multiple newline-delimited requests.
/// When the connection closes, the listener waits for the next one.
pub struct UnixSocketListener {
    path: PathBuf,
}

/// Errors produced by the Unix socket listener.
#[derive(Debug, thiserror::Error)]
pub enum UnixSocketError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json encode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What to do with one request line.
#[derive(Debug, PartialEq)]
pub(crate) enum Request {
    Command(Command),
    Shutdown,
    /// Not understood; the result says why.
    Invalid(CommandResult),
}

/// Parse one request line.  JSON is recognised by its leading `{` or `"`.
pub(crate) fn parse_request(line: &str) -> Request {
    let line = line.trim();
    if line == SHUTDOWN_REQUEST {
        return Request::Shutdown;
    }
    let parsed = if line.starts_with('{') || line.starts_with('"') {
        serde_json::from_str::<Command>(line).map_err(|e| e.to_string())
    } else {
        line.parse::<Command>().map_err(|e| e.to_string())
    };
    match parsed {
        Ok(command) => Request::Command(command),
        Err(e) => Request::Invalid(CommandResult::unhandled(e)),
    }
}

/// Whether the listener keeps accepting after a connection.
enum Served {
    Open,
    Closed,
}

impl UnixSocketListener {
    /// Create a new listener bound to `path`.
    ///
    /// The socket file is created when [`run`](CommandSource::run) is called
    /// and removed when the source shuts down.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serve every request on one connection.
    fn serve(
        &self,
        stream: UnixStream,
        sink: &mpsc::Sender<Message>,
    ) -> Result<Served, UnixSocketError> {
        let mut writer = stream.try_clone()?;
        let reader = BufReader::new(stream);

        for line in reader.lines() {
            let text = line?;
            if text.trim().is_empty() {
                continue;
            }
            debug!("received {:?}", text);

            let result = match parse_request(&text) {
                Request::Shutdown => {
                    info!("shutdown requested");
                    let closed = sink.send(Message::Shutdown).is_err();
                    respond(&mut writer, &CommandResult::success("shutting down"))?;
                    if closed {
                        warn!("sink already closed");
                    }
                    return Ok(Served::Closed);
                }
                Request::Invalid(result) => {
                    warn!("bad request {:?}: {}", text, result.message);
                    result
                }
                Request::Command(command) => {
                    let (reply_tx, reply_rx) = mpsc::channel();
                    let message = Message::Command {
                        command,
                        reply: Some(reply_tx),
                    };
                    if sink.send(message).is_err() {
                        info!("sink closed, shutting down");
                        return Ok(Served::Closed);
                    }
                    match reply_rx.recv() {
                        Ok(result) => result,
                        Err(_) => {
                            info!("command dropped without a reply, shutting down");
                            return Ok(Served::Closed);
                        }
                    }
                }
            };
            respond(&mut writer, &result)?;
        }
        Ok(Served::Open)
    }
}

/// Write `result` as one JSON line.
fn respond(writer: &mut impl Write, result: &CommandResult) -> Result<(), UnixSocketError> {
    let mut line = serde_json::to_string(result)?;
    line.push('\n');
    writer.write_all(line.as_bytes())?;
    writer.flush()?;
    Ok(())
}

impl CommandSource for UnixSocketListener {
    type Error = UnixSocketError;

    /// Bind the socket and start accepting connections.
    ///
    /// This method **blocks** until a shutdown request arrives or the sink
    /// closes.  Run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Message>) -> Result<(), Self::Error> {
        // Remove stale socket if present.
        let _ = std::fs::remove_file(&self.path);

        let listener = UnixListener::bind(&self.path)?;
        info!("listening on {}", self.path.display());

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    debug!("client connected");
                    match self.serve(stream, &sink) {
                        Ok(Served::Open) => debug!("client disconnected"),
                        Ok(Served::Closed) => break,
                        Err(e) => error!("client error: {}", e),
                    }
                }
                Err(e) => {
                    error!("accept error: {}", e);
                }
            }
        }

        let _ = std::fs::remove_file(&self.path);
        Ok(())
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::RelativeIndex;
    use std::time::Duration;

    /// Connect, retrying while the listener thread binds.
    fn connect(path: &Path) -> UnixStream {
        for _ in 0..100 {
            if let Ok(stream) = UnixStream::connect(path) {
                return stream;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        panic!("listener never came up at {}", path.display());
    }

    /// Start a listener plus a fake main loop that answers every command
    /// with `success(<command name>)`.  Returns the commands it saw.
    fn start(path: PathBuf) -> mpsc::Receiver<Command> {
        let (tx, rx) = mpsc::channel::<Message>();
        let (seen_tx, seen_rx) = mpsc::channel();

        std::thread::spawn(move || {
            let mut listener = UnixSocketListener::new(&path);
            let _ = listener.run(tx);
        });
        std::thread::spawn(move || {
            for msg in rx {
                match msg {
                    Message::Command { command, reply } => {
                        if let Some(reply) = reply {
                            let _ = reply.send(CommandResult::success(command.name()));
                        }
                        let _ = seen_tx.send(command);
                    }
                    Message::Shutdown => break,
                    Message::Event(_) => {}
                }
            }
        });
        seen_rx
    }

    fn exchange(stream: &mut UnixStream, reader: &mut impl BufRead, line: &str) -> CommandResult {
        writeln!(stream, "{}", line).unwrap();
        let mut response = String::new();
        reader.read_line(&mut response).unwrap();
        serde_json::from_str(&response).unwrap()
    }

    #[test]
    fn text_and_json_commands_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.sock");
        let seen = start(path.clone());

        let mut stream = connect(&path);
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let r = exchange(&mut stream, &mut reader, "go-to-workspace 3");
        assert_eq!(r, CommandResult::success("go-to-workspace"));
        let r = exchange(&mut stream, &mut reader, r#"{"move-to-workspace":"2"}"#);
        assert_eq!(r, CommandResult::success("move-to-workspace"));
        let r = exchange(&mut stream, &mut reader, r#""focus-next-monitor""#);
        assert_eq!(r, CommandResult::success("focus-next-monitor"));

        let cmds: Vec<Command> = seen.iter().take(3).collect();
        assert_eq!(
            cmds,
            vec![
                Command::GoToWorkspace(RelativeIndex::from("3")),
                Command::MoveToWorkspace(RelativeIndex::from("2")),
                Command::FocusNextMonitor,
            ]
        );
    }

    #[test]
    fn unknown_command_is_unhandled_and_connection_survives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.sock");
        let seen = start(path.clone());

        let mut stream = connect(&path);
        let mut reader = BufReader::new(stream.try_clone().unwrap());

        let r = exchange(&mut stream, &mut reader, "workspace 3");
        assert!(!r.handled);
        assert!(!r.success);
        assert_eq!(r.message, "unknown command: workspace");

        let r = exchange(&mut stream, &mut reader, "{not json");
        assert!(!r.handled);

        let r = exchange(&mut stream, &mut reader, "move-to-next-monitor");
        assert!(r.success);
        assert_eq!(seen.recv().unwrap(), Command::MoveToNextMonitor);
    }

    #[test]
    fn shutdown_stops_listener_and_removes_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pool.sock");
        let (tx, rx) = mpsc::channel::<Message>();
        let listener_path = path.clone();
        let handle = std::thread::spawn(move || {
            let mut listener = UnixSocketListener::new(&listener_path);
            listener.run(tx)
        });

        let mut stream = connect(&path);
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let r = exchange(&mut stream, &mut reader, "shutdown");
        assert!(r.success);

        assert!(matches!(rx.recv().unwrap(), Message::Shutdown));
        assert!(handle.join().unwrap().is_ok());
        assert!(!path.exists());
    }

    #[test]
    fn parse_request_variants() {
        assert_eq!(parse_request(" shutdown "), Request::Shutdown);
        assert_eq!(
            parse_request("move-to-workspace-silent 4"),
            Request::Command(Command::MoveToWorkspaceSilent("4".into()))
        );
        assert_eq!(
            parse_request(r#"{"go-to-workspace":2}"#),
            Request::Command(Command::GoToWorkspace("2".into()))
        );
        assert_eq!(
            parse_request(r#"{"go-to-workspace":2.5}"#),
            Request::Command(Command::GoToWorkspace("2.5".into()))
        );
        assert!(matches!(parse_request("frobnicate"), Request::Invalid(_)));
    }
}
