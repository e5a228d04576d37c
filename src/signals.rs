//! Termination signals as a [`CommandSource`].
//!
//! SIGINT, SIGTERM and SIGHUP become [`Message::Shutdown`], so the main loop
//! stops the same way it does for a `shutdown` request and every pool is
//! torn down before the process exits.

use crate::traits::{CommandSource, Message};
use log::info;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::sync::mpsc;

/// Signals that stop the daemon.
pub const TERMINATION_SIGNALS: [i32; 3] = [SIGINT, SIGTERM, SIGHUP];

/// Forwards the first termination signal as [`Message::Shutdown`].
///
/// Handlers are installed in [`new`](SignalSource::new), not in `run`, so a
/// signal arriving before the source thread starts is not lost and does not
/// kill the process.
pub struct SignalSource {
    signals: Signals,
}

/// Error from installing signal handlers.
#[derive(Debug, thiserror::Error)]
#[error("cannot install signal handler: {0}")]
pub struct SignalError(#[from] std::io::Error);

impl SignalSource {
    /// Install handlers for [`TERMINATION_SIGNALS`].
    pub fn new() -> Result<Self, SignalError> {
        Self::with_signals(&TERMINATION_SIGNALS)
    }

    /// Install handlers for `signals`.
    pub fn with_signals(signals: &[i32]) -> Result<Self, SignalError> {
        Ok(Self {
            signals: Signals::new(signals)?,
        })
    }
}

impl CommandSource for SignalSource {
    type Error = SignalError;

    /// Block until a signal arrives, then request shutdown.
    fn run(&mut self, sink: mpsc::Sender<Message>) -> Result<(), Self::Error> {
        if let Some(signal) = self.signals.forever().next() {
            info!("received signal {}, shutting down", signal);
            let _ = sink.send(Message::Shutdown);
        }
        Ok(())
    }
}
