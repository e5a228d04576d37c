//! Maps user [`Command`]s onto compositor dispatches.
//!
//! Each command resolves its target through the [`resolver`](crate::resolver),
//! formats a Hyprland dispatch string, sends it through
//! [`Compositor::dispatch`] and turns the raw response into a
//! [`CommandResult`].  The router only reads the [`Ledger`]; a failed
//! dispatch never changes allocation state.

use crate::command::{Command, CommandResult, MonitorInfo};
use crate::ledger::Ledger;
use crate::resolver::{active_workspace_or_default, current_monitor, next_monitor, resolve};
use crate::traits::Compositor;
use log::{debug, info, warn};

/// The compositor's whole answer to a successful dispatch.
pub const SUCCESS_RESPONSE: &str = "ok";

/// Why a command could not be turned into a dispatch.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// The compositor could not be queried.
    #[error("compositor error: {0}")]
    Compositor(String),
    /// Neither a focused monitor nor one under the cursor.
    #[error("no current monitor")]
    NoCurrentMonitor,
}

/// Execute `command` and report the outcome.
pub fn route<C: Compositor>(compositor: &C, ledger: &Ledger, command: &Command) -> CommandResult {
    let name = command.name();
    let dispatch = match dispatch_for(compositor, ledger, command) {
        Ok(dispatch) => dispatch,
        Err(e) => {
            warn!("{}: {}", name, e);
            return CommandResult::failure(name, e);
        }
    };
    debug!("{} -> dispatch {}", command, dispatch);
    match compositor.dispatch(&dispatch) {
        Ok(response) => classify(name, response),
        Err(e) => {
            warn!("{}: dispatch failed: {}", name, e);
            CommandResult::failure(name, e)
        }
    }
}

/// Success if `response` is exactly [`SUCCESS_RESPONSE`] (surrounding
/// whitespace ignored); otherwise a failure carrying the raw response.
pub fn classify(command: &str, response: String) -> CommandResult {
    if response.trim() == SUCCESS_RESPONSE {
        CommandResult::success(response.trim())
    } else {
        warn!("{}: compositor answered {:?}", command, response);
        CommandResult::failure(command, response)
    }
}

/// Build the dispatch string for `command`.
pub fn dispatch_for<C: Compositor>(
    compositor: &C,
    ledger: &Ledger,
    command: &Command,
) -> Result<String, RouteError> {
    let monitors = compositor
        .monitors()
        .map_err(|e| RouteError::Compositor(e.to_string()))?;
    let current: &MonitorInfo = current_monitor(compositor, &monitors)
        .map_err(|e| RouteError::Compositor(e.to_string()))?
        .ok_or(RouteError::NoCurrentMonitor)?;

    let dispatch = match command {
        Command::GoToWorkspace(idx) => {
            let target = resolve(ledger, current, idx.as_str());
            info!("go to workspace {} on {} -> {}", idx, current.name, target);
            format!("workspace {}", target)
        }
        Command::MoveToWorkspace(idx) => {
            let target = resolve(ledger, current, idx.as_str());
            info!("move to workspace {} on {} -> {}", idx, current.name, target);
            format!("movetoworkspace {}", target)
        }
        Command::MoveToWorkspaceSilent(idx) => {
            let target = resolve(ledger, current, idx.as_str());
            info!("move silently to workspace {} on {} -> {}", idx, current.name, target);
            format!("movetoworkspacesilent {}", target)
        }
        Command::FocusNextMonitor => {
            let next = next_monitor(&monitors, current);
            info!("focus next monitor: {} -> {}", current.name, next.name);
            format!("focusmonitor {}", next.id)
        }
        Command::MoveToNextMonitor => {
            let next = next_monitor(&monitors, current);
            let target = active_workspace_or_default(next);
            info!("move to next monitor: {} -> {} ({})", current.name, next.name, target);
            format!("movetoworkspace {}", target)
        }
    };
    Ok(dispatch)
}

//  Tests
