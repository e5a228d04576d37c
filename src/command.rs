//! Commands and types used throughout hyprpool.
//!
//! This module defines the vocabulary that all components share:
//! [`Command`] describes every action a user can invoke,
//! [`CommandResult`] is what every action answers with, and
//! [`MonitorId`] / [`WorkspaceId`] / [`MonitorInfo`] provide the
//! supporting data types.
//!
//! Commands arrive either as plain text (`go-to-workspace 3`) or as JSON
//! (`{"go-to-workspace":"3"}`, `"focus-next-monitor"`).

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque monitor identity issued by the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonitorId(pub i64);

impl fmt::Display for MonitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Global workspace identifier, issued only by the
/// [`Ledger`](crate::ledger::Ledger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkspaceId(pub u64);

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The 1-based, monitor-relative workspace index a user typed.
///
/// Kept as raw text: anything that does not parse falls back to the last
/// workspace of the pool instead of being rejected.  On the wire it accepts
/// any scalar; floats, booleans and `null` become text the resolver will not
/// parse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct RelativeIndex(pub String);

impl RelativeIndex {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RelativeIndex {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for RelativeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RelativeIndex {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Visitor;
        struct V;
        impl<'de> Visitor<'de> for V {
            type Value = RelativeIndex;
            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "workspace index as a scalar")
            }
            fn visit_u64<E>(self, n: u64) -> Result<RelativeIndex, E> {
                Ok(RelativeIndex(n.to_string()))
            }
            fn visit_i64<E>(self, n: i64) -> Result<RelativeIndex, E> {
                Ok(RelativeIndex(n.to_string()))
            }
            fn visit_f64<E>(self, n: f64) -> Result<RelativeIndex, E> {
                Ok(RelativeIndex(n.to_string()))
            }
            fn visit_bool<E>(self, b: bool) -> Result<RelativeIndex, E> {
                Ok(RelativeIndex(b.to_string()))
            }
            fn visit_unit<E>(self) -> Result<RelativeIndex, E> {
                Ok(RelativeIndex::default())
            }
            fn visit_none<E>(self) -> Result<RelativeIndex, E> {
                Ok(RelativeIndex::default())
            }
            fn visit_str<E>(self, s: &str) -> Result<RelativeIndex, E>
            where
                E: DeError,
            {
                Ok(RelativeIndex(s.to_string()))
            }
        }
        deserializer.deserialize_any(V)
    }
}

/// Every action a user can ask hyprpool to perform.
///
/// Commands are produced by [`CommandSource`](crate::traits::CommandSource)
/// implementations and consumed by the [`router`](crate::router).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Command {
    /// Switch to the n-th workspace of the current monitor.
    GoToWorkspace(RelativeIndex),

    /// Move the focused window to the n-th workspace of the current
    /// monitor; focus follows the window.
    MoveToWorkspace(RelativeIndex),

    /// Same as [`MoveToWorkspace`](Command::MoveToWorkspace) but focus
    /// stays where it is.
    MoveToWorkspaceSilent(RelativeIndex),

    /// Focus the monitor that follows the current one in enumeration order.
    FocusNextMonitor,

    /// Move the focused window onto the next monitor's active workspace.
    MoveToNextMonitor,
}

impl Command {
    /// User-facing command name, as typed on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Command::GoToWorkspace(_) => "go-to-workspace",
            Command::MoveToWorkspace(_) => "move-to-workspace",
            Command::MoveToWorkspaceSilent(_) => "move-to-workspace-silent",
            Command::FocusNextMonitor => "focus-next-monitor",
            Command::MoveToNextMonitor => "move-to-next-monitor",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::GoToWorkspace(idx)
            | Command::MoveToWorkspace(idx)
            | Command::MoveToWorkspaceSilent(idx) => write!(f, "{} {}", self.name(), idx),
            Command::FocusNextMonitor | Command::MoveToNextMonitor => f.write_str(self.name()),
        }
    }
}

/// Error from parsing a textual command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command: {0}")]
    Unknown(String),
}

/// Parse `"<name> [argument]"`.
///
/// A missing argument is kept as an empty index, which the resolver maps
/// to the last workspace of the pool.  Extra text after argument-less
/// commands is ignored.
impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CommandParseError::Empty);
        }
        let (name, arg) = match s.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (s, ""),
        };
        let idx = || RelativeIndex(arg.to_string());
        match name {
            "go-to-workspace" => Ok(Command::GoToWorkspace(idx())),
            "move-to-workspace" => Ok(Command::MoveToWorkspace(idx())),
            "move-to-workspace-silent" => Ok(Command::MoveToWorkspaceSilent(idx())),
            "focus-next-monitor" => Ok(Command::FocusNextMonitor),
            "move-to-next-monitor" => Ok(Command::MoveToNextMonitor),
            other => Err(CommandParseError::Unknown(other.to_string())),
        }
    }
}

/// Outcome of a single command, sent back to whoever invoked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Whether hyprpool recognised the command at all.
    pub handled: bool,
    /// Whether the compositor accepted the dispatch.
    pub success: bool,
    /// The compositor's raw response, or an error prefixed with the
    /// command name.
    pub message: String,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            handled: true,
            success: true,
            message: message.into(),
        }
    }

    /// A handled command that failed.  `message` is prefixed with the
    /// command name.
    pub fn failure(command: &str, message: impl fmt::Display) -> Self {
        Self {
            handled: true,
            success: false,
            message: format!("{}: {}", command, message),
        }
    }

    /// A request hyprpool could not make sense of.
    pub fn unhandled(message: impl Into<String>) -> Self {
        Self {
            handled: false,
            success: false,
            message: message.into(),
        }
    }
}

/// Static information about a monitor known to the compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorInfo {
    /// Compositor-issued identity.
    pub id: MonitorId,
    /// Unique name the compositor uses for this monitor (e.g. `"DP-1"`).
    pub name: String,
    /// Horizontal resolution in pixels.
    pub width: u32,
    /// Vertical resolution in pixels.
    pub height: u32,
    /// X position on the virtual desktop (pixels).
    pub x: i32,
    /// Y position on the virtual desktop (pixels).
    pub y: i32,
    /// Administratively disabled in the monitor rules.
    pub disabled: bool,
    /// Name of the display this one mirrors, if any.
    pub mirror_of: Option<String>,
    /// Whether this is the last-focused monitor.
    pub focused: bool,
    /// Label of the workspace currently shown, if any.
    pub active_workspace: Option<String>,
}

impl MonitorInfo {
    /// A plain enabled, unfocused monitor at the origin.  Mostly useful for
    /// tests and for backends that only know a name and an id.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id: MonitorId(id),
            name: name.into(),
            width: 1920,
            height: 1080,
            x: 0,
            y: 0,
            disabled: false,
            mirror_of: None,
            focused: false,
            active_workspace: None,
        }
    }

    /// Mirrored and disabled displays never get a pool of their own.
    pub fn is_pool_eligible(&self) -> bool {
        !self.disabled && self.mirror_of.is_none()
    }

    /// Whether the desktop point `(x, y)` lies on this monitor.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (x as i64, y as i64);
        let left = self.x as i64;
        let top = self.y as i64;
        x >= left && x < left + self.width as i64 && y >= top && y < top + self.height as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_text_commands() {
        assert_eq!(
            "go-to-workspace 3".parse::<Command>().unwrap(),
            Command::GoToWorkspace("3".into())
        );
        assert_eq!(
            "move-to-workspace  7 ".parse::<Command>().unwrap(),
            Command::MoveToWorkspace("7".into())
        );
        assert_eq!(
            "move-to-workspace-silent 2".parse::<Command>().unwrap(),
            Command::MoveToWorkspaceSilent("2".into())
        );
        assert_eq!(
            "focus-next-monitor".parse::<Command>().unwrap(),
            Command::FocusNextMonitor
        );
        assert_eq!(
            "move-to-next-monitor ignored".parse::<Command>().unwrap(),
            Command::MoveToNextMonitor
        );
    }

    #[test]
    fn missing_argument_is_kept_as_empty_index() {
        assert_eq!(
            "go-to-workspace".parse::<Command>().unwrap(),
            Command::GoToWorkspace(RelativeIndex::default())
        );
    }

    #[test]
    fn unknown_and_empty_commands_are_rejected() {
        assert_eq!(
            "workspace 3".parse::<Command>(),
            Err(CommandParseError::Unknown("workspace".into()))
        );
        assert_eq!("   ".parse::<Command>(), Err(CommandParseError::Empty));
    }

    #[test]
    fn json_commands_accept_strings_and_numbers() {
        let cmd: Command = serde_json::from_str(r#"{"go-to-workspace":"3"}"#).unwrap();
        assert_eq!(cmd, Command::GoToWorkspace("3".into()));
        let cmd: Command = serde_json::from_str(r#"{"move-to-workspace-silent":4}"#).unwrap();
        assert_eq!(cmd, Command::MoveToWorkspaceSilent("4".into()));
        let cmd: Command = serde_json::from_str(r#""focus-next-monitor""#).unwrap();
        assert_eq!(cmd, Command::FocusNextMonitor);
    }

    #[test]
    fn json_odd_scalars_are_kept_for_fallback() {
        let cmd: Command = serde_json::from_str(r#"{"go-to-workspace":2.5}"#).unwrap();
        assert_eq!(cmd, Command::GoToWorkspace("2.5".into()));
        let cmd: Command = serde_json::from_str(r#"{"move-to-workspace":true}"#).unwrap();
        assert_eq!(cmd, Command::MoveToWorkspace("true".into()));
        let cmd: Command = serde_json::from_str(r#"{"go-to-workspace":null}"#).unwrap();
        assert_eq!(cmd, Command::GoToWorkspace(RelativeIndex::default()));
    }

    #[test]
    fn display_matches_text_form() {
        let cmd = Command::MoveToWorkspace("5".into());
        assert_eq!(cmd.to_string(), "move-to-workspace 5");
        assert_eq!(cmd.to_string().parse::<Command>().unwrap(), cmd);
        assert_eq!(Command::MoveToNextMonitor.to_string(), "move-to-next-monitor");
    }

    #[test]
    fn failure_result_is_prefixed_with_command_name() {
        let r = CommandResult::failure("go-to-workspace", "invalid dispatcher");
        assert!(r.handled);
        assert!(!r.success);
        assert_eq!(r.message, "go-to-workspace: invalid dispatcher");
    }

    #[test]
    fn mirrored_and_disabled_monitors_are_not_eligible() {
        let mut m = MonitorInfo::new(0, "DP-1");
        assert!(m.is_pool_eligible());
        m.mirror_of = Some("eDP-1".into());
        assert!(!m.is_pool_eligible());
        m.mirror_of = None;
        m.disabled = true;
        assert!(!m.is_pool_eligible());
    }

    #[test]
    fn contains_uses_half_open_bounds() {
        let mut m = MonitorInfo::new(1, "HDMI-A-1");
        m.x = 1920;
        assert!(m.contains(1920, 0));
        assert!(m.contains(3839, 1079));
        assert!(!m.contains(3840, 0));
        assert!(!m.contains(1919, 500));
    }
}
