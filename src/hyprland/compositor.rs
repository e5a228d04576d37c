//! [`Compositor`] implementation backed by Hyprland IPC.
//!
//! Communicates directly with Hyprland through its Unix socket at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`,
//! avoiding any shell command invocation or third-party crate for socket
//! discovery.
//!
//! Hyprland has no IPC request that creates a workspace without switching
//! to it.  Workspaces are instead declared through `workspace` rules
//! (`keyword workspace 3,monitor:DP-1,persistent:true`), which makes
//! Hyprland create and keep them on the given monitor.

use crate::command::{MonitorId, MonitorInfo, WorkspaceId};
use crate::traits::Compositor;
use serde::Deserialize;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

/// Hyprland-backed compositor.
///
/// All communication happens over Hyprland's IPC socket
/// (`$XDG_RUNTIME_DIR/hypr/<instance>/.socket.sock`).  No child processes
/// are spawned.
pub struct HyprlandCompositor;

/// Errors that can occur when talking to Hyprland.
#[derive(Debug, thiserror::Error)]
#[error("hyprland IPC error: {0}")]
pub struct HyprlandError(pub(crate) String);

impl Default for HyprlandCompositor {
    fn default() -> Self {
        Self
    }
}

impl HyprlandCompositor {
    /// Create a new handle.
    ///
    /// No connection is opened eagerly; each method call opens a short-lived
    /// IPC request.
    pub fn new() -> Self {
        Self
    }
}

//  Direct Hyprland IPC helpers

/// Directory holding the sockets of the running Hyprland instance.
///
/// Hyprland ≥ 0.40 stores its sockets at
/// `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/`.
pub(crate) fn instance_dir() -> Result<PathBuf, HyprlandError> {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .map_err(|_| HyprlandError("XDG_RUNTIME_DIR not set".into()))?;
    let his = std::env::var("HYPRLAND_INSTANCE_SIGNATURE")
        .map_err(|_| HyprlandError("HYPRLAND_INSTANCE_SIGNATURE not set".into()))?;
    Ok(PathBuf::from(format!("{}/hypr/{}", runtime_dir, his)))
}

/// Send a raw command to the Hyprland command socket and return the
/// response as a string.
fn ipc_request(command: &str) -> Result<String, HyprlandError> {
    let path = instance_dir()?.join(".socket.sock");
    let mut stream = UnixStream::connect(&path)
        .map_err(|e| HyprlandError(format!("connect to {}: {}", path.display(), e)))?;

    stream
        .write_all(command.as_bytes())
        .map_err(|e| HyprlandError(format!("write: {}", e)))?;

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .map_err(|e| HyprlandError(format!("read: {}", e)))?;

    String::from_utf8(response).map_err(|e| HyprlandError(format!("utf-8: {}", e)))
}

/// Send a JSON data query (`j/<command>`) and deserialize the answer.
fn ipc_json<T: for<'de> Deserialize<'de>>(data_command: &str) -> Result<T, HyprlandError> {
    let json = ipc_request(&format!("j/{}", data_command))?;
    serde_json::from_str(&json).map_err(|e| HyprlandError(format!("parse {}: {}", data_command, e)))
}

/// Send a request whose only acceptable answer is `"ok"`.
fn ipc_expect_ok(request: &str) -> Result<(), HyprlandError> {
    let response = ipc_request(request)?;
    if response.trim() == "ok" {
        Ok(())
    } else {
        Err(HyprlandError(format!("{}: {}", request, response.trim())))
    }
}

/// Build the `workspace` rule value for `id`.
fn workspace_rule(id: WorkspaceId, monitor: Option<&str>, persistent: bool) -> String {
    match monitor {
        Some(name) => format!("{},monitor:{},persistent:{}", id, name, persistent),
        None => format!("{},persistent:{}", id, persistent),
    }
}

//  Minimal serde structs for the JSON we care about

/// Subset of the JSON object returned by `j/monitors all`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonitorJson {
    id: i64,
    name: String,
    width: u32,
    height: u32,
    x: i32,
    y: i32,
    #[serde(default)]
    focused: bool,
    #[serde(default)]
    disabled: bool,
    /// `"none"` when not mirroring.
    #[serde(default)]
    mirror_of: Option<String>,
    #[serde(default)]
    active_workspace: Option<WorkspaceRefJson>,
}

#[derive(Deserialize)]
struct WorkspaceRefJson {
    name: String,
}

/// Subset of the JSON object returned by `j/workspaces`.
#[derive(Deserialize)]
struct WorkspaceJson {
    id: i64,
    name: String,
}

#[derive(Deserialize)]
struct CursorJson {
    x: i32,
    y: i32,
}

#[derive(Deserialize)]
struct VersionJson {
    commit: String,
}

impl From<MonitorJson> for MonitorInfo {
    fn from(m: MonitorJson) -> Self {
        MonitorInfo {
            id: MonitorId(m.id),
            name: m.name,
            width: m.width,
            height: m.height,
            x: m.x,
            y: m.y,
            disabled: m.disabled,
            mirror_of: m.mirror_of.filter(|s| !s.is_empty() && s != "none"),
            focused: m.focused,
            active_workspace: m
                .active_workspace
                .map(|w| w.name)
                .filter(|name| !name.is_empty()),
        }
    }
}

//  Compositor implementation

impl Compositor for HyprlandCompositor {
    type Error = HyprlandError;

    /// The commit hash of the running Hyprland.
    fn api_version(&self) -> Result<String, Self::Error> {
        let v: VersionJson = ipc_json("version")?;
        Ok(v.commit)
    }

    fn monitors(&self) -> Result<Vec<MonitorInfo>, Self::Error> {
        let monitors: Vec<MonitorJson> = ipc_json("monitors all")?;
        Ok(monitors.into_iter().map(MonitorInfo::from).collect())
    }

    fn cursor_position(&self) -> Result<Option<(i32, i32)>, Self::Error> {
        let c: CursorJson = ipc_json("cursorpos")?;
        Ok(Some((c.x, c.y)))
    }

    fn workspace_exists(&self, id: WorkspaceId) -> Result<bool, Self::Error> {
        let workspaces: Vec<WorkspaceJson> = ipc_json("workspaces")?;
        let name = id.to_string();
        Ok(workspaces
            .iter()
            .any(|w| w.name == name || w.id == id.0 as i64))
    }

    fn create_workspace(&self, id: WorkspaceId, monitor: &MonitorInfo) -> Result<(), Self::Error> {
        ipc_expect_ok(&format!(
            "/keyword workspace {}",
            workspace_rule(id, Some(&monitor.name), true)
        ))
    }

    fn move_workspace_to_monitor(
        &self,
        id: WorkspaceId,
        monitor: &MonitorInfo,
    ) -> Result<(), Self::Error> {
        ipc_expect_ok(&format!(
            "/keyword workspace {}",
            workspace_rule(id, Some(&monitor.name), true)
        ))?;
        ipc_expect_ok(&format!("/dispatch moveworkspacetomonitor {} {}", id, monitor.name))
    }

    fn set_persistent(&self, id: WorkspaceId, persistent: bool) -> Result<(), Self::Error> {
        ipc_expect_ok(&format!(
            "/keyword workspace {}",
            workspace_rule(id, None, persistent)
        ))
    }

    fn dispatch(&self, command: &str) -> Result<String, Self::Error> {
        ipc_request(&format!("/dispatch {}", command))
    }

    /// Red error notification for five seconds.
    fn notify(&self, message: &str) -> Result<(), Self::Error> {
        ipc_expect_ok(&format!("/notify 3 5000 rgb(ff3333) {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_json_maps_mirror_and_active_workspace() {
        let json = r#"[
            {"id":0,"name":"DP-1","description":"Dell","width":2560,"height":1440,
             "x":0,"y":0,"focused":true,"disabled":false,"mirrorOf":"none",
             "activeWorkspace":{"id":2,"name":"2"}},
            {"id":1,"name":"HDMI-A-1","width":1920,"height":1080,"x":0,"y":0,
             "focused":false,"disabled":false,"mirrorOf":"DP-1",
             "activeWorkspace":{"id":2,"name":"2"}}
        ]"#;
        let monitors: Vec<MonitorJson> = serde_json::from_str(json).unwrap();
        let monitors: Vec<MonitorInfo> = monitors.into_iter().map(MonitorInfo::from).collect();
        assert_eq!(monitors[0].id, MonitorId(0));
        assert!(monitors[0].focused);
        assert_eq!(monitors[0].mirror_of, None);
        assert_eq!(monitors[0].active_workspace.as_deref(), Some("2"));
        assert!(monitors[0].is_pool_eligible());
        assert_eq!(monitors[1].mirror_of.as_deref(), Some("DP-1"));
        assert!(!monitors[1].is_pool_eligible());
    }

    #[test]
    fn monitor_json_tolerates_missing_optional_fields() {
        let json = r#"{"id":3,"name":"eDP-1","width":1920,"height":1200,"x":0,"y":0}"#;
        let m: MonitorInfo = serde_json::from_str::<MonitorJson>(json).unwrap().into();
        assert!(!m.disabled);
        assert!(!m.focused);
        assert_eq!(m.mirror_of, None);
        assert_eq!(m.active_workspace, None);
    }

    #[test]
    fn workspace_rules() {
        assert_eq!(
            workspace_rule(WorkspaceId(3), Some("DP-1"), true),
            "3,monitor:DP-1,persistent:true"
        );
        assert_eq!(workspace_rule(WorkspaceId(3), None, false), "3,persistent:false");
    }

    #[test]
    fn missing_environment_is_an_error() {
        // Only meaningful outside a Hyprland session.
        if std::env::var("HYPRLAND_INSTANCE_SIGNATURE").is_err() {
            assert!(HyprlandCompositor::new().monitors().is_err());
        }
    }
}
