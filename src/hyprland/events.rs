//! Translates Hyprland lifecycle events into [`Message`]s.
//!
//! Hyprland broadcasts events over its IPC event socket (`socket2`) at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket2.sock`,
//! one `EVENT>>DATA\n` line per event.  Only three of them matter here:
//!
//! | Event              | Payload           | Becomes                                |
//! |--------------------|-------------------|----------------------------------------|
//! | `configreloaded`   |                   | [`LifecycleEvent::ConfigReloaded`]     |
//! | `monitoraddedv2`   | `ID,NAME,DESC`    | [`LifecycleEvent::MonitorAdded`]       |
//! | `monitorremovedv2` | `ID,NAME,DESC`    | [`LifecycleEvent::MonitorRemoved`]     |
//! | `monitorremoved`   | `NAME`            | [`LifecycleEvent::MonitorRemoved`]     |
//!
//! Hyprland sends both `monitoradded` and `monitoraddedv2` for each new
//! output.  Only the v2 form carries the id, so the plain one is ignored.
//! For removals the v2 form is preferred, but older releases only send
//! `monitorremoved`; a duplicate removal is harmless because removing an
//! unknown pool is a no-op.

use super::compositor::instance_dir;
use crate::command::MonitorId;
use crate::traits::{CommandSource, LifecycleEvent, Message};
use log::{debug, error, info, warn};
use std::io::{BufRead, BufReader};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::mpsc;

/// A [`CommandSource`] that listens to Hyprland's event socket and
/// forwards monitor and config lifecycle events.
#[derive(Debug, Default)]
pub struct HyprlandEventSource;

impl HyprlandEventSource {
    pub fn new() -> Self {
        Self
    }
}

/// Error from the Hyprland event source.
#[derive(Debug, thiserror::Error)]
#[error("hyprland event error: {0}")]
pub struct HyprlandEventError(String);

/// Path of Hyprland's event socket.
fn socket2_path() -> Result<PathBuf, HyprlandEventError> {
    instance_dir()
        .map(|dir| dir.join(".socket2.sock"))
        .map_err(|e| HyprlandEventError(e.to_string()))
}

/// Split a raw `EVENT>>DATA` line.
pub(crate) fn parse_event_line(line: &str) -> Option<(&str, &str)> {
    line.split_once(">>")
}

/// Map a Hyprland event onto a [`LifecycleEvent`], if it is one we track.
pub(crate) fn translate(event: &str, data: &str) -> Option<LifecycleEvent> {
    match event {
        "configreloaded" => Some(LifecycleEvent::ConfigReloaded),
        "monitoraddedv2" => {
            let (id, name) = split_v2(data)?;
            Some(LifecycleEvent::MonitorAdded {
                id: MonitorId(id),
                name,
            })
        }
        "monitorremovedv2" => {
            let (id, name) = split_v2(data)?;
            Some(LifecycleEvent::MonitorRemoved {
                id: Some(MonitorId(id)),
                name,
            })
        }
        "monitorremoved" if !data.is_empty() => Some(LifecycleEvent::MonitorRemoved {
            id: None,
            name: data.to_string(),
        }),
        _ => None,
    }
}

/// `ID,NAME,DESC` → `(ID, NAME)`.  The description may itself contain
/// commas.
fn split_v2(data: &str) -> Option<(i64, String)> {
    let mut parts = data.splitn(3, ',');
    let id = parts.next()?.trim().parse().ok()?;
    let name = parts.next()?.trim();
    if name.is_empty() {
        return None;
    }
    Some((id, name.to_string()))
}

impl CommandSource for HyprlandEventSource {
    type Error = HyprlandEventError;

    /// Connect to socket2 and forward events until the stream ends.
    ///
    /// Blocks; run it on a dedicated thread.
    fn run(&mut self, sink: mpsc::Sender<Message>) -> Result<(), Self::Error> {
        let path = socket2_path()?;
        let stream = UnixStream::connect(&path)
            .map_err(|e| HyprlandEventError(format!("connect to {}: {}", path.display(), e)))?;
        info!("event source connected to {}", path.display());

        for line in BufReader::new(stream).lines() {
            match line {
                Ok(line) if line.is_empty() => continue,
                Ok(line) => {
                    let Some((event, data)) = parse_event_line(&line) else {
                        continue;
                    };
                    let Some(lifecycle) = translate(event, data) else {
                        continue;
                    };
                    debug!("event {} -> {:?}", event, lifecycle);
                    if sink.send(Message::Event(lifecycle)).is_err() {
                        info!("sink closed, event source stopping");
                        return Ok(());
                    }
                }
                Err(e) => {
                    error!("socket2 read error: {}", e);
                    return Err(HyprlandEventError(format!("read error: {}", e)));
                }
            }
        }

        warn!("socket2 stream ended");
        Ok(())
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_event_line_splits_on_first_separator() {
        assert_eq!(
            parse_event_line("monitoraddedv2>>1,DP-2,Dell >> U2720Q"),
            Some(("monitoraddedv2", "1,DP-2,Dell >> U2720Q"))
        );
        assert_eq!(parse_event_line("configreloaded>>"), Some(("configreloaded", "")));
        assert_eq!(parse_event_line("garbage"), None);
    }

    #[test]
    fn config_reload() {
        assert_eq!(
            translate("configreloaded", ""),
            Some(LifecycleEvent::ConfigReloaded)
        );
    }

    #[test]
    fn monitor_added_v2_keeps_id_and_name() {
        assert_eq!(
            translate("monitoraddedv2", "2,HDMI-A-1,LG Electronics, 27GL850"),
            Some(LifecycleEvent::MonitorAdded {
                id: MonitorId(2),
                name: "HDMI-A-1".into()
            })
        );
    }

    #[test]
    fn plain_monitor_added_is_ignored() {
        assert_eq!(translate("monitoradded", "HDMI-A-1"), None);
    }

    #[test]
    fn monitor_removed_both_forms() {
        assert_eq!(
            translate("monitorremovedv2", "1,DP-2,"),
            Some(LifecycleEvent::MonitorRemoved {
                id: Some(MonitorId(1)),
                name: "DP-2".into()
            })
        );
        assert_eq!(
            translate("monitorremoved", "DP-2"),
            Some(LifecycleEvent::MonitorRemoved {
                id: None,
                name: "DP-2".into()
            })
        );
    }

    #[test]
    fn malformed_payloads_are_dropped() {
        assert_eq!(translate("monitoraddedv2", "x,DP-1,desc"), None);
        assert_eq!(translate("monitoraddedv2", "3"), None);
        assert_eq!(translate("monitorremovedv2", "3,,desc"), None);
        assert_eq!(translate("monitorremoved", ""), None);
    }

    #[test]
    fn unrelated_events_are_dropped() {
        for event in ["workspace", "activewindow", "focusedmon", "openwindow"] {
            assert_eq!(translate(event, "1"), None, "{}", event);
        }
    }
}
