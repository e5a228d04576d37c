//! Core traits that decouple hyprpool from any specific compositor or
//! transport mechanism.
//!
//! Every concrete backend (Hyprland, a Unix-socket listener, a test harness,
//! …) implements one of these traits.  The [`Plugin`](crate::plugin::Plugin)
//! only depends on these abstractions.

use crate::command::{Command, CommandResult, MonitorId, MonitorInfo, WorkspaceId};
use std::sync::mpsc;

/// Abstraction over the compositor that owns monitors and workspaces.
///
/// hyprpool never creates or destroys monitors and never holds workspace
/// objects by reference: everything is looked up by id on every call.
pub trait Compositor {
    /// The error type produced by this compositor.
    type Error: std::error::Error + Send + 'static;

    /// Version string of the host interface, compared at startup against
    /// the version hyprpool was built for.
    fn api_version(&self) -> Result<String, Self::Error>;

    /// Every monitor the compositor knows about, in its enumeration order,
    /// including disabled ones.
    fn monitors(&self) -> Result<Vec<MonitorInfo>, Self::Error>;

    /// Pointer position on the virtual desktop, if known.
    fn cursor_position(&self) -> Result<Option<(i32, i32)>, Self::Error>;

    /// Whether a workspace object exists for `id`.
    fn workspace_exists(&self, id: WorkspaceId) -> Result<bool, Self::Error>;

    /// Create the workspace object for `id` on `monitor`.
    fn create_workspace(&self, id: WorkspaceId, monitor: &MonitorInfo) -> Result<(), Self::Error>;

    /// Assign an existing workspace object to `monitor`.
    fn move_workspace_to_monitor(
        &self,
        id: WorkspaceId,
        monitor: &MonitorInfo,
    ) -> Result<(), Self::Error>;

    /// Set or clear the flag that keeps an empty workspace alive.
    fn set_persistent(&self, id: WorkspaceId, persistent: bool) -> Result<(), Self::Error>;

    /// Execute a dispatch command and return the compositor's raw response.
    ///
    /// A non-success response is **not** an error here; the caller decides
    /// how to classify it.
    fn dispatch(&self, command: &str) -> Result<String, Self::Error>;

    /// Show a user-visible error notification.
    fn notify(&self, message: &str) -> Result<(), Self::Error>;
}

/// Lifecycle notifications coming from the compositor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The compositor reloaded its configuration.
    ConfigReloaded,
    /// A monitor was plugged in or enabled.
    MonitorAdded { id: MonitorId, name: String },
    /// A monitor went away.  Older event formats carry only the name.
    MonitorRemoved { id: Option<MonitorId>, name: String },
}

/// Everything the main loop can receive, in delivery order.
#[derive(Debug)]
pub enum Message {
    /// A user command.  The result is sent to `reply` when present.
    Command {
        command: Command,
        reply: Option<mpsc::Sender<CommandResult>>,
    },
    /// A compositor lifecycle event.
    Event(LifecycleEvent),
    /// Tear everything down and stop.
    Shutdown,
}

//  Message Source

/// A source of [`Message`]s.
///
/// Implementations listen on some transport — a Unix socket, Hyprland's
/// IPC event stream, an in-memory channel, … — and forward what they
/// receive into the provided [`mpsc::Sender`].
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received message must be sent through `sink` exactly once.
/// * Implementations must be [`Send`] so they can run on a dedicated thread.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Start listening and forward every incoming [`Message`] into `sink`.
    ///
    /// This method blocks the calling thread.  To run multiple sources
    /// concurrently, spawn each one on its own thread.
    fn run(&mut self, sink: mpsc::Sender<Message>) -> Result<(), Self::Error>;
}

//  Test double

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;

    /// A compositor that keeps workspaces in memory and records every call
    /// made to it.
    #[derive(Debug)]
    pub struct RecorderCompositor {
        pub version: String,
        pub monitors: RefCell<Vec<MonitorInfo>>,
        pub cursor: RefCell<Option<(i32, i32)>>,
        /// `id -> (monitor name, persistent)`
        pub workspaces: RefCell<BTreeMap<WorkspaceId, (String, bool)>>,
        pub created: RefCell<Vec<WorkspaceId>>,
        pub dispatches: RefCell<Vec<String>>,
        pub dispatch_response: RefCell<String>,
        pub notifications: RefCell<Vec<String>>,
        pub fail_creates: Cell<bool>,
        pub fail_dispatch: Cell<bool>,
        pub fail_monitors: Cell<bool>,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("recorder error: {0}")]
    pub struct RecorderError(pub String);

    impl Default for RecorderCompositor {
        fn default() -> Self {
            Self {
                version: "test".into(),
                monitors: RefCell::new(Vec::new()),
                cursor: RefCell::new(None),
                workspaces: RefCell::new(BTreeMap::new()),
                created: RefCell::new(Vec::new()),
                dispatches: RefCell::new(Vec::new()),
                dispatch_response: RefCell::new("ok".into()),
                notifications: RefCell::new(Vec::new()),
                fail_creates: Cell::new(false),
                fail_dispatch: Cell::new(false),
                fail_monitors: Cell::new(false),
            }
        }
    }

    impl RecorderCompositor {
        pub fn with_monitors(monitors: Vec<MonitorInfo>) -> Self {
            Self {
                monitors: RefCell::new(monitors),
                ..Self::default()
            }
        }

        /// Ids of every workspace currently flagged persistent.
        pub fn persistent_ids(&self) -> Vec<u64> {
            self.workspaces
                .borrow()
                .iter()
                .filter(|(_, (_, persistent))| *persistent)
                .map(|(id, _)| id.0)
                .collect()
        }

        /// Monitor a workspace currently lives on.
        pub fn workspace_monitor(&self, id: u64) -> Option<String> {
            self.workspaces
                .borrow()
                .get(&WorkspaceId(id))
                .map(|(monitor, _)| monitor.clone())
        }
    }

    impl Compositor for RecorderCompositor {
        type Error = RecorderError;

        fn api_version(&self) -> Result<String, RecorderError> {
            Ok(self.version.clone())
        }

        fn monitors(&self) -> Result<Vec<MonitorInfo>, RecorderError> {
            if self.fail_monitors.get() {
                return Err(RecorderError("monitors unavailable".into()));
            }
            Ok(self.monitors.borrow().clone())
        }

        fn cursor_position(&self) -> Result<Option<(i32, i32)>, RecorderError> {
            Ok(*self.cursor.borrow())
        }

        fn workspace_exists(&self, id: WorkspaceId) -> Result<bool, RecorderError> {
            Ok(self.workspaces.borrow().contains_key(&id))
        }

        fn create_workspace(
            &self,
            id: WorkspaceId,
            monitor: &MonitorInfo,
        ) -> Result<(), RecorderError> {
            if self.fail_creates.get() {
                return Err(RecorderError(format!("cannot create workspace {}", id)));
            }
            self.workspaces
                .borrow_mut()
                .insert(id, (monitor.name.clone(), false));
            self.created.borrow_mut().push(id);
            Ok(())
        }

        fn move_workspace_to_monitor(
            &self,
            id: WorkspaceId,
            monitor: &MonitorInfo,
        ) -> Result<(), RecorderError> {
            match self.workspaces.borrow_mut().get_mut(&id) {
                Some(entry) => {
                    entry.0 = monitor.name.clone();
                    Ok(())
                }
                None => Err(RecorderError(format!("no workspace {}", id))),
            }
        }

        fn set_persistent(&self, id: WorkspaceId, persistent: bool) -> Result<(), RecorderError> {
            match self.workspaces.borrow_mut().get_mut(&id) {
                Some(entry) => {
                    entry.1 = persistent;
                    Ok(())
                }
                None => Err(RecorderError(format!("no workspace {}", id))),
            }
        }

        fn dispatch(&self, command: &str) -> Result<String, RecorderError> {
            if self.fail_dispatch.get() {
                return Err(RecorderError("socket closed".into()));
            }
            self.dispatches.borrow_mut().push(command.to_string());
            Ok(self.dispatch_response.borrow().clone())
        }

        fn notify(&self, message: &str) -> Result<(), RecorderError> {
            self.notifications.borrow_mut().push(message.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::RecorderCompositor;
    use super::*;

    #[test]
    fn recorder_tracks_workspace_lifecycle() {
        let c = RecorderCompositor::default();
        let mon = MonitorInfo::new(0, "DP-1");
        assert!(!c.workspace_exists(WorkspaceId(1)).unwrap());
        c.create_workspace(WorkspaceId(1), &mon).unwrap();
        c.set_persistent(WorkspaceId(1), true).unwrap();
        assert!(c.workspace_exists(WorkspaceId(1)).unwrap());
        assert_eq!(c.persistent_ids(), vec![1]);
        assert!(c.set_persistent(WorkspaceId(2), true).is_err());
    }

    //  Mock CommandSource

    /// A test double that emits a fixed sequence of events.
    struct MockSource {
        events: Vec<LifecycleEvent>,
    }

    impl CommandSource for MockSource {
        type Error = super::mock::RecorderError;

        fn run(&mut self, sink: mpsc::Sender<Message>) -> Result<(), Self::Error> {
            for event in self.events.drain(..) {
                let _ = sink.send(Message::Event(event));
            }
            Ok(())
        }
    }

    #[test]
    fn mock_source_emits_messages_in_order() {
        let mut src = MockSource {
            events: vec![
                LifecycleEvent::ConfigReloaded,
                LifecycleEvent::MonitorAdded {
                    id: MonitorId(2),
                    name: "HDMI-A-1".into(),
                },
            ],
        };
        let (tx, rx) = mpsc::channel();
        src.run(tx).unwrap();
        let msgs: Vec<Message> = rx.try_iter().collect();
        assert_eq!(msgs.len(), 2);
        assert!(matches!(msgs[0], Message::Event(LifecycleEvent::ConfigReloaded)));
        assert!(matches!(
            &msgs[1],
            Message::Event(LifecycleEvent::MonitorAdded { id: MonitorId(2), .. })
        ));
    }
}
