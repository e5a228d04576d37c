//! **hyprpool** — per-monitor workspace pools for Hyprland.
//!
//! Every monitor owns a contiguous pool of workspace ids, handed out in
//! monitor priority order from one monotonically increasing counter.  Users
//! address workspaces *relative* to the monitor they are on: "workspace 2"
//! on the left screen and "workspace 2" on the right screen are different
//! workspaces, each pinned to its own output.
//!
//! # Architecture
//!
//! The crate is organised around two core traits:
//!
//! * [`traits::Compositor`] — abstracts monitor queries, workspace
//!   creation and dispatching so the pool logic is not coupled to any
//!   specific compositor.
//! * [`traits::CommandSource`] — abstracts the transports that deliver
//!   user commands and lifecycle events (a Unix socket, the compositor's
//!   event stream) so the main loop is not coupled to any IPC mechanism.
//!
//! [`plugin::Plugin`] owns all state and consumes
//! [`traits::Message`]s one at a time.  Concrete implementations live in
//! [`hyprland`] (Hyprland IPC), [`ipc`] (Unix-socket command listener) and
//! [`signals`] (termination signals).

pub mod command;
pub mod config;
pub mod hyprland;
pub mod ipc;
pub mod ledger;
pub mod plugin;
pub mod pool;
pub mod resolver;
pub mod router;
pub mod signals;
pub mod traits;
