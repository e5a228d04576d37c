//! Command socket.
//!
//! External tools (key bindings, scripts, the `hyprpool` CLI itself) connect
//! to the socket, send one request per line and read back one JSON
//! [`CommandResult`](crate::command::CommandResult) per request.

pub mod client;
pub mod listener;
