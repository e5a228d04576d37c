//! Turning what the user typed into a concrete workspace.
//!
//! Every "not found" case here has a defined answer instead of an error:
//!
//! | situation                                  | answer                                   |
//! |--------------------------------------------|------------------------------------------|
//! | index does not parse, is `<= 0` or too big | last workspace of the pool               |
//! | monitor has an empty pool                  | its active workspace, else `"1"`         |
//! | no focused monitor                         | monitor under the cursor                 |
//! | current monitor not in the monitor list    | it is its own "next" monitor             |

use crate::command::{MonitorInfo, WorkspaceId};
use crate::ledger::Ledger;
use crate::traits::Compositor;
use std::fmt;

/// Workspace label used when a monitor has neither a pool nor an active
/// workspace.
pub const DEFAULT_WORKSPACE_LABEL: &str = "1";

/// Result of resolving a relative index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedWorkspace {
    /// A workspace from the monitor's pool.
    Pooled(WorkspaceId),
    /// A compositor workspace label, used when the pool is empty.
    Label(String),
}

impl fmt::Display for ResolvedWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedWorkspace::Pooled(id) => write!(f, "{}", id),
            ResolvedWorkspace::Label(label) => f.write_str(label),
        }
    }
}

/// Resolve the 1-based `relative_index` against the pool of `monitor`.
pub fn resolve(ledger: &Ledger, monitor: &MonitorInfo, relative_index: &str) -> ResolvedWorkspace {
    let pool = ledger.pool(monitor.id);
    let Some(last) = pool.last() else {
        return active_workspace_or_default(monitor);
    };
    match zero_based(relative_index) {
        Some(index) if index < pool.len() => ResolvedWorkspace::Pooled(pool[index]),
        _ => ResolvedWorkspace::Pooled(*last),
    }
}

/// `"3"` → `Some(2)`; anything that is not a positive integer → `None`.
fn zero_based(relative_index: &str) -> Option<usize> {
    let n: i64 = relative_index.trim().parse().ok()?;
    usize::try_from(n.checked_sub(1)?).ok()
}

/// The workspace `monitor` currently shows, or [`DEFAULT_WORKSPACE_LABEL`].
pub fn active_workspace_or_default(monitor: &MonitorInfo) -> ResolvedWorkspace {
    ResolvedWorkspace::Label(
        monitor
            .active_workspace
            .clone()
            .unwrap_or_else(|| DEFAULT_WORKSPACE_LABEL.to_string()),
    )
}

/// The monitor commands act on: the last-focused one, otherwise the one
/// under the cursor.
pub fn current_monitor<'a, C: Compositor>(
    compositor: &C,
    monitors: &'a [MonitorInfo],
) -> Result<Option<&'a MonitorInfo>, C::Error> {
    if let Some(focused) = monitors.iter().find(|m| m.focused) {
        return Ok(Some(focused));
    }
    Ok(compositor
        .cursor_position()?
        .and_then(|(x, y)| monitors.iter().find(|m| m.contains(x, y))))
}

/// The monitor after `current` in enumeration order, wrapping around.
///
/// A monitor missing from `monitors` (or the only one in it) is its own
/// next monitor.
pub fn next_monitor<'a>(monitors: &'a [MonitorInfo], current: &'a MonitorInfo) -> &'a MonitorInfo {
    monitors
        .iter()
        .position(|m| m.id == current.id)
        .map(|i| &monitors[(i + 1) % monitors.len()])
        .unwrap_or(current)
}
