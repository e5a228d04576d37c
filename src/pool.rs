//! Pool lifecycle: creating, removing and rebuilding per-monitor pools.
//!
//! [`PoolManager`] owns the [`Ledger`] and is the only thing that mutates
//! it.  Every call into the [`Compositor`] is best-effort: a failed step is
//! logged and skipped, nothing is rolled back and nothing is retried.

use crate::command::{MonitorId, MonitorInfo, WorkspaceId};
use crate::config::ConfigSnapshot;
use crate::ledger::{Ledger, LedgerError};
use crate::traits::Compositor;
use log::{debug, info, warn};

/// Creates and tears down workspace pools.
#[derive(Debug, Default)]
pub struct PoolManager {
    ledger: Ledger,
}

impl PoolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access for the resolver and for tests.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Give `monitor` its pool of `snapshot.get(monitor).count` workspaces.
    ///
    /// Disabled and mirrored monitors are skipped, as is a monitor that
    /// already holds a pool.  Returns the number of ids allocated.
    pub fn create_pool<C: Compositor>(
        &mut self,
        compositor: &C,
        snapshot: &ConfigSnapshot,
        monitor: &MonitorInfo,
    ) -> usize {
        if !monitor.is_pool_eligible() {
            debug!(
                "skipping {} (disabled={}, mirror_of={:?})",
                monitor.name, monitor.disabled, monitor.mirror_of
            );
            return 0;
        }
        if self.ledger.has_pool(monitor.id) {
            debug!("{} already has a pool, leaving it alone", monitor.name);
            return 0;
        }

        let count = snapshot.get(monitor.id).count;
        self.ledger.open(monitor.id, &monitor.name);
        for _ in 0..count {
            let id = self.ledger.allocate_next();
            self.ledger.push(monitor.id, &monitor.name, id);
            attach_workspace(compositor, id, monitor);
        }

        info!(
            "created pool for {} ({}): {:?}",
            monitor.name,
            monitor.id,
            self.ledger
                .pool(monitor.id)
                .iter()
                .map(|id| id.0)
                .collect::<Vec<_>>()
        );
        count
    }

    /// Release the pool of `monitor`, clearing the persistent flag of every
    /// workspace that still exists.  Returns `false` if there was no pool.
    pub fn remove_pool<C: Compositor>(&mut self, compositor: &C, monitor: MonitorId) -> bool {
        let Some(pool) = self.ledger.remove(monitor) else {
            debug!("monitor {} has no pool", monitor);
            return false;
        };
        for id in pool.ids() {
            release_workspace(compositor, *id);
        }
        info!(
            "removed pool of {} ({}), {} workspace(s) released",
            pool.monitor_name(),
            monitor,
            pool.len()
        );
        true
    }

    /// Remove every pool and restart numbering at 1.
    pub fn teardown_all<C: Compositor>(&mut self, compositor: &C) -> Result<(), LedgerError> {
        for monitor in self.ledger.monitors() {
            self.remove_pool(compositor, monitor);
        }
        self.ledger.reset()
    }

    /// Tear everything down and recreate pools for `monitors`, lowest
    /// priority value first.
    ///
    /// The sort is stable, so monitors with equal priority keep the
    /// compositor's enumeration order.
    pub fn rebuild_all<C: Compositor>(
        &mut self,
        compositor: &C,
        snapshot: &ConfigSnapshot,
        monitors: &[MonitorInfo],
    ) -> Result<(), LedgerError> {
        let mut ordered: Vec<&MonitorInfo> = monitors.iter().collect();
        ordered.sort_by_key(|m| snapshot.get(m.id).priority);

        self.teardown_all(compositor)?;
        info!(
            "rebuilding pools in order: {:?}",
            ordered.iter().map(|m| m.name.as_str()).collect::<Vec<_>>()
        );
        for monitor in ordered {
            self.create_pool(compositor, snapshot, monitor);
        }
        Ok(())
    }
}

/// Make sure workspace `id` exists, lives on `monitor` and is persistent.
fn attach_workspace<C: Compositor>(compositor: &C, id: WorkspaceId, monitor: &MonitorInfo) {
    let exists = compositor.workspace_exists(id).unwrap_or_else(|e| {
        warn!("lookup of workspace {} failed: {}", id, e);
        false
    });
    if !exists {
        if let Err(e) = compositor.create_workspace(id, monitor) {
            warn!("could not create workspace {} on {}: {}", id, monitor.name, e);
            return;
        }
    }
    if let Err(e) = compositor.move_workspace_to_monitor(id, monitor) {
        warn!("could not move workspace {} to {}: {}", id, monitor.name, e);
    }
    if let Err(e) = compositor.set_persistent(id, true) {
        warn!("could not pin workspace {}: {}", id, e);
    }
    debug!("  workspace {} -> {}", id, monitor.name);
}

/// Let the compositor collect workspace `id` once it is empty.
fn release_workspace<C: Compositor>(compositor: &C, id: WorkspaceId) {
    match compositor.workspace_exists(id) {
        Ok(true) => {
            if let Err(e) = compositor.set_persistent(id, false) {
                warn!("could not unpin workspace {}: {}", id, e);
            }
        }
        Ok(false) => debug!("workspace {} already gone", id),
        Err(e) => warn!("lookup of workspace {} failed: {}", id, e),
    }
}

//  Tests
