//! Workspace allocation ledger.
//!
//! The [`Ledger`] is the single authoritative table of which monitor owns
//! which workspace ids, plus the counter that issues new ids.
//!
//! Ids are handed out from one process-wide counter starting at 1, so
//! pools are always disjoint.  Removing a pool never returns its ids to the
//! counter; only [`Ledger::reset`] on an empty ledger starts over at 1.

use crate::command::{MonitorId, WorkspaceId};
use std::collections::BTreeMap;

/// First id issued by a fresh or reset ledger.
pub const FIRST_WORKSPACE_ID: u64 = 1;

/// The ordered workspace ids owned by one monitor.
///
/// Position `i` in [`ids`](Pool::ids) is the monitor-relative workspace
/// `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    /// Monitor name at creation time, used to match name-only events.
    monitor_name: String,
    ids: Vec<WorkspaceId>,
}

impl Pool {
    pub fn monitor_name(&self) -> &str {
        &self.monitor_name
    }

    pub fn ids(&self) -> &[WorkspaceId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Errors from misusing the ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Resetting now would let new ids collide with ids still in use.
    #[error("cannot reset ledger: {count} pool(s) still allocated")]
    OutstandingPools { count: usize },
}

/// `monitor -> ordered workspace ids`, plus the next id to hand out.
#[derive(Debug, Clone)]
pub struct Ledger {
    pools: BTreeMap<MonitorId, Pool>,
    next_id: u64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    /// An empty ledger whose first allocation is id 1.
    pub fn new() -> Self {
        Self {
            pools: BTreeMap::new(),
            next_id: FIRST_WORKSPACE_ID,
        }
    }

    //  Accessors

    /// Id the next [`allocate_next`](Self::allocate_next) will return.
    pub fn next_id(&self) -> WorkspaceId {
        WorkspaceId(self.next_id)
    }

    /// Ids owned by `monitor`; empty if it has no pool.
    pub fn pool(&self, monitor: MonitorId) -> &[WorkspaceId] {
        self.pools.get(&monitor).map(Pool::ids).unwrap_or(&[])
    }

    pub fn has_pool(&self, monitor: MonitorId) -> bool {
        self.pools.contains_key(&monitor)
    }

    /// Monitors that currently hold a pool.
    pub fn monitors(&self) -> Vec<MonitorId> {
        self.pools.keys().copied().collect()
    }

    /// Find a pool owner by the monitor name recorded at creation.
    pub fn monitor_by_name(&self, name: &str) -> Option<MonitorId> {
        self.pools
            .iter()
            .find(|(_, pool)| pool.monitor_name == name)
            .map(|(id, _)| *id)
    }

    /// Which monitor owns `workspace`, if any.
    pub fn owner_of(&self, workspace: WorkspaceId) -> Option<MonitorId> {
        self.pools
            .iter()
            .find(|(_, pool)| pool.ids.contains(&workspace))
            .map(|(id, _)| *id)
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    //  Mutation

    /// Hand out the next id.
    ///
    /// The counter is a `u64` and is assumed never to wrap within a session.
    pub fn allocate_next(&mut self) -> WorkspaceId {
        let id = self.next_id;
        self.next_id += 1;
        WorkspaceId(id)
    }

    /// Append `id` to the pool of `monitor`, creating the pool on first use.
    pub fn push(&mut self, monitor: MonitorId, monitor_name: &str, id: WorkspaceId) {
        self.pools
            .entry(monitor)
            .or_insert_with(|| Pool {
                monitor_name: monitor_name.to_string(),
                ids: Vec::new(),
            })
            .ids
            .push(id);
    }

    /// Start an (empty) pool for `monitor` without allocating anything.
    pub fn open(&mut self, monitor: MonitorId, monitor_name: &str) {
        self.pools.entry(monitor).or_insert_with(|| Pool {
            monitor_name: monitor_name.to_string(),
            ids: Vec::new(),
        });
    }

    /// Drop the pool of `monitor` and return it.  The counter is untouched.
    pub fn remove(&mut self, monitor: MonitorId) -> Option<Pool> {
        self.pools.remove(&monitor)
    }

    /// Start numbering from 1 again.
    ///
    /// Fails without changing anything while any pool is still allocated.
    pub fn reset(&mut self) -> Result<(), LedgerError> {
        if !self.pools.is_empty() {
            return Err(LedgerError::OutstandingPools {
                count: self.pools.len(),
            });
        }
        self.next_id = FIRST_WORKSPACE_ID;
        Ok(())
    }
}

//  Tests
