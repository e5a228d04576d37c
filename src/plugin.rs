//! The long-lived state of hyprpool and the hooks that drive it.
//!
//! [`Plugin`] owns the compositor handle, the configuration store and
//! snapshot, and the [`PoolManager`].  It is driven one [`Message`] at a
//! time from the main loop, so no state is ever shared between threads.

use crate::command::{Command, CommandResult, MonitorId, MonitorInfo};
use crate::config::{count_key, Config, ConfigError, ConfigSnapshot, ConfigSource, ConfigStore};
use crate::ledger::{Ledger, LedgerError};
use crate::pool::PoolManager;
use crate::router;
use crate::traits::{Compositor, LifecycleEvent, Message};
use log::{debug, error, info};

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The host speaks a different interface version than hyprpool was
    /// built for.
    #[error("version mismatch: built for {expected}, host reports {actual}")]
    VersionMismatch { expected: String, actual: String },
    #[error("compositor error: {0}")]
    Compositor(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Errors from a lifecycle hook after startup.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("compositor error: {0}")]
    Compositor(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// What the main loop should do after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Refuse to start against a host version other than `expected`.
///
/// On mismatch the user gets a notification before the error is returned.
pub fn check_version<C: Compositor>(compositor: &C, expected: &str) -> Result<(), StartupError> {
    let actual = compositor
        .api_version()
        .map_err(|e| StartupError::Compositor(e.to_string()))?;
    if actual == expected {
        debug!("host version {} matches", actual);
        return Ok(());
    }
    if let Err(e) = compositor.notify("[hyprpool] Mismatched host version! Can't proceed.") {
        error!("could not show notification: {}", e);
    }
    Err(StartupError::VersionMismatch {
        expected: expected.to_string(),
        actual,
    })
}

/// Per-monitor workspace pools on top of a [`Compositor`].
pub struct Plugin<C: Compositor> {
    compositor: C,
    source: ConfigSource,
    config: Config,
    store: ConfigStore,
    snapshot: ConfigSnapshot,
    pools: PoolManager,
}

impl<C: Compositor> Plugin<C> {
    /// Run the startup sequence and build the initial pools.
    ///
    /// `expected_version` is the host version hyprpool was built against;
    /// `None` skips the check.
    pub fn init(
        compositor: C,
        source: ConfigSource,
        expected_version: Option<&str>,
    ) -> Result<Self, StartupError> {
        if let Some(expected) = expected_version {
            check_version(&compositor, expected)?;
        }

        let monitors = compositor
            .monitors()
            .map_err(|e| StartupError::Compositor(e.to_string()))?;
        info!("found {} monitor(s)", monitors.len());

        let mut store = ConfigStore::new();
        for monitor in &monitors {
            store.register_monitor(&monitor.name);
        }

        let config = source.load();
        store.apply(&config);
        let snapshot = ConfigSnapshot::load(&store, &monitors)?;

        let mut plugin = Self {
            compositor,
            source,
            config,
            store,
            snapshot,
            pools: PoolManager::new(),
        };
        plugin
            .pools
            .rebuild_all(&plugin.compositor, &plugin.snapshot, &monitors)?;
        Ok(plugin)
    }

    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    pub fn ledger(&self) -> &Ledger {
        self.pools.ledger()
    }

    /// Process one message from the main loop.
    pub fn handle(&mut self, message: Message) -> Result<Flow, PluginError> {
        match message {
            Message::Command { command, reply } => {
                let result = self.handle_command(&command);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            Message::Event(LifecycleEvent::ConfigReloaded) => self.on_config_reloaded()?,
            Message::Event(LifecycleEvent::MonitorAdded { id, name }) => {
                self.on_monitor_added(id, &name)?
            }
            Message::Event(LifecycleEvent::MonitorRemoved { id, name }) => {
                self.on_monitor_removed(id, &name)
            }
            Message::Shutdown => {
                info!("shutdown requested");
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    /// Run a user command.
    pub fn handle_command(&self, command: &Command) -> CommandResult {
        router::route(&self.compositor, self.pools.ledger(), command)
    }

    /// Re-read the configuration and rebuild every pool.
    pub fn on_config_reloaded(&mut self) -> Result<(), PluginError> {
        info!("config reloaded, rebuilding pools");
        let monitors = self.monitors()?;
        for monitor in &monitors {
            if !self.store.is_registered(&count_key(&monitor.name)) {
                debug!("registering keys for {} on reload", monitor.name);
                self.store.register_monitor(&monitor.name);
            }
        }

        self.config = self.source.load();
        self.store.apply(&self.config);
        self.snapshot = ConfigSnapshot::load(&self.store, &monitors)?;
        self.pools
            .rebuild_all(&self.compositor, &self.snapshot, &monitors)?;
        Ok(())
    }

    /// Give a newly connected monitor its pool.  Other pools are untouched.
    pub fn on_monitor_added(&mut self, id: MonitorId, name: &str) -> Result<(), PluginError> {
        info!("monitor added: {} ({})", name, id);
        let monitors = self.monitors()?;
        let Some(monitor) = monitors
            .iter()
            .find(|m| m.id == id)
            .or_else(|| monitors.iter().find(|m| m.name == name))
        else {
            debug!("monitor {} is already gone", name);
            return Ok(());
        };

        if !self.store.is_registered(&count_key(&monitor.name)) {
            self.store.register_monitor(&monitor.name);
            self.store.apply(&self.config);
        }
        self.snapshot.load_monitor(&self.store, monitor)?;
        self.pools
            .create_pool(&self.compositor, &self.snapshot, monitor);
        Ok(())
    }

    /// Release the pool of a disconnected monitor.  Events without an id
    /// are matched by the name recorded when the pool was created.
    pub fn on_monitor_removed(&mut self, id: Option<MonitorId>, name: &str) {
        info!("monitor removed: {}", name);
        match id.or_else(|| self.pools.ledger().monitor_by_name(name)) {
            Some(id) => {
                self.pools.remove_pool(&self.compositor, id);
            }
            None => debug!("no pool recorded for {}", name),
        }
    }

    /// Unpin every workspace so nothing stays pinned after hyprpool exits.
    pub fn shutdown(&mut self) -> Result<(), LedgerError> {
        info!("tearing down all pools");
        self.pools.teardown_all(&self.compositor)
    }

    fn monitors(&self) -> Result<Vec<MonitorInfo>, PluginError> {
        self.compositor
            .monitors()
            .map_err(|e| PluginError::Compositor(e.to_string()))
    }
}

//  Tests
