//! Application configuration.
//!
//! Three layers, from the outside in:
//!
//! * [`Config`] — the JSON file at `$XDG_CONFIG_HOME/hyprpool/config.json`.
//! * [`ConfigStore`] — a string-keyed integer store.  Keys must be
//!   registered (with a default) before they can be read, one `count` and
//!   one `priority` key per monitor.
//! * [`ConfigSnapshot`] — per-monitor [`MonitorConfig`] values read out of
//!   the store, looked up by [`MonitorId`].
//!
//! # Example
//!
//! ```json
//! {
//!   "monitors": {
//!     "DP-1": { "count": 3, "priority": 1 },
//!     "HDMI-A-1": { "count": 2, "priority": 2 }
//!   }
//! }
//! ```

use crate::command::{MonitorId, MonitorInfo};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Prefix of every key hyprpool registers.
pub const NAMESPACE: &str = "plugin:hyprpool";

/// Pool size for monitors without an explicit `count`.
pub const DEFAULT_COUNT: i64 = 10;

/// Priority for monitors without an explicit `priority`: created last.
pub const DEFAULT_PRIORITY: i64 = i64::MAX;

/// Key holding the pool size of `monitor`.
pub fn count_key(monitor: &str) -> String {
    format!("{}:{}:count", NAMESPACE, monitor)
}

/// Key holding the creation priority of `monitor`.
pub fn priority_key(monitor: &str) -> String {
    format!("{}:{}:priority", NAMESPACE, monitor)
}

//  Config file

/// Top-level configuration file.
///
/// Every field is optional — a minimal `{}` file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Per-monitor settings, keyed by monitor name.
    #[serde(default)]
    pub monitors: BTreeMap<String, MonitorSection>,
}

/// One `"monitors"` entry.  Unset fields keep the registered default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    pub count: Option<i64>,
    pub priority: Option<i64>,
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(config)
    }

    /// Flattened `key -> value` pairs for every value the file sets.
    fn entries(&self) -> impl Iterator<Item = (String, i64)> + '_ {
        self.monitors.iter().flat_map(|(name, section)| {
            let count = section.count.map(|v| (count_key(name), v));
            let priority = section.priority.map(|v| (priority_key(name), v));
            count.into_iter().chain(priority)
        })
    }
}

/// Where a reload reads its configuration from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Re-read the JSON file on every reload.  A missing or broken file
    /// yields the defaults.
    File(PathBuf),
    /// A fixed configuration.
    Inline(Config),
}

impl ConfigSource {
    /// Produce the current configuration.
    pub fn load(&self) -> Config {
        match self {
            ConfigSource::File(path) => match Config::load(path) {
                Ok(cfg) => {
                    info!("loaded config from {}", path.display());
                    cfg
                }
                Err(e) => {
                    info!("no usable config file ({}), using defaults", e);
                    Config::default()
                }
            },
            ConfigSource::Inline(cfg) => cfg.clone(),
        }
    }
}

//  Key-value store

/// String-keyed integer store with registered defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    defaults: HashMap<String, i64>,
    values: HashMap<String, i64>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` with `default`.  Registering an existing key keeps
    /// its current value.
    pub fn register(&mut self, key: impl Into<String>, default: i64) {
        let key = key.into();
        self.values.entry(key.clone()).or_insert(default);
        self.defaults.entry(key).or_insert(default);
    }

    /// Register the `count` and `priority` keys for `monitor`.
    pub fn register_monitor(&mut self, monitor: &str) {
        self.register(count_key(monitor), DEFAULT_COUNT);
        self.register(priority_key(monitor), DEFAULT_PRIORITY);
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.defaults.contains_key(key)
    }

    /// Reset every registered key to its default, then overlay the values
    /// `config` sets for registered keys.
    pub fn apply(&mut self, config: &Config) {
        self.values = self.defaults.clone();
        for (key, value) in config.entries() {
            match self.values.get_mut(&key) {
                Some(slot) => *slot = value,
                None => debug!("ignoring unregistered config key {}", key),
            }
        }
    }

    /// Read a registered key.
    pub fn get(&self, key: &str) -> Result<i64, ConfigError> {
        self.values
            .get(key)
            .copied()
            .ok_or_else(|| ConfigError::Missing { key: key.to_string() })
    }
}

//  Snapshot

/// Desired pool settings for one monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Number of workspaces in the pool.
    pub count: usize,
    /// Creation order during a rebuild; lower comes first.
    pub priority: i64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT as usize,
            priority: DEFAULT_PRIORITY,
        }
    }
}

/// Per-monitor settings as of the last reload.
#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    monitors: HashMap<MonitorId, MonitorConfig>,
}

impl ConfigSnapshot {
    /// Read the settings of every monitor in `monitors` from `store`.
    pub fn load(store: &ConfigStore, monitors: &[MonitorInfo]) -> Result<Self, ConfigError> {
        let mut snapshot = Self::default();
        for monitor in monitors {
            snapshot.load_monitor(store, monitor)?;
        }
        Ok(snapshot)
    }

    /// Read (or re-read) the settings of a single monitor.
    pub fn load_monitor(
        &mut self,
        store: &ConfigStore,
        monitor: &MonitorInfo,
    ) -> Result<(), ConfigError> {
        let count = store.get(&count_key(&monitor.name))?;
        let priority = store.get(&priority_key(&monitor.name))?;
        let config = MonitorConfig {
            count: usize::try_from(count).unwrap_or(0),
            priority,
        };
        debug!(
            "monitor {} ({}): count={} priority={}",
            monitor.name, monitor.id, config.count, config.priority
        );
        self.monitors.insert(monitor.id, config);
        Ok(())
    }

    /// Settings for `monitor`, or the defaults if it was never loaded.
    pub fn get(&self, monitor: MonitorId) -> MonitorConfig {
        self.monitors.get(&monitor).copied().unwrap_or_default()
    }
}

/// Error from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("config value not found: {key}")]
    Missing { key: String },
}
