//! Charm configuration with change detection across hook invocations.
//!
//! The runtime hands each invocation the full current configuration via
//! `config-get`. To let a hook see what *changed* since it last ran,
//! the previous view is persisted as a JSON snapshot inside the charm
//! directory and diffed against the fresh one on load. Keys that only
//! exist in the previous snapshot are carried forward, so a hook can
//! stash arbitrary values for a later invocation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::exec::{argv, run_json};

/// File the previous snapshot is persisted to, inside `CHARM_DIR`.
const STATE_FILE_NAME: &str = ".juju-persistent-config";

/// A [`Config`] shared between a hook handler and the after-callback
/// that persists it.
pub type SharedConfig = Arc<Mutex<Config>>;

/// The charm's configuration for this invocation, diffable against the
/// last persisted view.
///
/// Only `current` is ever mutated; the previous snapshot is read once
/// at load time and stays fixed for the rest of the process.
pub struct Config {
    current: Map<String, Value>,
    previous: Option<Map<String, Value>>,
    path: PathBuf,
    implicit_save: bool,
}

impl Config {
    pub(crate) fn new(current: Map<String, Value>, path: PathBuf) -> Self {
        Self {
            current,
            previous: None,
            path,
            implicit_save: true,
        }
    }

    /// Load the charm configuration from the runtime.
    ///
    /// Returns `Ok(None)` when `config-get` output does not decode as a
    /// JSON object, meaning the charm has no configuration available. When a
    /// persisted snapshot exists at the default path it is loaded as
    /// the previous view.
    pub fn load(env: &Environment) -> Result<Option<Config>> {
        let value = match run_json(env.runner(), &argv(&["config-get", "--format=json"])) {
            Ok(value) => value,
            Err(Error::Decode { .. }) => {
                debug!("config-get output did not decode; no configuration available");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let current = match value {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => {
                warn!("config-get returned a non-object payload; no configuration available");
                return Ok(None);
            }
        };

        let charm_dir = env.charm_dir().unwrap_or_else(|| PathBuf::from("."));
        let mut config = Config::new(current, charm_dir.join(STATE_FILE_NAME));
        if config.path.exists() {
            config.load_previous(None)?;
        }
        Ok(Some(config))
    }

    /// Fetch a single config key straight from the runtime, without any
    /// snapshot machinery. `Ok(None)` when the output does not decode.
    pub fn scoped(env: &Environment, scope: &str) -> Result<Option<Value>> {
        match run_json(env.runner(), &argv(&["config-get", scope, "--format=json"])) {
            Ok(value) => Ok(Some(value)),
            Err(Error::Decode { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Load the previous snapshot from disk, optionally redirecting the
    /// storage location. Subsequent [`save`](Self::save) calls write to
    /// the same (possibly redirected) path.
    ///
    /// Keys present only in the previous snapshot are copied into the
    /// current view; the previous record itself keeps its own copy, so
    /// later mutation of `current` cannot alter it.
    pub fn load_previous(&mut self, path: Option<&Path>) -> Result<()> {
        if let Some(p) = path {
            self.path = p.to_path_buf();
        }
        let raw = fs::read_to_string(&self.path)?;
        let previous: Map<String, Value> =
            serde_json::from_str(&raw).map_err(|source| Error::State {
                path: self.path.clone(),
                source,
            })?;

        for (key, value) in &previous {
            if !self.current.contains_key(key) {
                self.current.insert(key.clone(), value.clone());
            }
        }
        self.previous = Some(previous);
        Ok(())
    }

    /// Whether the value for `key` differs from the previous hook run.
    ///
    /// With no previous snapshot (the first invocation ever for this
    /// unit) every key reads as changed. A key absent from one side
    /// compares as JSON null.
    pub fn changed(&self, key: &str) -> bool {
        let previous = match &self.previous {
            None => return true,
            Some(map) => map,
        };
        previous.get(key).unwrap_or(&Value::Null) != self.current.get(key).unwrap_or(&Value::Null)
    }

    /// Value this key had on the previous hook run, if any.
    pub fn previous_value(&self, key: &str) -> Option<&Value> {
        self.previous.as_ref().and_then(|map| map.get(key))
    }

    /// Persist the current view as JSON to the storage path.
    ///
    /// Called automatically at the end of a successful dispatch when
    /// wired via [`Hooks::persist_on_success`](crate::hooks::Hooks::persist_on_success)
    /// and the implicit-save flag is set. I/O failures are fatal.
    pub fn save(&self) -> Result<()> {
        debug!(path = %self.path.display(), "persisting config snapshot");
        fs::write(&self.path, Value::Object(self.current.clone()).to_string())?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.current.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.current.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.current.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.current.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Iterate over the current key/value view.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.current.iter()
    }

    pub fn implicit_save(&self) -> bool {
        self.implicit_save
    }

    /// Control whether the dispatcher-wired after-callback saves this
    /// config. On by default.
    pub fn set_implicit_save(&mut self, on: bool) {
        self.implicit_save = on;
    }

    /// Storage path the snapshot persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wrap for sharing between a handler and the save callback.
    pub fn shared(self) -> SharedConfig {
        Arc::new(Mutex::new(self))
    }
}
