//! Hook execution environment.
//!
//! Centralized definition of the `JUJU_*` environment variables the
//! runtime sets for each hook invocation, plus [`Environment`]: typed
//! access over a snapshot of those variables and the command gateway
//! used for structured queries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::exec::{CommandRunner, SystemRunner, argv, run_json};

/// Root directory of the deployed charm
pub const CHARM_DIR: &str = "CHARM_DIR";

/// Name of the currently executing hook
pub const JUJU_HOOK_NAME: &str = "JUJU_HOOK_NAME";

/// Name of the local unit (e.g. `mysql/0`)
pub const JUJU_UNIT_NAME: &str = "JUJU_UNIT_NAME";

/// Id of the relation the current hook is running for
pub const JUJU_RELATION_ID: &str = "JUJU_RELATION_ID";

/// Relation type of the current hook
pub const JUJU_RELATION: &str = "JUJU_RELATION";

/// Remote unit in a relation hook
pub const JUJU_REMOTE_UNIT: &str = "JUJU_REMOTE_UNIT";

/// Name of the currently executing action
pub const JUJU_ACTION_NAME: &str = "JUJU_ACTION_NAME";

/// UUID of the currently executing action
pub const JUJU_ACTION_UUID: &str = "JUJU_ACTION_UUID";

/// Tag of the currently executing action
pub const JUJU_ACTION_TAG: &str = "JUJU_ACTION_TAG";

const METADATA_FILE: &str = "metadata.yaml";

/// Relation endpoint declared in `metadata.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationSpec {
    pub interface: String,

    #[serde(default)]
    pub scope: Option<String>,
}

/// Side of a relation as declared in charm metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Provides,
    Requires,
    Peers,
}

/// Charm metadata (`metadata.yaml` contents).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    pub name: String,

    #[serde(default)]
    pub summary: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub provides: HashMap<String, RelationSpec>,

    #[serde(default)]
    pub requires: HashMap<String, RelationSpec>,

    #[serde(default)]
    pub peers: HashMap<String, RelationSpec>,
}

impl Metadata {
    fn section(&self, role: Role) -> &HashMap<String, RelationSpec> {
        match role {
            Role::Provides => &self.provides,
            Role::Requires => &self.requires,
            Role::Peers => &self.peers,
        }
    }

    /// All relation names this charm declares, across every role.
    pub fn relation_types(&self) -> Vec<String> {
        let mut types = Vec::new();
        for role in [Role::Provides, Role::Requires, Role::Peers] {
            types.extend(self.section(role).keys().cloned());
        }
        types
    }

    /// Role and interface for a declared relation name.
    pub fn relation_to_role_and_interface(&self, relation_name: &str) -> Option<(Role, &str)> {
        for role in [Role::Provides, Role::Requires, Role::Peers] {
            if let Some(spec) = self.section(role).get(relation_name) {
                return Some((role, spec.interface.as_str()));
            }
        }
        None
    }

    /// Interface a declared relation name uses.
    pub fn relation_to_interface(&self, relation_name: &str) -> Option<&str> {
        self.relation_to_role_and_interface(relation_name)
            .map(|(_, interface)| interface)
    }

    /// Relation names under `role` that use `interface`.
    pub fn relations_using(&self, role: Role, interface: &str) -> Vec<String> {
        self.section(role)
            .iter()
            .filter(|(_, spec)| spec.interface == interface)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// The runtime environment available to the currently executing hook.
///
/// Holds a snapshot of the process environment taken at construction
/// time and the gateway used for structured runtime queries. Both are
/// injectable, which keeps everything built on top of this testable.
pub struct Environment {
    vars: HashMap<String, String>,
    runner: Arc<dyn CommandRunner>,
    metadata: OnceCell<Metadata>,
}

impl Environment {
    /// Environment over the real process variables and system runner.
    pub fn new() -> Self {
        Self::with_runner(std::env::vars().collect(), Arc::new(SystemRunner))
    }

    /// Environment over explicit variables and a custom runner.
    pub fn with_runner(vars: HashMap<String, String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            vars,
            runner,
            metadata: OnceCell::new(),
        }
    }

    /// The gateway used for runtime queries.
    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    /// Raw environment variable lookup.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Root directory of the current charm.
    pub fn charm_dir(&self) -> Option<PathBuf> {
        self.var(CHARM_DIR).map(PathBuf::from)
    }

    /// Name of the currently executing hook, if any.
    pub fn hook_name(&self) -> Option<&str> {
        self.var(JUJU_HOOK_NAME)
    }

    /// Name of the local unit (e.g. `mysql/0`), or `None` outside a
    /// hook context.
    pub fn unit_name(&self) -> Option<&str> {
        self.var(JUJU_UNIT_NAME)
    }

    /// Name of the service the local unit belongs to; calling from the
    /// unit `mysql/0` returns `mysql`.
    pub fn service_name(&self) -> Option<&str> {
        self.unit_name().map(|unit| match unit.split_once('/') {
            Some((service, _)) => service,
            None => unit,
        })
    }

    /// Remote unit name when running inside a relation hook.
    pub fn remote_unit(&self) -> Option<&str> {
        self.var(JUJU_REMOTE_UNIT)
    }

    /// Id of the relation the current hook runs for.
    pub fn relation_id(&self) -> Option<&str> {
        self.var(JUJU_RELATION_ID)
    }

    /// Type of the relation the current hook runs for.
    pub fn relation_type(&self) -> Option<&str> {
        self.var(JUJU_RELATION)
    }

    /// Whether the current process executes as part of a relation hook.
    pub fn in_relation_hook(&self) -> bool {
        self.vars.contains_key(JUJU_RELATION)
    }

    /// Parsed charm metadata, read from `$CHARM_DIR/metadata.yaml` on
    /// first access and cached for the rest of the invocation.
    pub fn metadata(&self) -> Result<&Metadata> {
        self.metadata.get_or_try_init(|| {
            let dir = self
                .charm_dir()
                .ok_or_else(|| Error::InvalidArgument(format!("{CHARM_DIR} is not set")))?;
            read_metadata(&dir.join(METADATA_FILE))
        })
    }

    /// Charm name as declared in metadata.
    pub fn charm_name(&self) -> Result<String> {
        Ok(self.metadata()?.name.clone())
    }

    /// Query an attribute of the local unit via `unit-get`. Output that
    /// does not decode as JSON reads as "attribute unavailable".
    pub fn unit_get(&self, attribute: &str) -> Result<Option<Value>> {
        let cmd = argv(&["unit-get", "--format=json", attribute]);
        match run_json(self.runner(), &cmd) {
            Ok(value) => Ok(Some(value)),
            Err(Error::Decode { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

fn read_metadata(path: &Path) -> Result<Metadata> {
    let raw = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&raw).map_err(|source| Error::Metadata {
        path: path.to_path_buf(),
        source,
    })
}
