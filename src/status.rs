//! Workload status reporting.
//!
//! The runtime shows one workload state and message per unit. The
//! accepted states are a closed set; anything else is rejected here,
//! before a command ever runs. Runtimes predating `status-set` get the
//! message through `juju-log` instead.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::exec::{argv, run_json};
use crate::log::{Level, log};

/// Workload states the runtime accepts for `status-set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadState {
    Maintenance,
    Blocked,
    Waiting,
    Active,
}

impl WorkloadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadState::Maintenance => "maintenance",
            WorkloadState::Blocked => "blocked",
            WorkloadState::Waiting => "waiting",
            WorkloadState::Active => "active",
        }
    }
}

impl fmt::Display for WorkloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "maintenance" => Ok(WorkloadState::Maintenance),
            "blocked" => Ok(WorkloadState::Blocked),
            "waiting" => Ok(WorkloadState::Waiting),
            "active" => Ok(WorkloadState::Active),
            other => Err(Error::InvalidArgument(format!(
                "`{other}` is not a valid workload state"
            ))),
        }
    }
}

/// Report workload state with a message visible in the runtime's
/// status output. The state string is validated before any command
/// executes.
pub fn status_set(env: &Environment, state: &str, message: &str) -> Result<()> {
    set(env, state.parse()?, message)
}

/// Typed variant of [`status_set`].
pub fn set(env: &Environment, state: WorkloadState, message: &str) -> Result<()> {
    let cmd = argv(&["status-set", state.as_str(), message]);
    match env.runner().run(&cmd) {
        Ok(_) => Ok(()),
        Err(Error::CommandNotFound { .. }) => {
            log(env, &format!("status-set failed: {state} {message}"), Level::Info)
        }
        Err(e) => Err(e),
    }
}

/// The previously set workload state and message. Runtimes without
/// `status-get` report `("unknown", "")`.
pub fn status_get(env: &Environment) -> Result<(String, String)> {
    #[derive(Deserialize)]
    struct Payload {
        status: String,
        #[serde(default)]
        message: String,
    }

    let cmd = argv(&["status-get", "--format=json", "--include-data"]);
    let value = match run_json(env.runner(), &cmd) {
        Ok(value) => value,
        Err(Error::CommandNotFound { .. }) => return Ok(("unknown".to_string(), String::new())),
        Err(e) => return Err(e),
    };
    let payload: Payload = serde_json::from_value(value).map_err(|source| Error::Decode {
        program: "status-get".to_string(),
        source,
    })?;
    Ok((payload.status, payload.message))
}
