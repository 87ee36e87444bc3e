//! Action parameter access and results.
//!
//! Actions are operator-triggered invocations delivered through the
//! same process contract as hooks, with their own parameter and result
//! channel.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::env::{Environment, JUJU_ACTION_NAME, JUJU_ACTION_TAG, JUJU_ACTION_UUID};
use crate::error::Result;
use crate::exec::run_json;

/// Access to the currently executing action.
pub struct Actions<'a> {
    env: &'a Environment,
}

impl<'a> Actions<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Self { env }
    }

    /// Value of one action parameter, or all parameters when `key` is
    /// `None`.
    pub fn get(&self, key: Option<&str>) -> Result<Value> {
        let mut cmd = vec!["action-get".to_string()];
        if let Some(key) = key {
            cmd.push(key.to_string());
        }
        cmd.push("--format=json".to_string());
        run_json(self.env.runner(), &cmd)
    }

    /// Set values to be returned after the action finishes.
    pub fn set(&self, values: &BTreeMap<String, String>) -> Result<()> {
        let mut cmd = vec!["action-set".to_string()];
        for (key, value) in values {
            cmd.push(format!("{key}={value}"));
        }
        self.env.runner().run(&cmd)?;
        Ok(())
    }

    /// Mark the action failed with an error message. Values already set
    /// via [`set`](Self::set) are preserved.
    pub fn fail(&self, message: &str) -> Result<()> {
        self.env
            .runner()
            .run(&["action-fail".to_string(), message.to_string()])?;
        Ok(())
    }

    /// Name of the currently executing action.
    pub fn name(&self) -> Option<&str> {
        self.env.var(JUJU_ACTION_NAME)
    }

    /// UUID of the currently executing action.
    pub fn uuid(&self) -> Option<&str> {
        self.env.var(JUJU_ACTION_UUID)
    }

    /// Tag of the currently executing action.
    pub fn tag(&self) -> Option<&str> {
        self.env.var(JUJU_ACTION_TAG)
    }
}
