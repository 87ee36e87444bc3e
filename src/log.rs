//! Message forwarding to the runtime log (`juju-log`).
//!
//! This is the charm-visible logging channel shown by the runtime's
//! debug tooling; the crate's own diagnostics go through `tracing`.

use std::fmt;

use crate::env::Environment;
use crate::error::Result;
use crate::exec::argv;

/// Log levels understood by `juju-log`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Critical => "CRITICAL",
            Level::Error => "ERROR",
            Level::Warning => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write a message to the runtime log at the given level.
pub fn log(env: &Environment, message: &str, level: Level) -> Result<()> {
    env.runner()
        .run(&argv(&["juju-log", "-l", level.as_str(), message]))?;
    Ok(())
}
