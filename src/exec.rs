//! Command-execution boundary to the orchestration runtime.
//!
//! Every runtime interaction funnels through [`CommandRunner::run`]:
//! spawn the named hook tool, capture its stdout, and surface nonzero
//! exits and missing binaries as typed errors. Higher layers add JSON
//! and YAML decoding on top of this one primitive, which also makes the
//! whole crate testable with a recording fake runner.

use std::process::Command;

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};

/// Executes a hook tool and returns its captured stdout as UTF-8 text.
pub trait CommandRunner: Send + Sync {
    fn run(&self, argv: &[String]) -> Result<String>;
}

/// Production runner over `std::process::Command`.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[String]) -> Result<String> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::InvalidArgument("empty command line".to_string()))?;

        debug!(command = %program, "running hook tool");
        let output = Command::new(program).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::CommandNotFound {
                    program: program.clone(),
                }
            } else {
                Error::Io(e)
            }
        })?;

        if !output.status.success() {
            return Err(Error::CommandFailed {
                program: program.clone(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Run a command and decode its stdout as JSON.
pub fn run_json(runner: &dyn CommandRunner, argv: &[String]) -> Result<Value> {
    let raw = runner.run(argv)?;
    serde_json::from_str(&raw).map_err(|source| Error::Decode {
        program: argv.first().cloned().unwrap_or_default(),
        source,
    })
}

/// Build an owned argv from string literals.
pub(crate) fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}
