//! charmkit: a Rust library for writing Juju charm hooks.
//!
//! The orchestration runtime delivers each lifecycle event by spawning
//! the charm process with the event name as its first argument, and
//! exposes everything else (configuration, relation data, leadership,
//! status) through small hook tools invoked over argv. This crate wraps
//! that contract: a hook dispatcher with before/after lifecycle
//! callbacks, a config snapshot that detects changes across
//! invocations, and typed wrappers for the hook tools.
//!
//! ```no_run
//! use charmkit::{Config, Environment, Hooks, Outcome};
//!
//! fn main() -> charmkit::Result<()> {
//!     let env = Environment::new();
//!     let config = Config::load(&env)?.expect("charm has no config").shared();
//!
//!     let mut hooks = Hooks::new();
//!     hooks.persist_on_success(&config);
//!
//!     let cfg = config.clone();
//!     hooks.register("config_changed", move || {
//!         let cfg = cfg.lock().unwrap();
//!         if cfg.changed("port") {
//!             // reconfigure the workload
//!         }
//!         Ok(Outcome::Success)
//!     });
//!
//!     let args: Vec<String> = std::env::args().collect();
//!     let outcome = hooks.execute(&args)?;
//!     std::process::exit(outcome.code());
//! }
//! ```

pub mod actions;
pub mod config;
pub mod env;
pub mod error;
pub mod exec;
pub mod hooks;
pub mod leadership;
pub mod log;
pub mod network;
pub mod relation;
pub mod status;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{Config, SharedConfig};
pub use env::Environment;
pub use error::{Error, Result};
pub use hooks::{Callbacks, Hook, Hooks, Outcome, hook_fn};
