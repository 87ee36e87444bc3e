//! Hook registration and dispatch.
//!
//! The runtime delivers each lifecycle event by invoking the charm
//! process with the event name as its first argument. [`Hooks`] maps
//! event names to handlers and drives one dispatch cycle: run the
//! before-callbacks, run the handler, and only on confirmed success
//! drain the after-callbacks (notably the implicit config save). A
//! failed hook must not record completion side effects.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::config::SharedConfig;
use crate::error::{Error, Result};

/// Completion outcome a hook handler reports to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The handler finished; the process should exit 0.
    Success,
    /// The handler requests termination with the given exit code.
    Failure(i32),
}

impl Outcome {
    /// Exit code for the process boundary.
    pub fn code(&self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::Failure(code) => *code,
        }
    }

    /// Whether this outcome counts as success. A requested exit with
    /// code 0 does: after-callbacks still run for it.
    pub fn is_success(&self) -> bool {
        self.code() == 0
    }
}

/// A named hook handler.
///
/// Most handlers are closures adapted via [`hook_fn`]; implement this
/// directly when a handler carries its own state or name.
pub trait Hook: Send {
    /// Declared name, used when registering without explicit names.
    fn name(&self) -> &str;

    /// Run the handler body. `Err` means the hook failed; a requested
    /// early exit is expressed through [`Outcome::Failure`].
    fn run(&mut self) -> anyhow::Result<Outcome>;
}

struct FnHook<F> {
    name: String,
    f: F,
}

impl<F> Hook for FnHook<F>
where
    F: FnMut() -> anyhow::Result<Outcome> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&mut self) -> anyhow::Result<Outcome> {
        (self.f)()
    }
}

/// Adapt a closure into a named [`Hook`].
pub fn hook_fn<F>(name: &str, f: F) -> impl Hook + 'static
where
    F: FnMut() -> anyhow::Result<Outcome> + Send + 'static,
{
    FnHook {
        name: name.to_string(),
        f,
    }
}

type Callback = Box<dyn FnMut() -> anyhow::Result<()> + Send>;

/// Ordered lifecycle callbacks around a dispatch cycle.
///
/// Before-callbacks run in registration order ahead of the main hook
/// body; after-callbacks run in reverse registration order once the
/// hook has completed successfully.
#[derive(Default)]
pub struct Callbacks {
    before: Vec<Callback>,
    after: Vec<Callback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `f` to run before the main hook body (FIFO order).
    pub fn at_start<F>(&mut self, f: F)
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        self.before.push(Box::new(f));
    }

    /// Schedule `f` to run after successful hook completion (LIFO
    /// order).
    pub fn at_exit<F>(&mut self, f: F)
    where
        F: FnMut() -> anyhow::Result<()> + Send + 'static,
    {
        self.after.push(Box::new(f));
    }

    /// Run every before-callback in registration order, then clear the
    /// list.
    ///
    /// A failing callback aborts the run and leaves the whole list in
    /// place, so a later attempt starts again from the beginning; the
    /// list is cleared only after a fully successful pass.
    pub fn run_before(&mut self) -> Result<()> {
        for callback in self.before.iter_mut() {
            callback().map_err(Error::Callback)?;
        }
        self.before.clear();
        Ok(())
    }

    /// Run every after-callback in reverse registration order, then
    /// clear the list. Same failure policy as [`run_before`](Self::run_before).
    pub fn run_after(&mut self) -> Result<()> {
        for callback in self.after.iter_mut().rev() {
            callback().map_err(Error::Callback)?;
        }
        self.after.clear();
        Ok(())
    }

    /// Number of before-callbacks not yet drained.
    pub fn pending_before(&self) -> usize {
        self.before.len()
    }

    /// Number of after-callbacks not yet drained.
    pub fn pending_after(&self) -> usize {
        self.after.len()
    }
}

type SharedHook = Arc<Mutex<dyn Hook>>;

/// Maps event names to handlers and drives one dispatch cycle.
#[derive(Default)]
pub struct Hooks {
    handlers: HashMap<String, SharedHook>,
    callbacks: Callbacks,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifecycle callbacks consulted at the start and end of
    /// [`execute`](Self::execute).
    pub fn callbacks(&mut self) -> &mut Callbacks {
        &mut self.callbacks
    }

    /// Register `f` under `name`.
    ///
    /// A name containing `_` is also registered under its hyphenated
    /// spelling, so a handler registered as `config_changed` serves the
    /// `config-changed` event. The last registration for a name wins.
    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: FnMut() -> anyhow::Result<Outcome> + Send + 'static,
    {
        self.register_hook(hook_fn(name, f));
    }

    /// Register a [`Hook`] under its declared name, with the same
    /// hyphen aliasing as [`register`](Self::register).
    pub fn register_hook<H: Hook + 'static>(&mut self, hook: H) {
        let name = hook.name().to_string();
        let shared: SharedHook = Arc::new(Mutex::new(hook));
        self.insert_aliased(&name, shared);
    }

    /// Register one handler under several event names. With an empty
    /// `names` slice the hook's declared name is used instead.
    pub fn register_for_names<H: Hook + 'static>(&mut self, names: &[&str], hook: H) {
        let declared = hook.name().to_string();
        let shared: SharedHook = Arc::new(Mutex::new(hook));
        if names.is_empty() {
            self.insert_aliased(&declared, shared);
            return;
        }
        for name in names {
            self.insert_aliased(name, Arc::clone(&shared));
        }
    }

    fn insert_aliased(&mut self, name: &str, hook: SharedHook) {
        if name.contains('_') {
            self.handlers
                .insert(name.replace('_', "-"), Arc::clone(&hook));
        }
        self.handlers.insert(name.to_string(), hook);
        debug!(hook = name, "registered hook handler");
    }

    /// Whether a handler is reachable under `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Execute the handler selected by the base name of `args[0]`.
    ///
    /// Before-callbacks run first. An unregistered event name fails
    /// with [`Error::UnregisteredHook`] without touching the
    /// after-callbacks. After the handler, after-callbacks run only
    /// when the outcome counts as success; a handler error propagates
    /// immediately.
    pub fn execute(&mut self, args: &[String]) -> Result<Outcome> {
        self.callbacks.run_before()?;

        let event = args
            .first()
            .map(|arg| base_name(arg))
            .ok_or_else(|| Error::InvalidArgument("empty hook argv".to_string()))?;

        let handler = self
            .handlers
            .get(&event)
            .cloned()
            .ok_or_else(|| Error::UnregisteredHook(event.clone()))?;

        debug!(hook = %event, "dispatching");
        let outcome = {
            let mut guard = handler.lock().map_err(|_| Error::Hook {
                hook: event.clone(),
                source: anyhow::anyhow!("handler mutex poisoned"),
            })?;
            guard.run().map_err(|source| Error::Hook {
                hook: event.clone(),
                source,
            })?
        };

        if outcome.is_success() {
            self.callbacks.run_after()?;
        } else {
            warn!(
                hook = %event,
                code = outcome.code(),
                "hook requested failure exit; skipping completion callbacks"
            );
        }
        Ok(outcome)
    }

    /// Register an after-callback that persists `config` when its
    /// implicit-save flag is set.
    pub fn persist_on_success(&mut self, config: &SharedConfig) {
        let config = Arc::clone(config);
        self.callbacks.at_exit(move || {
            let cfg = config
                .lock()
                .map_err(|_| anyhow::anyhow!("config mutex poisoned"))?;
            if cfg.implicit_save() {
                cfg.save()?;
            }
            Ok(())
        });
    }

    /// Process entry point: dispatch from `std::env::args` and map the
    /// result to an exit code for the runtime.
    pub fn dispatch(&mut self) -> i32 {
        let args: Vec<String> = std::env::args().collect();
        match self.execute(&args) {
            Ok(outcome) => outcome.code(),
            Err(err) => {
                warn!(error = %err, "hook dispatch failed");
                eprintln!("error: {err}");
                1
            }
        }
    }
}

fn base_name(arg: &str) -> String {
    Path::new(arg)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| arg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::Map;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn trace() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn FnMut() -> anyhow::Result<()> + Send>) {
        let log: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mk = {
            let log = Arc::clone(&log);
            move |tag: &str| -> Box<dyn FnMut() -> anyhow::Result<()> + Send> {
                let log = Arc::clone(&log);
                let tag = tag.to_string();
                Box::new(move || {
                    log.lock().unwrap().push(tag.clone());
                    Ok(())
                })
            }
        };
        (log, mk)
    }

    #[test]
    fn test_underscore_name_serves_hyphen_event() {
        let mut hooks = Hooks::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        hooks.register("config_changed", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::Success)
        });

        assert!(hooks.is_registered("config_changed"));
        assert!(hooks.is_registered("config-changed"));

        let outcome = hooks.execute(&args(&["config-changed"])).unwrap();
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hyphen_name_is_not_underscored() {
        let mut hooks = Hooks::new();
        hooks.register("config-changed", || Ok(Outcome::Success));
        assert!(hooks.is_registered("config-changed"));
        assert!(!hooks.is_registered("config_changed"));
    }

    #[test]
    fn test_event_resolved_from_base_name() {
        let mut hooks = Hooks::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        hooks.register("install", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::Success)
        });

        hooks
            .execute(&args(&["/var/lib/juju/charm/hooks/install"]))
            .unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_last_registration_wins() {
        let mut hooks = Hooks::new();
        let hits = Arc::new(AtomicUsize::new(0));
        hooks.register("install", || Ok(Outcome::Failure(9)));
        let counter = Arc::clone(&hits);
        hooks.register("install", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::Success)
        });

        let outcome = hooks.execute(&args(&["install"])).unwrap();
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unregistered_hook_skips_after_callbacks() {
        let mut hooks = Hooks::new();
        hooks.callbacks().at_exit(|| Ok(()));

        let err = hooks.execute(&args(&["upgrade-charm"])).unwrap_err();
        assert!(matches!(err, Error::UnregisteredHook(ref name) if name == "upgrade-charm"));
        assert_eq!(hooks.callbacks().pending_after(), 1);
    }

    #[test]
    fn test_callback_ordering_fifo_then_lifo() {
        let (log, mk) = trace();
        let mut hooks = Hooks::new();
        hooks.callbacks().at_start(mk("before-1"));
        hooks.callbacks().at_start(mk("before-2"));
        hooks.callbacks().at_exit(mk("after-1"));
        hooks.callbacks().at_exit(mk("after-2"));

        {
            let log = Arc::clone(&log);
            hooks.register("start", move || {
                log.lock().unwrap().push("handler".to_string());
                Ok(Outcome::Success)
            });
        }

        hooks.execute(&args(&["start"])).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["before-1", "before-2", "handler", "after-2", "after-1"]
        );
        assert_eq!(hooks.callbacks().pending_before(), 0);
        assert_eq!(hooks.callbacks().pending_after(), 0);
    }

    #[test]
    fn test_zero_exit_outcome_still_runs_after_callbacks() {
        let mut hooks = Hooks::new();
        hooks.callbacks().at_exit(|| Ok(()));
        hooks.register("stop", || Ok(Outcome::Failure(0)));

        let outcome = hooks.execute(&args(&["stop"])).unwrap();
        assert_eq!(outcome, Outcome::Failure(0));
        assert!(outcome.is_success());
        assert_eq!(hooks.callbacks().pending_after(), 0);
    }

    #[test]
    fn test_nonzero_exit_outcome_skips_after_callbacks() {
        let mut hooks = Hooks::new();
        hooks.callbacks().at_exit(|| Ok(()));
        hooks.register("stop", || Ok(Outcome::Failure(2)));

        let outcome = hooks.execute(&args(&["stop"])).unwrap();
        assert_eq!(outcome, Outcome::Failure(2));
        assert_eq!(outcome.code(), 2);
        assert_eq!(hooks.callbacks().pending_after(), 1);
    }

    #[test]
    fn test_handler_error_skips_after_callbacks() {
        let mut hooks = Hooks::new();
        hooks.callbacks().at_exit(|| Ok(()));
        hooks.register("install", || anyhow::bail!("disk full"));

        let err = hooks.execute(&args(&["install"])).unwrap_err();
        assert!(matches!(err, Error::Hook { ref hook, .. } if hook == "install"));
        assert_eq!(hooks.callbacks().pending_after(), 1);
    }

    #[test]
    fn test_failing_before_callback_leaves_list_intact() {
        let (log, mk) = trace();
        let mut callbacks = Callbacks::new();
        callbacks.at_start(mk("first"));
        callbacks.at_start(|| anyhow::bail!("boom"));
        callbacks.at_start(mk("never"));

        assert!(matches!(
            callbacks.run_before().unwrap_err(),
            Error::Callback(_)
        ));
        // clear-on-full-success: nothing was drained, a retry re-runs all
        assert_eq!(callbacks.pending_before(), 3);
        assert_eq!(*log.lock().unwrap(), vec!["first"]);

        log.lock().unwrap().clear();
        callbacks.before.remove(1);
        callbacks.run_before().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "never"]);
        assert_eq!(callbacks.pending_before(), 0);
    }

    #[test]
    fn test_failing_before_callback_aborts_dispatch() {
        let mut hooks = Hooks::new();
        hooks.callbacks().at_start(|| anyhow::bail!("boom"));
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        hooks.register("install", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Outcome::Success)
        });

        assert!(hooks.execute(&args(&["install"])).is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_register_for_names_shares_one_handler() {
        let mut hooks = Hooks::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        hooks.register_for_names(
            &["db_relation_joined", "db-relation-changed"],
            hook_fn("db_handler", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Outcome::Success)
            }),
        );

        hooks.execute(&args(&["db-relation-joined"])).unwrap();
        hooks.execute(&args(&["db-relation-changed"])).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        // explicit names, not the declared one
        assert!(!hooks.is_registered("db_handler"));
    }

    #[test]
    fn test_register_for_names_falls_back_to_declared_name() {
        let mut hooks = Hooks::new();
        hooks.register_for_names(&[], hook_fn("leader_elected", || Ok(Outcome::Success)));

        assert!(hooks.is_registered("leader_elected"));
        assert!(hooks.is_registered("leader-elected"));
    }

    #[test]
    fn test_persist_on_success_saves_config() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state");
        let config = Config::new(Map::new(), state.clone()).shared();

        let mut hooks = Hooks::new();
        hooks.persist_on_success(&config);
        {
            let config = Arc::clone(&config);
            hooks.register("config_changed", move || {
                config
                    .lock()
                    .unwrap()
                    .insert("stored", serde_json::json!(true));
                Ok(Outcome::Success)
            });
        }

        hooks.execute(&args(&["config-changed"])).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&state).unwrap()).unwrap();
        assert_eq!(written["stored"], true);
    }

    #[test]
    fn test_persist_on_success_respects_flag() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state");
        let config = Config::new(Map::new(), state.clone()).shared();
        config.lock().unwrap().set_implicit_save(false);

        let mut hooks = Hooks::new();
        hooks.persist_on_success(&config);
        hooks.register("start", || Ok(Outcome::Success));

        hooks.execute(&args(&["start"])).unwrap();
        assert!(!state.exists());
    }

    #[test]
    fn test_no_save_on_failed_hook() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state");
        let config = Config::new(Map::new(), state.clone()).shared();

        let mut hooks = Hooks::new();
        hooks.persist_on_success(&config);
        hooks.register("start", || Ok(Outcome::Failure(1)));

        hooks.execute(&args(&["start"])).unwrap();
        assert!(!state.exists());
    }
}
