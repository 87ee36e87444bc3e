//! Test doubles shared across module tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::exec::CommandRunner;

/// Captures every argv it receives and replays queued responses; an
/// exhausted queue yields empty stdout.
pub(crate) struct RecordingRunner {
    calls: Mutex<Vec<Vec<String>>>,
    responses: Mutex<VecDeque<Result<String>>>,
}

impl RecordingRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
        })
    }

    pub fn respond_ok(&self, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(body.to_string()));
    }

    pub fn respond_err(&self, err: Error) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, argv: &[String]) -> Result<String> {
        self.calls.lock().unwrap().push(argv.to_vec());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }
}

/// Environment over explicit variables and a recording runner.
pub(crate) fn env_with(vars: &[(&str, &str)], runner: Arc<RecordingRunner>) -> Environment {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Environment::with_runner(map, runner)
}
