//! Leadership queries and leader settings.
//!
//! Leadership is runtime-arbitrated: exactly one unit among peers
//! holds it at a time. The backing hook tools only exist on newer
//! runtimes, so a missing binary maps to [`Error::Unsupported`] and
//! callers can branch on capability instead of an OS error.

use serde_json::Value;

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::exec::run_json;
use crate::relation::Settings;

/// Leadership operations for the current unit.
pub struct Leadership<'a> {
    env: &'a Environment,
}

impl<'a> Leadership<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Self { env }
    }

    /// Whether the current unit holds leadership among its peers.
    pub fn is_leader(&self) -> Result<bool> {
        let cmd = vec!["is-leader".to_string(), "--format=json".to_string()];
        let value = match run_json(self.env.runner(), &cmd) {
            Ok(value) => value,
            Err(Error::CommandNotFound { .. }) => return Err(Error::Unsupported("is-leader")),
            Err(e) => return Err(e),
        };
        serde_json::from_value(value).map_err(|source| Error::Decode {
            program: "is-leader".to_string(),
            source,
        })
    }

    /// Read leader settings: one value for `attribute`, or the full
    /// mapping when `None`.
    pub fn leader_get(&self, attribute: Option<&str>) -> Result<Value> {
        let cmd = vec![
            "leader-get".to_string(),
            "--format=json".to_string(),
            attribute.unwrap_or("-").to_string(),
        ];
        match run_json(self.env.runner(), &cmd) {
            Ok(value) => Ok(value),
            Err(Error::CommandNotFound { .. }) => Err(Error::Unsupported("leader-get")),
            Err(e) => Err(e),
        }
    }

    /// Write leader settings. Only the leader may call this; a `None`
    /// value clears the key.
    pub fn leader_set(&self, settings: &Settings) -> Result<()> {
        let mut cmd = vec!["leader-set".to_string()];
        for (key, value) in settings {
            cmd.push(format!("{key}={}", value.as_deref().unwrap_or("")));
        }
        match self.env.runner().run(&cmd) {
            Ok(_) => Ok(()),
            Err(Error::CommandNotFound { .. }) => Err(Error::Unsupported("leader-set")),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{RecordingRunner, env_with};

    #[test]
    fn test_is_leader_decodes_bool() {
        let runner = RecordingRunner::new();
        runner.respond_ok("true");
        let env = env_with(&[], runner.clone());

        assert!(Leadership::new(&env).is_leader().unwrap());
        assert_eq!(
            runner.calls()[0],
            vec!["is-leader".to_string(), "--format=json".to_string()]
        );
    }

    #[test]
    fn test_missing_tool_reads_as_unsupported() {
        let runner = RecordingRunner::new();
        runner.respond_err(Error::CommandNotFound {
            program: "is-leader".to_string(),
        });
        let env = env_with(&[], runner);

        assert!(matches!(
            Leadership::new(&env).is_leader().unwrap_err(),
            Error::Unsupported("is-leader")
        ));
    }

    #[test]
    fn test_leader_get_whole_mapping() {
        let runner = RecordingRunner::new();
        runner.respond_ok(r#"{"primary": "mysql/0"}"#);
        let env = env_with(&[], runner.clone());

        let value = Leadership::new(&env).leader_get(None).unwrap();
        assert_eq!(value["primary"], "mysql/0");
        assert_eq!(
            runner.calls()[0],
            vec![
                "leader-get".to_string(),
                "--format=json".to_string(),
                "-".to_string(),
            ]
        );
    }

    #[test]
    fn test_leader_set_formats_pairs() {
        let runner = RecordingRunner::new();
        let env = env_with(&[], runner.clone());

        let mut settings = Settings::new();
        settings.insert("primary".to_string(), Some("mysql/0".to_string()));
        settings.insert("stale".to_string(), None);
        Leadership::new(&env).leader_set(&settings).unwrap();

        assert_eq!(
            runner.calls()[0],
            vec![
                "leader-set".to_string(),
                "primary=mysql/0".to_string(),
                "stale=".to_string(),
            ]
        );
    }
}
