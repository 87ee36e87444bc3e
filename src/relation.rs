//! Relation data exchange with peer and related units.
//!
//! These operations extend [`Environment`] with the `relation-*` hook
//! tools. Relation settings are plain string key/values on the wire; a
//! `None` value clears the key on the runtime side.

use std::collections::BTreeMap;
use std::io::Write;

use serde_json::Value;
use tracing::debug;

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::exec::run_json;

/// Relation settings payload for `relation-set` and `leader-set`
/// shaped calls. `None` clears the key.
pub type Settings = BTreeMap<String, Option<String>>;

impl Environment {
    /// Read data the selected unit has set on a relation.
    ///
    /// `attribute` narrows the result to one key, `unit` to one unit's
    /// data, `relation_id` to one relation. Returns `None` when the
    /// remote side has not set anything yet (the tool exits with status
    /// 2 or prints `null` in that case).
    pub fn relation_get(
        &self,
        attribute: Option<&str>,
        unit: Option<&str>,
        relation_id: Option<&str>,
    ) -> Result<Option<Value>> {
        let mut cmd = vec!["relation-get".to_string(), "--format=json".to_string()];
        if let Some(id) = relation_id {
            cmd.push("-r".to_string());
            cmd.push(id.to_string());
        }
        cmd.push(attribute.unwrap_or("-").to_string());
        if let Some(unit) = unit {
            cmd.push(unit.to_string());
        }

        match run_json(self.runner(), &cmd) {
            Ok(Value::Null) => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(Error::Decode { .. }) => Ok(None),
            Err(Error::CommandFailed { status: 2, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set relation data for the current unit.
    ///
    /// Newer runtimes accept `--file`, which sidesteps the argv length
    /// limit for large payloads; the tool's `--help` output is probed to
    /// find out. Older runtimes get inline `key=value` arguments.
    pub fn relation_set(&self, relation_id: Option<&str>, settings: &Settings) -> Result<()> {
        let mut cmd = vec!["relation-set".to_string()];

        let mut probe = cmd.clone();
        probe.push("--help".to_string());
        let accepts_file = self.runner().run(&probe)?.contains("--file");

        if let Some(id) = relation_id {
            cmd.push("-r".to_string());
            cmd.push(id.to_string());
        }

        if accepts_file {
            let mut file = tempfile::NamedTempFile::new()?;
            file.write_all(serde_yaml::to_string(settings)?.as_bytes())?;
            file.flush()?;
            cmd.push("--file".to_string());
            cmd.push(file.path().display().to_string());
            self.runner().run(&cmd)?;
        } else {
            for (key, value) in settings {
                cmd.push(format!("{key}={}", value.as_deref().unwrap_or("")));
            }
            self.runner().run(&cmd)?;
        }
        debug!(count = settings.len(), "relation data set");
        Ok(())
    }

    /// Ids of all relations of the given type, defaulting to the type
    /// of the relation the current hook runs for. No type in either
    /// place means no relations.
    pub fn relation_ids(&self, relation_type: Option<&str>) -> Result<Vec<String>> {
        let rtype = match relation_type.or_else(|| self.relation_type()) {
            Some(t) => t.to_string(),
            None => return Ok(Vec::new()),
        };
        let cmd = vec![
            "relation-ids".to_string(),
            "--format=json".to_string(),
            rtype,
        ];
        decode_string_list(run_json(self.runner(), &cmd)?, "relation-ids")
    }

    /// Names of units related to the caller, optionally restricted to
    /// one relation id (defaults to the current relation).
    pub fn related_units(&self, relation_id: Option<&str>) -> Result<Vec<String>> {
        let mut cmd = vec!["relation-list".to_string(), "--format=json".to_string()];
        if let Some(id) = relation_id.or_else(|| self.relation_id()) {
            cmd.push("-r".to_string());
            cmd.push(id.to_string());
        }
        decode_string_list(run_json(self.runner(), &cmd)?, "relation-list")
    }

    /// Service name of the remote side of a relation, or `None` when no
    /// unit has joined yet.
    pub fn remote_service_name(&self, relation_id: &str) -> Result<Option<String>> {
        let units = self.related_units(Some(relation_id))?;
        Ok(units
            .first()
            .map(|unit| unit.split('/').next().unwrap_or(unit).to_string()))
    }

    /// Find the id of the relation connecting `relation_name` to the
    /// given service (or unit of that service).
    pub fn relation_id_for(
        &self,
        relation_name: &str,
        service_or_unit: &str,
    ) -> Result<Option<String>> {
        let service = service_or_unit
            .split('/')
            .next()
            .unwrap_or(service_or_unit);
        for relid in self.relation_ids(Some(relation_name))? {
            if self.remote_service_name(&relid)?.as_deref() == Some(service) {
                return Ok(Some(relid));
            }
        }
        Ok(None)
    }

    /// Clear all data this unit has set on a relation, preserving the
    /// `public-address` and `private-address` keys (removing those is
    /// undefined behavior on the runtime side).
    pub fn relation_clear(&self, relation_id: &str) -> Result<()> {
        let unit = self.unit_name().map(str::to_string);
        let data = self.relation_get(None, unit.as_deref(), Some(relation_id))?;

        let mut settings = Settings::new();
        if let Some(Value::Object(map)) = data {
            for key in map.keys() {
                if key != "public-address" && key != "private-address" {
                    settings.insert(key.clone(), None);
                }
            }
        }
        if settings.is_empty() {
            return Ok(());
        }
        self.relation_set(Some(relation_id), &settings)
    }

    /// Whether a relation is established, judged by every listed key
    /// being present in some related unit's data.
    pub fn is_relation_made(&self, relation: &str, keys: &[&str]) -> Result<bool> {
        if keys.is_empty() {
            return Ok(false);
        }
        for relid in self.relation_ids(Some(relation))? {
            for unit in self.related_units(Some(&relid))? {
                let mut all_present = true;
                for key in keys {
                    if self
                        .relation_get(Some(key), Some(&unit), Some(&relid))?
                        .is_none()
                    {
                        all_present = false;
                        break;
                    }
                }
                if all_present {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

fn decode_string_list(value: Value, program: &str) -> Result<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        other => serde_json::from_value(other).map_err(|source| Error::Decode {
            program: program.to_string(),
            source,
        }),
    }
}
