//! Layered settings lookup.
//!
//! A [`Settings`] value holds an ordered list of sources, most specific
//! first. Typical order: explicit overrides, the JSON outputs of an external
//! command, the process environment, then a parsed `.env` map. Lookups never
//! fall back to anything outside that list.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::process::{Command, Stdio};

use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::model::EnvironmentMap;

/// Prefix under which deployed runtimes expose parameters.
pub const RUNTIME_PARAM_PREFIX: &str = "MLOPS_RUNTIME_PARAM_";

/// A single configuration layer.
pub trait SettingsSource: fmt::Debug {
    fn name(&self) -> &str;
    fn get(&self, key: &str) -> Option<String>;
}

/// Explicitly provided key/value pairs.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    name: String,
    values: HashMap<String, String>,
}

impl MapSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: HashMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for MapSource
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let values = iter
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        Self {
            name: "init".to_owned(),
            values,
        }
    }
}

impl SettingsSource for MapSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Snapshot of the process environment taken at construction.
#[derive(Debug, Clone, Default)]
pub struct ProcessEnvSource {
    values: HashMap<String, String>,
}

impl ProcessEnvSource {
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn capture() -> Self {
        let values = std::env::vars_os()
            .filter_map(|(key, value)| {
                Some((key.into_string().ok()?, value.into_string().ok()?))
            })
            .collect();
        Self { values }
    }
}

impl SettingsSource for ProcessEnvSource {
    fn name(&self) -> &str {
        "process-env"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Outputs of an external command that prints a JSON object on stdout.
///
/// String values are used as-is; any other JSON value is stored in its
/// serialized form. A command that fails or prints something other than a
/// JSON object contributes an empty layer.
#[derive(Debug, Clone, Default)]
pub struct CommandSource {
    name: String,
    values: HashMap<String, String>,
}

impl CommandSource {
    pub fn run<I, S>(program: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let program = program.into();
        let name = program.to_string_lossy().into_owned();
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();

        let values = match output {
            Ok(output) if output.status.success() => {
                match std::str::from_utf8(&output.stdout) {
                    Ok(stdout) => parse_json_outputs(stdout).unwrap_or_else(|| {
                        debug!(command = %name, "command output is not a JSON object");
                        HashMap::new()
                    }),
                    Err(_) => {
                        debug!(command = %name, "command output is not valid UTF-8");
                        HashMap::new()
                    }
                }
            }
            Ok(output) => {
                debug!(command = %name, status = %output.status, "command failed");
                HashMap::new()
            }
            Err(err) => {
                debug!(command = %name, error = %err, "command could not be started");
                HashMap::new()
            }
        };

        Self { name, values }
    }

    /// Build a source from JSON text directly.
    pub fn from_json(name: impl Into<String>, json: &str) -> Self {
        Self {
            name: name.into(),
            values: parse_json_outputs(json).unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl SettingsSource for CommandSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

fn parse_json_outputs(text: &str) -> Option<HashMap<String, String>> {
    let Value::Object(object) = serde_json::from_str::<Value>(text.trim()).ok()? else {
        return None;
    };

    Some(
        object
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(text) => text,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect(),
    )
}

impl SettingsSource for EnvironmentMap {
    fn name(&self) -> &str {
        "dotenv"
    }

    fn get(&self, key: &str) -> Option<String> {
        EnvironmentMap::get(self, key).map(str::to_owned)
    }
}

/// Ordered stack of settings sources, most specific first.
#[derive(Debug, Default)]
pub struct Settings {
    layers: Vec<Box<dyn SettingsSource>>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer below all existing ones.
    pub fn layer(mut self, source: impl SettingsSource + 'static) -> Self {
        self.layers.push(Box::new(source));
        self
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    /// First non-empty value for `key`, walking layers in order.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_any(&[key])
    }

    /// First non-empty value for any of `aliases`.
    ///
    /// Layer order outranks alias order: an alias found in a more specific
    /// layer wins over an earlier alias found further down.
    pub fn get_any(&self, aliases: &[&str]) -> Option<String> {
        for layer in &self.layers {
            for alias in aliases {
                if let Some(value) = layer.get(alias).filter(|value| !value.is_empty()) {
                    debug!(key = alias, layer = layer.name(), "resolved setting");
                    return Some(value);
                }
            }
        }
        None
    }

    pub fn require(&self, key: &str) -> Result<String, Error> {
        self.get(key).ok_or_else(|| Error::MissingSetting {
            key: key.to_owned(),
        })
    }

    /// Resolve a runtime parameter, preferring its prefixed form.
    pub fn runtime_param(&self, name: &str) -> Option<String> {
        let prefixed = format!("{RUNTIME_PARAM_PREFIX}{name}");
        self.get_any(&[prefixed.as_str(), name])
    }

    pub fn require_runtime_param(&self, name: &str) -> Result<String, Error> {
        self.runtime_param(name)
            .ok_or_else(|| Error::MissingSetting {
                key: name.to_owned(),
            })
    }
}
