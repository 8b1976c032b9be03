use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};
use std::{fs, io, path::Path};
use tracing::warn;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

/// Workload description consumed by the task definition builder.
///
/// Every field is optional. Defaults are applied by the accessors below,
/// at the point where a value is actually used.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub name: Option<String>,
    pub cpu: Option<Value>,
    pub memory: Option<Value>,
    pub cpu_arch: Option<String>,

    #[serde(deserialize_with = "nullable")]
    pub command: Vec<String>,

    #[serde(deserialize_with = "nullable")]
    pub entrypoint: Vec<String>,

    pub health_check: Option<HealthCheckConfig>,
    pub port: Option<Value>,

    /// Single-key `name: port` mappings.
    #[serde(deserialize_with = "nullable")]
    pub additional_ports: Vec<Value>,

    /// Single-key `NAME: value` mappings.
    #[serde(deserialize_with = "nullable")]
    pub envs: Vec<Value>,

    /// Single-key `NAME: base_arn` mappings.
    #[serde(deserialize_with = "nullable")]
    pub secrets: Vec<Value>,

    #[serde(deserialize_with = "nullable")]
    pub secret_files: Vec<String>,

    pub otel_collector: Option<CollectorConfig>,
    pub fluent_bit_collector: Option<CollectorConfig>,
    pub role_arn: Option<String>,
    pub replica_count: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    pub command: Option<String>,
    pub interval: Option<u32>,
    pub timeout: Option<u32>,
    pub retries: Option<u32>,
    pub start_period: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub image_name: Option<String>,
}

impl CollectorConfig {
    pub fn image_name(&self) -> &str {
        self.image_name.as_deref().unwrap_or_default().trim()
    }
}

impl WorkloadConfig {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("app")
    }

    pub fn cpu(&self) -> String {
        self.cpu
            .as_ref()
            .map(scalar_to_string)
            .unwrap_or_else(|| String::from("256"))
    }

    pub fn memory(&self) -> String {
        self.memory
            .as_ref()
            .map(scalar_to_string)
            .unwrap_or_else(|| String::from("512"))
    }

    pub fn cpu_arch(&self) -> &str {
        self.cpu_arch.as_deref().unwrap_or("X86_64")
    }

    pub fn role_arn(&self) -> &str {
        self.role_arn.as_deref().unwrap_or_default()
    }

    pub fn replica_count(&self) -> String {
        self.replica_count
            .as_ref()
            .map(scalar_to_string)
            .unwrap_or_default()
    }

    /// The main port. A zero port counts as unset; a value that is not a
    /// port number is skipped with a warning.
    pub fn port(&self) -> Option<u16> {
        let value = match &self.port {
            None | Some(Value::Null) => return None,
            Some(value) => value,
        };

        match as_port(value) {
            Some(0) => None,
            Some(port) => Some(port),
            None => {
                warn!(port = ?value, "skipping main port that is not a port number");
                None
            }
        }
    }
}

/// Step Function workflow description.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub name: Option<String>,
    pub description: Option<String>,
    pub schedule: Option<String>,
    pub role_arn: Option<String>,
    pub execution: Option<ExecutionConfig>,

    #[serde(rename = "retryPolicy")]
    pub retry_policy: Option<RetryPolicyConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutionConfig {
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicyConfig {
    pub max_attempts: Option<u32>,
    pub backoff_rate: Option<f64>,
    pub interval_seconds: Option<u64>,
}

impl WorkflowConfig {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("default-workflow")
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    pub fn schedule(&self) -> &str {
        self.schedule.as_deref().unwrap_or_default()
    }

    pub fn role_arn(&self) -> &str {
        self.role_arn.as_deref().unwrap_or_default()
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.execution
            .as_ref()
            .and_then(|execution| execution.timeout_seconds)
            .unwrap_or(3600)
    }

    pub fn max_attempts(&self) -> u32 {
        self.retry_policy
            .as_ref()
            .and_then(|policy| policy.max_attempts)
            .unwrap_or(3)
    }

    pub fn backoff_rate(&self) -> f64 {
        self.retry_policy
            .as_ref()
            .and_then(|policy| policy.backoff_rate)
            .unwrap_or(2.0)
    }

    pub fn interval_seconds(&self) -> u64 {
        self.retry_policy
            .as_ref()
            .and_then(|policy| policy.interval_seconds)
            .unwrap_or(60)
    }
}

/// Reads a YAML document from `path` and views it as `T`.
///
/// An empty document is treated as an empty mapping, so a blank file
/// yields a config made only of defaults.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(raw_contents) => Ok(raw_contents),
        Err(error) => match error.kind() {
            io::ErrorKind::NotFound => Err(Error::FileNotFound(path.display().to_string())),
            _ => Err(Error::Unknown(error.to_string())),
        },
    }?;

    let document: Value = if contents.trim().is_empty() {
        Value::Null
    } else {
        match serde_yaml::from_str(&contents) {
            Ok(data) => Ok(data),
            Err(error) => Err(Error::ParsingError(error.to_string())),
        }?
    };

    let document = match document {
        Value::Null => Value::Mapping(Mapping::new()),
        Value::Mapping(_) => document,
        _ => {
            return Err(Error::ParsingError(String::from(
                "expected a mapping at the top level of the document",
            )))
        }
    };

    let config: T = match serde_yaml::from_value(document) {
        Ok(data) => Ok(data),
        Err(error) => Err(Error::ParsingError(error.to_string())),
    }?;

    return Ok(config);
}

/// Renders a YAML scalar the way it reads in the source document.
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(value) => value.to_string(),
        Value::Number(value) => value.to_string(),
        Value::String(value) => value.clone(),
        other => serde_yaml::to_string(other)
            .map(|rendered| rendered.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Flattens a list of single-key mappings into ordered `(key, value)` pairs.
///
/// Entries that are not mappings are skipped.
pub fn entries<'a>(field: &str, values: &'a [Value]) -> Vec<(String, &'a Value)> {
    let mut pairs = Vec::new();
    for value in values {
        match value {
            Value::Mapping(mapping) => {
                for (key, value) in mapping {
                    pairs.push((scalar_to_string(key), value));
                }
            }
            other => warn!(key = field, entry = ?other, "skipping entry that is not a mapping"),
        }
    }
    pairs
}

pub fn as_port(value: &Value) -> Option<u16> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|port| u16::try_from(port).ok()),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
