//! Adapter Task Config: the static, versioned document listing steps to run
//! for each event.

use crate::error::ConfigError;
use crate::step::{RawStep, Step};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The only apiVersion this binary understands.
pub const SUPPORTED_API_VERSION: &str = "hyperfleet.io/v1";
/// The only kind this binary understands.
pub const SUPPORTED_KIND: &str = "AdapterTaskConfig";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaskMetadata {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdapterBlock {
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryBackoff {
    #[default]
    Exponential,
    Linear,
    Constant,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HyperfleetApiBlock {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default)]
    pub retry_backoff: RetryBackoff,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawAdapterTaskConfig {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: TaskMetadata,
    pub adapter: AdapterBlock,
    #[serde(rename = "hyperfleetApi")]
    pub hyperfleet_api: HyperfleetApiBlock,
    pub steps: Vec<RawStep>,
}

#[derive(Debug, Clone)]
pub struct AdapterTaskConfig {
    pub api_version: String,
    pub kind: String,
    pub metadata: TaskMetadata,
    pub adapter: AdapterBlock,
    pub hyperfleet_api: HyperfleetApiBlock,
    pub steps: Vec<Step>,
}

impl AdapterTaskConfig {
    /// Parses and validates a task config, enforcing every invariant: exactly one
    /// supported apiVersion/kind, unique non-empty hyphen-free step names, and
    /// exactly one payload variant per step.
    pub fn from_raw(raw: RawAdapterTaskConfig) -> Result<Self, ConfigError> {
        if raw.api_version != SUPPORTED_API_VERSION {
            return Err(ConfigError::UnsupportedApiVersion(raw.api_version));
        }
        if raw.kind != SUPPORTED_KIND {
            return Err(ConfigError::UnsupportedKind(raw.kind));
        }

        let mut steps = Vec::with_capacity(raw.steps.len());
        let mut seen = std::collections::HashSet::new();
        for raw_step in raw.steps {
            let step = Step::from_raw(raw_step)?;
            if !seen.insert(step.name.clone()) {
                return Err(ConfigError::DuplicateStepName(step.name));
            }
            steps.push(step);
        }

        Ok(AdapterTaskConfig {
            api_version: raw.api_version,
            kind: raw.kind,
            metadata: raw.metadata,
            adapter: raw.adapter,
            hyperfleet_api: raw.hyperfleet_api,
            steps,
        })
    }

    /// Parses the config from any `serde`-compatible format (the binary uses
    /// `serde_yaml`; tests use `serde_json`). The loader itself, flag/env
    /// precedence merging, is out of scope here; this is just decode+validate.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        let raw: RawAdapterTaskConfig = serde_json::from_value(value)
            .map_err(|e| ConfigError::InvalidYaml(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Compares the config's declared adapter version against the running binary's
    /// version. Mismatches are reported but do not themselves fail validation,
    /// callers decide policy (the reference binary logs a warning and continues).
    pub fn version_matches(&self, running_version: &str) -> bool {
        self.adapter.version == running_version
    }
}
