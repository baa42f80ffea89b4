//! The Step tagged union. Steps are modelled as a closed sum type, never an
//! open trait hierarchy, pattern-matched exhaustively by the engine.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire shape of one step entry before variant validation. Every step has a name,
/// an optional guard, and at most one of the five payload keys; `RawStep` lets the
/// YAML/JSON deserializer accept any of the five without committing to one up
/// front, so `Step::from_raw` can report `ConfigError::AmbiguousStepVariant` when
/// zero or more than one is present instead of silently picking one.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawStep {
    pub name: String,
    #[serde(default)]
    pub when: Option<String>,
    #[serde(default)]
    pub param: Option<ParamStep>,
    #[serde(default, rename = "apiCall")]
    pub api_call: Option<ApiCallStep>,
    #[serde(default)]
    pub resource: Option<ResourceStep>,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub log: Option<LogStep>,
}

#[derive(Debug, Clone)]
pub struct Step {
    pub name: String,
    pub when: Option<String>,
    pub kind: StepKind,
}

#[derive(Debug, Clone)]
pub enum StepKind {
    Param(ParamStep),
    ApiCall(ApiCallStep),
    Resource(ResourceStep),
    Payload(serde_json::Value),
    Log(LogStep),
}

impl StepKind {
    pub fn variant_name(&self) -> &'static str {
        match self {
            StepKind::Param(_) => "param",
            StepKind::ApiCall(_) => "apiCall",
            StepKind::Resource(_) => "resource",
            StepKind::Payload(_) => "payload",
            StepKind::Log(_) => "log",
        }
    }
}

impl Step {
    pub fn from_raw(raw: RawStep) -> Result<Self, ConfigError> {
        if raw.name.is_empty() {
            return Err(ConfigError::EmptyStepName);
        }
        if raw.name.contains('-') {
            return Err(ConfigError::AmbiguousStepName(raw.name));
        }

        let present = [
            raw.param.is_some(),
            raw.api_call.is_some(),
            raw.resource.is_some(),
            raw.payload.is_some(),
            raw.log.is_some(),
        ]
        .iter()
        .filter(|p| **p)
        .count();

        if present != 1 {
            return Err(ConfigError::AmbiguousStepVariant(raw.name));
        }

        let kind = if let Some(p) = raw.param {
            p.validate().map_err(|_| ConfigError::AmbiguousStepVariant(raw.name.clone()))?;
            StepKind::Param(p)
        } else if let Some(a) = raw.api_call {
            StepKind::ApiCall(a)
        } else if let Some(r) = raw.resource {
            StepKind::Resource(r)
        } else if let Some(p) = raw.payload {
            StepKind::Payload(p)
        } else if let Some(l) = raw.log {
            StepKind::Log(l)
        } else {
            unreachable!("presence check above guarantees one branch matches")
        };

        Ok(Step {
            name: raw.name,
            when: raw.when,
            kind,
        })
    }
}

/// `param` step. Exactly one of `source`/`value`/`expression` must be set;
/// `default` is used when the resolved value is unset.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParamStep {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

impl ParamStep {
    pub fn validate(&self) -> Result<(), ()> {
        let present = [self.source.is_some(), self.value.is_some(), self.expression.is_some()]
            .iter()
            .filter(|p| **p)
            .count();
        if present == 1 {
            Ok(())
        } else {
            Err(())
        }
    }

    /// Parses a `source` of the recognized forms: `env.NAME`, `event.path`, or a
    /// plain path into the current params map.
    pub fn source_kind(&self) -> Option<ParamSource> {
        let s = self.source.as_ref()?;
        if let Some(rest) = s.strip_prefix("env.") {
            Some(ParamSource::Env(rest.to_string()))
        } else if let Some(rest) = s.strip_prefix("event.") {
            Some(ParamSource::Event(rest.to_string()))
        } else {
            Some(ParamSource::Params(s.clone()))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSource {
    Env(String),
    Event(String),
    Params(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum HttpMethod {
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "POST")]
    Post,
    #[serde(rename = "PUT")]
    Put,
    #[serde(rename = "PATCH")]
    Patch,
    #[serde(rename = "DELETE")]
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

pub use crate::config::RetryBackoff;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Capture {
    pub name: String,
    pub field: String,
}

/// `apiCall` step. `url`, `headers`, and `body` are rendered as templates
/// before the request is issued.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallStep {
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub retry_attempts: Option<u32>,
    #[serde(default)]
    pub retry_backoff: Option<RetryBackoff>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    #[serde(default)]
    pub capture: Vec<Capture>,
}

/// How a resource step locates its target: either by-name (precedence) or by label
/// selector within a namespace (`""` or `"*"` meaning all namespaces).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Discovery {
    ByName(String),
    BySelectors {
        #[serde(rename = "labelSelector")]
        label_selector: BTreeMap<String, String>,
        #[serde(default)]
        namespace: Option<String>,
    },
}

/// `resource` step.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStep {
    pub manifest: serde_json::Value,
    pub discovery: Discovery,
    #[serde(default)]
    pub recreate_on_change: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// `log` step.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogStep {
    pub level: LogLevel,
    pub message: String,
}
