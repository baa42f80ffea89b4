//! The per-event mutable store threaded through every step. It owns all
//! intermediate values exclusively, resources never hold back-pointers into it:
//! the context is a flat map of maps, not a graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordering phases. Purely a classification of *when* a step ran, used to
/// decide whether a failing step may still be a "reporting" step that must run
/// under the soft-failure contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Phase {
    ParamsAndChecks,
    Resources,
    Reporting,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::ParamsAndChecks => write!(f, "ParamsAndChecks"),
            Phase::Resources => write!(f, "Resources"),
            Phase::Reporting => write!(f, "Reporting"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Success => write!(f, "success"),
            ExecutionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// The first-failure-wins slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionError {
    pub phase: Phase,
    pub step: String,
    pub message: String,
}

/// `adapter.*` namespace: execution status plus the optional error slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterSlot {
    pub execution_status: ExecutionStatus,
    pub error_reason: Option<String>,
    pub error_message: Option<String>,
    pub execution_error: Option<ExecutionError>,
}

impl Default for AdapterSlot {
    fn default() -> Self {
        Self {
            execution_status: ExecutionStatus::Success,
            error_reason: None,
            error_message: None,
            execution_error: None,
        }
    }
}

/// Per-event mutable context. Created when an event is received, mutated by
/// every step, and dropped after the terminal step; there is no sharing across
/// events.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// The raw event payload (`event.*` namespace for `param.source`).
    event_data: serde_json::Map<String, serde_json::Value>,
    /// User-level bindings produced by `param`/`apiCall`/`payload` steps.
    params: BTreeMap<String, serde_json::Value>,
    /// Discovered/applied resources keyed by the `resource` step's name.
    resources: BTreeMap<String, serde_json::Value>,
    adapter: AdapterSlot,
}

impl ExecutionContext {
    pub fn new(event_data: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            event_data,
            params: BTreeMap::new(),
            resources: BTreeMap::new(),
            adapter: AdapterSlot::default(),
        }
    }

    pub fn event_data(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.event_data
    }

    pub fn params(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.params
    }

    pub fn resources(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.resources
    }

    pub fn adapter(&self) -> &AdapterSlot {
        &self.adapter
    }

    /// Binds a value under `params`. Context is append-only within an event:
    /// later steps may still *overwrite* a key's value (e.g. re-running the same
    /// config on a retried event), but nothing ever removes a key.
    pub fn set_param(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.params.insert(name.into(), value);
    }

    pub fn get_param(&self, name: &str) -> Option<&serde_json::Value> {
        self.params.get(name)
    }

    pub fn set_resource(&mut self, step_name: impl Into<String>, value: serde_json::Value) {
        self.resources.insert(step_name.into(), value);
    }

    pub fn get_resource(&self, step_name: &str) -> Option<&serde_json::Value> {
        self.resources.get(step_name)
    }

    pub fn set_error_reason(&mut self, reason: impl Into<String>) {
        self.adapter.error_reason = Some(reason.into());
    }

    pub fn set_error_message(&mut self, message: impl Into<String>) {
        self.adapter.error_message = Some(message.into());
    }

    /// Records the first execution error. A second call is a no-op: the slot,
    /// once set, is never overwritten or cleared.
    pub fn record_error_if_empty(&mut self, phase: Phase, step: impl Into<String>, message: impl Into<String>) {
        if self.adapter.execution_error.is_some() {
            return;
        }
        let step = step.into();
        let message = message.into();
        self.adapter.execution_status = ExecutionStatus::Failed;
        if self.adapter.error_reason.is_none() {
            self.adapter.error_reason = Some(phase.to_string());
        }
        if self.adapter.error_message.is_none() {
            self.adapter.error_message = Some(message.clone());
        }
        self.adapter.execution_error = Some(ExecutionError { phase, step, message });
    }

    pub fn has_failed(&self) -> bool {
        self.adapter.execution_error.is_some()
    }

    /// Final status: `success` unless an `ExecutionError` was recorded.
    pub fn final_status(&self) -> ExecutionStatus {
        self.adapter.execution_status
    }

    /// Projects the whole context into one JSON tree, `{event, params, resources,
    /// adapter}`, the flat map of maps that the template/expression evaluator
    /// reads. Resources are exposed as their object maps, keyed by step name.
    pub fn as_json(&self) -> serde_json::Value {
        serde_json::json!({
            "event": serde_json::Value::Object(self.event_data.clone()),
            "params": self.params,
            "resources": self.resources,
            "adapter": {
                "executionStatus": self.adapter.execution_status.to_string(),
                "errorReason": self.adapter.error_reason,
                "errorMessage": self.adapter.error_message,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_failure_wins() {
        let mut ctx = ExecutionContext::new(Default::default());
        ctx.record_error_if_empty(Phase::Resources, "create-cluster", "namespace not found");
        ctx.record_error_if_empty(Phase::Reporting, "report-status", "should not overwrite");

        let err = ctx.adapter().execution_error.as_ref().unwrap();
        assert_eq!(err.step, "create-cluster");
        assert_eq!(err.message, "namespace not found");
        assert_eq!(ctx.final_status(), ExecutionStatus::Failed);
    }

    #[test]
    fn success_when_no_error_recorded() {
        let ctx = ExecutionContext::new(Default::default());
        assert_eq!(ctx.final_status(), ExecutionStatus::Success);
        assert!(ctx.adapter().error_reason.is_none());
    }

    #[test]
    fn as_json_exposes_resources_keyed_by_step_name() {
        let mut ctx = ExecutionContext::new(Default::default());
        ctx.set_resource("make-cluster", serde_json::json!({"metadata": {"name": "c1"}}));
        let tree = ctx.as_json();
        assert_eq!(
            tree["resources"]["make-cluster"]["metadata"]["name"],
            serde_json::json!("c1")
        );
    }
}
