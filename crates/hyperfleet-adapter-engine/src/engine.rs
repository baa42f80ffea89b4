//! The sequential step interpreter: evaluates each step's `when` guard,
//! dispatches on `StepKind`, and threads the result back through the
//! `ExecutionContext`.
//!
//! Phase classification is computed once up front from the position of the first
//! and last `resource` steps in the config, rather than tracked incrementally,
//! since a step's phase only depends on its position relative to the resource
//! block, not on anything that happens during the run.
//!
//! Soft-failure contract: once the context has recorded an error, later
//! `resource` steps are skipped outright (no transport I/O); every other step
//! kind keeps running so that status-reporting `payload`/`apiCall` steps still
//! fire. A step's own `when` guard evaluating to `false`, or erroring, is always
//! a skip rather than a hard failure of the whole run.

use std::sync::Arc;

use hyperfleet_adapter_core::{AdapterTaskConfig, EventEnvelope, ExecutionContext, Phase, Step, StepError, StepKind};
use hyperfleet_adapter_transport::{Transport, TransportContext};
use serde_json::Value;

pub struct StepEngine {
    config: AdapterTaskConfig,
    transport: Arc<dyn Transport>,
    http_client: reqwest::Client,
}

impl StepEngine {
    pub fn new(config: AdapterTaskConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport, http_client: reqwest::Client::new() }
    }

    pub fn config(&self) -> &AdapterTaskConfig {
        &self.config
    }

    pub async fn run(&self, event: &EventEnvelope) -> ExecutionContext {
        let mut ctx = ExecutionContext::new(event.data_object());
        let (first_resource, last_resource) = resource_step_bounds(&self.config.steps);

        for (index, step) in self.config.steps.iter().enumerate() {
            let phase = phase_for(index, first_resource, last_resource);
            let span = tracing::info_span!("step", name = %step.name, kind = step.kind.variant_name(), phase = %phase);
            let _enter = span.enter();

            if ctx.has_failed() && matches!(step.kind, StepKind::Resource(_)) {
                tracing::debug!("skipping resource step: a prior step already failed");
                continue;
            }

            let scope = ctx.as_json();
            match self.evaluate_guard(step, &scope) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!("skipping step: when-guard is false");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "when-guard evaluation failed");
                    ctx.record_error_if_empty(phase, &step.name, e.to_string());
                    continue;
                }
            }

            if let Err(e) = self.execute_step(step, &scope, &mut ctx).await {
                tracing::warn!(error = %e, "step execution failed");
                ctx.record_error_if_empty(phase, &step.name, e.to_string());
            }
        }

        ctx
    }

    fn evaluate_guard(&self, step: &Step, scope: &Value) -> Result<bool, StepError> {
        match &step.when {
            Some(expr) => Ok(hyperfleet_adapter_expr::eval_bool(expr, scope)?),
            None => Ok(true),
        }
    }

    async fn execute_step(&self, step: &Step, scope: &Value, ctx: &mut ExecutionContext) -> Result<(), StepError> {
        match &step.kind {
            StepKind::Param(param_step) => {
                let value = crate::param::execute(param_step, scope)?;
                ctx.set_param(step.name.clone(), value);
            }
            StepKind::ApiCall(api_call) => {
                let outcome = crate::apicall::execute(&self.http_client, api_call, scope).await?;
                ctx.set_param(step.name.clone(), outcome.body);
                for (name, value) in outcome.captures {
                    ctx.set_param(name, value);
                }
            }
            StepKind::Resource(resource_step) => {
                let transport_ctx = build_transport_context(ctx, &step.name);
                let applied = crate::resource::execute(&self.transport, &transport_ctx, resource_step, ctx, scope).await?;
                ctx.set_resource(step.name.clone(), applied);
            }
            StepKind::Payload(payload) => {
                let rendered = crate::payload::execute(payload, scope)?;
                ctx.set_param(step.name.clone(), rendered);
            }
            StepKind::Log(log_step) => {
                let message = hyperfleet_adapter_expr::render_template(&log_step.message, scope)?;
                log_at_level(log_step.level, &step.name, &message);
            }
        }
        Ok(())
    }
}

fn resource_step_bounds(steps: &[Step]) -> (Option<usize>, Option<usize>) {
    let first = steps.iter().position(|s| matches!(s.kind, StepKind::Resource(_)));
    let last = steps.iter().rposition(|s| matches!(s.kind, StepKind::Resource(_)));
    (first, last)
}

fn phase_for(index: usize, first_resource: Option<usize>, last_resource: Option<usize>) -> Phase {
    match (first_resource, last_resource) {
        (Some(first), Some(last)) => {
            if index < first {
                Phase::ParamsAndChecks
            } else if index <= last {
                Phase::Resources
            } else {
                Phase::Reporting
            }
        }
        _ => Phase::ParamsAndChecks,
    }
}

/// Pulls the routing fields the ManifestWork transport needs (`targetCluster`,
/// `manifestWorkName`) out of whatever `param` steps have bound so far; the
/// direct Kubernetes transport ignores all of this.
fn build_transport_context(ctx: &ExecutionContext, step_name: &str) -> TransportContext {
    let target_cluster = ctx.get_param("targetCluster").and_then(|v| v.as_str()).map(String::from);
    let manifest_work_name = ctx.get_param("manifestWorkName").and_then(|v| v.as_str()).map(String::from);
    TransportContext {
        target_cluster,
        manifest_work_name,
        resource_name: Some(step_name.to_string()),
        ref_content: None,
        params: ctx.params().clone(),
    }
}

fn log_at_level(level: hyperfleet_adapter_core::LogLevel, step: &str, message: &str) {
    use hyperfleet_adapter_core::LogLevel;
    match level {
        LogLevel::Debug => tracing::debug!(step, message),
        LogLevel::Info => tracing::info!(step, message),
        LogLevel::Warn => tracing::warn!(step, message),
        LogLevel::Error => tracing::error!(step, message),
    }
}
