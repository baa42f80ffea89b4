//! Event handler facade: parses one broker-delivered event, drives the
//! engine, and records the three adapter-health gauges. The broker subscription
//! itself (pulling CloudEvents off a pub/sub topic) is an external collaborator
//! this crate does not implement, callers hand in already-decoded bytes.

use std::sync::Arc;

use hyperfleet_adapter_core::{EventEnvelope, ExecutionContext, ExecutionStatus};

use crate::engine::StepEngine;
use crate::metrics::Metrics;

pub struct EventHandler {
    engine: StepEngine,
    metrics: Arc<Metrics>,
}

impl EventHandler {
    pub fn new(engine: StepEngine, metrics: Arc<Metrics>) -> Self {
        Self { engine, metrics }
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Decodes `raw` as an [`EventEnvelope`], runs the engine, and emits the one
    /// terminal log line every event produces: status, phase, step, message.
    pub async fn handle(&self, raw: serde_json::Value, now_unix: u64) -> Result<ExecutionContext, serde_json::Error> {
        let envelope: EventEnvelope = serde_json::from_value(raw)?;
        self.metrics.record_processed(now_unix);

        let span = tracing::info_span!(
            "event",
            id = %envelope.id,
            source = %envelope.source,
            event_type = %envelope.event_type,
            kind = envelope.kind.as_deref().unwrap_or(""),
        );
        let _enter = span.enter();

        let ctx = self.engine.run(&envelope).await;

        match ctx.final_status() {
            ExecutionStatus::Success => {
                self.metrics.record_success(now_unix);
                tracing::info!(status = %ExecutionStatus::Success, "event processed");
            }
            ExecutionStatus::Failed => {
                self.metrics.record_failure(now_unix);
                let err = ctx.adapter().execution_error.as_ref();
                tracing::warn!(
                    status = %ExecutionStatus::Failed,
                    phase = err.map(|e| e.phase.to_string()).unwrap_or_default(),
                    step = err.map(|e| e.step.as_str()).unwrap_or(""),
                    message = err.map(|e| e.message.as_str()).unwrap_or(""),
                    "event processed"
                );
            }
        }

        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperfleet_adapter_transport::{MockTransport, Transport};

    fn sample_config() -> hyperfleet_adapter_core::AdapterTaskConfig {
        hyperfleet_adapter_core::AdapterTaskConfig::from_value(serde_json::json!({
            "apiVersion": "hyperfleet.io/v1",
            "kind": "AdapterTaskConfig",
            "metadata": {"name": "t"},
            "adapter": {"version": "1.0.0"},
            "hyperfleetApi": {"baseUrl": "https://hf.example.com"},
            "steps": [{"name": "greet", "log": {"level": "info", "message": "hi"}}],
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn handle_records_processed_and_success_metrics() {
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
        let engine = StepEngine::new(sample_config(), transport);
        let metrics = Arc::new(Metrics::new());
        let handler = EventHandler::new(engine, metrics.clone());

        let event = serde_json::json!({"id": "evt-1", "source": "s", "type": "t", "time": "2026-01-01T00:00:00Z", "data": {}});
        let ctx = handler.handle(event, 1_700_000_000).await.unwrap();

        assert_eq!(ctx.final_status(), ExecutionStatus::Success);
        assert_eq!(metrics.last_processed_unix(), 1_700_000_000);
        assert_eq!(metrics.last_success_unix(), 1_700_000_000);
        assert_eq!(metrics.last_failure_unix(), 0);
    }

    #[tokio::test]
    async fn handle_rejects_malformed_envelope() {
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
        let engine = StepEngine::new(sample_config(), transport);
        let metrics = Arc::new(Metrics::new());
        let handler = EventHandler::new(engine, metrics);

        let bad_event = serde_json::json!({"id": "evt-1"});
        assert!(handler.handle(bad_event, 1_700_000_000).await.is_err());
    }
}
