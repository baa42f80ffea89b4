//! The event envelope: a CloudEvents-like structure whose `data` object is the
//! root of the `event.*` namespace visible to `param.source` expressions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub data: serde_json::Value,
    /// Propagated to logger fields when present; not otherwise interpreted by the
    /// engine. Extra envelope fields beyond these are ignored.
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default, rename = "ownedReference")]
    pub owned_reference: Option<serde_json::Value>,
}

impl EventEnvelope {
    /// The flat map the engine seeds the execution context's `event` namespace with.
    /// Non-object `data` (e.g. an event with a scalar payload) still yields a usable,
    /// if empty, namespace rather than failing the run.
    pub fn data_object(&self) -> serde_json::Map<String, serde_json::Value> {
        self.data.as_object().cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_envelope() {
        let raw = r#"{
            "id": "evt-1",
            "source": "hyperfleet/clusters",
            "type": "cluster.updated",
            "time": "2026-01-01T00:00:00Z",
            "data": {"clusterId": "abc"}
        }"#;
        let env: EventEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.id, "evt-1");
        assert_eq!(env.data_object().get("clusterId").unwrap(), "abc");
        assert!(env.kind.is_none());
    }

    #[test]
    fn ignores_extra_fields() {
        let raw = r#"{
            "id": "evt-2",
            "source": "s",
            "type": "t",
            "time": "2026-01-01T00:00:00Z",
            "data": {},
            "futureField": 42,
            "kind": "Cluster",
            "ownedReference": {"apiVersion": "v1", "kind": "Cluster", "name": "x"}
        }"#;
        let env: EventEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.kind.as_deref(), Some("Cluster"));
        assert!(env.owned_reference.is_some());
    }
}
