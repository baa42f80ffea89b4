//! `resource` step execution: render the manifest, validate it, discover any
//! existing object, compute the apply decision through the wired transport, and
//! fold the result back onto the context.
//!
//! Also implements the ManifestWork parent->child status-feedback enrichment:
//! when an earlier resource step in the same run discovered or
//! applied a ManifestWork, and the current step's rendered identity shows up in
//! that ManifestWork's `status.resourceStatus`, the matching entry's
//! `statusFeedback.values`/`conditions` are copied onto the child object before it
//! is bound into the context. A miss is a no-op, never an error.

use std::sync::Arc;

use hyperfleet_adapter_core::{ExecutionContext, ResourceStep, StepError};
use hyperfleet_adapter_core::step::Discovery as CoreDiscovery;
use hyperfleet_adapter_manifest::{read_generation, validate_manifest};
use hyperfleet_adapter_transport::{ApplyOptions, Discovery as TransportDiscovery, Gvk, ResourceToApply, Transport, TransportContext};
use serde_json::Value;

pub async fn execute(
    transport: &Arc<dyn Transport>,
    transport_ctx: &TransportContext,
    step: &ResourceStep,
    ctx: &ExecutionContext,
    scope: &Value,
) -> Result<Value, StepError> {
    let rendered = hyperfleet_adapter_manifest::render_mapping(&step.manifest, &|s: &str| hyperfleet_adapter_expr::render_template(s, scope))?;
    validate_manifest(&rendered)?;

    let gvk = Gvk::of_manifest(&rendered);
    let namespace = rendered.pointer("/metadata/namespace").and_then(|v| v.as_str()).unwrap_or("").to_string();
    let name = rendered.pointer("/metadata/name").and_then(|v| v.as_str()).unwrap_or("").to_string();

    let discovery = convert_discovery(&step.discovery, &namespace);
    let candidates = transport.discover_resources(transport_ctx, &gvk, &discovery).await?;
    let existing = pick_winner(candidates);

    let resource_to_apply = ResourceToApply {
        name: name.clone(),
        manifest: rendered,
        existing,
        options: ApplyOptions { recreate_on_change: step.recreate_on_change },
    };

    let mut results = transport.apply_resources(transport_ctx, vec![resource_to_apply]).await?;
    let result = results.pop().ok_or_else(|| StepError::Other("transport returned no apply result".to_string()))?;

    if let Some(error) = result.error {
        return Err(StepError::Other(error));
    }

    let mut applied = result.resource;
    enrich_from_manifestwork_parents(ctx, &gvk, &namespace, &name, &mut applied);
    Ok(applied)
}

fn convert_discovery(discovery: &CoreDiscovery, manifest_namespace: &str) -> TransportDiscovery {
    match discovery {
        CoreDiscovery::ByName(name) => TransportDiscovery::ByName { namespace: manifest_namespace.to_string(), name: name.clone() },
        CoreDiscovery::BySelectors { label_selector, namespace } => TransportDiscovery::BySelectors {
            namespace: namespace.clone().unwrap_or_default(),
            label_selector: hyperfleet_adapter_manifest::build_label_selector(label_selector),
        },
    }
}

/// Among candidates returned by discovery, the highest-generation object wins;
/// ties break on lexicographic `metadata.name`, so callers relying on discovery
/// order for temporal ordering get a deterministic but not necessarily
/// insertion-faithful answer.
fn pick_winner(mut candidates: Vec<Value>) -> Option<Value> {
    if candidates.is_empty() {
        return None;
    }
    let max_generation = candidates.iter().map(read_generation).max().unwrap_or(0);
    candidates.retain(|c| read_generation(c) == max_generation);
    candidates.sort_by(|a, b| {
        let name_a = a.pointer("/metadata/name").and_then(|v| v.as_str()).unwrap_or("");
        let name_b = b.pointer("/metadata/name").and_then(|v| v.as_str()).unwrap_or("");
        name_a.cmp(name_b)
    });
    candidates.into_iter().next()
}

fn enrich_from_manifestwork_parents(ctx: &ExecutionContext, gvk: &Gvk, namespace: &str, name: &str, child: &mut Value) {
    for parent in ctx.resources().values() {
        if parent.get("kind").and_then(|v| v.as_str()) != Some("ManifestWork") {
            continue;
        }
        let Some(entries) = parent.pointer("/status/resourceStatus").and_then(|v| v.as_array()) else {
            continue;
        };
        for entry in entries {
            let meta = entry.get("resourceMeta").unwrap_or(&Value::Null);
            let matches_kind = meta.get("kind").and_then(|v| v.as_str()) == Some(gvk.kind.as_str());
            let matches_namespace = meta.get("namespace").and_then(|v| v.as_str()).unwrap_or("") == namespace;
            let matches_name = meta.get("name").and_then(|v| v.as_str()).unwrap_or("") == name;
            if matches_kind && matches_namespace && matches_name {
                let values = entry.pointer("/statusFeedback/values").cloned();
                let conditions = entry.get("conditions").cloned();
                merge_feedback(child, values, conditions);
                return;
            }
        }
    }
}

fn merge_feedback(child: &mut Value, values: Option<Value>, conditions: Option<Value>) {
    if values.is_none() && conditions.is_none() {
        return;
    }
    let Some(child_obj) = child.as_object_mut() else {
        return;
    };
    let status = child_obj.entry("status").or_insert_with(|| Value::Object(Default::default()));
    if let Some(status_obj) = status.as_object_mut() {
        if let Some(values) = values {
            status_obj.insert("statusFeedback".to_string(), values);
        }
        if let Some(conditions) = conditions {
            status_obj.insert("conditions".to_string(), conditions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(name: &str, generation: i64) -> Value {
        serde_json::json!({
            "apiVersion": "hyperfleet.io/v1",
            "kind": "Cluster",
            "metadata": {"name": name, "namespace": "ns", "annotations": {hyperfleet_adapter_manifest::GENERATION_ANNOTATION: generation.to_string()}},
        })
    }

    #[test]
    fn pick_winner_prefers_highest_generation() {
        let candidates = vec![manifest("a", 3), manifest("b", 7), manifest("c", 5)];
        let winner = pick_winner(candidates).unwrap();
        assert_eq!(winner["metadata"]["name"], Value::String("b".to_string()));
    }

    #[test]
    fn pick_winner_ties_break_lexicographically() {
        let candidates = vec![manifest("zeta", 5), manifest("alpha", 5)];
        let winner = pick_winner(candidates).unwrap();
        assert_eq!(winner["metadata"]["name"], Value::String("alpha".to_string()));
    }

    #[test]
    fn pick_winner_none_when_empty() {
        assert!(pick_winner(Vec::new()).is_none());
    }

    #[test]
    fn enrich_copies_status_feedback_from_matching_parent() {
        let mut ctx = ExecutionContext::new(Default::default());
        ctx.set_resource(
            "parent-work",
            serde_json::json!({
                "kind": "ManifestWork",
                "status": {
                    "resourceStatus": [{
                        "resourceMeta": {"kind": "Cluster", "namespace": "ns", "name": "c1"},
                        "statusFeedback": {"values": [{"name": "phase", "value": "Ready"}]},
                        "conditions": [{"type": "Applied", "status": "True"}],
                    }],
                },
            }),
        );

        let gvk = Gvk { group: "hyperfleet.io".to_string(), version: "v1".to_string(), kind: "Cluster".to_string() };
        let mut child = manifest("c1", 1);
        enrich_from_manifestwork_parents(&ctx, &gvk, "ns", "c1", &mut child);
        assert!(child["status"]["statusFeedback"]["values"].is_array());
        assert!(child["status"]["conditions"].is_array());
    }

    #[test]
    fn enrich_is_noop_without_matching_parent() {
        let ctx = ExecutionContext::new(Default::default());
        let gvk = Gvk { group: "hyperfleet.io".to_string(), version: "v1".to_string(), kind: "Cluster".to_string() };
        let mut child = manifest("c1", 1);
        let before = child.clone();
        enrich_from_manifestwork_parents(&ctx, &gvk, "ns", "c1", &mut child);
        assert_eq!(before, child);
    }
}
