//! In-memory transport double for engine and integration tests, no network, no
//! TLS, deterministic. Mirrors the direct transport's apply-decision semantics so
//! engine tests can assert on `ApplyResult` without standing up a cluster.

use std::collections::BTreeMap;
use std::sync::Mutex;

use hyperfleet_adapter_core::TransportError;
use hyperfleet_adapter_manifest::{read_generation, ApplyDecision, ApplyOperation};

use crate::transport::Transport;
use crate::types::{ApplyResult, Discovery, Gvk, ResourceToApply, TransportContext};

#[derive(Default)]
pub struct MockTransport {
    store: Mutex<BTreeMap<(String, String), serde_json::Value>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(namespace: &str, name: &str) -> (String, String) {
        (namespace.to_string(), name.to_string())
    }

    /// Seeds the store directly, as if a prior apply had already landed.
    pub fn seed(&self, namespace: &str, name: &str, manifest: serde_json::Value) {
        self.store.lock().unwrap().insert(Self::key(namespace, name), manifest);
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<serde_json::Value> {
        self.store.lock().unwrap().get(&Self::key(namespace, name)).cloned()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn apply_resources(&self, _ctx: &TransportContext, resources: Vec<ResourceToApply>) -> Result<Vec<ApplyResult>, TransportError> {
        let mut results = Vec::with_capacity(resources.len());
        for resource in resources {
            let (namespace, name) = (
                resource.manifest.pointer("/metadata/namespace").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                resource.manifest.pointer("/metadata/name").and_then(|v| v.as_str()).unwrap_or("").to_string(),
            );
            let new_generation = read_generation(&resource.manifest);
            let existing_generation = resource.existing.as_ref().map(read_generation);
            let decision = ApplyDecision::decide(new_generation, existing_generation, resource.options.recreate_on_change);

            let applied = match decision.operation {
                ApplyOperation::Skip => resource.existing.clone().unwrap_or_else(|| resource.manifest.clone()),
                ApplyOperation::Create | ApplyOperation::Update | ApplyOperation::Recreate => resource.manifest.clone(),
            };
            if !matches!(decision.operation, ApplyOperation::Skip) {
                self.store.lock().unwrap().insert(Self::key(&namespace, &name), applied.clone());
            }

            results.push(ApplyResult { operation: decision.operation, reason: decision.reason, resource: applied, error: None });
        }
        Ok(results)
    }

    async fn get_resource(&self, _ctx: &TransportContext, _gvk: &Gvk, namespace: &str, name: &str) -> Result<Option<serde_json::Value>, TransportError> {
        Ok(self.get(namespace, name))
    }

    async fn discover_resources(&self, _ctx: &TransportContext, _gvk: &Gvk, discovery: &Discovery) -> Result<Vec<serde_json::Value>, TransportError> {
        let store = self.store.lock().unwrap();
        match discovery {
            Discovery::ByName { namespace, name } => Ok(store.get(&Self::key(namespace, name)).cloned().into_iter().collect()),
            Discovery::BySelectors { namespace, label_selector } => Ok(store
                .iter()
                .filter(|((ns, _), _)| namespace == "*" || namespace.is_empty() || ns == namespace)
                .filter(|(_, manifest)| manifest_matches_selector(manifest, label_selector))
                .map(|(_, manifest)| manifest.clone())
                .collect()),
        }
    }
}

fn manifest_matches_selector(manifest: &serde_json::Value, label_selector: &str) -> bool {
    if label_selector.is_empty() {
        return true;
    }
    let labels = manifest.pointer("/metadata/labels").and_then(|v| v.as_object());
    label_selector.split(',').all(|pair| match pair.split_once('=') {
        Some((k, v)) => labels.and_then(|l| l.get(k)).and_then(|val| val.as_str()) == Some(v),
        None => false,
    })
}
