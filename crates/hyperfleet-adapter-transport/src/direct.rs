//! Direct Kubernetes transport: a dynamic REST client over the cluster
//! API, authenticating with either an in-cluster service-account token or a bearer
//! token sourced from a kubeconfig path at startup. There is no API discovery
//! here, [`Gvk::naive_plural`] guesses the REST plural, which is wrong for
//! irregular kinds; a production client would discover plurals from the server.

use std::time::Duration;

use async_trait::async_trait;
use hyperfleet_adapter_core::TransportError;
use hyperfleet_adapter_manifest::{read_generation, ApplyDecision, ApplyOperation};
use tracing::{debug, warn};

use crate::transport::Transport;
use crate::types::{ApplyResult, Discovery, Gvk, ResourceToApply, TransportContext};

const BACKEND: &str = "direct-kubernetes";
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub struct KubernetesTransport {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
    recreate_poll_timeout: Duration,
}

impl KubernetesTransport {
    pub fn new(base_url: impl Into<String>, bearer_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            bearer_token,
            recreate_poll_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_recreate_poll_timeout(mut self, timeout: Duration) -> Self {
        self.recreate_poll_timeout = timeout;
        self
    }

    fn resource_url(&self, gvk: &Gvk, namespace: &str, name: Option<&str>) -> String {
        let api_root = if gvk.is_core() {
            format!("{}/api/{}", self.base_url, gvk.version)
        } else {
            format!("{}/apis/{}/{}", self.base_url, gvk.group, gvk.version)
        };
        let plural = gvk.naive_plural();
        match name {
            Some(name) => format!("{api_root}/namespaces/{namespace}/{plural}/{name}"),
            None => format!("{api_root}/namespaces/{namespace}/{plural}"),
        }
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let req = self.client.request(method, url);
        match &self.bearer_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    fn gvk_namespace_name(manifest: &serde_json::Value) -> Option<(String, String)> {
        let namespace = manifest.pointer("/metadata/namespace")?.as_str()?.to_string();
        let name = manifest.pointer("/metadata/name")?.as_str()?.to_string();
        Some((namespace, name))
    }

    async fn create(&self, gvk: &Gvk, namespace: &str, manifest: &serde_json::Value) -> Result<serde_json::Value, TransportError> {
        let url = self.resource_url(gvk, namespace, None);
        let resp = self
            .request(reqwest::Method::POST, &url)
            .json(manifest)
            .send()
            .await
            .map_err(|e| TransportError::Network { backend: BACKEND.to_string(), message: e.to_string() })?;
        Self::decode(resp).await
    }

    async fn update(&self, gvk: &Gvk, namespace: &str, name: &str, manifest: &serde_json::Value) -> Result<serde_json::Value, TransportError> {
        let url = self.resource_url(gvk, namespace, Some(name));
        let resp = self
            .request(reqwest::Method::PUT, &url)
            .json(manifest)
            .send()
            .await
            .map_err(|e| TransportError::Network { backend: BACKEND.to_string(), message: e.to_string() })?;
        Self::decode(resp).await
    }

    async fn delete(&self, gvk: &Gvk, namespace: &str, name: &str) -> Result<(), TransportError> {
        let url = self.resource_url(gvk, namespace, Some(name));
        let resp = self
            .request(reqwest::Method::DELETE, &url)
            .send()
            .await
            .map_err(|e| TransportError::Network { backend: BACKEND.to_string(), message: e.to_string() })?;
        if resp.status().is_success() || resp.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(TransportError::Network { backend: BACKEND.to_string(), message: format!("delete failed: {}", resp.status()) })
        }
    }

    async fn decode(resp: reqwest::Response) -> Result<serde_json::Value, TransportError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Network { backend: BACKEND.to_string(), message: format!("{status}: {body}") });
        }
        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| TransportError::Network { backend: BACKEND.to_string(), message: e.to_string() })
    }

    /// Polls `GetResource` every 100ms until it reports NotFound (the delete has
    /// landed) or the poll deadline elapses. Any error other than NotFound is
    /// fatal.
    async fn wait_until_absent(&self, gvk: &Gvk, namespace: &str, name: &str) -> Result<(), TransportError> {
        let deadline = tokio::time::Instant::now() + self.recreate_poll_timeout;
        loop {
            match self.get_resource(&TransportContext::default(), gvk, namespace, name).await? {
                None => return Ok(()),
                Some(_) => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(TransportError::Timeout(format!("{namespace}/{name} still present after delete")));
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }
}

#[async_trait]
impl Transport for KubernetesTransport {
    /// Sequential, fail-fast: once a resource fails, every remaining resource in
    /// this call is reported Skip with a "prior resource failed" reason instead of
    /// attempting its own mutation.
    async fn apply_resources(&self, _ctx: &TransportContext, resources: Vec<ResourceToApply>) -> Result<Vec<ApplyResult>, TransportError> {
        let mut results = Vec::with_capacity(resources.len());
        let mut aborted = false;

        for resource in resources {
            if aborted {
                results.push(ApplyResult {
                    operation: ApplyOperation::Skip,
                    reason: "skipped: a prior resource in this call failed".to_string(),
                    resource: resource.manifest,
                    error: Some("not attempted".to_string()),
                });
                continue;
            }

            let gvk = Gvk::of_manifest(&resource.manifest);
            let Some((namespace, name)) = Self::gvk_namespace_name(&resource.manifest) else {
                results.push(ApplyResult {
                    operation: ApplyOperation::Skip,
                    reason: "manifest missing metadata.namespace/name".to_string(),
                    resource: resource.manifest,
                    error: Some("invalid manifest".to_string()),
                });
                aborted = true;
                continue;
            };

            let new_generation = read_generation(&resource.manifest);
            let existing_generation = resource.existing.as_ref().map(read_generation);
            let decision = ApplyDecision::decide(new_generation, existing_generation, resource.options.recreate_on_change);

            let outcome = match decision.operation {
                ApplyOperation::Create => self.create(&gvk, &namespace, &resource.manifest).await,
                ApplyOperation::Update => {
                    let mut manifest = resource.manifest.clone();
                    if let Some(existing) = &resource.existing {
                        copy_identity_fields(&mut manifest, existing);
                    }
                    self.update(&gvk, &namespace, &name, &manifest).await
                }
                ApplyOperation::Recreate => {
                    async {
                        self.delete(&gvk, &namespace, &name).await?;
                        self.wait_until_absent(&gvk, &namespace, &name).await?;
                        self.create(&gvk, &namespace, &resource.manifest).await
                    }
                    .await
                }
                ApplyOperation::Skip => Ok(resource.existing.clone().unwrap_or_else(|| resource.manifest.clone())),
            };

            match outcome {
                Ok(applied) => results.push(ApplyResult {
                    operation: decision.operation,
                    reason: decision.reason,
                    resource: applied,
                    error: None,
                }),
                Err(err) => {
                    warn!(resource = %resource.name, error = %err, "direct transport apply failed");
                    results.push(ApplyResult {
                        operation: decision.operation,
                        reason: decision.reason,
                        resource: resource.manifest,
                        error: Some(err.to_string()),
                    });
                    aborted = true;
                }
            }
        }

        Ok(results)
    }

    async fn get_resource(&self, _ctx: &TransportContext, gvk: &Gvk, namespace: &str, name: &str) -> Result<Option<serde_json::Value>, TransportError> {
        let url = self.resource_url(gvk, namespace, Some(name));
        let resp = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| TransportError::Network { backend: BACKEND.to_string(), message: e.to_string() })?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::decode(resp).await.map(Some)
    }

    async fn discover_resources(&self, _ctx: &TransportContext, gvk: &Gvk, discovery: &Discovery) -> Result<Vec<serde_json::Value>, TransportError> {
        match discovery {
            Discovery::ByName { namespace, name } => {
                let found = self.get_resource(&TransportContext::default(), gvk, namespace, name).await?;
                Ok(found.into_iter().collect())
            }
            Discovery::BySelectors { namespace, label_selector } => {
                let namespaces: Vec<&str> = if namespace.is_empty() || namespace == "*" {
                    vec![""]
                } else {
                    vec![namespace.as_str()]
                };
                let mut all = Vec::new();
                for ns in namespaces {
                    let url = self.resource_url(gvk, ns, None);
                    let resp = self
                        .request(reqwest::Method::GET, &url)
                        .query(&[("labelSelector", label_selector.as_str())])
                        .send()
                        .await
                        .map_err(|e| TransportError::Network { backend: BACKEND.to_string(), message: e.to_string() })?;
                    let body = Self::decode(resp).await?;
                    if let Some(items) = body.get("items").and_then(|v| v.as_array()) {
                        all.extend(items.iter().cloned());
                    }
                }
                Ok(all)
            }
        }
    }
}

/// Carries `resourceVersion` and `uid` forward onto the rendered manifest before an
/// Update PUT, the server rejects a PUT missing `resourceVersion`.
fn copy_identity_fields(manifest: &mut serde_json::Value, existing: &serde_json::Value) {
    debug!("copying resourceVersion/uid from existing object onto rendered manifest");
    for field in ["resourceVersion", "uid"] {
        if let Some(value) = existing.pointer(&format!("/metadata/{field}")) {
            if let Some(metadata) = manifest.get_mut("metadata").and_then(|m| m.as_object_mut()) {
                metadata.insert(field.to_string(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naive_plural_lowercases_and_appends_s() {
        let gvk = Gvk { group: "hyperfleet.io".to_string(), version: "v1".to_string(), kind: "Cluster".to_string() };
        assert_eq!(gvk.naive_plural(), "clusters");
    }

    #[test]
    fn manifest_gvk_splits_group_and_version() {
        let manifest = serde_json::json!({"apiVersion": "hyperfleet.io/v1", "kind": "Cluster"});
        let gvk = Gvk::of_manifest(&manifest);
        assert_eq!(gvk.group, "hyperfleet.io");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.kind, "Cluster");
    }

    #[test]
    fn manifest_gvk_treats_bare_version_as_core_group() {
        let manifest = serde_json::json!({"apiVersion": "v1", "kind": "ConfigMap"});
        let gvk = Gvk::of_manifest(&manifest);
        assert!(gvk.is_core());
        assert_eq!(gvk.version, "v1");
    }

    #[test]
    fn copy_identity_fields_carries_resource_version_and_uid() {
        let mut manifest = serde_json::json!({"metadata": {"name": "c1"}});
        let existing = serde_json::json!({"metadata": {"name": "c1", "resourceVersion": "42", "uid": "abc"}});
        copy_identity_fields(&mut manifest, &existing);
        assert_eq!(manifest["metadata"]["resourceVersion"], "42");
        assert_eq!(manifest["metadata"]["uid"], "abc");
    }
}
