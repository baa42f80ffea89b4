//! ManifestWork / Maestro transport: bundles every resource delivered in
//! one `ApplyResources` call into a single ManifestWork keyed by
//! `(consumer, workName)`, applies it over an HTTPS REST lifecycle channel, and
//! delivers the work payload over a long-lived gRPC CloudEvents channel.
//!
//! Connection management is explicit rather than inherited: both the gRPC channel
//! and the HTTP client are built from an explicit TLS configuration resolved once
//! at construction, rather than reusing the process default HTTP transport.

use std::collections::BTreeMap;
use std::sync::Arc;

use hyperfleet_adapter_core::TransportError;
use hyperfleet_adapter_manifest::{read_generation, ApplyDecision, ApplyOperation, GENERATION_ANNOTATION};
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};

use crate::logging::{LeveledLog, TracingLeveledLogger};
use crate::proto::work_delivery_client::WorkDeliveryClient;
use crate::proto::CloudEvent;
use crate::tls::{TlsMaterial, TlsMode};
use crate::transport::Transport;
use crate::types::{ApplyResult, Discovery, Gvk, ResourceToApply, TransportContext};

const BACKEND: &str = "manifestwork";
const MANIFESTWORK_API_VERSION: &str = "work.open-cluster-management.io/v1";
const CLOUDEVENTS_SPEC_VERSION: &str = "1.0";

/// Rejects a `CloudEvent` missing any of the four fields CloudEvents requires on
/// every envelope: `id`, `source`, `type`, `specversion`.
fn validate_cloud_event(event: &CloudEvent) -> Result<(), TransportError> {
    let missing: Vec<&str> = [
        ("id", event.id.is_empty()),
        ("source", event.source.is_empty()),
        ("type", event.r#type.is_empty()),
        ("specversion", event.spec_version.is_empty()),
    ]
    .into_iter()
    .filter_map(|(field, is_empty)| is_empty.then_some(field))
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TransportError::Configuration {
            backend: BACKEND.to_string(),
            message: format!("CloudEvent missing required field(s): {}", missing.join(", ")),
        })
    }
}

pub struct ManifestWorkConfig {
    pub grpc_endpoint: String,
    pub http_base_url: String,
    pub source_id: String,
    pub tls: TlsMaterial,
}

pub struct ManifestWorkTransport {
    grpc_channel: Channel,
    http_client: reqwest::Client,
    http_base_url: String,
    source_id: String,
    tls: TlsMode,
    logger: Arc<dyn LeveledLog>,
}

impl ManifestWorkTransport {
    pub fn new(config: ManifestWorkConfig) -> Result<Self, TransportError> {
        let tls = TlsMode::resolve(&config.tls)?;
        let grpc_channel = build_grpc_channel(&config.grpc_endpoint, &tls)?;
        let http_client = build_http_client(&tls)?;
        let logger: Arc<dyn LeveledLog> = Arc::new(TracingLeveledLogger);
        logger.info("manifestwork.init", &format!("initialized with tls mode {tls:?}"));
        Ok(Self {
            grpc_channel,
            http_client,
            http_base_url: config.http_base_url,
            source_id: config.source_id,
            tls,
            logger,
        })
    }

    fn work_url(&self, consumer: &str, work_name: &str) -> String {
        format!("{}/api/maestro/v1/resources/{consumer}/{work_name}", self.http_base_url)
    }

    fn http_request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let req = self.http_client.request(method, url).header("User-Agent", "hyperfleet-adapter");
        match self.tls.bearer_token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn fetch_manifest_work(&self, consumer: &str, work_name: &str) -> Result<Option<serde_json::Value>, TransportError> {
        let url = self.work_url(consumer, work_name);
        let resp = self
            .http_request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| TransportError::Network { backend: BACKEND.to_string(), message: e.to_string() })?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            return Err(TransportError::Network { backend: BACKEND.to_string(), message: format!("GET {url}: {status}") });
        }
        resp.json::<serde_json::Value>()
            .await
            .map(Some)
            .map_err(|e| TransportError::Network { backend: BACKEND.to_string(), message: e.to_string() })
    }

    async fn push_manifest_work(&self, consumer: &str, work_name: &str, bundle: &serde_json::Value) -> Result<(), TransportError> {
        let url = self.work_url(consumer, work_name);
        let resp = self
            .http_request(reqwest::Method::PUT, &url)
            .json(bundle)
            .send()
            .await
            .map_err(|e| TransportError::Network { backend: BACKEND.to_string(), message: e.to_string() })?;
        if !resp.status().is_success() {
            let status = resp.status();
            self.logger.error("manifestwork.push", &format!("PUT {url} failed: {status}"));
            return Err(TransportError::Network { backend: BACKEND.to_string(), message: format!("PUT {url}: {status}") });
        }
        Ok(())
    }

    async fn delete_manifest_work(&self, consumer: &str, work_name: &str) -> Result<(), TransportError> {
        let url = self.work_url(consumer, work_name);
        let resp = self
            .http_request(reqwest::Method::DELETE, &url)
            .send()
            .await
            .map_err(|e| TransportError::Network { backend: BACKEND.to_string(), message: e.to_string() })?;
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            let status = resp.status();
            return Err(TransportError::Network { backend: BACKEND.to_string(), message: format!("DELETE {url}: {status}") });
        }
        Ok(())
    }

    /// Delivers the bundle over the gRPC CloudEvents channel, addressed by
    /// `(sourceId, consumerName, workName)`.
    async fn deliver_work(&self, consumer: &str, work_name: &str, bundle: &serde_json::Value, now_rfc3339: &str, event_id: &str) -> Result<(), TransportError> {
        let mut client = WorkDeliveryClient::new(self.grpc_channel.clone());
        let data = serde_json::to_vec(bundle).map_err(|e| TransportError::Configuration { backend: BACKEND.to_string(), message: e.to_string() })?;
        let event = CloudEvent {
            id: event_id.to_string(),
            source: self.source_id.clone(),
            r#type: "io.hyperfleet.manifestwork.v1.apply".to_string(),
            time: now_rfc3339.to_string(),
            consumer_name: consumer.to_string(),
            work_name: work_name.to_string(),
            data,
            spec_version: CLOUDEVENTS_SPEC_VERSION.to_string(),
        };
        validate_cloud_event(&event)?;
        let resp = client
            .publish_work(event)
            .await
            .map_err(|status| TransportError::Network { backend: BACKEND.to_string(), message: status.to_string() })?
            .into_inner();
        if !resp.accepted {
            self.logger.error("manifestwork.deliver", &resp.message);
            return Err(TransportError::Conflict { name: work_name.to_string(), message: resp.message });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for ManifestWorkTransport {
    /// All-or-nothing: every resource in the call is bundled into one ManifestWork,
    /// so a single apply either succeeds for all of them or fails for all of them.
    async fn apply_resources(&self, ctx: &TransportContext, resources: Vec<ResourceToApply>) -> Result<Vec<ApplyResult>, TransportError> {
        let consumer = require_context_field(ctx.target_cluster.as_deref(), "targetCluster")?;
        let work_name = require_context_field(ctx.manifest_work_name.as_deref(), "manifestWorkName")?;

        let new_generation = resources.iter().map(|r| read_generation(&r.manifest)).max().unwrap_or(0);
        let recreate_on_change = resources.iter().any(|r| r.options.recreate_on_change);

        let existing_work = self.fetch_manifest_work(consumer, work_name).await?;
        let existing_generation = existing_work.as_ref().map(read_generation);
        let decision = ApplyDecision::decide(new_generation, existing_generation, recreate_on_change);

        let labels = ctx.ref_content.as_ref().map(|r| r.merged_labels()).unwrap_or_default();
        let annotations = ctx.ref_content.as_ref().map(|r| r.merged_annotations()).unwrap_or_default();
        let delete_option = ctx.ref_content.as_ref().and_then(|r| r.delete_option.clone());

        let bundle = build_manifest_work(work_name, consumer, &resources, new_generation, &labels, &annotations, delete_option);

        match decision.operation {
            ApplyOperation::Skip => {}
            ApplyOperation::Create | ApplyOperation::Update => {
                self.push_manifest_work(consumer, work_name, &bundle).await?;
                self.deliver_work(consumer, work_name, &bundle, &now_rfc3339(), &event_id()).await?;
            }
            ApplyOperation::Recreate => {
                self.delete_manifest_work(consumer, work_name).await?;
                self.push_manifest_work(consumer, work_name, &bundle).await?;
                self.deliver_work(consumer, work_name, &bundle, &now_rfc3339(), &event_id()).await?;
            }
        }

        let reason = format!("applied via ManifestWork {work_name}: {}", decision.reason);
        Ok(resources
            .iter()
            .map(|r| ApplyResult { operation: decision.operation, reason: reason.clone(), resource: r.manifest.clone(), error: None })
            .collect())
    }

    async fn get_resource(&self, ctx: &TransportContext, gvk: &Gvk, namespace: &str, name: &str) -> Result<Option<serde_json::Value>, TransportError> {
        let consumer = require_context_field(ctx.target_cluster.as_deref(), "targetCluster")?;
        let work_name = require_context_field(ctx.manifest_work_name.as_deref(), "manifestWorkName")?;
        let Some(work) = self.fetch_manifest_work(consumer, work_name).await? else {
            return Ok(None);
        };
        Ok(find_member(&work, gvk, namespace, name))
    }

    /// Label-selector discovery against ManifestWork members is not supported in
    /// the general case; always reports an empty list.
    async fn discover_resources(&self, ctx: &TransportContext, gvk: &Gvk, discovery: &Discovery) -> Result<Vec<serde_json::Value>, TransportError> {
        match discovery {
            Discovery::BySelectors { .. } => Ok(Vec::new()),
            Discovery::ByName { namespace, name } => {
                let found = self.get_resource(ctx, gvk, namespace, name).await?;
                Ok(found.into_iter().collect())
            }
        }
    }
}

fn require_context_field<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, TransportError> {
    value.ok_or_else(|| TransportError::Configuration {
        backend: BACKEND.to_string(),
        message: format!("{field} is required for the ManifestWork transport"),
    })
}

fn find_member(work: &serde_json::Value, gvk: &Gvk, namespace: &str, name: &str) -> Option<serde_json::Value> {
    let members = work.pointer("/spec/workload/manifests")?.as_array()?;
    members
        .iter()
        .find(|member| {
            let api_version = member.get("apiVersion").and_then(|v| v.as_str()).unwrap_or("");
            let kind = member.get("kind").and_then(|v| v.as_str()).unwrap_or("");
            let member_namespace = member.pointer("/metadata/namespace").and_then(|v| v.as_str()).unwrap_or("");
            let member_name = member.pointer("/metadata/name").and_then(|v| v.as_str()).unwrap_or("");
            let expected_api_version = if gvk.is_core() { gvk.version.clone() } else { format!("{}/{}", gvk.group, gvk.version) };
            api_version == expected_api_version && kind == gvk.kind && member_namespace == namespace && member_name == name
        })
        .cloned()
}

fn build_manifest_work(
    work_name: &str,
    consumer: &str,
    resources: &[ResourceToApply],
    generation: i64,
    labels: &BTreeMap<String, String>,
    annotations: &BTreeMap<String, String>,
    delete_option: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut all_annotations = serde_json::Map::new();
    for (k, v) in annotations {
        all_annotations.insert(k.clone(), serde_json::Value::String(v.clone()));
    }
    all_annotations.insert(GENERATION_ANNOTATION.to_string(), serde_json::json!(generation.to_string()));

    serde_json::json!({
        "apiVersion": MANIFESTWORK_API_VERSION,
        "kind": "ManifestWork",
        "metadata": {
            "name": work_name,
            "namespace": consumer,
            "labels": labels,
            "annotations": all_annotations,
        },
        "spec": {
            "workload": {
                "manifests": resources.iter().map(|r| r.manifest.clone()).collect::<Vec<_>>(),
            },
            "deleteOption": delete_option,
        },
    })
}

fn build_grpc_channel(endpoint: &str, tls: &TlsMode) -> Result<Channel, TransportError> {
    let builder = Endpoint::from_shared(endpoint.to_string())
        .map_err(|e| TransportError::Configuration { backend: BACKEND.to_string(), message: e.to_string() })?;

    let builder = match tls {
        TlsMode::Insecure => builder,
        TlsMode::Mutual { ca, cert, key } => builder
            .tls_config(
                ClientTlsConfig::new()
                    .ca_certificate(Certificate::from_pem(ca))
                    .identity(Identity::from_pem(cert, key)),
            )
            .map_err(|e| TransportError::Configuration { backend: BACKEND.to_string(), message: e.to_string() })?,
        TlsMode::Bearer { ca, .. } | TlsMode::CaOnly { ca } => builder
            .tls_config(ClientTlsConfig::new().ca_certificate(Certificate::from_pem(ca)))
            .map_err(|e| TransportError::Configuration { backend: BACKEND.to_string(), message: e.to_string() })?,
    };

    Ok(builder.connect_lazy())
}

fn build_http_client(tls: &TlsMode) -> Result<reqwest::Client, TransportError> {
    let mut builder = reqwest::Client::builder();
    let config_err = |e: reqwest::Error| TransportError::Configuration { backend: BACKEND.to_string(), message: e.to_string() };

    match tls {
        TlsMode::Insecure => {}
        TlsMode::Mutual { ca, cert, key } => {
            let mut pem = cert.clone();
            pem.extend_from_slice(key);
            let identity = reqwest::Identity::from_pem(&pem).map_err(config_err)?;
            let root = reqwest::Certificate::from_pem(ca).map_err(config_err)?;
            builder = builder.add_root_certificate(root).identity(identity);
        }
        TlsMode::Bearer { ca, .. } | TlsMode::CaOnly { ca } => {
            let root = reqwest::Certificate::from_pem(ca).map_err(config_err)?;
            builder = builder.add_root_certificate(root);
        }
    }

    builder.build().map_err(config_err)
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn event_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_resource(namespace: &str, name: &str, generation: i64) -> ResourceToApply {
        ResourceToApply {
            name: name.to_string(),
            manifest: serde_json::json!({
                "apiVersion": "hyperfleet.io/v1",
                "kind": "Cluster",
                "metadata": {
                    "namespace": namespace,
                    "name": name,
                    "annotations": { GENERATION_ANNOTATION: generation.to_string() },
                },
            }),
            existing: None,
            options: crate::types::ApplyOptions::default(),
        }
    }

    #[test]
    fn build_manifest_work_takes_the_max_member_generation() {
        let resources = vec![sample_resource("ns", "a", 3), sample_resource("ns", "b", 7)];
        let max_gen = resources.iter().map(|r| read_generation(&r.manifest)).max().unwrap();
        assert_eq!(max_gen, 7);
        let bundle = build_manifest_work("work-1", "cluster-1", &resources, max_gen, &BTreeMap::new(), &BTreeMap::new(), None);
        assert_eq!(read_generation(&bundle), 7);
        assert_eq!(bundle["spec"]["workload"]["manifests"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn find_member_matches_on_full_identity() {
        let resources = vec![sample_resource("ns", "a", 1)];
        let bundle = build_manifest_work("work-1", "cluster-1", &resources, 1, &BTreeMap::new(), &BTreeMap::new(), None);
        let gvk = Gvk { group: "hyperfleet.io".to_string(), version: "v1".to_string(), kind: "Cluster".to_string() };
        assert!(find_member(&bundle, &gvk, "ns", "a").is_some());
        assert!(find_member(&bundle, &gvk, "ns", "missing").is_none());
    }

    #[test]
    fn require_context_field_errors_when_absent() {
        assert!(require_context_field(None, "targetCluster").is_err());
        assert!(require_context_field(Some("x"), "targetCluster").is_ok());
    }

    fn sample_cloud_event() -> CloudEvent {
        CloudEvent {
            id: "evt-1".to_string(),
            source: "hyperfleet-adapter".to_string(),
            r#type: "io.hyperfleet.manifestwork.v1.apply".to_string(),
            time: "2026-01-01T00:00:00Z".to_string(),
            consumer_name: "cluster-1".to_string(),
            work_name: "work-1".to_string(),
            data: Vec::new(),
            spec_version: CLOUDEVENTS_SPEC_VERSION.to_string(),
        }
    }

    #[test]
    fn validate_cloud_event_accepts_a_complete_envelope() {
        assert!(validate_cloud_event(&sample_cloud_event()).is_ok());
    }

    #[test]
    fn validate_cloud_event_rejects_missing_required_fields() {
        let mut event = sample_cloud_event();
        event.id = String::new();
        event.spec_version = String::new();
        let err = validate_cloud_event(&event).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("id"));
        assert!(message.contains("specversion"));
    }
}
