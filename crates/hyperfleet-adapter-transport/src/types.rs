//! Shared request/response types for the transport capability set.

use std::collections::BTreeMap;

/// A group/version/kind triple. No API-discovery: callers that need the REST
/// plural form go through [`Gvk::naive_plural`], which is a pragmatic
/// lower-and-pluralize and will be wrong for irregular kinds (e.g. `Ingress` ->
/// `ingresss` is wrong; a production client would discover plurals from the
/// API server instead of guessing).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gvk {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl Gvk {
    pub fn naive_plural(&self) -> String {
        format!("{}s", self.kind.to_lowercase())
    }

    pub fn is_core(&self) -> bool {
        self.group.is_empty()
    }

    /// Reads `apiVersion`/`kind` off a rendered manifest. `apiVersion` with no `/`
    /// is treated as the core group (`""`).
    pub fn of_manifest(manifest: &serde_json::Value) -> Gvk {
        let api_version = manifest.get("apiVersion").and_then(|v| v.as_str()).unwrap_or("");
        let kind = manifest.get("kind").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let (group, version) = match api_version.split_once('/') {
            Some((group, version)) => (group.to_string(), version.to_string()),
            None => (String::new(), api_version.to_string()),
        };
        Gvk { group, version, kind }
    }
}

/// Discovery mode for locating an existing object.
#[derive(Debug, Clone)]
pub enum Discovery {
    ByName { namespace: String, name: String },
    BySelectors { namespace: String, label_selector: String },
}

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub recreate_on_change: bool,
}

#[derive(Debug, Clone)]
pub struct ResourceToApply {
    pub name: String,
    pub manifest: serde_json::Value,
    pub existing: Option<serde_json::Value>,
    pub options: ApplyOptions,
}

#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub operation: hyperfleet_adapter_manifest::ApplyOperation,
    pub reason: String,
    pub resource: serde_json::Value,
    pub error: Option<String>,
}

/// Labels/annotations/deleteOption used to build ManifestWork ref-content.
/// `metadata_labels`/`metadata_annotations` are the nested, modern fields;
/// `legacy_labels`/`legacy_annotations` mirror an older root-level convention
/// this system still accepts. Per-field merge order is documented at
/// [`RefContent::merged_labels`]/[`RefContent::merged_annotations`].
#[derive(Debug, Clone, Default)]
pub struct RefContent {
    pub legacy_labels: BTreeMap<String, String>,
    pub legacy_annotations: BTreeMap<String, String>,
    pub metadata_labels: BTreeMap<String, String>,
    pub metadata_annotations: BTreeMap<String, String>,
    pub delete_option: Option<serde_json::Value>,
}

impl RefContent {
    /// Nested `metadata.labels` wins over legacy root-level labels on key
    /// collision, the nested field is the one authors are expected to set
    /// going forward, so a stray legacy entry should never shadow it.
    pub fn merged_labels(&self) -> BTreeMap<String, String> {
        let mut merged = self.legacy_labels.clone();
        merged.extend(self.metadata_labels.clone());
        merged
    }

    pub fn merged_annotations(&self) -> BTreeMap<String, String> {
        let mut merged = self.legacy_annotations.clone();
        merged.extend(self.metadata_annotations.clone());
        merged
    }
}

/// Per-request transport context bag: routing information that does not
/// belong on the resource manifest itself. Optional fields are required only
/// by the transports that use them (e.g. `target_cluster` is required by the
/// ManifestWork transport and ignored by the direct transport).
#[derive(Debug, Clone, Default)]
pub struct TransportContext {
    pub target_cluster: Option<String>,
    pub manifest_work_name: Option<String>,
    pub resource_name: Option<String>,
    pub ref_content: Option<RefContent>,
    pub params: BTreeMap<String, serde_json::Value>,
}
