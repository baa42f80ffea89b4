//! The capability interface: transport polymorphism via one small trait, not an
//! inheritance hierarchy. Direct-Kubernetes and ManifestWork are the two concrete
//! backends; `MockTransport` (test-only) is a third.

use crate::types::{ApplyResult, Discovery, Gvk, ResourceToApply, TransportContext};
use hyperfleet_adapter_core::TransportError;

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Applies every resource in input order, returning one `ApplyResult` per
    /// input in the same order. Whether a single element's error aborts the rest
    /// is transport-defined and must be documented on the implementation.
    async fn apply_resources(
        &self,
        ctx: &TransportContext,
        resources: Vec<ResourceToApply>,
    ) -> Result<Vec<ApplyResult>, TransportError>;

    /// `Ok(None)` is NotFound, which is not an error, it is the signal
    /// upstream code uses to choose Create.
    async fn get_resource(
        &self,
        ctx: &TransportContext,
        gvk: &Gvk,
        namespace: &str,
        name: &str,
    ) -> Result<Option<serde_json::Value>, TransportError>;

    async fn discover_resources(
        &self,
        ctx: &TransportContext,
        gvk: &Gvk,
        discovery: &Discovery,
    ) -> Result<Vec<serde_json::Value>, TransportError>;
}
