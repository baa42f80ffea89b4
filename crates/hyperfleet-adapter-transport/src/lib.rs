//! Transport polymorphism via one capability interface: direct Kubernetes,
//! ManifestWork/Maestro, and an in-memory test double, all implementing the same
//! three-method [`Transport`] trait. Per-request routing is carried in
//! [`TransportContext`], never in subclass state.

mod direct;
mod logging;
mod manifestwork;
mod mock;
mod tls;
mod transport;
mod types;

#[allow(clippy::large_enum_variant)]
pub mod proto {
    tonic::include_proto!("hyperfleet.transport.v1");
}

pub use direct::KubernetesTransport;
pub use logging::{LeveledLog, TracingLeveledLogger};
pub use manifestwork::{ManifestWorkConfig, ManifestWorkTransport};
pub use mock::MockTransport;
pub use tls::{TlsMaterial, TlsMode};
pub use transport::Transport;
pub use types::{ApplyOptions, ApplyResult, Discovery, Gvk, RefContent, ResourceToApply, TransportContext};
