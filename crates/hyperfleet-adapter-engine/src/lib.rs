//! The step engine and event handler facade: a sequential
//! interpreter over one `AdapterTaskConfig`'s steps, driven one event at a time.
//!
//! The engine owns no network clients directly beyond a shared `reqwest::Client`
//! for `apiCall` steps; resource discovery and apply go through whatever
//! `hyperfleet_adapter_transport::Transport` the caller wires in, so swapping the
//! direct Kubernetes transport for ManifestWork is a construction-time choice, not
//! a code change here.

mod apicall;
mod engine;
mod handler;
mod metrics;
mod param;
mod payload;
mod resource;

pub use engine::StepEngine;
pub use handler::EventHandler;
pub use metrics::Metrics;
