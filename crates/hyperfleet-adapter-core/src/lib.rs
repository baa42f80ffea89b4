//! Data model, error taxonomy, and per-event execution context for the HyperFleet
//! event adapter.
//!
//! This crate has no I/O: task config shapes, the step tagged-union, and the
//! execution context are plain data plus validation. Transports, rendering, and
//! dispatch live in sibling crates.

pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod step;

pub use config::{AdapterBlock, AdapterTaskConfig, HyperfleetApiBlock, RetryBackoff, TaskMetadata};
pub use context::{AdapterSlot, ExecutionContext, ExecutionError, ExecutionStatus, Phase};
pub use error::{ConfigError, ExpressionError, StepError, TemplateError, TransportError, ValidationError};
pub use event::EventEnvelope;
pub use step::{
    ApiCallStep, Capture, Discovery, HttpMethod, LogLevel, LogStep, ParamSource, ParamStep,
    ResourceStep, Step, StepKind,
};
