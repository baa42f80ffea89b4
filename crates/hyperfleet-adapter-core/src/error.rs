//! Error taxonomy for the HyperFleet event adapter.
//!
//! Configuration and Validation errors fail the process at startup; Expression, Template and Transport
//! errors are per-event and are captured into `adapter.ExecutionError` rather than
//! propagated, see `hyperfleet-adapter-engine`.

use thiserror::Error;

/// Configuration-time errors: invalid task config, unsupported apiVersion/kind, missing
/// required fields. These fail the process at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unsupported apiVersion: {0}")]
    UnsupportedApiVersion(String),

    #[error("unsupported kind: {0}")]
    UnsupportedKind(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("duplicate step name: {0}")]
    DuplicateStepName(String),

    #[error("step name is empty")]
    EmptyStepName,

    #[error("step name contains a hyphen, which is ambiguous in expressions: {0}")]
    AmbiguousStepName(String),

    #[error("step {0:?} must set exactly one of param/apiCall/resource/payload/log")]
    AmbiguousStepVariant(String),

    #[error("adapter version mismatch: config declares {declared}, running binary is {running}")]
    AdapterVersionMismatch { declared: String, running: String },

    #[error("invalid yaml: {0}")]
    InvalidYaml(String),
}

/// Manifest validation errors. Used by "validate" operations that require the
/// generation annotation to be a positive integer; "read" operations never produce
/// this error and instead default to generation 0.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("manifest is missing an annotations block")]
    MissingAnnotationsBlock,

    #[error("manifest is missing the hyperfleet.io/generation annotation")]
    MissingGenerationKey,

    #[error("hyperfleet.io/generation annotation is empty")]
    EmptyGenerationValue,

    #[error("hyperfleet.io/generation annotation is not an integer: {0:?}")]
    NonIntegerGeneration(String),

    #[error("hyperfleet.io/generation annotation must be > 0, got {0}")]
    NonPositiveGeneration(i64),

    #[error("manifest is missing required field: {0}")]
    MissingManifestField(&'static str),
}

/// Expression-language errors: parse, program construction, and evaluation
/// (including top-level type mismatches).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("parse error in expression {expr:?}: {message}")]
    Parse { expr: String, message: String },

    #[error("cannot construct evaluator for expression {expr:?}: {message}")]
    Program { expr: String, message: String },

    #[error("evaluation error in expression {expr:?}: {message}")]
    Eval { expr: String, message: String },

    #[error("expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },
}

/// Template-rendering errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("undefined variable {0:?} in template")]
    UndefinedVariable(String),

    #[error("unknown filter {0:?} in template")]
    UnknownFilter(String),

    #[error("unterminated template expression in {0:?}")]
    Unterminated(String),
}

/// Transport errors: network, auth, conflict. NotFound is represented
/// separately (see `transport::NotFound`) because it is not an error when
/// discovering existing resources, it is the signal to choose Create.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("network error talking to {backend}: {message}")]
    Network { backend: String, message: String },

    #[error("authentication failed for {backend}: {message}")]
    Auth { backend: String, message: String },

    #[error("conflict applying resource {name}: {message}")]
    Conflict { name: String, message: String },

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("{backend} transport misconfigured: {message}")]
    Configuration { backend: String, message: String },

    #[error("discovery is not supported by this transport: {0}")]
    Unsupported(String),
}

/// Umbrella error returned from fallible step execution inside one event run. It is
/// never returned from the engine's public entry point (see
/// `hyperfleet-adapter-engine::handler`), it is captured into
/// `adapter.ExecutionError` and execution continues per the soft-failure contract.
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Other(String),
}
