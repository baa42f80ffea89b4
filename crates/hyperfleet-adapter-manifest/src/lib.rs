//! Manifest utilities: generation annotation read/validate/compare,
//! label-selector construction, and recursive template rendering of manifests.
//!
//! Manifests are opaque nested JSON trees to the rest of the system except for the
//! `hyperfleet.io/generation` annotation, which is the sole key for idempotent apply
//! decisions.

mod decision;
mod generation;
mod render;
mod selector;

pub use decision::{ApplyDecision, ApplyOperation};
pub use generation::{read_generation, validate_generation, validate_manifest, GENERATION_ANNOTATION};
pub use render::render_mapping;
pub use selector::build_label_selector;
