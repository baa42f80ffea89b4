//! Template rendering and the field-access expression language.
//!
//! Both halves operate on a plain `serde_json::Value` scope tree rather than on
//! `hyperfleet-adapter-core::ExecutionContext` directly, so this crate has no
//! dependency on the engine or on execution state, callers project whatever tree
//! they want addressable (`ExecutionContext::as_json` is the usual source) and hand
//! it in.

mod expr;
mod template;

pub use expr::{eval_bool, eval_value};
pub use template::render_template;
