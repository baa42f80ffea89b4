//! `param` step execution: binds one value onto the context under `params`
//! from exactly one of `source`, `value`, or `expression`, falling back to
//! `default` when the resolved value is absent.

use hyperfleet_adapter_core::{ParamSource, ParamStep, StepError};
use serde_json::Value;

pub fn execute(step: &ParamStep, scope: &Value) -> Result<Value, StepError> {
    let resolved = if let Some(source) = step.source_kind() {
        match source {
            ParamSource::Env(name) => std::env::var(&name).ok().map(Value::String),
            ParamSource::Event(path) => resolve_dotted(&path, scope.get("event").unwrap_or(&Value::Null)),
            ParamSource::Params(path) => resolve_dotted(&path, scope.get("params").unwrap_or(&Value::Null)),
        }
    } else if let Some(value) = &step.value {
        Some(value.clone())
    } else if let Some(expr) = &step.expression {
        Some(hyperfleet_adapter_expr::eval_value(expr, scope)?)
    } else {
        None
    };

    resolved
        .or_else(|| step.default.clone())
        .ok_or_else(|| StepError::Other("param resolved to no value and no default was set".to_string()))
}

/// Walks a dot-separated path through a JSON tree. Each segment is a plain object
/// key lookup; there is no array-index or optional-chaining syntax here, unlike
/// the expression language (`param.source` paths are always plain).
pub(crate) fn resolve_dotted(path: &str, root: &Value) -> Option<Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperfleet_adapter_core::ParamStep;

    fn step(source: Option<&str>, value: Option<Value>, expression: Option<&str>, default: Option<Value>) -> ParamStep {
        ParamStep {
            source: source.map(|s| s.to_string()),
            value,
            expression: expression.map(|s| s.to_string()),
            default,
        }
    }

    #[test]
    fn resolves_from_event_path() {
        let scope = serde_json::json!({"event": {"clusterId": "abc"}, "params": {}, "resources": {}, "adapter": {}});
        let s = step(Some("event.clusterId"), None, None, None);
        assert_eq!(execute(&s, &scope).unwrap(), Value::String("abc".to_string()));
    }

    #[test]
    fn resolves_from_env() {
        std::env::set_var("HYPERFLEET_ENGINE_TEST_VAR", "env-value");
        let scope = serde_json::json!({});
        let s = step(Some("env.HYPERFLEET_ENGINE_TEST_VAR"), None, None, None);
        assert_eq!(execute(&s, &scope).unwrap(), Value::String("env-value".to_string()));
    }

    #[test]
    fn literal_value_wins_without_source() {
        let scope = serde_json::json!({});
        let s = step(None, Some(Value::from(7)), None, None);
        assert_eq!(execute(&s, &scope).unwrap(), Value::from(7));
    }

    #[test]
    fn falls_back_to_default_when_source_unresolved() {
        let scope = serde_json::json!({"event": {}, "params": {}, "resources": {}, "adapter": {}});
        let s = step(Some("event.missing"), None, None, Some(Value::String("fallback".to_string())));
        assert_eq!(execute(&s, &scope).unwrap(), Value::String("fallback".to_string()));
    }

    #[test]
    fn errors_when_nothing_resolves_and_no_default() {
        let scope = serde_json::json!({"event": {}, "params": {}, "resources": {}, "adapter": {}});
        let s = step(Some("event.missing"), None, None, None);
        assert!(execute(&s, &scope).is_err());
    }

    #[test]
    fn resolves_expression() {
        let scope = serde_json::json!({"event": {}, "params": {"clusterPhase": "Ready"}, "resources": {}, "adapter": {}});
        let s = step(None, None, Some("clusterPhase"), None);
        assert_eq!(execute(&s, &scope).unwrap(), Value::String("Ready".to_string()));
    }
}
