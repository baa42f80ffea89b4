//! `payload` step execution: recursively walks a payload tree, resolving
//! `{value: ...}`/`{expression: ...}` leaf mappings and rendering every other
//! string as a template.

use hyperfleet_adapter_core::{StepError, TemplateError};
use serde_json::Value;

pub fn execute(payload: &Value, scope: &Value) -> Result<Value, StepError> {
    render(payload, scope).map_err(StepError::from)
}

fn render(node: &Value, scope: &Value) -> Result<Value, StepError> {
    match node {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(literal) = map.get("value") {
                    return Ok(literal.clone());
                }
                if let Some(expr) = map.get("expression") {
                    let expr = expr.as_str().ok_or_else(|| TemplateError::Unterminated("expression must be a string".to_string()))?;
                    return Ok(hyperfleet_adapter_expr::eval_value(expr, scope)?);
                }
            }
            let mut rendered = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                rendered.insert(k.clone(), render(v, scope)?);
            }
            Ok(Value::Object(rendered))
        }
        Value::Array(items) => Ok(Value::Array(items.iter().map(|i| render(i, scope)).collect::<Result<_, _>>()?)),
        Value::String(s) => Ok(Value::String(hyperfleet_adapter_expr::render_template(s, scope)?)),
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> Value {
        serde_json::json!({
            "event": {"clusterId": "abc"},
            "params": {"phase": "Ready"},
            "resources": {},
            "adapter": {"executionStatus": "success", "errorReason": null, "errorMessage": null},
        })
    }

    #[test]
    fn renders_plain_strings_as_templates() {
        let payload = serde_json::json!({"id": "{{ .params.phase }}"});
        let rendered = execute(&payload, &scope()).unwrap();
        assert_eq!(rendered["id"], Value::String("Ready".to_string()));
    }

    #[test]
    fn value_key_passes_through_literal() {
        let payload = serde_json::json!({"count": {"value": 3}});
        let rendered = execute(&payload, &scope()).unwrap();
        assert_eq!(rendered["count"], Value::from(3));
    }

    #[test]
    fn expression_key_evaluates() {
        let payload = serde_json::json!({"ready": {"expression": "phase == \"Ready\""}});
        let rendered = execute(&payload, &scope()).unwrap();
        assert_eq!(rendered["ready"], Value::Bool(true));
    }

    #[test]
    fn recurses_into_arrays_and_nested_objects() {
        let payload = serde_json::json!({"items": [{"id": "{{ .event.clusterId }}"}, {"value": "raw"}]});
        let rendered = execute(&payload, &scope()).unwrap();
        assert_eq!(rendered["items"][0]["id"], Value::String("abc".to_string()));
        assert_eq!(rendered["items"][1], Value::String("raw".to_string()));
    }
}
