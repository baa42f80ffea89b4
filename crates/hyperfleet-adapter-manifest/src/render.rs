//! Recursive manifest rendering: applies a caller-supplied render function
//! to every string value and every map key in a nested mapping/sequence tree.
//!
//! `serde_json::Value` object keys are always strings already, the "convert
//! heterogeneous key maps to string-keyed maps" step happens once, upstream,
//! when the YAML config loader transcodes `serde_yaml::Value` (which allows
//! non-string keys) into this crate's `serde_json::Value` manifests. This
//! function still re-renders keys defensively so a caller that hands it a tree
//! containing numeric-looking keys (e.g. a rendered label map) gets them templated
//! too, not just values.

use hyperfleet_adapter_core::TemplateError;

/// Recursively renders every string leaf (and every object key) in `value` through
/// `render_fn`. Rendering is idempotent by construction as long as `render_fn`
/// itself is idempotent on already-rendered strings, callers
/// whose render function replaces `{{ .x }}` placeholders satisfy this because a
/// rendered string no longer contains the placeholder syntax.
pub fn render_mapping<F>(value: &serde_json::Value, render_fn: &F) -> Result<serde_json::Value, TemplateError>
where
    F: Fn(&str) -> Result<String, TemplateError>,
{
    match value {
        serde_json::Value::String(s) => Ok(serde_json::Value::String(render_fn(s)?)),
        serde_json::Value::Array(items) => {
            let rendered = items
                .iter()
                .map(|item| render_mapping(item, render_fn))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(serde_json::Value::Array(rendered))
        }
        serde_json::Value::Object(map) => {
            let mut rendered = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                let rendered_key = render_fn(k)?;
                rendered.insert(rendered_key, render_mapping(v, render_fn)?);
            }
            Ok(serde_json::Value::Object(rendered))
        }
        // Numbers, bools, null are not template targets; pass through unchanged.
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(s: &str) -> Result<String, TemplateError> {
        Ok(s.to_string())
    }

    fn upper(s: &str) -> Result<String, TemplateError> {
        Ok(s.to_uppercase())
    }

    #[test]
    fn renders_nested_strings_and_keys() {
        let tree = serde_json::json!({
            "metadata": {"name": "cluster-one"},
            "tags": ["a", "b"],
        });
        let rendered = render_mapping(&tree, &upper).unwrap();
        assert_eq!(rendered["METADATA"]["NAME"], serde_json::json!("CLUSTER-ONE"));
        assert_eq!(rendered["TAGS"], serde_json::json!(["A", "B"]));
    }

    #[test]
    fn leaves_non_string_scalars_untouched() {
        let tree = serde_json::json!({"count": 3, "enabled": true, "note": null});
        let rendered = render_mapping(&tree, &identity).unwrap();
        assert_eq!(rendered, tree);
    }

    #[test]
    fn idempotent_for_identity_render() {
        let tree = serde_json::json!({"a": ["x", {"b": "y"}]});
        let once = render_mapping(&tree, &identity).unwrap();
        let twice = render_mapping(&once, &identity).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn propagates_render_errors() {
        let tree = serde_json::json!({"a": "bad"});
        let err_fn = |s: &str| -> Result<String, TemplateError> {
            if s == "bad" {
                Err(TemplateError::UndefinedVariable("x".into()))
            } else {
                Ok(s.to_string())
            }
        };
        assert!(render_mapping(&tree, &err_fn).is_err());
    }
}
