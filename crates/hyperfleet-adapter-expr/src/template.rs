//! Mustache-like template rendering: `{{ .path.to.field | filter }}`.
//!
//! A placeholder is a dotted field path, optionally piped through one or more
//! filters. A bare path (`.name`, `.cluster.id`) is shorthand for a param lookup
//! (`.params.name`), matching how most templates only ever need to read a value a
//! prior step captured; a path that starts with one of the reserved namespace roots
//! (`.adapter.errorReason`, `.resources.createCluster.metadata.name`) is resolved
//! against that namespace instead. Everything outside `{{ }}` is copied through
//! unchanged.

use hyperfleet_adapter_core::TemplateError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Renders every `{{ ... }}` placeholder in `template` against `scope`.
pub fn render_template(template: &str, scope: &serde_json::Value) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    loop {
        let Some(start) = rest.find(OPEN) else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            return Err(TemplateError::Unterminated(template.to_string()));
        };
        let expr = &after_open[..end];
        out.push_str(&render_placeholder(expr, scope)?);
        rest = &after_open[end + CLOSE.len()..];
    }

    Ok(out)
}

fn render_placeholder(expr: &str, scope: &serde_json::Value) -> Result<String, TemplateError> {
    let mut parts = expr.split('|').map(str::trim);
    let path = parts.next().unwrap_or("").trim();

    let mut value = resolve_path(path, scope)?;
    for filter in parts {
        value = apply_filter(filter, value)?;
    }

    Ok(stringify(&value))
}

/// Resolves a dotted field path against `scope`. A path whose first segment names
/// one of the reserved namespace roots (`event`, `params`, `resources`, `adapter`)
/// is resolved as written; any other path is relative to `params`, so `{{ .name }}`
/// means the param named `name`, matching the same shorthand the expression
/// language applies to bare identifiers.
fn resolve_path(path: &str, scope: &serde_json::Value) -> Result<serde_json::Value, TemplateError> {
    let path = path.strip_prefix('.').unwrap_or(path);
    if path.is_empty() {
        return Ok(scope.clone());
    }

    let segments: Vec<&str> = path.split('.').collect();
    let qualified: Vec<&str> = match segments.first() {
        Some(first) if crate::expr::NAMESPACES.contains(first) => segments,
        _ => {
            let mut full = vec!["params"];
            full.extend(segments);
            full
        }
    };

    let mut current = scope;
    for segment in &qualified {
        current = current
            .get(segment)
            .ok_or_else(|| TemplateError::UndefinedVariable(path.to_string()))?;
    }
    Ok(current.clone())
}

fn apply_filter(filter: &str, value: serde_json::Value) -> Result<serde_json::Value, TemplateError> {
    match filter {
        "lower" => Ok(serde_json::Value::String(stringify(&value).to_lowercase())),
        "upper" => Ok(serde_json::Value::String(stringify(&value).to_uppercase())),
        "json" => Ok(serde_json::Value::String(
            serde_json::to_string(&value).unwrap_or_default(),
        )),
        other => Err(TemplateError::UnknownFilter(other.to_string())),
    }
}

/// Strings render as themselves; every other JSON type renders as compact JSON.
fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> serde_json::Value {
        serde_json::json!({
            "params": {"clusterId": "c-1", "replicas": 3},
            "adapter": {"errorReason": "ResourcesCreated"},
        })
    }

    #[test]
    fn bare_path_resolves_against_params() {
        assert_eq!(render_template("id={{ .clusterId }}", &scope()).unwrap(), "id=c-1");
    }

    #[test]
    fn bare_multi_segment_path_resolves_against_params() {
        let nested = serde_json::json!({"params": {"cluster": {"id": "c-1"}}});
        assert_eq!(render_template("{{ .cluster.id }}", &nested).unwrap(), "c-1");
    }

    #[test]
    fn namespaced_path_still_reaches_adapter() {
        assert_eq!(
            render_template("{{ .adapter.errorReason }}", &scope()).unwrap(),
            "ResourcesCreated"
        );
    }

    #[test]
    fn renders_plain_text_unchanged() {
        assert_eq!(render_template("no placeholders here", &scope()).unwrap(), "no placeholders here");
    }

    #[test]
    fn renders_a_nested_path() {
        assert_eq!(render_template("id={{ .params.clusterId }}", &scope()).unwrap(), "id=c-1");
    }

    #[test]
    fn renders_non_string_scalars_as_json() {
        assert_eq!(render_template("n={{ .params.replicas }}", &scope()).unwrap(), "n=3");
    }

    #[test]
    fn applies_a_filter() {
        assert_eq!(
            render_template("{{ .adapter.errorReason | upper }}", &scope()).unwrap(),
            "RESOURCECREATED"
        );
    }

    #[test]
    fn chains_filters_left_to_right() {
        assert_eq!(
            render_template("{{ .adapter.errorReason | upper | lower }}", &scope()).unwrap(),
            "resourcecreated"
        );
    }

    #[test]
    fn rejects_unknown_field() {
        let err = render_template("{{ .params.missing }}", &scope()).unwrap_err();
        assert!(matches!(err, TemplateError::UndefinedVariable(_)));
    }

    #[test]
    fn rejects_unknown_filter() {
        let err = render_template("{{ .params.clusterId | shout }}", &scope()).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownFilter(_)));
    }

    #[test]
    fn rejects_unterminated_placeholder() {
        let err = render_template("id={{ .params.clusterId", &scope()).unwrap_err();
        assert!(matches!(err, TemplateError::Unterminated(_)));
    }

    #[test]
    fn renders_multiple_placeholders_in_one_template() {
        assert_eq!(
            render_template("{{ .params.clusterId }}-{{ .params.replicas }}", &scope()).unwrap(),
            "c-1-3"
        );
    }
}
