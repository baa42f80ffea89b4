//! Generation annotation read/validate.

use hyperfleet_adapter_core::ValidationError;

pub const GENERATION_ANNOTATION: &str = "hyperfleet.io/generation";

/// Reads the generation annotation for *read* operations: missing or invalid
/// values default to `0` rather than failing.
pub fn read_generation(manifest: &serde_json::Value) -> i64 {
    manifest
        .pointer("/metadata/annotations")
        .and_then(|a| a.get(GENERATION_ANNOTATION))
        .and_then(|v| match v {
            serde_json::Value::String(s) => s.parse::<i64>().ok(),
            serde_json::Value::Number(n) => n.as_i64(),
            _ => None,
        })
        .unwrap_or(0)
}

/// Validates the generation annotation for *validate* operations, which require a
/// positive integer: missing, non-numeric, and non-positive are each
/// reported as distinct `ValidationError` variants.
pub fn validate_generation(manifest: &serde_json::Value) -> Result<i64, ValidationError> {
    let annotations = manifest
        .pointer("/metadata/annotations")
        .ok_or(ValidationError::MissingAnnotationsBlock)?;

    let value = annotations
        .get(GENERATION_ANNOTATION)
        .ok_or(ValidationError::MissingGenerationKey)?;

    let parsed = match value {
        serde_json::Value::String(s) => {
            if s.is_empty() {
                return Err(ValidationError::EmptyGenerationValue);
            }
            s.parse::<i64>()
                .map_err(|_| ValidationError::NonIntegerGeneration(s.clone()))?
        }
        serde_json::Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ValidationError::NonIntegerGeneration(n.to_string()))?,
        other => return Err(ValidationError::NonIntegerGeneration(other.to_string())),
    };

    if parsed <= 0 {
        return Err(ValidationError::NonPositiveGeneration(parsed));
    }

    Ok(parsed)
}

/// Full manifest validation: `apiVersion`, `kind`, `metadata.name`, and a
/// positive generation annotation must all be present after rendering.
pub fn validate_manifest(manifest: &serde_json::Value) -> Result<i64, ValidationError> {
    if manifest.get("apiVersion").and_then(|v| v.as_str()).is_none() {
        return Err(ValidationError::MissingManifestField("apiVersion"));
    }
    if manifest.get("kind").and_then(|v| v.as_str()).is_none() {
        return Err(ValidationError::MissingManifestField("kind"));
    }
    if manifest
        .pointer("/metadata/name")
        .and_then(|v| v.as_str())
        .is_none()
    {
        return Err(ValidationError::MissingManifestField("metadata.name"));
    }
    validate_generation(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_with_gen(gen: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "apiVersion": "v1",
            "kind": "Cluster",
            "metadata": {
                "name": "c1",
                "annotations": { GENERATION_ANNOTATION: gen }
            }
        })
    }

    #[test]
    fn read_generation_defaults_to_zero_when_missing() {
        let m = serde_json::json!({"metadata": {"name": "c1"}});
        assert_eq!(read_generation(&m), 0);
    }

    #[test]
    fn read_generation_defaults_to_zero_when_invalid() {
        let m = manifest_with_gen(serde_json::json!("not-a-number"));
        assert_eq!(read_generation(&m), 0);
    }

    #[test]
    fn read_generation_parses_string_and_number() {
        assert_eq!(read_generation(&manifest_with_gen(serde_json::json!("5"))), 5);
        assert_eq!(read_generation(&manifest_with_gen(serde_json::json!(5))), 5);
    }

    #[test]
    fn validate_generation_requires_annotations_block() {
        let m = serde_json::json!({"metadata": {"name": "c1"}});
        assert_eq!(validate_generation(&m), Err(ValidationError::MissingAnnotationsBlock));
    }

    #[test]
    fn validate_generation_requires_key() {
        let m = serde_json::json!({"metadata": {"name": "c1", "annotations": {}}});
        assert_eq!(validate_generation(&m), Err(ValidationError::MissingGenerationKey));
    }

    #[test]
    fn validate_generation_rejects_empty() {
        let m = manifest_with_gen(serde_json::json!(""));
        assert_eq!(validate_generation(&m), Err(ValidationError::EmptyGenerationValue));
    }

    #[test]
    fn validate_generation_rejects_non_integer() {
        let m = manifest_with_gen(serde_json::json!("abc"));
        assert!(matches!(validate_generation(&m), Err(ValidationError::NonIntegerGeneration(_))));
    }

    #[test]
    fn validate_generation_rejects_non_positive() {
        let m = manifest_with_gen(serde_json::json!(0));
        assert_eq!(validate_generation(&m), Err(ValidationError::NonPositiveGeneration(0)));

        let m = manifest_with_gen(serde_json::json!(-3));
        assert_eq!(validate_generation(&m), Err(ValidationError::NonPositiveGeneration(-3)));
    }

    #[test]
    fn validate_generation_accepts_positive() {
        let m = manifest_with_gen(serde_json::json!(7));
        assert_eq!(validate_generation(&m), Ok(7));
    }

    #[test]
    fn validate_manifest_checks_required_fields() {
        let m = serde_json::json!({"kind": "Cluster", "metadata": {"name": "c1", "annotations": {GENERATION_ANNOTATION: 1}}});
        assert_eq!(validate_manifest(&m), Err(ValidationError::MissingManifestField("apiVersion")));
    }

    #[test]
    fn validate_manifest_accepts_well_formed() {
        let m = manifest_with_gen(serde_json::json!(3));
        assert_eq!(validate_manifest(&m), Ok(3));
    }
}
