//! `ApplyDecision`: a pure function of `(newGen, existingGen, exists)`, with a
//! caller override for `recreateOnChange`. Modelled as a closed tagged union,
//! never an open hierarchy.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOperation {
    Create,
    Update,
    Recreate,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyDecision {
    pub operation: ApplyOperation,
    pub reason: String,
}

impl ApplyDecision {
    /// Computes the decision for one resource. `existing_generation` is `None`
    /// exactly when the resource was not found (NotFound is the signal to create,
    /// never an error). Monotonicity is not required: a generation
    /// *downgrade* is accepted explicitly to support rollback.
    pub fn decide(new_generation: i64, existing_generation: Option<i64>, recreate_on_change: bool) -> Self {
        let Some(existing) = existing_generation else {
            return ApplyDecision {
                operation: ApplyOperation::Create,
                reason: "resource not found".to_string(),
            };
        };

        if existing == new_generation {
            return ApplyDecision {
                operation: ApplyOperation::Skip,
                reason: format!("generation {new_generation} unchanged"),
            };
        }

        let reason = format!("generation changed {existing}\u{2192}{new_generation}");
        if recreate_on_change {
            ApplyDecision { operation: ApplyOperation::Recreate, reason }
        } else {
            ApplyDecision { operation: ApplyOperation::Update, reason }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_when_absent() {
        let d = ApplyDecision::decide(5, None, false);
        assert_eq!(d.operation, ApplyOperation::Create);
        assert_eq!(d.reason, "resource not found");
    }

    #[test]
    fn skip_when_unchanged() {
        let d = ApplyDecision::decide(5, Some(5), false);
        assert_eq!(d.operation, ApplyOperation::Skip);
        assert_eq!(d.reason, "generation 5 unchanged");
    }

    #[test]
    fn update_on_generation_bump() {
        let d = ApplyDecision::decide(6, Some(5), false);
        assert_eq!(d.operation, ApplyOperation::Update);
        assert!(d.reason.contains("5"));
        assert!(d.reason.contains("6"));
    }

    #[test]
    fn rollback_is_accepted_as_update() {
        let d = ApplyDecision::decide(4, Some(5), false);
        assert_eq!(d.operation, ApplyOperation::Update);
    }

    #[test]
    fn recreate_on_change_promotes_update_to_recreate() {
        let d = ApplyDecision::decide(6, Some(5), true);
        assert_eq!(d.operation, ApplyOperation::Recreate);
    }

    #[test]
    fn recreate_on_change_has_no_effect_when_unchanged() {
        let d = ApplyDecision::decide(5, Some(5), true);
        assert_eq!(d.operation, ApplyOperation::Skip);
    }

    #[test]
    fn decision_is_independent_of_anything_but_generations_and_override() {
        // Same (new, existing, override) always yields the same decision,
        // there is no hidden transport-specific state.
        for _ in 0..3 {
            assert_eq!(ApplyDecision::decide(6, Some(5), false), ApplyDecision::decide(6, Some(5), false));
        }
    }
}
