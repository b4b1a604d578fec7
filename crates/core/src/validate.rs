//! Range validation of normalised values.

use crate::error::{Bound, Violation};
use crate::normalize::{BpComponent, NormalizedValue};
use crate::tag::{Range, TagKind};

fn check_range(range: Range, value: f64, component: Option<BpComponent>) -> Option<Violation> {
    let (bound, limit) = match (range.min, range.max) {
        (Some(min), _) if value < min => (Bound::BelowMinimum, min),
        (_, Some(max)) if value > max => (Bound::AboveMaximum, max),
        _ => return None,
    };
    Some(Violation {
        component,
        value,
        bound,
        limit,
    })
}

/// Checks a normalised value against the bounds declared by its tag.
///
/// Bounds are inclusive. Blood pressure components are checked independently and every
/// failure is reported, so the result may hold one or two violations. Text, date and boolean
/// values carry no range rules and always pass.
pub fn validate(kind: &TagKind, value: &NormalizedValue) -> Result<(), Vec<Violation>> {
    let violations: Vec<Violation> = match (kind, value) {
        (TagKind::Number(rules), NormalizedValue::Number(v)) => {
            check_range(rules.range(), *v, None).into_iter().collect()
        }
        (TagKind::CompositeBp(rules), NormalizedValue::BloodPressure(bp)) => [
            check_range(rules.systolic, bp.systolic, Some(BpComponent::Systolic)),
            check_range(rules.diastolic, bp.diastolic, Some(BpComponent::Diastolic)),
        ]
        .into_iter()
        .flatten()
        .collect(),
        _ => Vec::new(),
    };

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::BloodPressure;
    use crate::tag::{BloodPressureRules, NumberRules};

    fn pa() -> TagKind {
        TagKind::CompositeBp(BloodPressureRules {
            systolic: Range::new(Some(60.0), Some(250.0)),
            diastolic: Range::new(Some(30.0), Some(150.0)),
            ..BloodPressureRules::default()
        })
    }

    fn bp(systolic: f64, diastolic: f64) -> NormalizedValue {
        NormalizedValue::BloodPressure(BloodPressure {
            systolic,
            diastolic,
        })
    }

    #[test]
    fn only_the_failing_component_is_reported() {
        let violations = validate(&pa(), &bp(300.0, 80.0)).unwrap_err();
        assert_eq!(
            violations,
            vec![Violation {
                component: Some(BpComponent::Systolic),
                value: 300.0,
                bound: Bound::AboveMaximum,
                limit: 250.0,
            }]
        );
        assert_eq!(violations[0].to_string(), "systolic 300 is above maximum 250");
    }

    #[test]
    fn both_components_are_reported_together() {
        let violations = validate(&pa(), &bp(40.0, 160.0)).unwrap_err();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].bound, Bound::BelowMinimum);
        assert_eq!(violations[1].component, Some(BpComponent::Diastolic));
    }

    #[test]
    fn number_bounds_are_inclusive() {
        let kind = TagKind::Number(NumberRules {
            min: Some(35.0),
            max: Some(42.0),
            ..NumberRules::default()
        });
        assert!(validate(&kind, &NormalizedValue::Number(35.0)).is_ok());
        assert!(validate(&kind, &NormalizedValue::Number(42.0)).is_ok());

        let violations = validate(&kind, &NormalizedValue::Number(42.5)).unwrap_err();
        assert_eq!(violations[0].component, None);
        assert_eq!(violations[0].limit, 42.0);
    }

    #[test]
    fn open_bounds_and_other_types_pass() {
        let kind = TagKind::Number(NumberRules::default());
        assert!(validate(&kind, &NormalizedValue::Number(-1e9)).is_ok());
        assert!(validate(&TagKind::Boolean, &NormalizedValue::Boolean(false)).is_ok());
    }
}
