//! Sections: resolved, positioned tag occurrences inside one record.
//!
//! Every occurrence becomes a [`Section`]. Whether it resolved, normalised and validated is
//! carried in its [`SectionOutcome`], so one bad marker never costs the rest of the note.

use crate::error::{NormalizationError, UnknownTagError, Violation};
use crate::normalize::NormalizedValue;
use crate::tag::DataType;
use ctag_types::TagCode;
use ctag_uuid::{RecordId, TagId};
use serde::{Deserialize, Serialize};

/// Why a resolved occurrence carries no parsed value.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionFailure {
    /// The raw text does not fit the tag's data type.
    Normalization(NormalizationError),
    /// The value parsed but broke one or more bounds.
    Violations {
        value: NormalizedValue,
        violations: Vec<Violation>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionOutcome {
    Resolved {
        tag: TagId,
        data_type: DataType,
        value: NormalizedValue,
    },
    Unresolved(UnknownTagError),
    Invalid {
        tag: TagId,
        data_type: DataType,
        failure: SectionFailure,
    },
}

/// One tag occurrence, exclusively owned by its record.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub record: RecordId,
    pub ordinal: usize,
    pub code: TagCode,
    /// Captured text, kept verbatim (after trimming) for audit.
    pub raw_value: String,
    pub outcome: SectionOutcome,
}

impl Section {
    pub fn is_resolved(&self) -> bool {
        !matches!(self.outcome, SectionOutcome::Unresolved(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.outcome, SectionOutcome::Invalid { .. })
    }

    pub fn tag(&self) -> Option<TagId> {
        match &self.outcome {
            SectionOutcome::Resolved { tag, .. } | SectionOutcome::Invalid { tag, .. } => {
                Some(*tag)
            }
            SectionOutcome::Unresolved(_) => None,
        }
    }

    pub fn data_type(&self) -> Option<DataType> {
        match &self.outcome {
            SectionOutcome::Resolved { data_type, .. }
            | SectionOutcome::Invalid { data_type, .. } => Some(*data_type),
            SectionOutcome::Unresolved(_) => None,
        }
    }

    /// The canonical value; absent unless the occurrence resolved, normalised and validated.
    pub fn parsed_value(&self) -> Option<&NormalizedValue> {
        match &self.outcome {
            SectionOutcome::Resolved { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn violations(&self) -> &[Violation] {
        match &self.outcome {
            SectionOutcome::Invalid {
                failure: SectionFailure::Violations { violations, .. },
                ..
            } => violations,
            _ => &[],
        }
    }

    /// Human readable reason for an unresolved or unparseable occurrence.
    pub fn error(&self) -> Option<String> {
        match &self.outcome {
            SectionOutcome::Unresolved(err) => Some(err.to_string()),
            SectionOutcome::Invalid {
                failure: SectionFailure::Normalization(err),
                ..
            } => Some(err.to_string()),
            _ => None,
        }
    }

    pub fn view(&self) -> SectionView {
        let violations = self.violations();
        SectionView {
            ordinal: self.ordinal,
            code: self.code.clone(),
            resolved: self.is_resolved(),
            tag_id: self.tag(),
            data_type: self.data_type(),
            raw_value: self.raw_value.clone(),
            parsed_value: self.parsed_value().map(NormalizedValue::to_json),
            violations: (!violations.is_empty()).then(|| violations.to_vec()),
            error: self.error(),
        }
    }
}

/// The resolved-note output shape handed to persistence and downstream readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionView {
    pub ordinal: usize,
    pub code: TagCode,
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<TagId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    pub raw_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<Violation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SectionView {
    /// Resolved but failed normalisation or validation.
    pub fn is_invalid(&self) -> bool {
        self.resolved && (self.error.is_some() || self.violations.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Bound;
    use crate::normalize::{BloodPressure, BpComponent};

    fn section(outcome: SectionOutcome) -> Section {
        Section {
            record: RecordId::new(),
            ordinal: 3,
            code: TagCode::parse("#PA").unwrap(),
            raw_value: "300/80".into(),
            outcome,
        }
    }

    #[test]
    fn invalid_section_view_has_violations_but_no_value() {
        let tag = TagId::new();
        let s = section(SectionOutcome::Invalid {
            tag,
            data_type: DataType::CompositeBp,
            failure: SectionFailure::Violations {
                value: NormalizedValue::BloodPressure(BloodPressure {
                    systolic: 300.0,
                    diastolic: 80.0,
                }),
                violations: vec![Violation {
                    component: Some(BpComponent::Systolic),
                    value: 300.0,
                    bound: Bound::AboveMaximum,
                    limit: 250.0,
                }],
            },
        });

        let json = serde_json::to_value(s.view()).unwrap();
        assert_eq!(json["resolved"], true);
        assert_eq!(json["dataType"], "composite-bp");
        assert_eq!(json["rawValue"], "300/80");
        assert!(json.get("parsedValue").is_none());
        assert_eq!(json["violations"][0]["component"], "systolic");
        assert_eq!(json["violations"][0]["bound"], "aboveMaximum");
        assert!(s.view().is_invalid());
    }

    #[test]
    fn unresolved_section_view_is_minimal() {
        let s = section(SectionOutcome::Unresolved(UnknownTagError {
            code: TagCode::parse("#NAOEXISTE").unwrap(),
        }));
        let json = serde_json::to_value(s.view()).unwrap();
        assert_eq!(json["resolved"], false);
        assert!(json.get("dataType").is_none());
        assert!(json.get("parsedValue").is_none());
        assert_eq!(json["error"], "unknown tag #NAOEXISTE");
    }

    #[test]
    fn view_survives_json_round_trip() {
        let s = section(SectionOutcome::Resolved {
            tag: TagId::new(),
            data_type: DataType::Number,
            value: NormalizedValue::Number(1.75),
        });
        let text = serde_json::to_string(&s.view()).unwrap();
        let back: SectionView = serde_json::from_str(&text).unwrap();
        assert_eq!(back, s.view());
        assert_eq!(back.parsed_value, Some(serde_json::json!(1.75)));
    }
}
