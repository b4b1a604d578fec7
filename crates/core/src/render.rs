//! Read-side helpers over assembled or stored sections: canonical text, mandatory-code checks
//! and note statistics.

use crate::section::{Section, SectionView};
use crate::tag::DataType;
use ctag_types::TagCode;
use serde::Serialize;
use std::collections::BTreeMap;

/// The parts of a section the read-side helpers need, shared by [`Section`] and its stored
/// [`SectionView`].
pub trait TaggedSection {
    fn ordinal(&self) -> usize;
    fn code(&self) -> &TagCode;
    fn raw_value(&self) -> &str;
    fn data_type(&self) -> Option<DataType>;
    fn is_resolved(&self) -> bool;
    fn is_invalid(&self) -> bool;
}

impl TaggedSection for Section {
    fn ordinal(&self) -> usize {
        self.ordinal
    }
    fn code(&self) -> &TagCode {
        &self.code
    }
    fn raw_value(&self) -> &str {
        &self.raw_value
    }
    fn data_type(&self) -> Option<DataType> {
        Section::data_type(self)
    }
    fn is_resolved(&self) -> bool {
        Section::is_resolved(self)
    }
    fn is_invalid(&self) -> bool {
        Section::is_invalid(self)
    }
}

impl TaggedSection for SectionView {
    fn ordinal(&self) -> usize {
        self.ordinal
    }
    fn code(&self) -> &TagCode {
        &self.code
    }
    fn raw_value(&self) -> &str {
        &self.raw_value
    }
    fn data_type(&self) -> Option<DataType> {
        self.data_type
    }
    fn is_resolved(&self) -> bool {
        self.resolved
    }
    fn is_invalid(&self) -> bool {
        SectionView::is_invalid(self)
    }
}

/// Renders sections back to note text, one `<code>: <raw value>` block per section in ordinal
/// order, separated by a blank line.
///
/// Assembling the result again yields the same codes, ordinals and parsed values.
pub fn sections_to_text<S: TaggedSection>(sections: &[S]) -> String {
    let mut ordered: Vec<&S> = sections.iter().collect();
    ordered.sort_by_key(|s| s.ordinal());

    ordered
        .iter()
        .map(|s| {
            if s.raw_value().is_empty() {
                format!("{}:", s.code())
            } else {
                format!("{}: {}", s.code(), s.raw_value())
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Mandatory codes with no resolved section, in the order they were declared.
pub fn missing_mandatory<S: TaggedSection>(sections: &[S], mandatory: &[TagCode]) -> Vec<TagCode> {
    let mut missing: Vec<TagCode> = Vec::new();
    for code in mandatory {
        let present = sections
            .iter()
            .any(|s| s.is_resolved() && s.code() == code);
        if !present && !missing.contains(code) {
            missing.push(code.clone());
        }
    }
    missing
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteStats {
    pub total: usize,
    /// Resolved sections per data type, invalid ones included.
    pub by_data_type: BTreeMap<DataType, usize>,
    pub unresolved: usize,
    pub invalid: usize,
    /// A valid blood pressure reading was captured.
    pub has_blood_pressure: bool,
    /// Percentage (rounded) of the basic codes present among resolved sections.
    pub completeness: u8,
}

impl NoteStats {
    pub fn from_sections<S: TaggedSection>(sections: &[S], basic_codes: &[TagCode]) -> Self {
        let mut by_data_type = BTreeMap::new();
        let mut unresolved = 0;
        let mut invalid = 0;
        let mut has_blood_pressure = false;

        for section in sections {
            match section.data_type() {
                Some(data_type) if section.is_resolved() => {
                    *by_data_type.entry(data_type).or_insert(0) += 1;
                    if section.is_invalid() {
                        invalid += 1;
                    } else if data_type == DataType::CompositeBp {
                        has_blood_pressure = true;
                    }
                }
                _ => unresolved += 1,
            }
        }

        let mut distinct: Vec<TagCode> = Vec::with_capacity(basic_codes.len());
        for code in basic_codes {
            if !distinct.contains(code) {
                distinct.push(code.clone());
            }
        }

        let completeness = if distinct.is_empty() {
            100
        } else {
            let present = distinct.len() - missing_mandatory(sections, &distinct).len();
            ((present as f64 / distinct.len() as f64) * 100.0).round() as u8
        };

        Self {
            total: sections.len(),
            by_data_type,
            unresolved,
            invalid,
            has_blood_pressure,
            completeness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::Assembler;
    use crate::catalog::TagCatalog;
    use crate::config::BooleanVocabulary;
    use crate::constants::{DEFAULT_BASIC_CODES, DEFAULT_DATE_PATTERNS};
    use crate::normalize::Normalizer;
    use crate::tag::{BloodPressureRules, Tag, TagKind, TextRules};
    use ctag_types::NonEmptyText;
    use ctag_uuid::{ClinicianId, RecordId};

    fn code(s: &str) -> TagCode {
        TagCode::parse(s).unwrap()
    }

    fn assemble(note: &str) -> Vec<Section> {
        let text = |c: &str| {
            Tag::new(
                code(c),
                NonEmptyText::new(c).unwrap(),
                TagKind::Text(TextRules::default()),
            )
        };
        let catalog = TagCatalog::from_tags([
            text("#QP"),
            text("#HDA"),
            Tag::new(
                code("#PA"),
                NonEmptyText::new("PA").unwrap(),
                TagKind::CompositeBp(BloodPressureRules::default()),
            ),
        ])
        .unwrap();
        let patterns: Vec<String> = DEFAULT_DATE_PATTERNS.iter().map(|p| p.to_string()).collect();
        let booleans = BooleanVocabulary::default();
        Assembler::new(&catalog, Normalizer::new(&patterns, &booleans))
            .assemble(RecordId::new(), note, ClinicianId::new())
            .unwrap()
    }

    fn basic() -> Vec<TagCode> {
        DEFAULT_BASIC_CODES.iter().map(|c| code(c)).collect()
    }

    #[test]
    fn rendered_text_reassembles_to_the_same_sections() {
        let sections = assemble("intro #QP: dor\n de cabeça #PA 120/80 #ZZ ? #HDA");
        let text = sections_to_text(&sections);
        assert_eq!(
            text,
            "#QP: dor\n de cabeça\n\n#PA: 120/80\n\n#ZZ: ?\n\n#HDA:"
        );

        let again = assemble(&text);
        let shape = |s: &[Section]| {
            s.iter()
                .map(|s| (s.ordinal, s.code.clone(), s.parsed_value().cloned()))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&again), shape(&sections));
    }

    #[test]
    fn missing_mandatory_ignores_unresolved_and_keeps_order() {
        let sections = assemble("#HDA ontem #EF normal");
        let missing = missing_mandatory(&sections, &basic());
        assert_eq!(missing, vec![code("#QP"), code("#EF")]);
    }

    #[test]
    fn stats_count_types_and_completeness() {
        let sections = assemble("#QP febre #HDA 2 dias #PA 120/80 #PA 120 #X y");
        let stats = NoteStats::from_sections(&sections, &basic());

        assert_eq!(stats.total, 5);
        assert_eq!(stats.by_data_type.get(&DataType::Text), Some(&2));
        assert_eq!(stats.by_data_type.get(&DataType::CompositeBp), Some(&2));
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.invalid, 1);
        assert!(stats.has_blood_pressure);
        assert_eq!(stats.completeness, 67);
    }

    #[test]
    fn repeated_basic_codes_count_once() {
        let repeated = vec![code("#QP"), code("#QP"), code("#HDA")];

        let empty = NoteStats::from_sections(&[] as &[SectionView], &repeated);
        assert_eq!(empty.completeness, 0);

        let sections = assemble("#HDA ontem");
        let stats = NoteStats::from_sections(&sections, &repeated);
        assert_eq!(stats.completeness, 50);
    }

    #[test]
    fn stats_agree_between_sections_and_views() {
        let sections = assemble("#QP febre #PA 12x8 #NADA");
        let views: Vec<SectionView> = sections.iter().map(Section::view).collect();
        assert_eq!(
            NoteStats::from_sections(&sections, &basic()),
            NoteStats::from_sections(&views, &basic())
        );
        assert_eq!(sections_to_text(&sections), sections_to_text(&views));
    }
}
