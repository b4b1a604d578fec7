//! The section assembler: raw note in, ordered sections out.
//!
//! The assembler is the only component with document-level state, and that state lives for one
//! call. Given the same note and the same catalog snapshot it always produces the same sections,
//! so a retry after a storage failure is safe.

use crate::catalog::TagCatalog;
use crate::error::AssemblyError;
use crate::normalize::Normalizer;
use crate::scanner::{scan, Occurrence};
use crate::section::{Section, SectionFailure, SectionOutcome};
use crate::validate::validate;
use ctag_types::TagCode;
use ctag_uuid::{ClinicianId, RecordId};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct Assembler<'a> {
    catalog: &'a TagCatalog,
    normalizer: Normalizer<'a>,
    mandatory: Vec<TagCode>,
}

impl<'a> Assembler<'a> {
    pub fn new(catalog: &'a TagCatalog, normalizer: Normalizer<'a>) -> Self {
        Self {
            catalog,
            normalizer,
            mandatory: Vec::new(),
        }
    }

    /// Declares codes the caller expects in every note.
    ///
    /// When non-empty, a note with no markers at all is rejected with
    /// [`AssemblyError::NoMarkers`]. Which mandatory codes are actually present is a separate
    /// question, answered by [`crate::render::missing_mandatory`].
    pub fn with_mandatory(mut self, mandatory: Vec<TagCode>) -> Self {
        self.mandatory = mandatory;
        self
    }

    /// Assembles the sections of one note.
    ///
    /// # Arguments
    ///
    /// * `record` - Record that will own the sections.
    /// * `raw_note` - Free text with tag markers.
    /// * `clinician` - Author, used for private tag resolution.
    ///
    /// # Returns
    ///
    /// One section per marker in document order, `ordinal` equal to its position. Unknown
    /// tags, unparseable values and out-of-range values are recorded on their section.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError`] only for structural failures: a duplicate ordinal, or a note
    /// without markers when mandatory codes were declared.
    pub fn assemble(
        &self,
        record: RecordId,
        raw_note: &str,
        clinician: ClinicianId,
    ) -> Result<Vec<Section>, AssemblyError> {
        let occurrences = scan(raw_note);

        if occurrences.is_empty() && !self.mandatory.is_empty() {
            let err = AssemblyError::NoMarkers {
                mandatory: self.mandatory.clone(),
            };
            tracing::error!("rejecting note for record {}: {}", record, err);
            return Err(err);
        }

        let sections: Vec<Section> = occurrences
            .into_iter()
            .map(|occurrence| self.section_for(record, occurrence, clinician))
            .collect();

        if let Err(err) = check_ordinals(record, &sections) {
            tracing::error!("structural assembly failure: {}", err);
            return Err(err);
        }

        Ok(sections)
    }

    /// Resolves, normalises and validates one occurrence.
    pub fn section_for(
        &self,
        record: RecordId,
        occurrence: Occurrence,
        clinician: ClinicianId,
    ) -> Section {
        let Occurrence {
            ordinal,
            code,
            raw_value,
            ..
        } = occurrence;

        let outcome = match self.catalog.resolve(&code, clinician) {
            Err(unknown) => {
                tracing::warn!("unresolved tag {} at ordinal {}", code, ordinal);
                SectionOutcome::Unresolved(unknown)
            }
            Ok(tag) => {
                let data_type = tag.data_type();
                match self.normalizer.normalize(&tag.kind, &raw_value) {
                    Err(err) => {
                        tracing::warn!(
                            "tag {} at ordinal {} failed normalisation: {}",
                            code,
                            ordinal,
                            err
                        );
                        SectionOutcome::Invalid {
                            tag: tag.id,
                            data_type,
                            failure: SectionFailure::Normalization(err),
                        }
                    }
                    Ok(value) => match validate(&tag.kind, &value) {
                        Ok(()) => {
                            tracing::debug!(
                                "resolved tag {} at ordinal {} as {}",
                                code,
                                ordinal,
                                data_type
                            );
                            SectionOutcome::Resolved {
                                tag: tag.id,
                                data_type,
                                value,
                            }
                        }
                        Err(violations) => {
                            tracing::warn!(
                                "tag {} at ordinal {} has {} violation(s)",
                                code,
                                ordinal,
                                violations.len()
                            );
                            SectionOutcome::Invalid {
                                tag: tag.id,
                                data_type,
                                failure: SectionFailure::Violations { value, violations },
                            }
                        }
                    },
                }
            }
        };

        Section {
            record,
            ordinal,
            code,
            raw_value,
            outcome,
        }
    }
}

/// Checks that every section belongs to `record` and that no two share an ordinal.
///
/// # Errors
///
/// - [`AssemblyError::ForeignSection`] if a section is owned by another record,
/// - [`AssemblyError::DuplicateOrdinal`] on the first repeated ordinal.
pub fn check_ordinals(record: RecordId, sections: &[Section]) -> Result<(), AssemblyError> {
    let mut seen = HashSet::with_capacity(sections.len());
    for section in sections {
        if section.record != record {
            return Err(AssemblyError::ForeignSection {
                expected: record,
                found: section.record,
            });
        }
        if !seen.insert(section.ordinal) {
            return Err(AssemblyError::DuplicateOrdinal {
                record,
                ordinal: section.ordinal,
            });
        }
    }
    Ok(())
}
