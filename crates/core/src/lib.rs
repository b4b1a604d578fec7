//! # ctag Core
//!
//! Structured clinical-tag annotation engine.
//!
//! A clinician's free-text note carries short markers such as `#QP`, `#PA` or `##ALTURA`. This
//! crate turns such a note into an ordered list of typed, validated, unit-normalised
//! [`Section`]s:
//!
//! - [`catalog`]: tag definitions, per-clinician shadowing of global tags, and the tag hierarchy
//! - [`normalize`]: raw text to canonical values (base units, blood pressure pairs, dates, ...)
//! - [`validate`]: range checks on normalised values
//! - [`assemble`]: marker scanning and per-occurrence resolution into sections
//! - [`repositories`]: atomic persistence of a record with its sections
//!
//! Failures tied to one marker are recorded on that marker's section; only structural problems
//! reject a whole note.
//!
//! **No API concerns**: authentication, transport and UI rendering belong to the host.

pub mod assemble;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod normalize;
pub mod record;
pub mod render;
pub mod repositories;
pub mod scanner;
pub mod section;
pub mod tag;
pub mod validate;

pub use assemble::{check_ordinals, Assembler};
pub use catalog::TagCatalog;
pub use config::{BooleanVocabulary, CoreConfig};
pub use error::{
    AssemblyError, Bound, CatalogError, CatalogResult, CoreError, CoreResult, NormalizationError,
    UnknownTagError, Violation,
};
pub use normalize::{BloodPressure, BpComponent, NormalizedValue, Normalizer};
pub use record::Record;
pub use render::{missing_mandatory, sections_to_text, NoteStats, TaggedSection};
pub use repositories::{FileSectionStore, MemorySectionStore, SectionStore, StoredNote};
pub use scanner::{extract_codes, scan, Occurrence};
pub use section::{Section, SectionFailure, SectionOutcome, SectionView};
pub use tag::{DataType, Tag, TagKind};

use ctag_types::TagCode;
use ctag_uuid::{ClinicianId, PatientId, RecordId};
use std::sync::Arc;

/// A record together with the sections assembled from it.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedNote {
    pub record: Record,
    pub sections: Vec<Section>,
}

impl IngestedNote {
    pub fn views(&self) -> Vec<SectionView> {
        self.sections.iter().map(Section::view).collect()
    }
}

/// Note ingestion over one catalog snapshot.
///
/// The service holds no per-note state; it can be shared between threads and used for any
/// number of concurrent ingestions.
#[derive(Clone, Debug)]
pub struct NoteService {
    cfg: Arc<CoreConfig>,
    catalog: Arc<TagCatalog>,
    mandatory: Vec<TagCode>,
}

impl NoteService {
    pub fn new(cfg: Arc<CoreConfig>, catalog: Arc<TagCatalog>) -> Self {
        Self {
            cfg,
            catalog,
            mandatory: Vec::new(),
        }
    }

    /// See [`Assembler::with_mandatory`].
    pub fn with_mandatory(mut self, mandatory: Vec<TagCode>) -> Self {
        self.mandatory = mandatory;
        self
    }

    pub fn catalog(&self) -> &TagCatalog {
        &self.catalog
    }

    pub fn assembler(&self) -> Assembler<'_> {
        Assembler::new(&self.catalog, Normalizer::from_config(&self.cfg))
            .with_mandatory(self.mandatory.clone())
    }

    /// Assembles a note without creating or persisting a record.
    pub fn preview(&self, clinician: ClinicianId, raw_text: &str) -> CoreResult<Vec<Section>> {
        Ok(self
            .assembler()
            .assemble(RecordId::new(), raw_text, clinician)?)
    }

    /// Creates a record for the note, assembles it and persists both atomically.
    ///
    /// # Errors
    ///
    /// Returns `CoreError` if:
    /// - assembly hits a structural failure ([`CoreError::Assembly`]),
    /// - the store rejects or fails the write.
    pub fn ingest(
        &self,
        clinician: ClinicianId,
        patient: PatientId,
        raw_text: &str,
        store: &dyn SectionStore,
    ) -> CoreResult<IngestedNote> {
        let record = Record::new(clinician, patient, raw_text);
        self.ingest_record(record, store)
    }

    /// Records an amendment of `original` as a new record.
    pub fn amend(
        &self,
        original: &Record,
        clinician: ClinicianId,
        raw_text: &str,
        store: &dyn SectionStore,
    ) -> CoreResult<IngestedNote> {
        self.ingest_record(original.amend(clinician, raw_text), store)
    }

    /// Assembles and persists an existing record.
    ///
    /// Assembly is deterministic, so calling this again with the same record after a storage
    /// failure writes the same batch, and calling it after a success is a no-op.
    pub fn ingest_record(
        &self,
        record: Record,
        store: &dyn SectionStore,
    ) -> CoreResult<IngestedNote> {
        let sections =
            self.assembler()
                .assemble(record.id(), record.raw_text(), record.clinician())?;
        store.write_batch(&record, &sections)?;

        tracing::info!(
            "ingested record {} for patient {} ({} section(s))",
            record.id(),
            record.patient(),
            sections.len()
        );
        Ok(IngestedNote { record, sections })
    }

    /// Statistics over sections, scored against the configured basic codes.
    pub fn stats<S: TaggedSection>(&self, sections: &[S]) -> NoteStats {
        NoteStats::from_sections(sections, self.cfg.basic_codes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_DATE_PATTERNS;
    use crate::tag::{BloodPressureRules, TextRules};
    use ctag_types::NonEmptyText;
    use tempfile::TempDir;

    fn code(s: &str) -> TagCode {
        TagCode::parse(s).unwrap()
    }

    fn service(data_dir: &std::path::Path) -> NoteService {
        let cfg = Arc::new(
            CoreConfig::new(
                data_dir.to_path_buf(),
                DEFAULT_DATE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            )
            .expect("CoreConfig::new should succeed"),
        );
        let catalog = TagCatalog::from_tags([
            Tag::new(
                code("#QP"),
                NonEmptyText::new("Queixa principal").unwrap(),
                TagKind::Text(TextRules::default()),
            ),
            Tag::new(
                code("#PA"),
                NonEmptyText::new("Pressão arterial").unwrap(),
                TagKind::CompositeBp(BloodPressureRules::default()),
            ),
        ])
        .unwrap();
        NoteService::new(cfg, Arc::new(catalog))
    }

    #[test]
    fn ingest_persists_record_and_sections() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let service = service(temp_dir.path());
        let store = FileSectionStore::new(&service.cfg);

        let note = service
            .ingest(
                ClinicianId::new(),
                PatientId::new(),
                "#QP cefaleia #PA 120/80 #X ?",
                &store,
            )
            .unwrap();

        let stored = store.load(note.record.id()).unwrap();
        assert_eq!(stored.record, note.record);
        assert_eq!(stored.sections, note.views());
        assert!(temp_dir
            .path()
            .join("records")
            .join(&note.record.id().to_string()[0..2])
            .is_dir());

        let stats = service.stats(&stored.sections);
        assert_eq!(stats.unresolved, 1);
        assert!(stats.has_blood_pressure);
        assert_eq!(stats.completeness, 33);
    }

    #[test]
    fn ingest_record_can_be_retried() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let service = service(temp_dir.path());
        let store = MemorySectionStore::new();
        let record = Record::new(ClinicianId::new(), PatientId::new(), "#QP tosse");

        let first = service.ingest_record(record.clone(), &store).unwrap();
        let second = service.ingest_record(record, &store).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn amendment_is_stored_beside_the_original() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let service = service(temp_dir.path());
        let store = MemorySectionStore::new();
        let clinician = ClinicianId::new();

        let original = service
            .ingest(clinician, PatientId::new(), "#PA 12x8", &store)
            .unwrap();
        let amended = service
            .amend(&original.record, clinician, "#PA 13x8", &store)
            .unwrap();

        assert_eq!(amended.record.amends(), Some(original.record.id()));
        assert_eq!(store.len().unwrap(), 2);
        assert_eq!(
            store.load(original.record.id()).unwrap().sections[0].raw_value,
            "12x8"
        );
    }

    #[test]
    fn mandatory_codes_reject_notes_without_markers() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let service = service(temp_dir.path()).with_mandatory(vec![code("#QP")]);
        let store = MemorySectionStore::new();

        let err = service
            .ingest(ClinicianId::new(), PatientId::new(), "texto livre", &store)
            .expect_err("note without markers should be rejected");
        assert!(matches!(
            err,
            CoreError::Assembly(AssemblyError::NoMarkers { .. })
        ));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn demo_note_assembles_cleanly_against_demo_catalog() {
        let catalog =
            TagCatalog::from_yaml_str(include_str!("../../../demos/catalog.yaml")).unwrap();
        let cfg = Arc::new(
            CoreConfig::new(
                "unused".into(),
                DEFAULT_DATE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            )
            .unwrap(),
        );
        let service = NoteService::new(cfg, Arc::new(catalog));

        let sections = service
            .preview(ClinicianId::new(), include_str!("../../../demos/note.txt"))
            .unwrap();
        let stats = service.stats(&sections);
        assert_eq!(stats.total, 9);
        assert_eq!(stats.unresolved, 0);
        assert_eq!(stats.invalid, 0);
        assert_eq!(stats.completeness, 100);
        assert!(stats.has_blood_pressure);

        let altura = sections
            .iter()
            .find(|s| s.code.as_str() == "##ALTURA")
            .unwrap();
        assert_eq!(altura.parsed_value(), Some(&NormalizedValue::Number(1.72)));
    }

    #[test]
    fn preview_does_not_persist() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let service = service(temp_dir.path());
        let sections = service.preview(ClinicianId::new(), "#QP dor").unwrap();
        assert_eq!(sections.len(), 1);
        assert!(!temp_dir.path().join("records").exists());
    }
}
