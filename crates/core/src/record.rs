//! Authored clinical notes.

use chrono::{DateTime, Utc};
use ctag_uuid::{ClinicianId, PatientId, RecordId};
use serde::{Deserialize, Serialize};

/// One authored note. Immutable once created; an amendment is a new record that points back
/// at the one it amends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Record {
    id: RecordId,
    clinician: ClinicianId,
    patient: PatientId,
    /// Kept for audit only; sections are the structured reading of it.
    raw_text: String,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    amends: Option<RecordId>,
}

impl Record {
    pub fn new(clinician: ClinicianId, patient: PatientId, raw_text: impl Into<String>) -> Self {
        Self {
            id: RecordId::new(),
            clinician,
            patient,
            raw_text: raw_text.into(),
            created_at: Utc::now(),
            amends: None,
        }
    }

    /// Creates the record that supersedes this one for the same patient.
    pub fn amend(&self, clinician: ClinicianId, raw_text: impl Into<String>) -> Self {
        Self {
            amends: Some(self.id),
            ..Self::new(clinician, self.patient, raw_text)
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn clinician(&self) -> ClinicianId {
        self.clinician
    }

    pub fn patient(&self) -> PatientId {
        self.patient
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn amends(&self) -> Option<RecordId> {
        self.amends
    }
}
