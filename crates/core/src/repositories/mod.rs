//! Section persistence.
//!
//! A record and its sections are written as one unit: after a successful write both are
//! visible, after a failed write neither is. Stores reject a batch whose ordinals collide and
//! treat an identical re-write of an existing record as a no-op, so retries are safe.

pub mod file;
pub mod memory;

use crate::record::Record;
use crate::section::{Section, SectionView};
use crate::CoreResult;
use ctag_uuid::RecordId;
use serde::{Deserialize, Serialize};

pub use file::FileSectionStore;
pub use memory::MemorySectionStore;

/// A persisted note: the immutable record and the views of its sections in ordinal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNote {
    pub record: Record,
    pub sections: Vec<SectionView>,
}

impl StoredNote {
    pub(crate) fn new(record: &Record, sections: &[Section]) -> Self {
        let mut sections: Vec<SectionView> = sections.iter().map(Section::view).collect();
        sections.sort_by_key(|s| s.ordinal);
        Self {
            record: record.clone(),
            sections,
        }
    }
}

pub trait SectionStore: Send + Sync {
    /// Atomically persists a record with all of its sections.
    ///
    /// # Errors
    ///
    /// - [`crate::CoreError::Assembly`] if the batch has a duplicate or foreign ordinal,
    /// - [`crate::CoreError::RecordConflict`] if the record exists with different content,
    /// - storage errors from the backing medium.
    fn write_batch(&self, record: &Record, sections: &[Section]) -> CoreResult<()>;

    /// Loads a persisted note.
    fn load(&self, record: RecordId) -> CoreResult<StoredNote>;
}
