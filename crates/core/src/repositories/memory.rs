//! In-process section store.

use super::{SectionStore, StoredNote};
use crate::assemble::check_ordinals;
use crate::record::Record;
use crate::section::Section;
use crate::{CoreError, CoreResult};
use ctag_uuid::RecordId;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemorySectionStore {
    notes: RwLock<HashMap<RecordId, StoredNote>>,
}

impl MemorySectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> CoreResult<usize> {
        let notes = self.notes.read().map_err(|_| CoreError::StoreLockPoisoned)?;
        Ok(notes.len())
    }

    pub fn is_empty(&self) -> CoreResult<bool> {
        self.len().map(|n| n == 0)
    }
}

impl SectionStore for MemorySectionStore {
    fn write_batch(&self, record: &Record, sections: &[Section]) -> CoreResult<()> {
        check_ordinals(record.id(), sections)?;
        let note = StoredNote::new(record, sections);

        let mut notes = self
            .notes
            .write()
            .map_err(|_| CoreError::StoreLockPoisoned)?;
        match notes.get(&record.id()) {
            Some(existing) if *existing == note => {
                tracing::debug!("record {} already stored, nothing to do", record.id());
                Ok(())
            }
            Some(_) => Err(CoreError::RecordConflict(record.id())),
            None => {
                notes.insert(record.id(), note);
                tracing::info!(
                    "persisted record {} with {} section(s)",
                    record.id(),
                    sections.len()
                );
                Ok(())
            }
        }
    }

    fn load(&self, record: RecordId) -> CoreResult<StoredNote> {
        let notes = self.notes.read().map_err(|_| CoreError::StoreLockPoisoned)?;
        notes
            .get(&record)
            .cloned()
            .ok_or(CoreError::RecordNotFound(record))
    }
}
