//! File-backed section store.
//!
//! Each record lives in its own sharded directory:
//!
//! ```text
//! <records_dir>/<s1>/<s2>/<record_id>/
//!     record.yaml
//!     sections.json
//! ```
//!
//! Both files are written into a staging directory beside the final location and the staging
//! directory is then renamed into place, so readers see either the complete record or nothing.

use super::{SectionStore, StoredNote};
use crate::assemble::check_ordinals;
use crate::config::CoreConfig;
use crate::constants::{RECORD_FILENAME, SECTIONS_FILENAME};
use crate::record::Record;
use crate::section::{Section, SectionView};
use crate::{CoreError, CoreResult};
use ctag_uuid::{CanonicalUuid, RecordId};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[cfg(test)]
use std::{
    collections::HashSet,
    sync::{LazyLock, Mutex},
};

#[derive(Debug, Clone)]
pub struct FileSectionStore {
    records_dir: PathBuf,
}

impl FileSectionStore {
    /// Creates a store rooted at the configured records directory.
    pub fn new(cfg: &CoreConfig) -> Self {
        Self::at(cfg.records_dir())
    }

    pub fn at(records_dir: PathBuf) -> Self {
        Self { records_dir }
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    /// `<records_dir>/<s1>/<s2>/<record_id>`
    pub fn record_dir(&self, record: RecordId) -> PathBuf {
        record.sharded_dir(&self.records_dir)
    }

    fn render(note: &StoredNote) -> CoreResult<(String, String)> {
        let record_yaml =
            serde_yaml::to_string(&note.record).map_err(CoreError::YamlSerialization)?;
        let sections_json =
            serde_json::to_string_pretty(&note.sections).map_err(CoreError::Serialization)?;
        Ok((record_yaml, sections_json))
    }

    fn read_file(path: &Path) -> CoreResult<String> {
        fs::read_to_string(path).map_err(CoreError::FileRead)
    }

    fn write_staged(staging: &Path, record_yaml: &str, sections_json: &str) -> CoreResult<()> {
        fs::write(staging.join(RECORD_FILENAME), record_yaml).map_err(CoreError::FileWrite)?;
        fs::write(staging.join(SECTIONS_FILENAME), sections_json).map_err(CoreError::FileWrite)?;

        #[cfg(test)]
        {
            if take_forced_write_error() {
                return Err(CoreError::FileWrite(io::Error::other(
                    "forced write failure (test hook)",
                )));
            }
        }

        Ok(())
    }

    /// Compares an already published record with the batch being written.
    ///
    /// Identical bytes make the write a no-op; anything else is a conflict.
    fn compare_published(
        record: RecordId,
        final_dir: &Path,
        record_yaml: &str,
        sections_json: &str,
    ) -> CoreResult<()> {
        let same = Self::read_file(&final_dir.join(RECORD_FILENAME))? == record_yaml
            && Self::read_file(&final_dir.join(SECTIONS_FILENAME))? == sections_json;
        if same {
            tracing::debug!("record {} already stored, nothing to do", record);
            return Ok(());
        }
        Err(CoreError::RecordConflict(record))
    }

    /// Removes the staging directory after a failed write and returns the original error.
    fn discard_staging(staging: PathBuf, write_error: CoreError) -> CoreResult<()> {
        match remove_staging_dir_all(&staging) {
            Ok(()) => Err(write_error),
            Err(cleanup_error) => Err(CoreError::CleanupAfterWriteFailed {
                path: staging,
                write_error: Box::new(write_error),
                cleanup_error,
            }),
        }
    }
}

impl SectionStore for FileSectionStore {
    fn write_batch(&self, record: &Record, sections: &[Section]) -> CoreResult<()> {
        check_ordinals(record.id(), sections)?;

        let note = StoredNote::new(record, sections);
        let (record_yaml, sections_json) = Self::render(&note)?;
        let final_dir = self.record_dir(record.id());

        if final_dir.exists() {
            return Self::compare_published(record.id(), &final_dir, &record_yaml, &sections_json);
        }

        let parent = final_dir.parent().unwrap_or(&self.records_dir);
        fs::create_dir_all(parent).map_err(CoreError::StorageDirCreation)?;

        let staging = parent.join(format!(".staging-{}-{}", record.id(), CanonicalUuid::new()));
        fs::create_dir(&staging).map_err(CoreError::RecordDirCreation)?;

        if let Err(write_error) = Self::write_staged(&staging, &record_yaml, &sections_json) {
            return Self::discard_staging(staging, write_error);
        }

        if let Err(rename_error) = fs::rename(&staging, &final_dir) {
            if !final_dir.is_dir() {
                return Self::discard_staging(staging, CoreError::FileWrite(rename_error));
            }

            // A concurrent writer published the record first.
            remove_staging_dir_all(&staging).map_err(|cleanup_error| {
                CoreError::CleanupAfterWriteFailed {
                    path: staging.clone(),
                    write_error: Box::new(CoreError::FileWrite(rename_error)),
                    cleanup_error,
                }
            })?;
            return Self::compare_published(record.id(), &final_dir, &record_yaml, &sections_json);
        }

        tracing::info!(
            "persisted record {} with {} section(s)",
            record.id(),
            sections.len()
        );
        Ok(())
    }

    fn load(&self, record: RecordId) -> CoreResult<StoredNote> {
        let dir = self.record_dir(record);
        if !dir.is_dir() {
            return Err(CoreError::RecordNotFound(record));
        }

        let record_yaml = Self::read_file(&dir.join(RECORD_FILENAME))?;
        let sections_json = Self::read_file(&dir.join(SECTIONS_FILENAME))?;

        let stored_record: Record =
            serde_yaml::from_str(&record_yaml).map_err(CoreError::YamlDeserialization)?;
        if stored_record.id() != record {
            return Err(CoreError::InvalidInput(format!(
                "record file in {} belongs to record {}",
                dir.display(),
                stored_record.id()
            )));
        }
        let sections: Vec<SectionView> =
            serde_json::from_str(&sections_json).map_err(CoreError::Deserialization)?;

        Ok(StoredNote {
            record: stored_record,
            sections,
        })
    }
}

#[cfg(test)]
static FORCE_WRITE_ERROR_FOR_THREADS: LazyLock<Mutex<HashSet<std::thread::ThreadId>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

#[cfg(test)]
static FORCE_CLEANUP_ERROR_FOR_THREADS: LazyLock<Mutex<HashSet<std::thread::ThreadId>>> =
    LazyLock::new(|| Mutex::new(HashSet::new()));

#[cfg(test)]
fn take_forced_write_error() -> bool {
    FORCE_WRITE_ERROR_FOR_THREADS
        .lock()
        .expect("FORCE_WRITE_ERROR_FOR_THREADS mutex poisoned")
        .remove(&std::thread::current().id())
}

/// Removes a staging directory and everything in it.
///
/// In test builds the removal can be forced to fail for the current thread.
fn remove_staging_dir_all(staging: &Path) -> io::Result<()> {
    #[cfg(test)]
    {
        let mut guard = FORCE_CLEANUP_ERROR_FOR_THREADS
            .lock()
            .expect("FORCE_CLEANUP_ERROR_FOR_THREADS mutex poisoned");
        if guard.remove(&std::thread::current().id()) {
            return Err(io::Error::other("forced cleanup failure (test hook)"));
        }
    }

    fs::remove_dir_all(staging)
}
