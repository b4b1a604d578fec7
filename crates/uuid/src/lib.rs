//! Canonical identifiers and sharded-path utilities.
//!
//! Tags, records, clinicians and patients are all identified by UUIDs. To keep comparisons,
//! map keys and storage paths deterministic, identifiers use a *canonical* representation:
//! **32 lowercase hexadecimal characters** (no hyphens).
//!
//! This crate provides:
//! - [`CanonicalUuid`], a wrapper that guarantees the canonical format once constructed.
//! - Typed identifiers ([`TagId`], [`RecordId`], [`ClinicianId`], [`PatientId`]) so a tag id can
//!   never be passed where a clinician id is expected.
//! - Shared sharding logic to derive a record directory from an identifier.
//!
//! ## Canonical UUID form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Non-canonical values (uppercase, hyphenated, wrong length, non-hex) are rejected by
//! [`CanonicalUuid::parse`].
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, data is stored under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`

mod canonical;
mod ids;

pub use canonical::{CanonicalUuid, Uuid};
pub use ids::{ClinicianId, PatientId, RecordId, TagId};

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;
