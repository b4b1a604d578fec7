use crate::normalize::BpComponent;
use ctag_types::{TagCode, TextError};
use ctag_uuid::{RecordId, TagId};
use serde::{Deserialize, Serialize};

/// Errors raised while building or querying the tag catalog.
///
/// These are surfaced to whoever maintains the catalog; none of them is recorded on a section.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog schema mismatch at {path}: {message}")]
    Schema { path: String, message: String },
    #[error("invalid rules for tag {code}: {reason}")]
    InvalidRules { code: TagCode, reason: String },
    #[error("duplicate tag id {0}")]
    DuplicateId(TagId),
    #[error("tag code {code} is already defined in scope {scope}")]
    DuplicateCode { code: TagCode, scope: String },
    #[error("tag {tag} references unknown parent {parent}")]
    UnknownParent { tag: TagId, parent: TagId },
    #[error("unknown tag id {0}")]
    UnknownTagId(TagId),
    #[error("cyclic tag hierarchy detected at tag {0}")]
    CyclicHierarchy(TagId),
    #[error("failed to read catalog file: {0}")]
    FileRead(std::io::Error),
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// A marker whose code is defined neither for the authoring clinician nor globally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tag {code}")]
pub struct UnknownTagError {
    pub code: TagCode,
}

/// Raw text that cannot be coerced into the declared data type of its tag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizationError {
    #[error("value cannot be empty")]
    EmptyValue,
    #[error("value does not match pattern {pattern}")]
    PatternMismatch { pattern: String },
    #[error("'{0}' is not a recognised yes/no value")]
    UnrecognisedBoolean(String),
    #[error("'{0}' does not match any accepted date pattern")]
    UnparseableDate(String),
    #[error("'{0}' is not a valid number")]
    InvalidNumber(String),
    #[error("unit '{suffix}' is not accepted")]
    UnrecognisedUnit { suffix: String },
    #[error("no accepted separator found")]
    MissingSeparator,
    #[error("expected exactly two parts, found {found}")]
    WrongPartCount { found: usize },
    #[error("{component} part '{raw}' is not a valid number")]
    InvalidComponent { component: BpComponent, raw: String },
}

/// Which side of a range a value fell out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Bound {
    BelowMinimum,
    AboveMaximum,
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::BelowMinimum => write!(f, "below minimum"),
            Bound::AboveMaximum => write!(f, "above maximum"),
        }
    }
}

/// A normalized value that parses but falls outside the bounds declared by its tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Set for composite values; `None` for plain numbers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<BpComponent>,
    pub value: f64,
    pub bound: Bound,
    pub limit: f64,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.component {
            Some(component) => write!(f, "{component}"),
            None => write!(f, "value"),
        }?;
        write!(f, " {} is {} {}", self.value, self.bound, self.limit)
    }
}

impl std::error::Error for Violation {}

/// Structural failures that reject a whole batch of sections.
///
/// These indicate a defect in assembly or a caller policy breach, never a bad marker.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssemblyError {
    #[error("duplicate ordinal {ordinal} in record {record}")]
    DuplicateOrdinal { record: RecordId, ordinal: usize },
    #[error("section from record {found} in batch for record {expected}")]
    ForeignSection { expected: RecordId, found: RecordId },
    #[error("note contains no tag markers but {} mandatory tag(s) are expected", .mandatory.len())]
    NoMarkers { mandatory: Vec<TagCode> },
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid text: {0}")]
    Text(#[from] TextError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("structural assembly error: {0}")]
    Assembly(#[from] AssemblyError),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create record directory: {0}")]
    RecordDirCreation(std::io::Error),
    #[error(
        "persisting record failed and cleanup also failed (path: {path}): write={write_error}; cleanup={cleanup_error}",
        path = .path.display()
    )]
    CleanupAfterWriteFailed {
        path: std::path::PathBuf,
        #[source]
        write_error: Box<CoreError>,
        cleanup_error: std::io::Error,
    },
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize sections: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize sections: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("record {0} is already stored with different sections")]
    RecordConflict(RecordId),
    #[error("record {0} not found")]
    RecordNotFound(RecordId),
    #[error("section store lock poisoned")]
    StoreLockPoisoned,
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
