//! Constants used throughout the core crate.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_RECORD_DATA_DIR: &str = "record_data";

/// Directory name (under the data directory) holding persisted records.
pub const RECORDS_DIR_NAME: &str = "records";

/// Filename for the immutable record header.
pub const RECORD_FILENAME: &str = "record.yaml";

/// Filename for the assembled section batch of a record.
pub const SECTIONS_FILENAME: &str = "sections.json";

/// Date patterns tried in order when a tag does not declare its own.
pub const DEFAULT_DATE_PATTERNS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

/// Lower-case tokens read as `true` by boolean tags.
pub const AFFIRMATIVE_TOKENS: &[&str] = &["true", "sim", "s", "1", "verdadeiro", "yes", "y"];

/// Lower-case tokens read as `false` by boolean tags.
pub const NEGATIVE_TOKENS: &[&str] = &["false", "não", "nao", "n", "0", "falso", "no"];

/// Separators used by blood pressure tags that do not declare any.
pub const DEFAULT_BP_SEPARATORS: &[&str] = &["/", "x", "X"];

/// Codes that make up a complete basic note (chief complaint, history, physical exam).
pub const DEFAULT_BASIC_CODES: &[&str] = &["#QP", "#HDA", "#EF"];

/// Upper bound on `decimal_places` accepted in number rules.
pub const MAX_DECIMAL_PLACES: u32 = 12;
