//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. The
//! core never reads process-wide environment variables itself; hosts read them and hand the raw
//! values to the resolver functions below.

use crate::constants::{
    AFFIRMATIVE_TOKENS, DEFAULT_BASIC_CODES, DEFAULT_DATE_PATTERNS, DEFAULT_RECORD_DATA_DIR,
    NEGATIVE_TOKENS, RECORDS_DIR_NAME,
};
use crate::{CoreError, CoreResult};
use chrono::format::{Item, StrftimeItems};
use ctag_types::TagCode;
use std::path::{Path, PathBuf};

/// Case-insensitive yes/no tokens accepted by boolean tags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BooleanVocabulary {
    affirmative: Vec<String>,
    negative: Vec<String>,
}

impl Default for BooleanVocabulary {
    fn default() -> Self {
        Self {
            affirmative: AFFIRMATIVE_TOKENS.iter().map(|t| t.to_string()).collect(),
            negative: NEGATIVE_TOKENS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl BooleanVocabulary {
    /// Creates a vocabulary from explicit token lists.
    ///
    /// Tokens are stored lower-cased. A token may not appear on both sides.
    pub fn new(
        affirmative: impl IntoIterator<Item = impl AsRef<str>>,
        negative: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> CoreResult<Self> {
        let lower = |t: &str| t.trim().to_lowercase();
        let affirmative: Vec<String> = affirmative.into_iter().map(|t| lower(t.as_ref())).collect();
        let negative: Vec<String> = negative.into_iter().map(|t| lower(t.as_ref())).collect();

        if affirmative.iter().chain(&negative).any(String::is_empty) {
            return Err(CoreError::InvalidInput(
                "boolean tokens cannot be empty".into(),
            ));
        }
        if let Some(clash) = affirmative.iter().find(|t| negative.contains(*t)) {
            return Err(CoreError::InvalidInput(format!(
                "boolean token '{clash}' is both affirmative and negative"
            )));
        }

        Ok(Self {
            affirmative,
            negative,
        })
    }

    /// Reads `token` as a boolean, ignoring case and surrounding whitespace.
    pub fn read(&self, token: &str) -> Option<bool> {
        let token = token.trim().to_lowercase();
        if self.affirmative.contains(&token) {
            Some(true)
        } else if self.negative.contains(&token) {
            Some(false)
        } else {
            None
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    record_data_dir: PathBuf,
    date_patterns: Vec<String>,
    booleans: BooleanVocabulary,
    basic_codes: Vec<TagCode>,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with the default boolean vocabulary and basic codes.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidInput` if `date_patterns` is empty or any pattern is not a
    /// valid chrono format string.
    pub fn new(record_data_dir: PathBuf, date_patterns: Vec<String>) -> CoreResult<Self> {
        validate_date_patterns(&date_patterns)?;

        let basic_codes = DEFAULT_BASIC_CODES
            .iter()
            .map(|c| TagCode::parse(c))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            record_data_dir,
            date_patterns,
            booleans: BooleanVocabulary::default(),
            basic_codes,
        })
    }

    pub fn with_boolean_vocabulary(mut self, booleans: BooleanVocabulary) -> Self {
        self.booleans = booleans;
        self
    }

    /// Replaces the codes used to score note completeness.
    pub fn with_basic_codes(mut self, basic_codes: Vec<TagCode>) -> Self {
        self.basic_codes = basic_codes;
        self
    }

    pub fn record_data_dir(&self) -> &Path {
        &self.record_data_dir
    }

    pub fn records_dir(&self) -> PathBuf {
        self.record_data_dir.join(RECORDS_DIR_NAME)
    }

    pub fn date_patterns(&self) -> &[String] {
        &self.date_patterns
    }

    pub fn booleans(&self) -> &BooleanVocabulary {
        &self.booleans
    }

    pub fn basic_codes(&self) -> &[TagCode] {
        &self.basic_codes
    }
}

/// Checks that every pattern is a usable chrono format string.
pub(crate) fn validate_date_patterns(patterns: &[String]) -> CoreResult<()> {
    if patterns.is_empty() {
        return Err(CoreError::InvalidInput(
            "at least one date pattern is required".into(),
        ));
    }

    for pattern in patterns {
        if pattern.trim().is_empty() {
            return Err(CoreError::InvalidInput("date pattern cannot be empty".into()));
        }
        if StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
            return Err(CoreError::InvalidInput(format!(
                "invalid date pattern '{pattern}'"
            )));
        }
    }

    Ok(())
}

/// Parse the date patterns from an optional comma-separated string value.
///
/// If `value` is `None` or empty/whitespace, returns the default patterns.
pub fn date_patterns_from_env_value(value: Option<String>) -> CoreResult<Vec<String>> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let patterns: Vec<String> = match value {
        Some(v) => v
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        None => DEFAULT_DATE_PATTERNS.iter().map(|p| p.to_string()).collect(),
    };

    validate_date_patterns(&patterns)?;
    Ok(patterns)
}

/// Resolve the record data directory from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_RECORD_DATA_DIR`].
pub fn record_data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORD_DATA_DIR))
}
