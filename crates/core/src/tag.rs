//! Tag definitions and their per-type rule sets.
//!
//! A tag's data type and its rules travel together in [`TagKind`], so a number tag can only
//! carry number rules and a composite blood pressure tag only composite rules.

use crate::constants::MAX_DECIMAL_PLACES;
use crate::error::{CatalogError, CatalogResult};
use ctag_types::{NonEmptyText, TagCode};
use ctag_uuid::{ClinicianId, TagId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The declared type of a tag's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataType {
    #[serde(alias = "texto")]
    Text,
    #[serde(alias = "numero")]
    Number,
    #[serde(alias = "data")]
    Date,
    #[serde(alias = "booleano")]
    Boolean,
    #[serde(alias = "bp")]
    CompositeBp,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Text => "text",
            DataType::Number => "number",
            DataType::Date => "date",
            DataType::Boolean => "boolean",
            DataType::CompositeBp => "composite-bp",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A regular expression a text value must match somewhere.
///
/// Compiled once when the catalog is loaded.
#[derive(Debug, Clone)]
pub struct TextPattern(regex::Regex);

impl TextPattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        regex::Regex::new(pattern).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for TextPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl<'de> Deserialize<'de> for TextPattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        TextPattern::new(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextRules {
    #[serde(alias = "regex")]
    pub pattern: Option<TextPattern>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DateRules {
    /// Overrides the configured date patterns for this tag when non-empty.
    pub patterns: Vec<String>,
}

/// Inclusive bounds; an absent side is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Range {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    fn check(&self) -> Result<(), String> {
        for bound in [self.min, self.max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err("bounds must be finite".into());
            }
        }
        match (self.min, self.max) {
            (Some(min), Some(max)) if min > max => Err(format!("min {min} exceeds max {max}")),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NumberRules {
    /// Base unit values are stored in.
    #[serde(alias = "unidade")]
    pub unit: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    #[serde(alias = "decimais")]
    pub decimal_places: Option<u32>,
    pub accepted_suffixes: Vec<String>,
    /// Suffix → multiplier into the base unit.
    pub conversions: BTreeMap<String, f64>,
}

impl NumberRules {
    pub fn range(&self) -> Range {
        Range::new(self.min, self.max)
    }

    fn check(&self) -> Result<(), String> {
        self.range().check()?;

        if let Some(places) = self.decimal_places {
            if places > MAX_DECIMAL_PLACES {
                return Err(format!(
                    "decimal_places {places} exceeds maximum of {MAX_DECIMAL_PLACES}"
                ));
            }
        }
        if self.accepted_suffixes.iter().any(|s| s.trim().is_empty()) {
            return Err("accepted suffixes cannot be empty".into());
        }
        for (suffix, factor) in &self.conversions {
            if !self.accepted_suffixes.contains(suffix) {
                return Err(format!(
                    "conversion for '{suffix}' but it is not an accepted suffix"
                ));
            }
            if !factor.is_finite() || *factor <= 0.0 {
                return Err(format!("conversion factor for '{suffix}' must be positive"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BloodPressureRules {
    #[serde(alias = "unidade")]
    pub unit: Option<String>,
    #[serde(alias = "sistolica")]
    pub systolic: Range,
    #[serde(alias = "diastolica")]
    pub diastolic: Range,
    /// Tried in order; empty means the default separators.
    pub accepted_separators: Vec<String>,
}

impl BloodPressureRules {
    fn check(&self) -> Result<(), String> {
        self.systolic.check().map_err(|e| format!("systolic: {e}"))?;
        self.diastolic.check().map_err(|e| format!("diastolic: {e}"))?;
        if self.accepted_separators.iter().any(|s| s.is_empty()) {
            return Err("separators cannot be empty".into());
        }
        Ok(())
    }
}

/// A tag's data type together with the rules that apply to it.
#[derive(Debug, Clone, PartialEq)]
pub enum TagKind {
    Text(TextRules),
    Number(NumberRules),
    Date(DateRules),
    Boolean,
    CompositeBp(BloodPressureRules),
}

impl TagKind {
    pub fn data_type(&self) -> DataType {
        match self {
            TagKind::Text(_) => DataType::Text,
            TagKind::Number(_) => DataType::Number,
            TagKind::Date(_) => DataType::Date,
            TagKind::Boolean => DataType::Boolean,
            TagKind::CompositeBp(_) => DataType::CompositeBp,
        }
    }

    /// Checks rule coherence (bounds ordered, conversions reference accepted suffixes, ...).
    pub fn check(&self, code: &TagCode) -> CatalogResult<()> {
        let result = match self {
            TagKind::Number(rules) => rules.check(),
            TagKind::CompositeBp(rules) => rules.check(),
            TagKind::Date(rules) if rules.patterns.is_empty() => Ok(()),
            TagKind::Date(rules) => {
                crate::config::validate_date_patterns(&rules.patterns).map_err(|e| e.to_string())
            }
            TagKind::Text(_) | TagKind::Boolean => Ok(()),
        };

        result.map_err(|reason| CatalogError::InvalidRules {
            code: code.clone(),
            reason,
        })
    }
}

/// A named, typed annotation definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub id: TagId,
    pub code: TagCode,
    pub display_name: NonEmptyText,
    /// `None` means the tag is global.
    pub owner: Option<ClinicianId>,
    pub parent: Option<TagId>,
    pub kind: TagKind,
}

impl Tag {
    /// Creates a global, top-level tag.
    pub fn new(code: TagCode, display_name: NonEmptyText, kind: TagKind) -> Self {
        Self {
            id: TagId::new(),
            code,
            display_name,
            owner: None,
            parent: None,
            kind,
        }
    }

    pub fn owned_by(mut self, owner: ClinicianId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn child_of(mut self, parent: TagId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn data_type(&self) -> DataType {
        self.kind.data_type()
    }

    pub fn is_global(&self) -> bool {
        self.owner.is_none()
    }
}
