//! Value normalisation: raw captured text to a canonical value of the tag's declared type.
//!
//! The shape of a [`NormalizedValue`] is fully determined by the data type of the tag it was
//! produced for. Blood pressure always yields exactly `{systolic, diastolic}`.

use crate::config::{BooleanVocabulary, CoreConfig};
use crate::constants::DEFAULT_BP_SEPARATORS;
use crate::error::NormalizationError;
use crate::tag::{BloodPressureRules, DataType, NumberRules, TagKind, TextRules};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One side of a blood pressure reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BpComponent {
    Systolic,
    Diastolic,
}

impl std::fmt::Display for BpComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BpComponent::Systolic => write!(f, "systolic"),
            BpComponent::Diastolic => write!(f, "diastolic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: f64,
    pub diastolic: f64,
}

/// A canonical value. Numbers are in the tag's base unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Boolean(bool),
    BloodPressure(BloodPressure),
}

impl NormalizedValue {
    pub fn data_type(&self) -> DataType {
        match self {
            NormalizedValue::Text(_) => DataType::Text,
            NormalizedValue::Number(_) => DataType::Number,
            NormalizedValue::Date(_) => DataType::Date,
            NormalizedValue::Boolean(_) => DataType::Boolean,
            NormalizedValue::BloodPressure(_) => DataType::CompositeBp,
        }
    }

    /// JSON form used in section views.
    pub fn to_json(&self) -> serde_json::Value {
        let number = |v: f64| {
            serde_json::Number::from_f64(v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)
        };
        match self {
            NormalizedValue::Text(text) => serde_json::Value::String(text.clone()),
            NormalizedValue::Number(v) => number(*v),
            NormalizedValue::Date(date) => {
                serde_json::Value::String(date.format("%Y-%m-%d").to_string())
            }
            NormalizedValue::Boolean(b) => serde_json::Value::Bool(*b),
            NormalizedValue::BloodPressure(bp) => serde_json::json!({
                "systolic": number(bp.systolic),
                "diastolic": number(bp.diastolic),
            }),
        }
    }
}

/// Normalises raw values using the ambient date patterns and boolean vocabulary.
///
/// Holds borrowed configuration only, so one normaliser can serve any number of notes.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    date_patterns: &'a [String],
    booleans: &'a BooleanVocabulary,
}

impl<'a> Normalizer<'a> {
    pub fn new(date_patterns: &'a [String], booleans: &'a BooleanVocabulary) -> Self {
        Self {
            date_patterns,
            booleans,
        }
    }

    pub fn from_config(config: &'a CoreConfig) -> Self {
        Self::new(config.date_patterns(), config.booleans())
    }

    /// Coerces `raw` into the data type declared by `kind`.
    ///
    /// Surrounding whitespace is ignored; a value that is empty after trimming is an error for
    /// every type.
    ///
    /// # Errors
    ///
    /// Returns the [`NormalizationError`] describing why the text does not fit the type.
    pub fn normalize(
        &self,
        kind: &TagKind,
        raw: &str,
    ) -> Result<NormalizedValue, NormalizationError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(NormalizationError::EmptyValue);
        }

        match kind {
            TagKind::Text(rules) => normalize_text(rules, text),
            TagKind::Boolean => self
                .booleans
                .read(text)
                .map(NormalizedValue::Boolean)
                .ok_or_else(|| NormalizationError::UnrecognisedBoolean(text.to_string())),
            TagKind::Date(rules) => {
                let patterns = if rules.patterns.is_empty() {
                    self.date_patterns
                } else {
                    rules.patterns.as_slice()
                };
                patterns
                    .iter()
                    .find_map(|p| NaiveDate::parse_from_str(text, p).ok())
                    .map(NormalizedValue::Date)
                    .ok_or_else(|| NormalizationError::UnparseableDate(text.to_string()))
            }
            TagKind::Number(rules) => normalize_number(rules, text).map(NormalizedValue::Number),
            TagKind::CompositeBp(rules) => {
                normalize_blood_pressure(rules, text).map(NormalizedValue::BloodPressure)
            }
        }
    }
}

fn normalize_text(rules: &TextRules, text: &str) -> Result<NormalizedValue, NormalizationError> {
    if let Some(pattern) = &rules.pattern {
        if !pattern.is_match(text) {
            return Err(NormalizationError::PatternMismatch {
                pattern: pattern.as_str().to_string(),
            });
        }
    }
    Ok(NormalizedValue::Text(text.to_string()))
}

/// Splits a leading numeral off `text`, accepting `.` or `,` as the decimal separator.
///
/// Returns the value and the remaining text, or `None` if `text` does not start with a number.
fn split_numeral(text: &str) -> Option<(f64, &str)> {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if end < bytes.len() && matches!(bytes[end], b'.' | b',') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }

    if digits == 0 {
        return None;
    }

    let value = text[..end].replace(',', ".").parse::<f64>().ok()?;
    Some((value, &text[end..]))
}

fn round_half_even(value: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (value * scale).round_ties_even() / scale
}

fn normalize_number(rules: &NumberRules, text: &str) -> Result<f64, NormalizationError> {
    let (value, rest) =
        split_numeral(text).ok_or_else(|| NormalizationError::InvalidNumber(text.to_string()))?;

    let suffix = rest.trim();
    let factor = if suffix.is_empty() || rules.unit.as_deref() == Some(suffix) {
        1.0
    } else if rules.accepted_suffixes.iter().any(|s| s == suffix) {
        // An accepted suffix without a conversion is an alias of the base unit.
        rules.conversions.get(suffix).copied().unwrap_or(1.0)
    } else {
        return Err(NormalizationError::UnrecognisedUnit {
            suffix: suffix.to_string(),
        });
    };

    let mut value = value * factor;
    if let Some(places) = rules.decimal_places {
        value = round_half_even(value, places);
    }

    if !value.is_finite() {
        return Err(NormalizationError::InvalidNumber(text.to_string()));
    }
    Ok(value)
}

fn parse_component(component: BpComponent, raw: &str) -> Result<f64, NormalizationError> {
    let raw = raw.trim();
    match split_numeral(raw) {
        Some((value, "")) if value.is_finite() => Ok(value),
        _ => Err(NormalizationError::InvalidComponent {
            component,
            raw: raw.to_string(),
        }),
    }
}

fn normalize_blood_pressure(
    rules: &BloodPressureRules,
    text: &str,
) -> Result<BloodPressure, NormalizationError> {
    let mut text = text;
    if let Some(unit) = rules.unit.as_deref().filter(|u| !u.is_empty()) {
        if let Some(stripped) = text.strip_suffix(unit) {
            text = stripped.trim_end();
        }
    }

    let separator = if rules.accepted_separators.is_empty() {
        DEFAULT_BP_SEPARATORS.iter().copied().find(|s| text.contains(s))
    } else {
        rules
            .accepted_separators
            .iter()
            .map(String::as_str)
            .find(|s| text.contains(s))
    }
    .ok_or(NormalizationError::MissingSeparator)?;

    let parts: Vec<&str> = text.split(separator).collect();
    if parts.len() != 2 {
        return Err(NormalizationError::WrongPartCount { found: parts.len() });
    }

    Ok(BloodPressure {
        systolic: parse_component(BpComponent::Systolic, parts[0])?,
        diastolic: parse_component(BpComponent::Diastolic, parts[1])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_DATE_PATTERNS;
    use crate::tag::{DateRules, TextPattern};
    use std::collections::BTreeMap;

    fn with_normalizer<T>(f: impl FnOnce(Normalizer<'_>) -> T) -> T {
        let patterns: Vec<String> = DEFAULT_DATE_PATTERNS.iter().map(|p| p.to_string()).collect();
        let booleans = BooleanVocabulary::default();
        f(Normalizer::new(&patterns, &booleans))
    }

    fn height_rules() -> TagKind {
        let mut conversions = BTreeMap::new();
        conversions.insert("cm".to_string(), 0.01);
        TagKind::Number(NumberRules {
            unit: Some("m".into()),
            decimal_places: Some(2),
            accepted_suffixes: vec!["cm".into()],
            conversions,
            ..NumberRules::default()
        })
    }

    fn bp_rules() -> TagKind {
        TagKind::CompositeBp(BloodPressureRules {
            unit: Some("mmHg".into()),
            accepted_separators: vec!["/".into(), "x".into(), "por".into()],
            ..BloodPressureRules::default()
        })
    }

    #[test]
    fn converts_centimetres_to_metres() {
        with_normalizer(|n| {
            assert_eq!(
                n.normalize(&height_rules(), "175cm").unwrap(),
                NormalizedValue::Number(1.75)
            );
            assert_eq!(
                n.normalize(&height_rules(), "1,82 m").unwrap(),
                NormalizedValue::Number(1.82)
            );
            assert_eq!(
                n.normalize(&height_rules(), " 1.8 ").unwrap(),
                NormalizedValue::Number(1.8)
            );
        });
    }

    #[test]
    fn unknown_suffix_is_rejected() {
        with_normalizer(|n| {
            let err = n.normalize(&height_rules(), "70in").unwrap_err();
            assert_eq!(
                err,
                NormalizationError::UnrecognisedUnit {
                    suffix: "in".into()
                }
            );
            assert!(matches!(
                n.normalize(&height_rules(), "alto"),
                Err(NormalizationError::InvalidNumber(_))
            ));
        });
    }

    #[test]
    fn rounding_is_half_to_even_and_idempotent() {
        let kind = TagKind::Number(NumberRules {
            decimal_places: Some(0),
            ..NumberRules::default()
        });
        with_normalizer(|n| {
            assert_eq!(n.normalize(&kind, "2.5").unwrap(), NormalizedValue::Number(2.0));
            assert_eq!(n.normalize(&kind, "3,5").unwrap(), NormalizedValue::Number(4.0));
            assert_eq!(n.normalize(&kind, "-0.5").unwrap(), NormalizedValue::Number(-0.0));

            let once = n.normalize(&height_rules(), "175.555cm").unwrap();
            let NormalizedValue::Number(v) = once else {
                panic!("expected number");
            };
            assert_eq!(n.normalize(&height_rules(), &v.to_string()).unwrap(), once);
        });
    }

    #[test]
    fn splits_blood_pressure() {
        with_normalizer(|n| {
            let expected = NormalizedValue::BloodPressure(BloodPressure {
                systolic: 120.0,
                diastolic: 80.0,
            });
            assert_eq!(n.normalize(&bp_rules(), "120x80").unwrap(), expected);
            assert_eq!(n.normalize(&bp_rules(), "120/80 mmHg").unwrap(), expected);
            assert_eq!(n.normalize(&bp_rules(), "120 por 80").unwrap(), expected);
        });
    }

    #[test]
    fn blood_pressure_without_separator_fails() {
        with_normalizer(|n| {
            assert_eq!(
                n.normalize(&bp_rules(), "120").unwrap_err(),
                NormalizationError::MissingSeparator
            );
            assert_eq!(
                n.normalize(&bp_rules(), "120/80/70").unwrap_err(),
                NormalizationError::WrongPartCount { found: 3 }
            );
            assert!(matches!(
                n.normalize(&bp_rules(), "120/oitenta"),
                Err(NormalizationError::InvalidComponent {
                    component: BpComponent::Diastolic,
                    ..
                })
            ));
        });
    }

    #[test]
    fn default_separators_apply_when_none_configured() {
        let kind = TagKind::CompositeBp(BloodPressureRules::default());
        with_normalizer(|n| {
            assert!(n.normalize(&kind, "13X8").is_ok());
            assert!(n.normalize(&kind, "13 por 8").is_err());
        });
    }

    #[test]
    fn reads_booleans() {
        with_normalizer(|n| {
            assert_eq!(
                n.normalize(&TagKind::Boolean, "Sim").unwrap(),
                NormalizedValue::Boolean(true)
            );
            assert_eq!(
                n.normalize(&TagKind::Boolean, "nao").unwrap(),
                NormalizedValue::Boolean(false)
            );
            assert!(matches!(
                n.normalize(&TagKind::Boolean, "às vezes"),
                Err(NormalizationError::UnrecognisedBoolean(_))
            ));
        });
    }

    #[test]
    fn first_matching_date_pattern_wins() {
        let kind = TagKind::Date(DateRules::default());
        with_normalizer(|n| {
            let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
            assert_eq!(
                n.normalize(&kind, "2024-03-05").unwrap(),
                NormalizedValue::Date(expected)
            );
            assert_eq!(
                n.normalize(&kind, "05/03/2024").unwrap(),
                NormalizedValue::Date(expected)
            );
            assert!(matches!(
                n.normalize(&kind, "ontem"),
                Err(NormalizationError::UnparseableDate(_))
            ));
        });
    }

    #[test]
    fn tag_date_patterns_override_configured_ones() {
        let kind = TagKind::Date(DateRules {
            patterns: vec!["%m/%d/%Y".into()],
        });
        with_normalizer(|n| {
            assert_eq!(
                n.normalize(&kind, "03/05/2024").unwrap(),
                NormalizedValue::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
            );
        });
    }

    #[test]
    fn text_is_trimmed_and_checked() {
        let plain = TagKind::Text(TextRules::default());
        let coded = TagKind::Text(TextRules {
            pattern: Some(TextPattern::new(r"^[A-Z]\d{2}").unwrap()),
        });
        with_normalizer(|n| {
            assert_eq!(
                n.normalize(&plain, "  dor de cabeça \n").unwrap(),
                NormalizedValue::Text("dor de cabeça".into())
            );
            assert_eq!(
                n.normalize(&plain, "   ").unwrap_err(),
                NormalizationError::EmptyValue
            );
            assert!(n.normalize(&coded, "J45").is_ok());
            assert!(matches!(
                n.normalize(&coded, "asma"),
                Err(NormalizationError::PatternMismatch { .. })
            ));
        });
    }

    #[test]
    fn json_shape_follows_data_type() {
        let bp = NormalizedValue::BloodPressure(BloodPressure {
            systolic: 120.0,
            diastolic: 80.0,
        });
        assert_eq!(
            bp.to_json(),
            serde_json::json!({"systolic": 120.0, "diastolic": 80.0})
        );
        let date = NormalizedValue::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(date.to_json(), serde_json::json!("2024-01-02"));
        assert_eq!(date.data_type(), DataType::Date);
    }
}
