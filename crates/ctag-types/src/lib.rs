//! Validated text primitives shared by the clinical-tag crates.
//!
//! Values of these types can only be constructed through their checking constructors, so code
//! that receives one never has to re-validate it.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input is not a marker prefix followed by a code token
    #[error("invalid tag code '{0}' (expected '#CODE', '##CODE' or '>>CODE')")]
    InvalidTagCode(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Returns true if `c` may appear in the code token that follows a marker prefix.
///
/// Code tokens are word characters: letters, digits and underscore (Unicode aware, so
/// accented codes such as `#PRESSÃO` are accepted).
pub fn is_code_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// The prefix that introduces a tag occurrence in a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerStyle {
    /// `#CODE`, a top-level tag.
    Hash,
    /// `##CODE`, conventionally a sub-tag.
    DoubleHash,
    /// `>>CODE`, the alternative sub-tag marker.
    Chevron,
}

impl MarkerStyle {
    pub fn prefix(&self) -> &'static str {
        match self {
            MarkerStyle::Hash => "#",
            MarkerStyle::DoubleHash => "##",
            MarkerStyle::Chevron => ">>",
        }
    }

    /// Detects the marker prefix at the start of `input`, preferring the longest match.
    pub fn detect(input: &str) -> Option<Self> {
        if input.starts_with("##") {
            Some(MarkerStyle::DoubleHash)
        } else if input.starts_with(">>") {
            Some(MarkerStyle::Chevron)
        } else if input.starts_with('#') {
            Some(MarkerStyle::Hash)
        } else {
            None
        }
    }
}

/// A syntactically valid tag code, prefix included (for example `#PA`, `##ALTURA`, `>>DOR`).
///
/// Codes are compared exactly: `#PA` and `##PA` are different codes, as are `#PA` and `#pa`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagCode(String);

impl TagCode {
    /// Parses a tag code, requiring a marker prefix immediately followed by one or more code
    /// characters and nothing else.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::InvalidTagCode`] if the input does not follow the marker syntax.
    pub fn parse(input: &str) -> Result<Self, TextError> {
        let style =
            MarkerStyle::detect(input).ok_or_else(|| TextError::InvalidTagCode(input.into()))?;
        let body = &input[style.prefix().len()..];
        if body.is_empty() || !body.chars().all(is_code_char) {
            return Err(TextError::InvalidTagCode(input.into()));
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn style(&self) -> MarkerStyle {
        // A constructed code always carries a prefix.
        MarkerStyle::detect(&self.0).unwrap_or(MarkerStyle::Hash)
    }

    /// The code token without its marker prefix.
    pub fn body(&self) -> &str {
        &self.0[self.style().prefix().len()..]
    }
}

impl std::fmt::Display for TagCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TagCode {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagCode::parse(s)
    }
}

impl AsRef<str> for TagCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for TagCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for TagCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        TagCode::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_and_rejects_blank() {
        assert_eq!(NonEmptyText::new("  dor  ").unwrap().as_str(), "dor");
        assert_eq!(NonEmptyText::new(" \n\t ").unwrap_err(), TextError::Empty);
    }

    #[test]
    fn tag_code_accepts_all_marker_styles() {
        let hash = TagCode::parse("#QP").unwrap();
        assert_eq!(hash.style(), MarkerStyle::Hash);
        assert_eq!(hash.body(), "QP");

        let double = TagCode::parse("##ALTURA").unwrap();
        assert_eq!(double.style(), MarkerStyle::DoubleHash);
        assert_eq!(double.body(), "ALTURA");

        let chevron = TagCode::parse(">>EF_CV").unwrap();
        assert_eq!(chevron.style(), MarkerStyle::Chevron);
        assert_eq!(chevron.body(), "EF_CV");
    }

    #[test]
    fn tag_code_accepts_unicode_word_characters() {
        assert!(TagCode::parse("#PRESSÃO").is_ok());
    }

    #[test]
    fn tag_code_rejects_bad_syntax() {
        for bad in ["", "#", "##", ">>", "PA", "# PA", "#PA ", "#P-A", ">PA", "###PA"] {
            assert!(
                matches!(TagCode::parse(bad), Err(TextError::InvalidTagCode(_))),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn tag_code_deserialize_validates() {
        let ok: TagCode = serde_json::from_str("\"#PA\"").unwrap();
        assert_eq!(ok.as_str(), "#PA");
        assert!(serde_json::from_str::<TagCode>("\"PA\"").is_err());
    }
}
