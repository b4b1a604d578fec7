//! Typed identifiers built on [`CanonicalUuid`].

use crate::{CanonicalUuid, UuidResult};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

macro_rules! canonical_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(CanonicalUuid);

        impl $name {
            /// Allocates a fresh random identifier.
            pub fn new() -> Self {
                Self(CanonicalUuid::new())
            }

            /// Parses an identifier that must already be in canonical form.
            pub fn parse(input: &str) -> UuidResult<Self> {
                CanonicalUuid::parse(input).map(Self)
            }

            pub fn canonical(&self) -> CanonicalUuid {
                self.0
            }

            /// See [`CanonicalUuid::sharded_dir`].
            pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
                self.0.sharded_dir(parent_dir)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<CanonicalUuid> for $name {
            fn from(value: CanonicalUuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = crate::UuidError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        #[cfg(feature = "serde")]
        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.collect_str(&self.0)
            }
        }

        #[cfg(feature = "serde")]
        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                Self::parse(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

canonical_id!(
    /// Identifies a tag definition in the catalog.
    TagId
);

canonical_id!(
    /// Identifies one authored clinical note.
    RecordId
);

canonical_id!(
    /// Identifies an authoring clinician; also the owner of private tag definitions.
    ClinicianId
);

canonical_id!(
    /// Identifies the subject patient of a record.
    PatientId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_ids_share_canonical_parsing() {
        let raw = "550e8400e29b41d4a716446655440000";
        let tag = TagId::parse(raw).unwrap();
        let clinician: ClinicianId = raw.parse().unwrap();

        assert_eq!(tag.to_string(), raw);
        assert_eq!(tag.canonical(), clinician.canonical());
        assert!(RecordId::parse("not-a-uuid").is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn typed_ids_serialize_as_canonical_strings() {
        let id = PatientId::parse("550e8400e29b41d4a716446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let back: PatientId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<PatientId>("\"550E8400E29B41D4A716446655440000\"").is_err());
    }
}
