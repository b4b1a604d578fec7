//! YAML wire model for tag catalogs.
//!
//! A catalog file is a top-level `tags:` sequence:
//!
//! ```yaml
//! tags:
//!   - id: 0f0e3b6c2a5d4e7f8a9b0c1d2e3f4a5b
//!     code: "#PA"
//!     display_name: Pressão arterial
//!     data_type: composite-bp
//!     rules:
//!       unit: mmHg
//!       systolic: { min: 60, max: 250 }
//!       diastolic: { min: 30, max: 150 }
//!       accepted_separators: ["/", "x", "por"]
//! ```
//!
//! `owner` (clinician id) and `parent` (tag id) are optional. `rules` is interpreted according
//! to `data_type`, so keys that belong to another type are rejected.

use crate::error::{CatalogError, CatalogResult};
use crate::tag::{BloodPressureRules, DataType, DateRules, NumberRules, Tag, TagKind, TextRules};
use ctag_types::{NonEmptyText, TagCode};
use ctag_uuid::{ClinicianId, TagId};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogWire {
    #[serde(default)]
    tags: Vec<TagWire>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TagWire {
    id: TagId,
    code: TagCode,
    #[serde(alias = "nome")]
    display_name: NonEmptyText,
    #[serde(default)]
    owner: Option<ClinicianId>,
    #[serde(default)]
    parent: Option<TagId>,
    #[serde(alias = "tipo_dado")]
    data_type: DataType,
    #[serde(default, alias = "regras_validacao")]
    rules: Option<serde_yaml::Value>,
}

/// Boolean tags carry no rules; an empty or absent mapping is the only accepted form.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoRules {}

fn schema_error(path: String, message: String) -> CatalogError {
    let path = if path.is_empty() {
        "<root>".to_string()
    } else {
        path
    };
    CatalogError::Schema { path, message }
}

/// Parses catalog YAML into tag definitions without checking cross-tag constraints.
pub(crate) fn parse_catalog_yaml(yaml: &str) -> CatalogResult<Vec<Tag>> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml);
    let wire = serde_path_to_error::deserialize::<_, CatalogWire>(deserializer).map_err(|err| {
        let path = err.path().to_string();
        schema_error(path, err.into_inner().to_string())
    })?;

    wire.tags.into_iter().map(wire_to_domain).collect()
}

fn rules_from_value<T: DeserializeOwned>(code: &TagCode, value: serde_yaml::Value) -> CatalogResult<T> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        let reason = if path.is_empty() || path == "." {
            source.to_string()
        } else {
            format!("{path}: {source}")
        };
        CatalogError::InvalidRules {
            code: code.clone(),
            reason,
        }
    })
}

fn wire_to_domain(wire: TagWire) -> CatalogResult<Tag> {
    let rules = match wire.rules {
        None | Some(serde_yaml::Value::Null) => {
            serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
        }
        Some(value) => value,
    };

    let code = &wire.code;
    let kind = match wire.data_type {
        DataType::Text => TagKind::Text(rules_from_value::<TextRules>(code, rules)?),
        DataType::Number => TagKind::Number(rules_from_value::<NumberRules>(code, rules)?),
        DataType::Date => TagKind::Date(rules_from_value::<DateRules>(code, rules)?),
        DataType::Boolean => {
            rules_from_value::<NoRules>(code, rules)?;
            TagKind::Boolean
        }
        DataType::CompositeBp => {
            TagKind::CompositeBp(rules_from_value::<BloodPressureRules>(code, rules)?)
        }
    };

    Ok(Tag {
        id: wire.id,
        code: wire.code,
        display_name: wire.display_name,
        owner: wire.owner,
        parent: wire.parent,
        kind,
    })
}
