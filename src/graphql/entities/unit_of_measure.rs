//! Units of measure used on orders and tariffs
//!
//! Keywords match both the short code (`KG`) and the display name.

use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::graphql::orm::ScalarType;
use crate::graphql::schema::{EntitySchema, FieldDef, FilterKind, KeywordSearch};

pub static SCHEMA: EntitySchema = EntitySchema {
    plural: "unitOfMeasures",
    singular: "UnitOfMeasure",
    keyword: KeywordSearch {
        paths: &[&["code"], &["name"]],
        numeric_id: false,
    },
    fields: &[
        FieldDef::new(
            "code",
            FilterKind::Exact {
                path: &["code"],
                scalar: ScalarType::String,
            },
        ),
        FieldDef::new(
            "name",
            FilterKind::Text {
                path: &["name"],
                shares_keywords: true,
            },
        ),
        FieldDef::new(
            "type",
            FilterKind::InSet {
                path: &["type"],
                scalar: ScalarType::String,
            },
        ),
    ],
    selection: "id code name type updatedAt",
    default_sort: &["code:asc"],
    unique_fields: &["code"],
};

/// Measurement dimension of a unit
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitKind {
    Weight,
    Volume,
    Length,
    Quantity,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnitOfMeasure {
    pub id: EntityId,
    pub code: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: Option<UnitKind>,
    #[serde(default)]
    pub updated_at: Option<String>,
}
