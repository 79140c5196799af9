use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::graphql::orm::ScalarType;
use crate::graphql::schema::{EntitySchema, FieldDef, FilterKind, KeywordSearch};

pub static SCHEMA: EntitySchema = EntitySchema {
    plural: "gasStations",
    singular: "GasStation",
    keyword: KeywordSearch {
        paths: &[&["name"], &["address"]],
        numeric_id: false,
    },
    fields: &[
        FieldDef::new(
            "name",
            FilterKind::Text {
                path: &["name"],
                shares_keywords: true,
            },
        ),
        FieldDef::new(
            "address",
            FilterKind::Text {
                path: &["address"],
                shares_keywords: false,
            },
        ),
        FieldDef::new(
            "fuelCapacity",
            FilterKind::NumberRange {
                path: &["fuelCapacity"],
            },
        ),
        FieldDef::new(
            "status",
            FilterKind::InSet {
                path: &["status"],
                scalar: ScalarType::String,
            },
        ),
        FieldDef::new("updatedAt", FilterKind::SortOnly { path: &["updatedAt"] }),
    ],
    selection: "id name address fuelCapacity status updatedAt",
    default_sort: &["name:asc"],
    unique_fields: &["name"],
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GasStation {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    /// Liters
    #[serde(default)]
    pub fuel_capacity: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}
