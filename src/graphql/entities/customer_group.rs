//! Customer groups
//!
//! A group is filtered by the customers it contains (`customers.id in [...]`).

use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::graphql::orm::ScalarType;
use crate::graphql::schema::{EntitySchema, FieldDef, FilterKind, KeywordSearch};

pub static SCHEMA: EntitySchema = EntitySchema {
    plural: "customerGroups",
    singular: "CustomerGroup",
    keyword: KeywordSearch {
        paths: &[&["name"]],
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
            "customers",
            FilterKind::InSet {
                path: &["customers", "id"],
                scalar: ScalarType::Id,
            },
        ),
        FieldDef::new("updatedAt", FilterKind::SortOnly { path: &["updatedAt"] }),
    ],
    selection: "id name description updatedAt customers { id name }",
    default_sort: &["name:asc"],
    unique_fields: &["name"],
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRef {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerGroup {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub customers: Vec<CustomerRef>,
}
