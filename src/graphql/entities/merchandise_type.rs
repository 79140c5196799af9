use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::graphql::schema::{EntitySchema, FieldDef, FilterKind, KeywordSearch};

pub static SCHEMA: EntitySchema = EntitySchema {
    plural: "merchandiseTypes",
    singular: "MerchandiseType",
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
        FieldDef::new("isActive", FilterKind::BoolToggle { path: &["isActive"] }),
        FieldDef::new("createdAt", FilterKind::DateRange { path: &["createdAt"] }),
        FieldDef::new("updatedAt", FilterKind::SortOnly { path: &["updatedAt"] }),
    ],
    selection: "id name description isActive updatedAt",
    default_sort: &["name:asc"],
    unique_fields: &["name"],
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MerchandiseType {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub updated_at: Option<String>,
}
