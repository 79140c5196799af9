//! Trailer types (flatbed, box, reefer...)

use serde::{Deserialize, Serialize};

use super::{EntityId, UserRef};
use crate::graphql::schema::{EntitySchema, FieldDef, FilterKind, KeywordSearch};

pub static SCHEMA: EntitySchema = EntitySchema {
    plural: "trailerTypes",
    singular: "TrailerType",
    keyword: KeywordSearch {
        paths: &[&["name"]],
        numeric_id: true,
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
            "description",
            FilterKind::Text {
                path: &["description"],
                shares_keywords: false,
            },
        ),
        FieldDef::new("createdAt", FilterKind::DateRange { path: &["createdAt"] }),
        FieldDef::new("updatedAt", FilterKind::DateRange { path: &["updatedAt"] }),
        FieldDef::new(
            "createdByName",
            FilterKind::RelationName {
                relation: &["createdByUser"],
                name_fields: &["firstName", "lastName"],
            },
        ),
    ],
    selection: "id name description createdAt updatedAt createdByUser { id firstName lastName }",
    default_sort: &["updatedAt:desc"],
    unique_fields: &["name"],
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrailerType {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub created_by_user: Option<UserRef>,
}
