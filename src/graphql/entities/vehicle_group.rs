use serde::{Deserialize, Serialize};

use super::{EntityId, UserRef};
use crate::graphql::schema::{EntitySchema, FieldDef, FilterKind, KeywordSearch};

pub static SCHEMA: EntitySchema = EntitySchema {
    plural: "vehicleGroups",
    singular: "VehicleGroup",
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
            "managerName",
            FilterKind::RelationName {
                relation: &["manager"],
                name_fields: &["firstName", "lastName"],
            },
        ),
        FieldDef::new("isActive", FilterKind::BoolToggle { path: &["isActive"] }),
        FieldDef::new("updatedAt", FilterKind::DateRange { path: &["updatedAt"] }),
    ],
    selection: "id name isActive updatedAt manager { id firstName lastName }",
    default_sort: &["name:asc"],
    unique_fields: &["name"],
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleGroup {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub manager: Option<UserRef>,
}
