//! Drivers
//!
//! Keyword search covers first name, last name and phone number, and a numeric
//! keyword also matches the driver id. The phone number is unique within an
//! organization.

use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::graphql::orm::ScalarType;
use crate::graphql::schema::{EntitySchema, FieldDef, FilterKind, KeywordSearch};

pub static SCHEMA: EntitySchema = EntitySchema {
    plural: "drivers",
    singular: "Driver",
    keyword: KeywordSearch {
        paths: &[&["firstName"], &["lastName"], &["phoneNumber"]],
        numeric_id: true,
    },
    fields: &[
        FieldDef::new(
            "licenseType",
            FilterKind::InSet {
                path: &["licenseType", "id"],
                scalar: ScalarType::Id,
            },
        ),
        FieldDef::new("isActive", FilterKind::BoolToggle { path: &["isActive"] }),
        FieldDef::new(
            "vehicleId",
            FilterKind::Exact {
                path: &["vehicle", "id"],
                scalar: ScalarType::Id,
            },
        ),
        FieldDef::new("createdAt", FilterKind::DateRange { path: &["createdAt"] }),
        FieldDef::new("firstName", FilterKind::SortOnly { path: &["firstName"] }),
        FieldDef::new("updatedAt", FilterKind::SortOnly { path: &["updatedAt"] }),
    ],
    selection: "id firstName lastName phoneNumber isActive createdAt updatedAt \
                licenseType { id name }",
    default_sort: &["updatedAt:desc"],
    unique_fields: &["phoneNumber"],
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseTypeRef {
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: EntityId,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub license_type: Option<LicenseTypeRef>,
}
