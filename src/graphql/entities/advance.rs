//! Cash advances paid to drivers before a trip

use serde::{Deserialize, Serialize};

use super::{EntityId, UserRef};
use crate::graphql::orm::ScalarType;
use crate::graphql::schema::{EntitySchema, FieldDef, FilterKind, KeywordSearch};

pub static SCHEMA: EntitySchema = EntitySchema {
    plural: "advances",
    singular: "Advance",
    keyword: KeywordSearch {
        paths: &[&["reason"]],
        numeric_id: true,
    },
    fields: &[
        FieldDef::new(
            "driverName",
            FilterKind::RelationName {
                relation: &["driver"],
                name_fields: &["firstName", "lastName"],
            },
        ),
        FieldDef::new(
            "status",
            FilterKind::InSet {
                path: &["status"],
                scalar: ScalarType::String,
            },
        ),
        FieldDef::new(
            "paymentDate",
            FilterKind::DateRange {
                path: &["paymentDate"],
            },
        ),
        FieldDef::new("amount", FilterKind::NumberRange { path: &["amount"] }),
        FieldDef::new("updatedAt", FilterKind::SortOnly { path: &["updatedAt"] }),
    ],
    selection: "id reason amount status paymentDate updatedAt driver { id firstName lastName }",
    default_sort: &["updatedAt:desc"],
    unique_fields: &[],
};

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvanceStatus {
    Pending,
    Accepted,
    Rejected,
    Paid,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Advance {
    pub id: EntityId,
    #[serde(default)]
    pub reason: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub status: Option<AdvanceStatus>,
    #[serde(default)]
    pub payment_date: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Driver the advance was paid to
    #[serde(default)]
    pub driver: Option<UserRef>,
}
