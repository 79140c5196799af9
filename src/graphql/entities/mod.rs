//! Entity schemas of the logistics backend
//!
//! Each submodule declares one collection's [`EntitySchema`] and the typed row
//! returned by its selection set. [`lookup`] resolves a schema by name.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::schema::EntitySchema;

// Master data
pub mod customer_group;
pub mod merchandise_type;
pub mod trailer_type;
pub mod unit_of_measure;
pub mod vehicle_group;

// Operations
pub mod advance;
pub mod driver;
pub mod gas_station;

/// Row id. The backend sends ids as strings or numbers depending on the
/// resolver, so both are accepted and kept as text.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
            Unsigned(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => EntityId(s),
            Raw::Int(n) => EntityId(n.to_string()),
            Raw::Unsigned(n) => EntityId(n.to_string()),
        })
    }
}

/// Related user as selected by `createdByUser { id firstName lastName }`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: EntityId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Every known schema
pub fn all() -> [&'static EntitySchema; 8] {
    [
        &advance::SCHEMA,
        &customer_group::SCHEMA,
        &driver::SCHEMA,
        &gas_station::SCHEMA,
        &merchandise_type::SCHEMA,
        &trailer_type::SCHEMA,
        &unit_of_measure::SCHEMA,
        &vehicle_group::SCHEMA,
    ]
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

static CATALOG: Lazy<HashMap<String, &'static EntitySchema>> = Lazy::new(|| {
    let mut catalog = HashMap::new();
    for schema in all() {
        catalog.insert(schema.plural.to_string(), schema);
        catalog.insert(snake_case(schema.plural), schema);
        catalog.insert(snake_case(schema.singular), schema);
    }
    catalog
});

/// Find a schema by collection name (`trailerTypes`, `trailer_types`) or
/// type name (`TrailerType`, `trailer_type`)
pub fn lookup(name: &str) -> Option<&'static EntitySchema> {
    CATALOG
        .get(name.trim())
        .or_else(|| CATALOG.get(&snake_case(name.trim())))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::orm::{CompileOptions, compile_list, inspect};
    use crate::graphql::filters::{FieldFilter, FilterSpec};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lookup_by_any_name() {
        for name in ["trailerTypes", "trailer_types", "TrailerType", "trailer_type"] {
            assert_eq!(lookup(name).map(|s| s.plural), Some("trailerTypes"), "{}", name);
        }
        assert!(lookup("spaceships").is_none());
    }

    #[test]
    fn test_entity_id_accepts_numbers_and_strings() {
        let ids: Vec<EntityId> = serde_json::from_str(r#"[42, "abc"]"#).unwrap();
        assert_eq!(ids, vec![EntityId::from("42"), EntityId::from("abc")]);
    }

    #[test]
    fn test_every_schema_compiles_consistent_documents() {
        for schema in all() {
            let mut spec = FilterSpec::new().keywords("7");
            for field in schema.fields {
                spec = spec.field(field.name, FieldFilter::value("1"));
            }
            let compiled = compile_list(schema, &spec, &CompileOptions::default());
            let usage = inspect(&compiled.document).unwrap();
            assert!(usage.is_consistent(), "{}: {}", schema.plural, compiled.document);
        }
    }
}
