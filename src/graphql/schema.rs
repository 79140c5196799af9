//! Declarative entity schemas
//!
//! Each backend collection is described once by an [`EntitySchema`]: its
//! GraphQL names, the filter kind of every filterable field, the keyword
//! search paths and the selection set returned to list pages. The compiler in
//! [`crate::graphql::orm`] is generic over these descriptions.

use super::orm::ScalarType;

/// A path from the collection root to a (possibly nested) field
pub type FieldPath = &'static [&'static str];

/// How the free-text `keywords` value is searched
#[derive(Debug, Clone, Copy)]
pub struct KeywordSearch {
    /// Text fields matched with `containsi`
    pub paths: &'static [FieldPath],
    /// Also match the numeric id when the keyword is an integer
    pub numeric_id: bool,
}

impl KeywordSearch {
    pub const NONE: KeywordSearch = KeywordSearch {
        paths: &[],
        numeric_id: false,
    };

    pub fn is_enabled(&self) -> bool {
        !self.paths.is_empty()
    }
}

/// Filter semantics of one logical field
#[derive(Debug, Clone, Copy)]
pub enum FilterKind {
    /// Case-insensitive substring match.
    ///
    /// With `shares_keywords`, the clause is OR-ed with the keyword search
    /// when both are present instead of being AND-ed.
    Text {
        path: FieldPath,
        shares_keywords: bool,
    },
    /// Exact match on a scalar
    Exact { path: FieldPath, scalar: ScalarType },
    /// Match any of the selected options
    InSet { path: FieldPath, scalar: ScalarType },
    /// Active/inactive style multi-select of `"true"`/`"false"` options
    BoolToggle { path: FieldPath },
    /// Inclusive date range, widened to full days
    DateRange { path: FieldPath },
    /// Inclusive numeric range
    NumberRange { path: FieldPath },
    /// Substring search on the first/last name of a related user
    RelationName {
        relation: FieldPath,
        name_fields: &'static [&'static str],
    },
    /// Sortable column without a filter
    SortOnly { path: FieldPath },
}

impl FilterKind {
    /// Field path used for sorting
    pub fn path(&self) -> FieldPath {
        match *self {
            FilterKind::Text { path, .. }
            | FilterKind::Exact { path, .. }
            | FilterKind::InSet { path, .. }
            | FilterKind::BoolToggle { path }
            | FilterKind::DateRange { path }
            | FilterKind::NumberRange { path }
            | FilterKind::SortOnly { path } => path,
            FilterKind::RelationName { relation, .. } => relation,
        }
    }
}

/// A logical field exposed to list pages
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    /// Logical name, also used as the variable name stem
    pub name: &'static str,
    pub kind: FilterKind,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FilterKind) -> Self {
        Self { name, kind }
    }

    /// `path.to.field` as accepted by the backend sort argument
    pub fn sort_key(&self) -> String {
        match self.kind {
            FilterKind::RelationName {
                relation,
                name_fields,
            } => {
                let mut segments: Vec<&str> = relation.to_vec();
                if let Some(first) = name_fields.first() {
                    segments.push(*first);
                }
                segments.join(".")
            }
            kind => kind.path().join("."),
        }
    }
}

/// Description of one backend collection
#[derive(Debug)]
pub struct EntitySchema {
    /// Collection query field, e.g. `trailerTypes`
    pub plural: &'static str,
    /// Type name, e.g. `TrailerType`; mutation names derive from it
    pub singular: &'static str,
    pub keyword: KeywordSearch,
    pub fields: &'static [FieldDef],
    /// Selection set of one item, e.g. `id name updatedAt`
    pub selection: &'static str,
    /// Sort applied when the request carries none
    pub default_sort: &'static [&'static str],
    /// Fields that must be unique within an organization
    pub unique_fields: &'static [&'static str],
}

impl EntitySchema {
    /// Look up a field by logical name
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// `createTrailerType`
    pub fn create_mutation(&self) -> String {
        format!("create{}", self.singular)
    }

    /// `updateTrailerType`
    pub fn update_mutation(&self) -> String {
        format!("update{}", self.singular)
    }

    /// `TrailerTypeInput`
    pub fn input_type(&self) -> String {
        format!("{}Input", self.singular)
    }

    /// `TrailerTypes`, used to name operations
    pub fn plural_type_name(&self) -> String {
        let mut chars = self.plural.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static SAMPLE: EntitySchema = EntitySchema {
        plural: "vehicleGroups",
        singular: "VehicleGroup",
        keyword: KeywordSearch {
            paths: &[&["name"]],
            numeric_id: false,
        },
        fields: &[
            FieldDef::new(
                "managerName",
                FilterKind::RelationName {
                    relation: &["manager"],
                    name_fields: &["firstName", "lastName"],
                },
            ),
            FieldDef::new("createdAt", FilterKind::DateRange { path: &["createdAt"] }),
        ],
        selection: "id name",
        default_sort: &["name:asc"],
        unique_fields: &["name"],
    };

    #[test]
    fn test_names_derive_from_singular_and_plural() {
        assert_eq!(SAMPLE.create_mutation(), "createVehicleGroup");
        assert_eq!(SAMPLE.update_mutation(), "updateVehicleGroup");
        assert_eq!(SAMPLE.input_type(), "VehicleGroupInput");
        assert_eq!(SAMPLE.plural_type_name(), "VehicleGroups");
    }

    #[test]
    fn test_sort_keys() {
        assert_eq!(SAMPLE.field("managerName").unwrap().sort_key(), "manager.firstName");
        assert_eq!(SAMPLE.field("createdAt").unwrap().sort_key(), "createdAt");
        assert!(SAMPLE.field("missing").is_none());
    }
}
