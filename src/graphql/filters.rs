//! Filter state submitted by list pages
//!
//! A list page sends one [`FilterSpec`] per request. It carries:
//! - a free-text `keywords` search
//! - one [`FieldFilter`] per logical field (value, selected options, range, sort)
//! - the requested page and page size
//! - an optional explicit sort (single value or list)
//!
//! Every part is optional. The compiler in [`crate::graphql::orm`] only emits
//! clauses for the parts that are actually present.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Sorting
// ============================================================================

/// Sort direction selected on a column header
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A-Z, 1-9, oldest-newest)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-1, newest-oldest)
    Desc,
}

impl SortDirection {
    /// Suffix used in `field:direction` sort strings
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Explicit sort passed by the caller: one `field:direction` string or a list
#[derive(Serialize, Deserialize, Clone, Debug, Eq, PartialEq)]
#[serde(untagged)]
pub enum SortValue {
    One(String),
    Many(Vec<String>),
}

impl SortValue {
    /// Always a list, since the backend sort argument is list-typed
    pub fn into_list(self) -> Vec<String> {
        match self {
            SortValue::One(value) => vec![value],
            SortValue::Many(values) => values,
        }
    }
}

// ============================================================================
// Field descriptors
// ============================================================================

/// One selectable option of a multi-select filter
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterProperty {
    /// The value sent to the backend
    pub value: String,
    /// Display label (ignored by the compiler)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FilterProperty {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }
}

/// Lower/upper bound pair for date and number ranges.
///
/// `min`/`max` are accepted as aliases so number ranges read naturally.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct RangeFilter {
    /// Lower bound (inclusive)
    #[serde(default, alias = "min", skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Upper bound (inclusive)
    #[serde(default, alias = "max", skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl RangeFilter {
    /// Check if neither bound is set
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Filter descriptor for a single logical field
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldFilter {
    /// Exact or substring value, depending on the field's filter kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Selected options for "in" semantics
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterProperty>,
    /// Range bounds for date and number fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeFilter>,
    /// Column sort requested for this field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_type: Option<SortDirection>,
}

impl FieldFilter {
    /// Check if the descriptor carries nothing at all
    pub fn is_empty(&self) -> bool {
        self.value.is_none()
            && self.filters.is_empty()
            && self.range.as_ref().map_or(true, RangeFilter::is_empty)
            && self.sort_type.is_none()
    }

    // ========================================================================
    // Helper constructors for programmatic use
    // ========================================================================

    /// Create a value filter (substring or exact match)
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    /// Create a multi-select filter from option values
    pub fn any_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filters: values.into_iter().map(FilterProperty::new).collect(),
            ..Default::default()
        }
    }

    /// Create a range filter with both bounds optional
    pub fn range(from: Option<&str>, to: Option<&str>) -> Self {
        Self {
            range: Some(RangeFilter {
                from: from.map(str::to_string),
                to: to.map(str::to_string),
            }),
            ..Default::default()
        }
    }

    /// Create a sort-only descriptor
    pub fn sorted(direction: SortDirection) -> Self {
        Self {
            sort_type: Some(direction),
            ..Default::default()
        }
    }
}

// ============================================================================
// Request
// ============================================================================

/// Requested page (1-based) and page size
#[derive(Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }
}

/// Complete filter state for one list request.
///
/// Field descriptors are flattened next to `keywords`, `pagination` and `sort`,
/// matching the shape list pages already send. Field order is preserved and
/// drives the order of per-field sorts.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    /// Free-text search across the entity's keyword fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    /// Requested page
    #[serde(default)]
    pub pagination: PageRequest,
    /// Explicit sort overriding per-field sorts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortValue>,
    /// Per-field descriptors keyed by logical field name
    #[serde(flatten)]
    pub fields: IndexMap<String, FieldFilter>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the keyword search
    pub fn keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    /// Set a field descriptor
    pub fn field(mut self, name: impl Into<String>, filter: FieldFilter) -> Self {
        self.fields.insert(name.into(), filter);
        self
    }

    /// Set the requested page
    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.pagination = PageRequest::new(page, page_size);
        self
    }

    /// Set an explicit sort
    pub fn sort(mut self, sort: SortValue) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Look up a field descriptor by logical name
    pub fn get(&self, name: &str) -> Option<&FieldFilter> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filter_spec_deserializes_flattened_fields() {
        let json = serde_json::json!({
            "keywords": "flatbed",
            "pagination": { "page": 2, "pageSize": 20 },
            "name": { "value": "box", "sortType": "desc" },
            "status": { "filters": [{ "value": "ACTIVE", "label": "Active" }] },
            "createdAt": { "range": { "from": "2024-01-01" } },
            "fuelCapacity": { "range": { "min": "10", "max": "80" } }
        });

        let spec: FilterSpec = serde_json::from_value(json).unwrap();

        assert_eq!(spec.keywords.as_deref(), Some("flatbed"));
        assert_eq!(spec.pagination, PageRequest::new(2, 20));
        assert_eq!(
            spec.fields.keys().collect::<Vec<_>>(),
            vec!["name", "status", "createdAt", "fuelCapacity"]
        );
        assert_eq!(spec.get("name").unwrap().sort_type, Some(SortDirection::Desc));
        assert_eq!(spec.get("status").unwrap().filters[0].value, "ACTIVE");
        let fuel = spec.get("fuelCapacity").unwrap().range.clone().unwrap();
        assert_eq!(fuel.from.as_deref(), Some("10"));
        assert_eq!(fuel.to.as_deref(), Some("80"));
    }

    #[test]
    fn test_sort_value_accepts_one_or_many() {
        let one: SortValue = serde_json::from_str("\"name:asc\"").unwrap();
        let many: SortValue = serde_json::from_str("[\"name:asc\",\"id:desc\"]").unwrap();

        assert_eq!(one.into_list(), vec!["name:asc"]);
        assert_eq!(many.into_list(), vec!["name:asc", "id:desc"]);
    }

    #[test]
    fn test_field_filter_is_empty() {
        assert!(FieldFilter::default().is_empty());
        assert!(FieldFilter::range(None, None).is_empty());
        assert!(!FieldFilter::value("x").is_empty());
        assert!(!FieldFilter::sorted(SortDirection::Asc).is_empty());
    }
}
