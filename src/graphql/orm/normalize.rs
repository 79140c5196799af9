//! Filter normalization
//!
//! Trims every string in a [`FilterSpec`] and drops values that become empty,
//! so "not provided" has exactly one representation (`None` / empty list)
//! before fragments are built. Nothing else is validated here.

use crate::graphql::filters::{FieldFilter, FilterProperty, FilterSpec, RangeFilter, SortValue};

/// Trim a string, treating whitespace-only input as absent
fn trimmed(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn normalize_range(range: Option<&RangeFilter>) -> Option<RangeFilter> {
    let range = range?;
    let normalized = RangeFilter {
        from: trimmed(range.from.as_ref()),
        to: trimmed(range.to.as_ref()),
    };
    (!normalized.is_empty()).then_some(normalized)
}

fn normalize_field(field: &FieldFilter) -> FieldFilter {
    FieldFilter {
        value: trimmed(field.value.as_ref()),
        filters: field
            .filters
            .iter()
            .filter_map(|p| {
                trimmed(Some(&p.value)).map(|value| FilterProperty {
                    value,
                    label: p.label.clone(),
                })
            })
            .collect(),
        range: normalize_range(field.range.as_ref()),
        sort_type: field.sort_type,
    }
}

fn normalize_sort(sort: Option<&SortValue>) -> Option<SortValue> {
    match sort? {
        SortValue::One(value) => trimmed(Some(value)).map(SortValue::One),
        SortValue::Many(values) => {
            let values: Vec<String> = values.iter().filter_map(|v| trimmed(Some(v))).collect();
            (!values.is_empty()).then_some(SortValue::Many(values))
        }
    }
}

/// Produce a trimmed copy of the filter state.
///
/// Field descriptors that end up carrying nothing are removed; descriptors
/// with only a sort direction are kept.
pub fn normalize(spec: &FilterSpec) -> FilterSpec {
    FilterSpec {
        keywords: trimmed(spec.keywords.as_ref()),
        pagination: spec.pagination,
        sort: normalize_sort(spec.sort.as_ref()),
        fields: spec
            .fields
            .iter()
            .map(|(name, field)| (name.trim().to_string(), normalize_field(field)))
            .filter(|(name, field)| !name.is_empty() && !field.is_empty())
            .collect(),
    }
}
