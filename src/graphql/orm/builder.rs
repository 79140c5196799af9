//! Condition-fragment builder
//!
//! Turns a normalized [`FilterSpec`] into filter [`Fragment`]s for one
//! [`EntitySchema`]. A field only contributes a fragment when at least one of
//! its conditions applies; a descriptor whose conditions all turn out to be
//! inapplicable contributes nothing rather than an empty filter object.

use chrono::{DateTime, Datelike, NaiveDate};
use serde_json::Value as JsonValue;

use super::fragment::{Fragment, ScalarType, Transform, VarType, Variable};
use crate::graphql::filters::{FieldFilter, FilterSpec};
use crate::graphql::schema::{EntitySchema, FieldDef, FilterKind};

/// Variable names used by the keyword search
pub const KEYWORDS_VAR: &str = "keywords";
pub const KEYWORD_ID_VAR: &str = "keywordId";
pub const KEYWORD_NAME_VAR: &str = "keywordName";

/// Fragments and sort keys produced from one filter state
#[derive(Debug, Clone, Default)]
pub struct FilterFragments {
    pub fragments: Vec<Fragment>,
    /// Per-field sorts in request order, e.g. `["name:desc"]`
    pub field_sorts: Vec<String>,
}

/// Whether a keyword should also be matched against the numeric id
pub fn is_numeric_keyword(keyword: &str) -> bool {
    let digits = keyword
        .strip_prefix('-')
        .or_else(|| keyword.strip_prefix('+'))
        .unwrap_or(keyword);
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && keyword.parse::<i64>().is_ok()
}

/// Whether a range bound can be read as a calendar date or timestamp.
///
/// Only four-digit years count; anything outside them cannot be shifted by a
/// UTC offset and rendered as RFC 3339.
pub(crate) fn is_date_value(value: &str) -> bool {
    let year = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.year())
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|instant| instant.year()));
    year.is_ok_and(|year| (1..=9999).contains(&year))
}

fn is_number_value(value: &str) -> bool {
    value.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Branches of the keyword search.
///
/// A numeric keyword on a schema with id search switches to the
/// `$keywordId`/`$keywordName` pair; otherwise every branch shares `$keywords`.
fn keyword_branches(schema: &EntitySchema, keywords: Option<&str>) -> Vec<Fragment> {
    let Some(keywords) = keywords else {
        return Vec::new();
    };
    if !schema.keyword.is_enabled() {
        tracing::debug!(
            entity = schema.plural,
            "Keyword search not supported, ignoring keywords"
        );
        return Vec::new();
    }

    if schema.keyword.numeric_id && is_numeric_keyword(keywords) {
        let mut branches = vec![Fragment::equals(
            &["id"],
            Variable::id(KEYWORD_ID_VAR, keywords),
        )];
        branches.extend(schema.keyword.paths.iter().map(|path| {
            Fragment::contains(path, Variable::string(KEYWORD_NAME_VAR, keywords))
        }));
        return branches;
    }

    schema
        .keyword
        .paths
        .iter()
        .map(|path| Fragment::contains(path, Variable::string(KEYWORDS_VAR, keywords)))
        .collect()
}

fn option_values(filter: &FieldFilter) -> Vec<JsonValue> {
    filter
        .filters
        .iter()
        .map(|p| JsonValue::String(p.value.clone()))
        .collect()
}

/// Build the fragment of one field, or `None` when nothing applies
fn field_fragment(field: &FieldDef, filter: &FieldFilter) -> Option<Fragment> {
    match field.kind {
        FilterKind::Text { path, .. } => {
            let value = filter.value.as_deref()?;
            Some(Fragment::contains(path, Variable::string(field.name, value)))
        }
        FilterKind::Exact { path, scalar } => {
            let value = filter.value.as_deref()?;
            let variable = match scalar {
                ScalarType::Id => Variable::id(field.name, value),
                ScalarType::Boolean => {
                    if !matches!(value, "true" | "false") {
                        return None;
                    }
                    Variable::new(
                        field.name,
                        VarType::Scalar(scalar),
                        JsonValue::String(value.to_string()),
                    )
                    .with_transform(Transform::Bool)
                }
                ScalarType::Int => {
                    value.parse::<i64>().ok()?;
                    Variable::new(
                        field.name,
                        VarType::Scalar(scalar),
                        JsonValue::String(value.to_string()),
                    )
                    .with_transform(Transform::Integer)
                }
                ScalarType::Float => {
                    if !is_number_value(value) {
                        return None;
                    }
                    Variable::new(
                        field.name,
                        VarType::Scalar(scalar),
                        JsonValue::String(value.to_string()),
                    )
                    .with_transform(Transform::Float)
                }
                _ => Variable::new(
                    field.name,
                    VarType::Scalar(scalar),
                    JsonValue::String(value.to_string()),
                ),
            };
            Some(Fragment::equals(path, variable))
        }
        FilterKind::InSet { path, scalar } => {
            if filter.filters.is_empty() {
                return None;
            }
            let transform = if scalar == ScalarType::Id {
                Transform::IdList
            } else {
                Transform::None
            };
            let variable = Variable::new(
                field.name,
                VarType::List(scalar),
                JsonValue::Array(option_values(filter)),
            )
            .with_transform(transform);
            Some(Fragment::one_of(path, variable))
        }
        FilterKind::BoolToggle { path } => {
            if filter.filters.is_empty() {
                return None;
            }
            let variable = Variable::new(
                field.name,
                VarType::List(ScalarType::Boolean),
                JsonValue::Array(option_values(filter)),
            )
            .with_transform(Transform::BoolList);
            Some(Fragment::one_of(path, variable))
        }
        FilterKind::DateRange { path } => {
            let range = filter.range.as_ref()?;
            let bound = |suffix: &str, value: Option<&String>, transform: Transform| {
                value.filter(|v| is_date_value(v)).map(|v| {
                    Variable::new(
                        format!("{}{}", field.name, suffix),
                        VarType::Scalar(ScalarType::DateTime),
                        JsonValue::String(v.clone()),
                    )
                    .with_transform(transform)
                })
            };
            Fragment::range(
                path,
                bound("From", range.from.as_ref(), Transform::StartOfDay),
                bound("To", range.to.as_ref(), Transform::EndOfDay),
            )
        }
        FilterKind::NumberRange { path } => {
            let range = filter.range.as_ref()?;
            let bound = |suffix: &str, value: Option<&String>| {
                value.filter(|v| is_number_value(v)).map(|v| {
                    Variable::new(
                        format!("{}{}", field.name, suffix),
                        VarType::Scalar(ScalarType::Float),
                        JsonValue::String(v.clone()),
                    )
                    .with_transform(Transform::Float)
                })
            };
            Fragment::range(
                path,
                bound("Min", range.from.as_ref()),
                bound("Max", range.to.as_ref()),
            )
        }
        FilterKind::RelationName {
            relation,
            name_fields,
        } => {
            let value = filter.value.as_deref()?;
            let branches = name_fields
                .iter()
                .map(|name| Fragment::contains(&[*name], Variable::string(field.name, value)))
                .collect();
            Fragment::any(branches).map(|inner| Fragment::nested(relation, inner))
        }
        FilterKind::SortOnly { .. } => None,
    }
}

/// Build every applicable fragment for a normalized filter state.
///
/// The keyword group comes first; fields follow in schema order. Unknown field
/// names are ignored.
pub fn build_fragments(schema: &EntitySchema, spec: &FilterSpec) -> FilterFragments {
    let mut keyword_group = keyword_branches(schema, spec.keywords.as_deref());
    let keywords_present = !keyword_group.is_empty();
    let mut fragments = Vec::new();

    for field in schema.fields {
        let Some(filter) = spec.get(field.name) else {
            continue;
        };
        let Some(fragment) = field_fragment(field, filter) else {
            continue;
        };
        match field.kind {
            FilterKind::Text {
                shares_keywords: true,
                ..
            } if keywords_present => keyword_group.push(fragment),
            _ => fragments.push(fragment),
        }
    }

    if let Some(group) = Fragment::any(keyword_group) {
        fragments.insert(0, group);
    }

    let mut field_sorts = Vec::new();
    for (name, filter) in &spec.fields {
        let Some(direction) = filter.sort_type else {
            continue;
        };
        match schema.field(name) {
            Some(field) => {
                field_sorts.push(format!("{}:{}", field.sort_key(), direction.as_str()))
            }
            None => tracing::debug!(
                entity = schema.plural,
                field = %name,
                "Ignoring sort on unknown field"
            ),
        }
    }

    FilterFragments {
        fragments,
        field_sorts,
    }
}
