//! Parameter binder
//!
//! Builds the variable map sent with a compiled document. The map is produced
//! by walking the declared variables, so its key set is always exactly the
//! declaration set. Each variable's [`Transform`] converts the raw UI value
//! into the value the backend expects.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeDelta, TimeZone, Utc};
use serde_json::{Map, Number, Value as JsonValue};

use super::assembler::{CompileOptions, CompiledQuery};
use super::builder::is_numeric_keyword;
use super::fragment::{Transform, Variable};
use crate::graphql::filters::SortValue;

/// Runtime values keyed by declared variable name
pub type ParameterMap = Map<String, JsonValue>;

/// Bind every declared variable of `query`
pub fn bind(query: &CompiledQuery, options: &CompileOptions) -> ParameterMap {
    query
        .variables
        .iter()
        .map(|variable| {
            (
                variable.name.clone(),
                bind_variable(variable, options.utc_offset_minutes),
            )
        })
        .collect()
}

fn bind_variable(variable: &Variable, utc_offset_minutes: i32) -> JsonValue {
    let value = &variable.value;
    match variable.transform {
        Transform::None => value.clone(),
        Transform::StartOfDay => day_boundary(value, utc_offset_minutes, false),
        Transform::EndOfDay => day_boundary(value, utc_offset_minutes, true),
        Transform::Bool => to_bool(value),
        Transform::BoolList => map_items(value, to_bool),
        Transform::Id => to_id(value),
        Transform::IdList => map_items(value, to_id),
        Transform::Integer => to_integer(value),
        Transform::Float => to_float(value),
        Transform::SortList => serde_json::from_value::<SortValue>(value.clone())
            .map(|sort| JsonValue::from(sort.into_list()))
            .unwrap_or_else(|_| value.clone()),
    }
}

fn map_items(value: &JsonValue, f: fn(&JsonValue) -> JsonValue) -> JsonValue {
    match value {
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(f).collect()),
        other => JsonValue::Array(vec![f(other)]),
    }
}

fn to_bool(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) if s == "true" => JsonValue::Bool(true),
        JsonValue::String(s) if s == "false" => JsonValue::Bool(false),
        other => other.clone(),
    }
}

/// Integer-looking ids are sent as numbers, other ids stay strings
fn to_id(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) if is_numeric_keyword(s) => s
            .parse::<i64>()
            .map(JsonValue::from)
            .unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

fn to_integer(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) => s
            .trim()
            .parse::<i64>()
            .map(JsonValue::from)
            .unwrap_or_else(|_| value.clone()),
        other => other.clone(),
    }
}

fn to_float(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or_else(|| value.clone()),
        other => other.clone(),
    }
}

/// Calendar day of a bound as seen from the users' offset
fn local_day(raw: &str, utc_offset_minutes: i32) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    let instant = DateTime::parse_from_rfc3339(raw).ok()?;
    let local = instant
        .naive_utc()
        .checked_add_signed(TimeDelta::minutes(i64::from(utc_offset_minutes)))?;
    Some(local.date())
}

/// First or last millisecond of the bound's day, as a UTC timestamp.
///
/// Values that are not dates, or whose boundary falls outside the calendar
/// range once shifted by the offset, are bound unchanged.
fn day_boundary(value: &JsonValue, utc_offset_minutes: i32, end: bool) -> JsonValue {
    let Some(raw) = value.as_str() else {
        return value.clone();
    };
    let Some(day) = local_day(raw.trim(), utc_offset_minutes) else {
        return value.clone();
    };

    let time = if end {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_milli_opt(0, 0, 0, 0)
    };
    let Some(time) = time else {
        return value.clone();
    };
    let Some(utc) = day
        .and_time(time)
        .checked_sub_signed(TimeDelta::minutes(i64::from(utc_offset_minutes)))
    else {
        return value.clone();
    };
    JsonValue::String(
        Utc.from_utc_datetime(&utc)
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::orm::fragment::{ScalarType, VarType};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn bound(variable: Variable, offset: i32) -> JsonValue {
        bind_variable(&variable, offset)
    }

    fn date(name: &str, value: &str, transform: Transform) -> Variable {
        Variable::new(name, VarType::Scalar(ScalarType::DateTime), json!(value))
            .with_transform(transform)
    }

    #[test]
    fn test_date_only_bounds_cover_the_full_day() {
        assert_eq!(
            bound(date("from", "2024-03-01", Transform::StartOfDay), 0),
            json!("2024-03-01T00:00:00.000Z")
        );
        assert_eq!(
            bound(date("to", "2024-03-01", Transform::EndOfDay), 0),
            json!("2024-03-01T23:59:59.999Z")
        );
    }

    #[test]
    fn test_day_boundaries_follow_the_offset() {
        // UTC+7: local midnight is 17:00 the previous day in UTC
        assert_eq!(
            bound(date("from", "2024-03-01", Transform::StartOfDay), 420),
            json!("2024-02-29T17:00:00.000Z")
        );
        assert_eq!(
            bound(date("to", "2024-03-01", Transform::EndOfDay), 420),
            json!("2024-03-01T16:59:59.999Z")
        );
        // 20:00 UTC on the 1st is already the 2nd at UTC+7
        assert_eq!(
            bound(date("from", "2024-03-01T20:00:00Z", Transform::StartOfDay), 420),
            json!("2024-03-01T17:00:00.000Z")
        );
    }

    #[test]
    fn test_boundaries_outside_the_calendar_are_bound_unchanged() {
        assert_eq!(
            bound(date("from", "-262143-01-01", Transform::StartOfDay), 420),
            json!("-262143-01-01")
        );
        assert_eq!(
            bound(date("to", "+262142-12-31", Transform::EndOfDay), -420),
            json!("+262142-12-31")
        );
        assert_eq!(
            bound(date("from", "2024-03-01T20:00:00Z", Transform::StartOfDay), i32::MAX),
            json!("2024-03-01T20:00:00Z")
        );
    }

    #[test]
    fn test_exact_scalars() {
        let flag = |raw: &str| {
            Variable::new("isActive", VarType::Scalar(ScalarType::Boolean), json!(raw))
                .with_transform(Transform::Bool)
        };
        assert_eq!(bound(flag("true"), 0), json!(true));
        assert_eq!(bound(flag("false"), 0), json!(false));
        assert_eq!(bound(flag("maybe"), 0), json!("maybe"));

        let seats = Variable::new("seats", VarType::Scalar(ScalarType::Int), json!("12"))
            .with_transform(Transform::Integer);
        assert_eq!(bound(seats, 0), json!(12));

        let weight = Variable::new("weight", VarType::Scalar(ScalarType::Float), json!("1.25"))
            .with_transform(Transform::Float);
        assert_eq!(bound(weight, 0), json!(1.25));
    }

    #[test]
    fn test_boolean_strings_are_coerced() {
        let variable = Variable::new(
            "isActive",
            VarType::List(ScalarType::Boolean),
            json!(["true", "false"]),
        )
        .with_transform(Transform::BoolList);
        assert_eq!(bound(variable, 0), json!([true, false]));
    }

    #[test]
    fn test_ids_and_numbers() {
        assert_eq!(bound(Variable::id("id", "42"), 0), json!(42));
        assert_eq!(bound(Variable::id("id", "abc-1"), 0), json!("abc-1"));

        let ids = Variable::new("customers", VarType::List(ScalarType::Id), json!(["1", "x"]))
            .with_transform(Transform::IdList);
        assert_eq!(bound(ids, 0), json!([1, "x"]));

        let min = Variable::new("fuelMin", VarType::Scalar(ScalarType::Float), json!("10.5"))
            .with_transform(Transform::Float);
        assert_eq!(bound(min, 0), json!(10.5));
    }

    #[test]
    fn test_single_sort_becomes_a_list() {
        let sort = Variable::new("sort", VarType::List(ScalarType::String), json!("name:asc"))
            .with_transform(Transform::SortList);
        assert_eq!(bound(sort, 0), json!(["name:asc"]));

        let many = Variable::new(
            "sort",
            VarType::List(ScalarType::String),
            json!(["name:asc", "id:desc"]),
        )
        .with_transform(Transform::SortList);
        assert_eq!(bound(many, 0), json!(["name:asc", "id:desc"]));
    }
}
