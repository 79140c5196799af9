//! In-process GraphQL endpoint
//!
//! [`MemoryBackend`] answers the documents produced by the compiler the way
//! the real backend does: it parses the document, rejects undeclared or
//! unused variables, evaluates Strapi-style `filters`, sorts, paginates and
//! projects the selection set. `create<Entity>` and `update<Entity>` mutations
//! modify the stored rows. Every request is recorded for inspection.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

use async_graphql::parser::parse_query;
use async_graphql::parser::types::{Field, OperationType, Selection, SelectionSet};
use async_graphql_value::{ConstValue, Name};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use parking_lot::{Mutex, RwLock};
use reqwest::StatusCode;
use serde_json::{Map, Value as JsonValue, json};

use super::client::{ClientError, GraphqlRequest, GraphqlResponse, GraphqlTransport};
use crate::graphql::entities::EntityId;
use crate::graphql::orm::inspect;
use crate::graphql::pagination::PaginationEnvelope;
use crate::graphql::schema::EntitySchema;

const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Default)]
struct Collection {
    singular: String,
    rows: Vec<Map<String, JsonValue>>,
    next_id: i64,
}

/// In-memory stand-in for the GraphQL backend
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, Collection>>,
    requests: Mutex<Vec<GraphqlRequest>>,
    forced_status: Mutex<Option<StatusCode>>,
    epoch: DateTime<Utc>,
    clock: AtomicI64,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Error returned in the `errors` array of a response
struct ResolveError(String);

type Resolved<T> = Result<T, ResolveError>;

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            forced_status: Mutex::new(None),
            epoch: Utc::now(),
            clock: AtomicI64::new(0),
        }
    }

    /// Serve the collection described by `schema`
    pub fn register(&self, schema: &EntitySchema) -> &Self {
        self.collections
            .write()
            .entry(schema.plural.to_string())
            .or_insert_with(|| Collection {
                singular: schema.singular.to_string(),
                rows: Vec::new(),
                next_id: 1,
            });
        self
    }

    /// Next strictly increasing timestamp
    fn stamp(&self) -> String {
        let tick = self.clock.fetch_add(1, AtomicOrdering::SeqCst);
        (self.epoch + TimeDelta::milliseconds(tick)).to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Store a row as is. A missing `id` is assigned, missing `publishedAt`
    /// and `updatedAt` are set to now.
    ///
    /// # Panics
    ///
    /// Panics if `plural` was not registered or `row` is not an object.
    pub fn insert(&self, plural: &str, row: JsonValue) -> EntityId {
        let JsonValue::Object(mut row) = row else {
            panic!("rows must be JSON objects");
        };
        let now = JsonValue::String(self.stamp());
        let mut collections = self.collections.write();
        let collection = collections
            .get_mut(plural)
            .unwrap_or_else(|| panic!("collection {} is not registered", plural));

        let id = match row.get("id") {
            Some(JsonValue::Number(n)) => {
                if let Some(n) = n.as_i64() {
                    collection.next_id = collection.next_id.max(n + 1);
                }
                n.to_string()
            }
            Some(JsonValue::String(s)) => s.clone(),
            _ => {
                let id = collection.next_id;
                collection.next_id += 1;
                row.insert("id".to_string(), JsonValue::from(id));
                id.to_string()
            }
        };
        row.entry("publishedAt").or_insert_with(|| now.clone());
        row.entry("updatedAt").or_insert(now);
        collection.rows.push(row);
        EntityId(id)
    }

    /// Current stored row, soft-deleted or not
    pub fn row(&self, plural: &str, id: &str) -> Option<JsonValue> {
        self.collections.read().get(plural).and_then(|c| {
            c.rows
                .iter()
                .find(|row| id_matches(row, id))
                .map(|row| JsonValue::Object(row.clone()))
        })
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<GraphqlRequest> {
        self.requests.lock().clone()
    }

    /// Number of mutation documents received
    pub fn mutation_count(&self) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.query.trim_start().starts_with("mutation"))
            .count()
    }

    /// Answer every following request with `status` and no data
    pub fn force_status(&self, status: Option<StatusCode>) {
        *self.forced_status.lock() = status;
    }

    /// Resolve one request without going through the transport trait
    pub fn handle(&self, request: &GraphqlRequest) -> GraphqlResponse {
        self.requests.lock().push(request.clone());

        if let Some(status) = *self.forced_status.lock() {
            return GraphqlResponse {
                status,
                body: json!({ "errors": [{ "message": "forced failure" }] }),
            };
        }

        match self.resolve(request) {
            Ok(data) => GraphqlResponse::ok(json!({ "data": data })),
            Err((status, ResolveError(message))) => {
                tracing::debug!(%status, %message, "Memory backend rejected request");
                GraphqlResponse {
                    status,
                    body: json!({ "data": null, "errors": [{ "message": message }] }),
                }
            }
        }
    }

    fn resolve(&self, request: &GraphqlRequest) -> Result<JsonValue, (StatusCode, ResolveError)> {
        let bad_request = |message: String| (StatusCode::BAD_REQUEST, ResolveError(message));

        let document = parse_query(&request.query).map_err(|e| bad_request(e.to_string()))?;
        let usage = inspect(&request.query).map_err(|e| bad_request(e.to_string()))?;
        if let Some(name) = usage.undeclared().first() {
            return Err(bad_request(format!("Variable \"${}\" is not defined.", name)));
        }
        if let Some(name) = usage.unused().first() {
            return Err(bad_request(format!("Variable \"${}\" is never used.", name)));
        }
        for (name, ty) in &usage.declared {
            let missing = request.params.get(name).is_none_or(JsonValue::is_null);
            if ty.ends_with('!') && missing {
                return Err(bad_request(format!(
                    "Variable \"${}\" of required type \"{}\" was not provided.",
                    name, ty
                )));
            }
        }

        let Some((_, operation)) = document.operations.iter().next() else {
            return Err(bad_request("Document contains no operation".to_string()));
        };
        let is_mutation = operation.node.ty == OperationType::Mutation;

        let mut data = Map::new();
        for item in &operation.node.selection_set.node.items {
            let Selection::Field(field) = &item.node else {
                continue;
            };
            let key = field.node.response_key().node.to_string();
            let value = self
                .resolve_root_field(&field.node, &request.params, is_mutation)
                .map_err(|e| (StatusCode::OK, e))?;
            data.insert(key, value);
        }
        Ok(JsonValue::Object(data))
    }

    fn resolve_root_field(
        &self,
        field: &Field,
        params: &Map<String, JsonValue>,
        is_mutation: bool,
    ) -> Resolved<JsonValue> {
        let name = field.name.node.as_str();
        let args = arguments(field, params)?;

        if !is_mutation {
            let collections = self.collections.read();
            let collection = collections.get(name).ok_or_else(|| {
                ResolveError(format!("Cannot query field \"{}\" on type \"Query\".", name))
            })?;
            let result = query_collection(collection, &args)?;
            return Ok(project(&result, &field.selection_set.node));
        }

        let mut collections = self.collections.write();
        let Some((plural, create)) = collections.iter().find_map(|(plural, c)| {
            if name == format!("create{}", c.singular) {
                Some((plural.clone(), true))
            } else if name == format!("update{}", c.singular) {
                Some((plural.clone(), false))
            } else {
                None
            }
        }) else {
            return Err(ResolveError(format!(
                "Cannot query field \"{}\" on type \"Mutation\".",
                name
            )));
        };
        let stamp = self.stamp();
        let Some(collection) = collections.get_mut(&plural) else {
            return Err(ResolveError(format!("Unknown collection {}", plural)));
        };

        let data = match args.get("data") {
            Some(JsonValue::Object(data)) => data.clone(),
            _ => return Err(ResolveError("Argument \"data\" must be an object.".to_string())),
        };

        let row = if create {
            let mut row = data;
            row.insert("id".to_string(), JsonValue::from(collection.next_id));
            collection.next_id += 1;
            row.insert("createdAt".to_string(), JsonValue::String(stamp.clone()));
            row.insert("updatedAt".to_string(), JsonValue::String(stamp));
            collection.rows.push(row.clone());
            Some(row)
        } else {
            let id = args.get("id").map(scalar_text).unwrap_or_default();
            collection.rows.iter_mut().find(|row| id_matches(row, &id)).map(|row| {
                for (key, value) in data {
                    row.insert(key, value);
                }
                row.insert("updatedAt".to_string(), JsonValue::String(stamp));
                row.clone()
            })
        };

        let payload = json!({ "data": row.map(JsonValue::Object) });
        Ok(project(&payload, &field.selection_set.node))
    }
}

#[async_trait]
impl GraphqlTransport for MemoryBackend {
    async fn execute(&self, request: &GraphqlRequest) -> Result<GraphqlResponse, ClientError> {
        Ok(self.handle(request))
    }
}

// ============================================================================
// Arguments
// ============================================================================

/// Resolve field arguments to JSON, substituting variables from `params`
fn arguments(field: &Field, params: &Map<String, JsonValue>) -> Resolved<Map<String, JsonValue>> {
    let mut args = Map::new();
    for (name, value) in &field.arguments {
        let resolved = value
            .node
            .clone()
            .into_const_with(|var: Name| -> Result<ConstValue, ResolveError> {
                match params.get(var.as_str()) {
                    Some(json) => ConstValue::from_json(json.clone())
                        .map_err(|e| ResolveError(e.to_string())),
                    None => Ok(ConstValue::Null),
                }
            })?;
        let json = resolved
            .into_json()
            .map_err(|e| ResolveError(e.to_string()))?;
        args.insert(name.node.to_string(), json);
    }
    Ok(args)
}

fn scalar_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn id_matches(row: &Map<String, JsonValue>, id: &str) -> bool {
    row.get("id").is_some_and(|value| scalar_text(value) == id)
}

// ============================================================================
// Query evaluation
// ============================================================================

fn query_collection(collection: &Collection, args: &Map<String, JsonValue>) -> Resolved<JsonValue> {
    let filters = args.get("filters").cloned().unwrap_or(JsonValue::Null);
    let mut rows: Vec<&Map<String, JsonValue>> = collection
        .rows
        .iter()
        .filter(|row| matches_filter(row, &filters))
        .collect();

    let sort_keys: Vec<String> = match args.get("sort") {
        Some(JsonValue::String(s)) => vec![s.clone()],
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    if !sort_keys.is_empty() {
        rows.sort_by(|a, b| compare_rows(a, b, &sort_keys));
    }

    let pagination = args.get("pagination");
    let page_arg = |key: &str| {
        pagination
            .and_then(|p| p.get(key))
            .and_then(JsonValue::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    };
    let meta = PaginationEnvelope::compute(
        page_arg("page").unwrap_or(1),
        page_arg("pageSize").unwrap_or(DEFAULT_PAGE_SIZE),
        rows.len() as u64,
    );

    let data: Vec<JsonValue> = rows
        .into_iter()
        .skip(meta.offset())
        .take(meta.page_size as usize)
        .map(|row| JsonValue::Object(row.clone()))
        .collect();

    Ok(json!({ "data": data, "meta": { "pagination": meta } }))
}

const OPERATORS: &[&str] = &[
    "eq", "eqi", "ne", "nei", "contains", "containsi", "notContains", "notContainsi", "in",
    "notIn", "gt", "gte", "lt", "lte", "null", "notNull", "startsWith", "endsWith", "between",
];

/// Evaluate a filter object against a row (or a related object)
fn matches_filter(row: &Map<String, JsonValue>, filter: &JsonValue) -> bool {
    let Some(filter) = filter.as_object() else {
        return true;
    };
    filter.iter().all(|(key, condition)| match key.as_str() {
        "and" => as_list(condition).iter().all(|c| matches_filter(row, c)),
        "or" => {
            let branches = as_list(condition);
            branches.is_empty() || branches.iter().any(|c| matches_filter(row, c))
        }
        "not" => !matches_filter(row, condition),
        field => matches_field(row.get(field).unwrap_or(&JsonValue::Null), condition),
    })
}

fn as_list(value: &JsonValue) -> Vec<JsonValue> {
    match value {
        JsonValue::Array(items) => items.clone(),
        JsonValue::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

fn matches_field(value: &JsonValue, condition: &JsonValue) -> bool {
    let Some(condition) = condition.as_object() else {
        return loose_eq(value, condition);
    };

    condition.iter().all(|(key, operand)| {
        if OPERATORS.contains(&key.as_str()) {
            match value {
                // to-many relation or list field: any element satisfies
                JsonValue::Array(items) if !matches!(key.as_str(), "null" | "notNull") => {
                    items.iter().any(|item| apply_operator(key, item, operand))
                }
                _ => apply_operator(key, value, operand),
            }
        } else {
            let mut nested = Map::new();
            nested.insert(key.clone(), operand.clone());
            let nested = JsonValue::Object(nested);
            match value {
                JsonValue::Object(related) => matches_filter(related, &nested),
                JsonValue::Array(items) => items
                    .iter()
                    .filter_map(JsonValue::as_object)
                    .any(|related| matches_filter(related, &nested)),
                _ => false,
            }
        }
    })
}

fn apply_operator(op: &str, value: &JsonValue, operand: &JsonValue) -> bool {
    let text = || scalar_text(value).to_lowercase();
    let needle = || scalar_text(operand).to_lowercase();
    match op {
        "eq" => loose_eq(value, operand),
        "ne" => !loose_eq(value, operand),
        "eqi" => !value.is_null() && text() == needle(),
        "nei" => value.is_null() || text() != needle(),
        "contains" => !value.is_null() && scalar_text(value).contains(&scalar_text(operand)),
        "containsi" => !value.is_null() && text().contains(&needle()),
        "notContains" => value.is_null() || !scalar_text(value).contains(&scalar_text(operand)),
        "notContainsi" => value.is_null() || !text().contains(&needle()),
        "startsWith" => !value.is_null() && scalar_text(value).starts_with(&scalar_text(operand)),
        "endsWith" => !value.is_null() && scalar_text(value).ends_with(&scalar_text(operand)),
        "in" => as_list(operand).iter().any(|o| loose_eq(value, o)),
        "notIn" => !as_list(operand).iter().any(|o| loose_eq(value, o)),
        "gt" => compare_values(value, operand) == Some(Ordering::Greater),
        "gte" => matches!(
            compare_values(value, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        "lt" => compare_values(value, operand) == Some(Ordering::Less),
        "lte" => matches!(
            compare_values(value, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        "between" => match operand.as_array().map(Vec::as_slice) {
            Some([low, high]) => {
                apply_operator("gte", value, low) && apply_operator("lte", value, high)
            }
            _ => false,
        },
        "null" => value.is_null() == operand.as_bool().unwrap_or(true),
        "notNull" => !value.is_null() == operand.as_bool().unwrap_or(true),
        _ => false,
    }
}

fn as_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Equality that tolerates ids and numbers sent as strings
fn loose_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Null, JsonValue::Null) => true,
        (JsonValue::Null, _) | (_, JsonValue::Null) => false,
        (JsonValue::Number(_), _) | (_, JsonValue::Number(_)) => {
            match (as_number(a), as_number(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (JsonValue::String(x), JsonValue::String(y)) => {
            x == y || compare_values(a, b) == Some(Ordering::Equal)
        }
        _ => a == b,
    }
}

/// Order numbers numerically, timestamps chronologically, other text lexically
fn compare_values(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    if let (JsonValue::String(x), JsonValue::String(y)) = (a, b) {
        if let (Ok(x), Ok(y)) = (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
            return Some(x.cmp(&y));
        }
        return Some(x.cmp(y));
    }
    match (a, b) {
        (JsonValue::Bool(x), JsonValue::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn lookup_path<'a>(row: &'a Map<String, JsonValue>, path: &str) -> Option<&'a JsonValue> {
    let mut segments = path.split('.');
    let mut current = row.get(segments.next()?)?;
    for segment in segments {
        current = current.get(segment)?;
    }
    Some(current)
}

fn compare_rows(
    a: &Map<String, JsonValue>,
    b: &Map<String, JsonValue>,
    keys: &[String],
) -> Ordering {
    for key in keys {
        let (path, descending) = match key.rsplit_once(':') {
            Some((path, dir)) => (path, dir.eq_ignore_ascii_case("desc")),
            None => (key.as_str(), false),
        };
        let ordering = match (lookup_path(a, path), lookup_path(b, path)) {
            (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        let ordering = if descending { ordering.reverse() } else { ordering };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

// ============================================================================
// Projection
// ============================================================================

/// Keep only the fields named by `selection`
fn project(value: &JsonValue, selection: &SelectionSet) -> JsonValue {
    if selection.items.is_empty() {
        return value.clone();
    }
    match value {
        JsonValue::Array(items) => {
            JsonValue::Array(items.iter().map(|item| project(item, selection)).collect())
        }
        JsonValue::Object(object) => {
            let mut out = Map::new();
            for item in &selection.items {
                match &item.node {
                    Selection::Field(field) => {
                        let inner = object
                            .get(field.node.name.node.as_str())
                            .unwrap_or(&JsonValue::Null);
                        out.insert(
                            field.node.response_key().node.to_string(),
                            project(inner, &field.node.selection_set.node),
                        );
                    }
                    Selection::InlineFragment(fragment) => {
                        let nested = project(value, &fragment.node.selection_set.node);
                        if let JsonValue::Object(nested) = nested {
                            out.extend(nested);
                        }
                    }
                    Selection::FragmentSpread(_) => {}
                }
            }
            JsonValue::Object(out)
        }
        other => other.clone(),
    }
}
