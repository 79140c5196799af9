//! Query assembler
//!
//! Wraps filter fragments in the standard envelope of each operation kind and
//! renders one GraphQL document. Every read path is scoped to the tenant
//! (`organizationId: { eq: $organizationId }`) and skips soft-deleted rows
//! (`publishedAt: { ne: null }`).

use serde_json::{Map, Value as JsonValue};

use super::builder::build_fragments;
use super::fragment::{Fragment, ScalarType, Transform, VarType, Variable, render_object};
use super::normalize::normalize;
use crate::graphql::filters::{FilterSpec, SortValue};
use crate::graphql::schema::EntitySchema;

const MAX_PAGE: u32 = i32::MAX as u32;

/// Variables declared by the list envelope rather than by filter fragments
pub const ENVELOPE_VARIABLES: &[&str] = &["organizationId", "page", "pageSize", "sort"];

const PAGINATION_SELECTION: &str = "meta { pagination { page pageSize pageCount total } }";
const MUTATION_SELECTION: &str = "id updatedAt";

/// Tenant and paging settings applied to every compiled operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub organization_id: i64,
    pub default_page_size: u32,
    pub max_page_size: u32,
    /// Offset of the users' calendar from UTC, used to widen dates to full days
    pub utc_offset_minutes: i32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            organization_id: 1,
            default_page_size: 10,
            max_page_size: 100,
            utc_offset_minutes: 0,
        }
    }
}

impl CompileOptions {
    pub fn for_organization(organization_id: i64) -> Self {
        Self {
            organization_id,
            ..Default::default()
        }
    }
}

/// Kind of operation a document performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    List,
    Single,
    /// Reads `updatedAt` before a write
    ExclusivityProbe,
    /// Looks for another row with the same unique value
    UniquenessProbe,
    Create,
    Update,
    SoftDelete,
}

impl OperationKind {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            OperationKind::Create | OperationKind::Update | OperationKind::SoftDelete
        )
    }
}

/// A rendered document and the variables it declares
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub kind: OperationKind,
    /// Collection the document addresses, e.g. `trailerTypes`
    pub entity: &'static str,
    pub operation_name: String,
    pub document: String,
    pub variables: Vec<Variable>,
}

impl CompiledQuery {
    /// Names of every declared variable, in declaration order
    pub fn declared(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    /// Declared variables that come from filter fragments
    pub fn filter_variables(&self) -> Vec<&str> {
        self.declared()
            .into_iter()
            .filter(|name| !ENVELOPE_VARIABLES.contains(name))
            .collect()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

fn render_operation(keyword: &str, name: &str, variables: &[Variable], body: &str) -> String {
    debug_assert!(
        variables
            .iter()
            .enumerate()
            .all(|(i, v)| variables[..i].iter().all(|w| w.name != v.name)),
        "duplicate variable declaration in {}",
        name
    );
    let declarations: Vec<String> = variables.iter().map(Variable::declaration).collect();
    if declarations.is_empty() {
        format!("{} {} {{\n{}\n}}", keyword, name, body)
    } else {
        format!(
            "{} {}({}) {{\n{}\n}}",
            keyword,
            name,
            declarations.join(", "),
            body
        )
    }
}

fn organization_variable(options: &CompileOptions) -> Variable {
    Variable::new(
        "organizationId",
        VarType::Scalar(ScalarType::Int),
        JsonValue::from(options.organization_id),
    )
    .required()
}

/// Tenant scope and soft-delete guard shared by every read
fn read_scope(options: &CompileOptions) -> Vec<Fragment> {
    vec![
        Fragment::equals(&["organizationId"], organization_variable(options)),
        Fragment::not_null(&["publishedAt"]),
    ]
}

/// Render `fragments` as one filter object and collect their variables
fn filter_object(fragments: Vec<Fragment>) -> (String, Vec<Variable>) {
    match Fragment::all(fragments) {
        Some(fragment) => {
            let (clause, variables) = fragment.into_parts();
            (render_object(vec![clause]), variables)
        }
        None => ("{}".to_string(), Vec::new()),
    }
}

fn resolve_sort(schema: &EntitySchema, spec: &FilterSpec, field_sorts: Vec<String>) -> JsonValue {
    if let Some(sort) = &spec.sort {
        return match sort {
            SortValue::One(value) => JsonValue::String(value.clone()),
            SortValue::Many(values) => JsonValue::from(values.clone()),
        };
    }
    if !field_sorts.is_empty() {
        return JsonValue::from(field_sorts);
    }
    JsonValue::from(
        schema
            .default_sort
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>(),
    )
}

/// Compile a list query: normalize, build fragments, assemble.
pub fn compile_list(
    schema: &'static EntitySchema,
    spec: &FilterSpec,
    options: &CompileOptions,
) -> CompiledQuery {
    let spec = normalize(spec);
    let built = build_fragments(schema, &spec);

    let mut fragments = read_scope(options);
    fragments.extend(built.fragments);
    let (filters, mut variables) = filter_object(fragments);

    // `$page` is a 32-bit GraphQL Int
    let page = spec.pagination.page.unwrap_or(1).clamp(1, MAX_PAGE);
    let page_size = spec
        .pagination
        .page_size
        .unwrap_or(options.default_page_size)
        .clamp(1, options.max_page_size.max(1));
    let envelope = [
        Variable::new("page", VarType::Scalar(ScalarType::Int), JsonValue::from(page)),
        Variable::new(
            "pageSize",
            VarType::Scalar(ScalarType::Int),
            JsonValue::from(page_size),
        ),
        Variable::new(
            "sort",
            VarType::List(ScalarType::String),
            resolve_sort(schema, &spec, built.field_sorts),
        )
        .with_transform(Transform::SortList),
    ];
    // organizationId stays first, the paging variables follow it
    variables.splice(1..1, envelope);

    let body = format!(
        "  {}(\n    pagination: {{ page: $page, pageSize: $pageSize }}\n    sort: $sort\n    filters: {}\n  ) {{\n    data {{ {} }}\n    {}\n  }}",
        schema.plural, filters, schema.selection, PAGINATION_SELECTION
    );
    let operation_name = schema.plural_type_name();

    CompiledQuery {
        kind: OperationKind::List,
        entity: schema.plural,
        document: render_operation("query", &operation_name, &variables, &body),
        operation_name,
        variables,
    }
}

fn compile_by_id(
    schema: &'static EntitySchema,
    kind: OperationKind,
    operation_name: String,
    id: &str,
    selection: &str,
    options: &CompileOptions,
) -> CompiledQuery {
    let mut fragments = vec![Fragment::equals(&["id"], Variable::id("id", id).required())];
    fragments.extend(read_scope(options));
    let (filters, variables) = filter_object(fragments);

    let body = format!(
        "  {}(filters: {}) {{\n    data {{ {} }}\n  }}",
        schema.plural, filters, selection
    );

    CompiledQuery {
        kind,
        entity: schema.plural,
        document: render_operation("query", &operation_name, &variables, &body),
        operation_name,
        variables,
    }
}

/// Compile a tenant-scoped read of one entity by id
pub fn compile_single(
    schema: &'static EntitySchema,
    id: &str,
    options: &CompileOptions,
) -> CompiledQuery {
    compile_by_id(
        schema,
        OperationKind::Single,
        schema.singular.to_string(),
        id,
        schema.selection,
        options,
    )
}

/// Compile the `updatedAt` read used by the optimistic-concurrency check
pub fn compile_exclusivity_probe(
    schema: &'static EntitySchema,
    id: &str,
    options: &CompileOptions,
) -> CompiledQuery {
    compile_by_id(
        schema,
        OperationKind::ExclusivityProbe,
        format!("{}UpdatedAt", schema.singular),
        id,
        MUTATION_SELECTION,
        options,
    )
}

/// Compile a lookup for another live row whose `field` equals `value`
/// (case-insensitive). `exclude_id` skips the row being updated.
pub fn compile_uniqueness_probe(
    schema: &'static EntitySchema,
    field: &str,
    value: &str,
    exclude_id: Option<&str>,
    options: &CompileOptions,
) -> CompiledQuery {
    let mut fragments = read_scope(options);
    fragments.push(Fragment::equals_ignore_case(
        &[field],
        Variable::string(field, value),
    ));
    if let Some(id) = exclude_id {
        fragments.push(Fragment::not_equals(&["id"], Variable::id("excludeId", id)));
    }
    let (filters, variables) = filter_object(fragments);

    let body = format!(
        "  {}(pagination: {{ pageSize: 1 }}, filters: {}) {{\n    data {{ id }}\n  }}",
        schema.plural, filters
    );
    let operation_name = format!("{}Exists", schema.singular);

    CompiledQuery {
        kind: OperationKind::UniquenessProbe,
        entity: schema.plural,
        document: render_operation("query", &operation_name, &variables, &body),
        operation_name,
        variables,
    }
}

fn data_variable(schema: &EntitySchema, data: Map<String, JsonValue>) -> Variable {
    Variable::new(
        "data",
        VarType::Input(schema.input_type()),
        JsonValue::Object(data),
    )
    .required()
}

/// Compile `create<Entity>(data: $data)`
pub fn compile_create(
    schema: &'static EntitySchema,
    data: Map<String, JsonValue>,
) -> CompiledQuery {
    let variables = vec![data_variable(schema, data)];
    let mutation = schema.create_mutation();
    let body = format!(
        "  {}(data: $data) {{\n    data {{ {} }}\n  }}",
        mutation, MUTATION_SELECTION
    );
    let operation_name = format!("Create{}", schema.singular);

    CompiledQuery {
        kind: OperationKind::Create,
        entity: schema.plural,
        document: render_operation("mutation", &operation_name, &variables, &body),
        operation_name,
        variables,
    }
}

fn compile_update_with(
    schema: &'static EntitySchema,
    kind: OperationKind,
    operation_name: String,
    id: &str,
    data: Map<String, JsonValue>,
) -> CompiledQuery {
    let variables = vec![Variable::id("id", id).required(), data_variable(schema, data)];
    let body = format!(
        "  {}(id: $id, data: $data) {{\n    data {{ {} }}\n  }}",
        schema.update_mutation(),
        MUTATION_SELECTION
    );

    CompiledQuery {
        kind,
        entity: schema.plural,
        document: render_operation("mutation", &operation_name, &variables, &body),
        operation_name,
        variables,
    }
}

/// Compile `update<Entity>(id: $id, data: $data)`
pub fn compile_update(
    schema: &'static EntitySchema,
    id: &str,
    data: Map<String, JsonValue>,
) -> CompiledQuery {
    compile_update_with(
        schema,
        OperationKind::Update,
        format!("Update{}", schema.singular),
        id,
        data,
    )
}

/// Compile a soft delete: an update that clears `publishedAt`
pub fn compile_soft_delete(
    schema: &'static EntitySchema,
    id: &str,
    mut data: Map<String, JsonValue>,
) -> CompiledQuery {
    data.insert("publishedAt".to_string(), JsonValue::Null);
    compile_update_with(
        schema,
        OperationKind::SoftDelete,
        format!("Delete{}", schema.singular),
        id,
        data,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::filters::{FieldFilter, SortDirection};
    use crate::graphql::orm::bind;
    use crate::graphql::schema::{FieldDef, FilterKind, KeywordSearch};
    use pretty_assertions::assert_eq;

    static UNITS: EntitySchema = EntitySchema {
        plural: "unitOfMeasures",
        singular: "UnitOfMeasure",
        keyword: KeywordSearch {
            paths: &[&["code"], &["name"]],
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
                "type",
                FilterKind::InSet {
                    path: &["type"],
                    scalar: ScalarType::String,
                },
            ),
        ],
        selection: "id code name type updatedAt",
        default_sort: &["code:asc"],
        unique_fields: &["code"],
    };

    #[test]
    fn test_list_document_layout() {
        let compiled = compile_list(
            &UNITS,
            &FilterSpec::new().page(2, 20),
            &CompileOptions::for_organization(7),
        );

        assert_eq!(
            compiled.document,
            "query UnitOfMeasures($organizationId: Int!, $page: Int, $pageSize: Int, $sort: [String]) {\n\
             \x20 unitOfMeasures(\n\
             \x20   pagination: { page: $page, pageSize: $pageSize }\n\
             \x20   sort: $sort\n\
             \x20   filters: { organizationId: { eq: $organizationId }, publishedAt: { ne: null } }\n\
             \x20 ) {\n\
             \x20   data { id code name type updatedAt }\n\
             \x20   meta { pagination { page pageSize pageCount total } }\n\
             \x20 }\n\
             }"
        );
        assert_eq!(compiled.declared(), vec!["organizationId", "page", "pageSize", "sort"]);
        assert!(compiled.filter_variables().is_empty());
    }

    #[test]
    fn test_list_page_size_defaults_and_clamps() {
        let options = CompileOptions {
            default_page_size: 15,
            max_page_size: 50,
            ..Default::default()
        };
        let compiled = compile_list(&UNITS, &FilterSpec::new(), &options);
        assert_eq!(compiled.variable("page").unwrap().value, JsonValue::from(1));
        assert_eq!(compiled.variable("pageSize").unwrap().value, JsonValue::from(15));

        let compiled = compile_list(&UNITS, &FilterSpec::new().page(0, 500), &options);
        assert_eq!(compiled.variable("page").unwrap().value, JsonValue::from(1));
        assert_eq!(compiled.variable("pageSize").unwrap().value, JsonValue::from(50));
    }

    #[test]
    fn test_page_fits_a_graphql_int() {
        let options = CompileOptions::default();
        let compiled = compile_list(&UNITS, &FilterSpec::new().page(u32::MAX, 10), &options);
        assert_eq!(
            compiled.variable("page").unwrap().value,
            JsonValue::from(i32::MAX)
        );

        let params = bind(&compiled, &options);
        assert_eq!(params["page"], JsonValue::from(2_147_483_647));
    }

    #[test]
    fn test_sort_precedence() {
        let options = CompileOptions::default();

        let compiled = compile_list(&UNITS, &FilterSpec::new(), &options);
        assert_eq!(
            compiled.variable("sort").unwrap().value,
            serde_json::json!(["code:asc"])
        );

        let spec = FilterSpec::new().field("name", FieldFilter::sorted(SortDirection::Desc));
        let compiled = compile_list(&UNITS, &spec, &options);
        assert_eq!(
            compiled.variable("sort").unwrap().value,
            serde_json::json!(["name:desc"])
        );

        let spec = spec.sort(SortValue::One("type:asc".into()));
        let compiled = compile_list(&UNITS, &spec, &options);
        assert_eq!(compiled.variable("sort").unwrap().value, serde_json::json!("type:asc"));
        assert_eq!(compiled.variable("sort").unwrap().transform, Transform::SortList);
    }

    #[test]
    fn test_keywords_across_two_paths_share_one_variable() {
        let spec = FilterSpec::new()
            .keywords("kg")
            .field("name", FieldFilter::value("kilo"))
            .field("type", FieldFilter::any_of(["WEIGHT"]));
        let compiled = compile_list(&UNITS, &spec, &CompileOptions::default());

        assert_eq!(compiled.filter_variables(), vec!["keywords", "name", "type"]);
        assert!(compiled.document.contains(
            "or: [{ code: { containsi: $keywords } }, { name: { containsi: $keywords } }, \
             { name: { containsi: $name } }]"
        ));
        assert!(compiled.document.contains("type: { in: $type }"));
    }

    #[test]
    fn test_single_and_probe_documents() {
        let options = CompileOptions::default();

        let single = compile_single(&UNITS, "5", &options);
        assert_eq!(single.kind, OperationKind::Single);
        assert_eq!(single.declared(), vec!["id", "organizationId"]);
        assert!(
            single
                .document
                .starts_with("query UnitOfMeasure($id: ID!, $organizationId: Int!)")
        );
        assert!(single.document.contains(
            "filters: { id: { eq: $id }, organizationId: { eq: $organizationId }, \
             publishedAt: { ne: null } }"
        ));

        let probe = compile_exclusivity_probe(&UNITS, "5", &options);
        assert!(probe.document.contains("data { id updatedAt }"));

        let unique = compile_uniqueness_probe(&UNITS, "code", "KG", None, &options);
        assert_eq!(unique.declared(), vec!["organizationId", "code"]);
        assert!(unique.document.contains("code: { eqi: $code }"));

        let unique = compile_uniqueness_probe(&UNITS, "code", "KG", Some("5"), &options);
        assert_eq!(unique.declared(), vec!["organizationId", "code", "excludeId"]);
        assert!(unique.document.contains("id: { ne: $excludeId }"));
    }

    #[test]
    fn test_mutation_documents() {
        let mut data = Map::new();
        data.insert("code".into(), JsonValue::from("KG"));

        let create = compile_create(&UNITS, data.clone());
        assert!(create.kind.is_mutation());
        assert_eq!(
            create.document,
            "mutation CreateUnitOfMeasure($data: UnitOfMeasureInput!) {\n\
             \x20 createUnitOfMeasure(data: $data) {\n\
             \x20   data { id updatedAt }\n\
             \x20 }\n\
             }"
        );

        let update = compile_update(&UNITS, "3", data.clone());
        assert!(update.document.contains("updateUnitOfMeasure(id: $id, data: $data)"));
        assert_eq!(update.declared(), vec!["id", "data"]);

        let delete = compile_soft_delete(&UNITS, "3", Map::new());
        assert_eq!(delete.operation_name, "DeleteUnitOfMeasure");
        assert_eq!(
            delete.variable("data").unwrap().value,
            serde_json::json!({ "publishedAt": null })
        );
    }
}
