//! Repository flows against the in-memory backend

use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::{Map, Value as JsonValue, json};

use freightline::graphql::entities::advance::{self, Advance, AdvanceStatus};
use freightline::graphql::entities::trailer_type::{self, TrailerType};
use freightline::graphql::entities::unit_of_measure::{self, UnitOfMeasure};
use freightline::graphql::entities::{EntityId, driver};
use freightline::graphql::errors::{ErrorType, MutationError};
use freightline::graphql::filters::{FieldFilter, FilterSpec, SortDirection};
use freightline::graphql::orm::{CompileOptions, Repository, bind};
use freightline::services::client::ClientError;
use freightline::services::memory::MemoryBackend;

const ORG: i64 = 7;

fn options() -> CompileOptions {
    CompileOptions::for_organization(ORG)
}

fn data(value: JsonValue) -> Map<String, JsonValue> {
    value.as_object().cloned().unwrap()
}

fn trailer_backend() -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend.register(&trailer_type::SCHEMA);
    backend.insert(
        "trailerTypes",
        json!({
            "id": 42,
            "name": "Flatbed",
            "organizationId": ORG,
            "updatedAt": "2024-03-01T10:00:00.000Z"
        }),
    );
    backend.insert(
        "trailerTypes",
        json!({ "id": 43, "name": "Box 42ft", "organizationId": ORG }),
    );
    backend.insert(
        "trailerTypes",
        json!({ "id": 44, "name": "Reefer", "organizationId": 8 }),
    );
    backend.insert(
        "trailerTypes",
        json!({ "id": 45, "name": "Lowboy", "organizationId": ORG, "publishedAt": null }),
    );
    backend
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_numeric_keyword_finds_entity_by_id() {
    let backend = MemoryBackend::new();
    backend.register(&trailer_type::SCHEMA);
    backend.insert(
        "trailerTypes",
        json!({ "id": 42, "name": "Flatbed", "organizationId": ORG }),
    );
    backend.insert(
        "trailerTypes",
        json!({ "id": 7, "name": "Curtainsider", "organizationId": ORG }),
    );

    let repository = Repository::new(&backend, &trailer_type::SCHEMA, options());
    let spec = FilterSpec::new().keywords("42").page(1, 10);

    let compiled = repository.compile_list(&spec);
    assert!(compiled.document.contains(
        "or: [{ id: { eq: $keywordId } }, { name: { containsi: $keywordName } }]"
    ));
    let params = bind(&compiled, &options());
    assert_eq!(params["keywordId"], json!(42));
    assert_eq!(params["keywordName"], json!("42"));
    assert_eq!(params["page"], json!(1));
    assert_eq!(params["pageSize"], json!(10));

    let result = repository.list::<TrailerType>(&spec).await.unwrap();
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].id, EntityId::from("42"));
    assert_eq!(result.total(), 1);
}

#[tokio::test]
async fn test_list_is_scoped_to_tenant_and_live_rows() {
    let backend = trailer_backend();
    let repository = Repository::new(&backend, &trailer_type::SCHEMA, options());

    let spec = FilterSpec::new().field("name", FieldFilter::sorted(SortDirection::Asc));
    let result = repository.list::<TrailerType>(&spec).await.unwrap();

    let names: Vec<_> = result.items.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["Box 42ft", "Flatbed"]);
    assert_eq!(result.total(), 2);
}

#[tokio::test]
async fn test_text_keyword_or_name() {
    let backend = trailer_backend();
    let repository = Repository::new(&backend, &trailer_type::SCHEMA, options());

    let spec = FilterSpec::new()
        .keywords("flat")
        .field("name", FieldFilter::value("box"));
    let result = repository.list::<TrailerType>(&spec).await.unwrap();

    assert_eq!(result.total(), 2);
}

#[tokio::test]
async fn test_empty_page_keeps_pagination() {
    let backend = trailer_backend();
    let repository = Repository::new(&backend, &trailer_type::SCHEMA, options());

    let spec = FilterSpec::new().keywords("nothing-like-this").page(1, 20);
    let result = repository.list::<TrailerType>(&spec).await.unwrap();

    assert!(result.items.is_empty());
    let pagination = result.pagination.unwrap();
    assert_eq!(
        (pagination.page, pagination.page_size, pagination.page_count, pagination.total),
        (1, 20, 0, 0)
    );
    assert!(!pagination.has_next_page());
}

#[tokio::test]
async fn test_ranges_sets_and_relations() {
    let backend = MemoryBackend::new();
    backend.register(&advance::SCHEMA);
    let rows = [
        (1, 150.0, "PAID", "2024-03-01T09:00:00.000Z", "Ann", "Lee"),
        (2, 80.0, "PENDING", "2024-03-02T09:00:00.000Z", "Bob", "Tru"),
        (3, 300.0, "PAID", "2024-03-05T09:00:00.000Z", "Cid", "Anh"),
    ];
    for (id, amount, status, paid, first, last) in rows {
        backend.insert(
            "advances",
            json!({
                "id": id,
                "amount": amount,
                "status": status,
                "paymentDate": paid,
                "organizationId": ORG,
                "driver": { "id": id + 100, "firstName": first, "lastName": last }
            }),
        );
    }
    let repository = Repository::new(&backend, &advance::SCHEMA, options());

    let spec = FilterSpec::new()
        .field("status", FieldFilter::any_of(["PAID"]))
        .field("paymentDate", FieldFilter::range(Some("2024-03-01"), Some("2024-03-04")))
        .field("amount", FieldFilter::range(Some("100"), None));
    let result = repository.list::<Advance>(&spec).await.unwrap();
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].status, Some(AdvanceStatus::Paid));

    // Ann by first name, Anh by last name
    let spec = FilterSpec::new().field("driverName", FieldFilter::value("an"));
    let result = repository.list::<Advance>(&spec).await.unwrap();
    let ids: Vec<_> = result.items.iter().map(|a| a.id.to_string()).collect();
    assert!(ids.contains(&"1".to_string()));
    assert!(ids.contains(&"3".to_string()));
    assert!(!ids.contains(&"2".to_string()));
}

#[tokio::test]
async fn test_find_by_id() {
    let backend = trailer_backend();
    let repository = Repository::new(&backend, &trailer_type::SCHEMA, options());

    let found = repository.find::<TrailerType>("42").await.unwrap();
    assert_eq!(found.map(|t| t.name), Some("Flatbed".to_string()));

    // other tenant and soft-deleted rows are invisible
    assert!(repository.find::<TrailerType>("44").await.unwrap().is_none());
    assert!(repository.find::<TrailerType>("45").await.unwrap().is_none());
}

#[tokio::test]
async fn test_backend_status_error_surfaces_on_reads() {
    let backend = trailer_backend();
    backend.force_status(Some(StatusCode::SERVICE_UNAVAILABLE));
    let repository = Repository::new(&backend, &trailer_type::SCHEMA, options());

    assert_matches!(
        repository.list::<TrailerType>(&FilterSpec::new()).await,
        Err(ClientError::Status { status, .. }) if status == StatusCode::SERVICE_UNAVAILABLE
    );
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_create_sets_tenant_and_actor() {
    let backend = MemoryBackend::new();
    backend.register(&unit_of_measure::SCHEMA);
    let repository =
        Repository::new(&backend, &unit_of_measure::SCHEMA, options()).with_actor(Some(3));

    let outcome = repository
        .create(data(json!({ "code": "KG", "name": "Kilogram", "type": "WEIGHT" })))
        .await
        .unwrap();

    let row = backend.row("unitOfMeasures", outcome.id.as_str()).unwrap();
    assert_eq!(row["organizationId"], json!(ORG));
    assert_eq!(row["createdById"], json!(3));
    assert!(row["publishedAt"].is_string());

    let listed = repository.list::<UnitOfMeasure>(&FilterSpec::new()).await.unwrap();
    assert_eq!(listed.items.len(), 1);
    assert_eq!(listed.items[0].code, "KG");
}

#[tokio::test]
async fn test_duplicate_value_is_rejected_before_writing() {
    let backend = MemoryBackend::new();
    backend.register(&unit_of_measure::SCHEMA);
    backend.insert(
        "unitOfMeasures",
        json!({ "code": "KG", "name": "Kilogram", "organizationId": ORG }),
    );
    let repository = Repository::new(&backend, &unit_of_measure::SCHEMA, options());

    let err = repository
        .create(data(json!({ "code": "kg", "name": "Kilo" })))
        .await
        .unwrap_err();

    assert_matches!(&err, MutationError::Existed { field, .. } if field == "code");
    assert_eq!(err.error_type(), ErrorType::Existed);
    assert_eq!(backend.mutation_count(), 0);
}

#[tokio::test]
async fn test_same_value_in_other_tenant_is_allowed() {
    let backend = MemoryBackend::new();
    backend.register(&unit_of_measure::SCHEMA);
    backend.insert(
        "unitOfMeasures",
        json!({ "code": "KG", "name": "Kilogram", "organizationId": 99 }),
    );
    let repository = Repository::new(&backend, &unit_of_measure::SCHEMA, options());

    assert!(repository.create(data(json!({ "code": "KG", "name": "Kilogram" }))).await.is_ok());
    assert_eq!(backend.mutation_count(), 1);
}

#[tokio::test]
async fn test_stale_update_is_exclusive_and_not_sent() {
    let backend = trailer_backend();
    let repository = Repository::new(&backend, &trailer_type::SCHEMA, options());

    let err = repository
        .update("42", data(json!({ "name": "Flatbed XL" })), "2024-02-01T10:00:00.000Z")
        .await
        .unwrap_err();

    assert_eq!(err.error_type(), ErrorType::Exclusive);
    assert_eq!(backend.mutation_count(), 0);
    assert_eq!(backend.row("trailerTypes", "42").unwrap()["name"], json!("Flatbed"));
}

#[tokio::test]
async fn test_update_with_current_stamp() {
    let backend = trailer_backend();
    let repository = Repository::new(&backend, &trailer_type::SCHEMA, options());

    // same instant written with an offset still matches
    let outcome = repository
        .update("42", data(json!({ "name": "Flatbed XL" })), "2024-03-01T17:00:00+07:00")
        .await
        .unwrap();

    assert_eq!(outcome.id, EntityId::from("42"));
    let row = backend.row("trailerTypes", "42").unwrap();
    assert_eq!(row["name"], json!("Flatbed XL"));
    assert_ne!(row["updatedAt"], json!("2024-03-01T10:00:00.000Z"));

    // the old stamp is now stale
    let err = repository
        .update("42", data(json!({ "name": "Again" })), "2024-03-01T10:00:00.000Z")
        .await
        .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Exclusive);
}

#[tokio::test]
async fn test_update_keeping_own_unique_value() {
    let backend = trailer_backend();
    let repository = Repository::new(&backend, &trailer_type::SCHEMA, options());

    let result = repository
        .update("42", data(json!({ "name": "FLATBED" })), "2024-03-01T10:00:00.000Z")
        .await;
    assert!(result.is_ok());

    let stamp = backend.row("trailerTypes", "42").unwrap()["updatedAt"]
        .as_str()
        .unwrap()
        .to_string();
    let err = repository
        .update("42", data(json!({ "name": "box 42FT" })), &stamp)
        .await
        .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Existed);
}

#[tokio::test]
async fn test_update_of_missing_row_is_exclusive() {
    let backend = trailer_backend();
    let repository = Repository::new(&backend, &trailer_type::SCHEMA, options());

    let err = repository
        .update("999", data(json!({ "name": "Ghost" })), "2024-03-01T10:00:00.000Z")
        .await
        .unwrap_err();
    assert_matches!(err, MutationError::Exclusive { .. });
}

#[tokio::test]
async fn test_soft_delete_hides_row() {
    let backend = trailer_backend();
    let repository =
        Repository::new(&backend, &trailer_type::SCHEMA, options()).with_actor(Some(5));

    repository.delete("42", "2024-03-01T10:00:00.000Z").await.unwrap();

    let row = backend.row("trailerTypes", "42").unwrap();
    assert!(row["publishedAt"].is_null());
    assert_eq!(row["updatedById"], json!(5));
    assert!(repository.find::<TrailerType>("42").await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_write_is_unknown() {
    let backend = MemoryBackend::new();
    backend.register(&driver::SCHEMA);
    let repository = Repository::new(&backend, &driver::SCHEMA, options());

    // no unique field in the payload, so the create is the first request
    backend.force_status(Some(StatusCode::INTERNAL_SERVER_ERROR));
    let err = repository
        .create(data(json!({ "firstName": "Ann" })))
        .await
        .unwrap_err();
    assert_eq!(err.error_type(), ErrorType::Unknown);
}
