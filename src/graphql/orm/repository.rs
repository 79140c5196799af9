//! Repository over one entity collection
//!
//! Runs the full pipeline (normalize, build, assemble, bind, execute, unwrap)
//! for reads, and the guarded write flows for mutations:
//!
//! - `create`: uniqueness check, then `create<Entity>`
//! - `update`: exclusivity check, uniqueness check excluding the row, then
//!   `update<Entity>`
//! - `delete`: exclusivity check, then a soft delete (`publishedAt: null`)
//!
//! The checks are separate reads. A concurrent writer can still slip in between
//! the check and the write; the backend offers no conditional update to close
//! that gap.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use super::assembler::{
    CompileOptions, CompiledQuery, compile_create, compile_exclusivity_probe, compile_list,
    compile_single, compile_soft_delete, compile_uniqueness_probe, compile_update,
};
use super::binder::bind;
use crate::graphql::entities::EntityId;
use crate::graphql::errors::{MutationError, MutationResult};
use crate::graphql::filters::FilterSpec;
use crate::graphql::pagination::{ListResult, unwrap_collection};
use crate::graphql::schema::EntitySchema;
use crate::services::client::{ClientError, GraphqlRequest, GraphqlResponse, GraphqlTransport};

/// Row identity returned by a successful write
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub id: EntityId,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Stamp {
    #[serde(default)]
    updated_at: Option<String>,
}

/// Compare two `updatedAt` values: identical strings, or equal instants
pub fn same_timestamp(current: &str, expected: &str) -> bool {
    if current == expected {
        return true;
    }
    match (
        DateTime::parse_from_rfc3339(current),
        DateTime::parse_from_rfc3339(expected),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Data access for one collection within one organization
pub struct Repository<'a> {
    transport: &'a dyn GraphqlTransport,
    schema: &'static EntitySchema,
    options: CompileOptions,
    actor_id: Option<i64>,
}

impl<'a> Repository<'a> {
    pub fn new(
        transport: &'a dyn GraphqlTransport,
        schema: &'static EntitySchema,
        options: CompileOptions,
    ) -> Self {
        Self {
            transport,
            schema,
            options,
            actor_id: None,
        }
    }

    /// Record writes as made by this user
    pub fn with_actor(mut self, user_id: Option<i64>) -> Self {
        self.actor_id = user_id;
        self
    }

    /// Compile the list query for `spec` without executing it
    pub fn compile_list(&self, spec: &FilterSpec) -> CompiledQuery {
        compile_list(self.schema, spec, &self.options)
    }

    async fn execute(&self, compiled: &CompiledQuery) -> Result<GraphqlResponse, ClientError> {
        let params = bind(compiled, &self.options);
        tracing::debug!(
            entity = compiled.entity,
            operation = %compiled.operation_name,
            variables = %JsonValue::Object(params.clone()),
            "Executing GraphQL operation"
        );
        let request = GraphqlRequest::new(compiled, params);
        self.transport.execute(&request).await
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        compiled: &CompiledQuery,
    ) -> Result<ListResult<T>, ClientError> {
        let body = self.execute(compiled).await?.into_checked()?;
        unwrap_collection(&body, self.schema.plural)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// One page of rows matching `spec`
    pub async fn list<T: DeserializeOwned>(
        &self,
        spec: &FilterSpec,
    ) -> Result<ListResult<T>, ClientError> {
        let compiled = self.compile_list(spec);
        let result = self.fetch(&compiled).await?;
        tracing::debug!(
            entity = self.schema.plural,
            items = result.items.len(),
            total = result.total(),
            has_next_page = result.pagination.is_some_and(|p| p.has_next_page()),
            "List query completed"
        );
        Ok(result)
    }

    /// One live row by id
    pub async fn find<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>, ClientError> {
        let compiled = compile_single(self.schema, id, &self.options);
        let result = self.fetch(&compiled).await?;
        Ok(result.items.into_iter().next())
    }

    // ========================================================================
    // Pre-write checks
    // ========================================================================

    /// Fail with `EXCLUSIVE` unless the row still carries `last_updated_at`
    pub async fn check_exclusive(&self, id: &str, last_updated_at: &str) -> MutationResult<()> {
        let compiled = compile_exclusivity_probe(self.schema, id, &self.options);
        let current = self
            .fetch::<Stamp>(&compiled)
            .await?
            .items
            .into_iter()
            .next()
            .and_then(|stamp| stamp.updated_at);

        match current {
            Some(current) if same_timestamp(&current, last_updated_at) => {
                tracing::debug!(
                    entity = self.schema.plural,
                    id,
                    "Exclusivity check passed; the write that follows is not atomic with it"
                );
                Ok(())
            }
            current => {
                tracing::info!(
                    entity = self.schema.plural,
                    id,
                    expected = last_updated_at,
                    current = current.as_deref().unwrap_or("<missing>"),
                    "Exclusivity conflict"
                );
                Err(MutationError::Exclusive {
                    entity: self.schema.plural.to_string(),
                    id: id.to_string(),
                })
            }
        }
    }

    /// Fail with `EXISTED` if another live row shares a unique value in `data`
    pub async fn check_unique(
        &self,
        data: &Map<String, JsonValue>,
        exclude_id: Option<&str>,
    ) -> MutationResult<()> {
        for field in self.schema.unique_fields {
            let value = match data.get(*field) {
                Some(JsonValue::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
                Some(JsonValue::Number(n)) => n.to_string(),
                _ => continue,
            };
            let compiled =
                compile_uniqueness_probe(self.schema, field, &value, exclude_id, &self.options);
            let existing = self.fetch::<JsonValue>(&compiled).await?;
            if !existing.items.is_empty() {
                tracing::info!(entity = self.schema.plural, field, "Unique value already taken");
                return Err(MutationError::Existed {
                    entity: self.schema.plural.to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    fn now() -> JsonValue {
        JsonValue::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Decode `data.<mutation>.data`; a non-200 status or null payload is `UNKNOWN`
    fn mutation_outcome(
        &self,
        mutation: &str,
        response: GraphqlResponse,
    ) -> MutationResult<MutationOutcome> {
        let unknown = |reason: String| MutationError::Unknown {
            entity: self.schema.plural.to_string(),
            reason,
        };

        if response.status != reqwest::StatusCode::OK {
            return Err(unknown(format!("status {}", response.status)));
        }
        let errors = response.error_messages();
        if !errors.is_empty() {
            return Err(unknown(errors.join("; ")));
        }

        match response
            .body
            .get("data")
            .and_then(|data| data.get(mutation))
            .and_then(|payload| payload.get("data"))
        {
            None | Some(JsonValue::Null) => Err(unknown("empty mutation payload".to_string())),
            Some(row) => serde_json::from_value(row.clone()).map_err(|e| unknown(e.to_string())),
        }
    }

    async fn write(
        &self,
        compiled: CompiledQuery,
        mutation: &str,
    ) -> MutationResult<MutationOutcome> {
        let response = self.execute(&compiled).await?;
        let outcome = self.mutation_outcome(mutation, response)?;
        tracing::info!(
            entity = self.schema.plural,
            operation = %compiled.operation_name,
            id = %outcome.id,
            "Mutation applied"
        );
        Ok(outcome)
    }

    /// Create a row in the current organization
    pub async fn create(
        &self,
        mut data: Map<String, JsonValue>,
    ) -> MutationResult<MutationOutcome> {
        self.check_unique(&data, None).await?;

        data.insert(
            "organizationId".to_string(),
            JsonValue::from(self.options.organization_id),
        );
        data.insert("publishedAt".to_string(), Self::now());
        if let Some(actor) = self.actor_id {
            data.insert("createdById".to_string(), JsonValue::from(actor));
            data.insert("updatedById".to_string(), JsonValue::from(actor));
        }

        let compiled = compile_create(self.schema, data);
        self.write(compiled, &self.schema.create_mutation()).await
    }

    /// Update a row the caller last saw at `last_updated_at`
    pub async fn update(
        &self,
        id: &str,
        mut data: Map<String, JsonValue>,
        last_updated_at: &str,
    ) -> MutationResult<MutationOutcome> {
        self.check_exclusive(id, last_updated_at).await?;
        self.check_unique(&data, Some(id)).await?;

        if let Some(actor) = self.actor_id {
            data.insert("updatedById".to_string(), JsonValue::from(actor));
        }

        let compiled = compile_update(self.schema, id, data);
        self.write(compiled, &self.schema.update_mutation()).await
    }

    /// Soft-delete a row the caller last saw at `last_updated_at`
    pub async fn delete(&self, id: &str, last_updated_at: &str) -> MutationResult<MutationOutcome> {
        self.check_exclusive(id, last_updated_at).await?;

        let mut data = Map::new();
        if let Some(actor) = self.actor_id {
            data.insert("updatedById".to_string(), JsonValue::from(actor));
        }

        let compiled = compile_soft_delete(self.schema, id, data);
        self.write(compiled, &self.schema.update_mutation()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_timestamp() {
        assert!(same_timestamp("2024-03-01T10:00:00.000Z", "2024-03-01T10:00:00.000Z"));
        assert!(same_timestamp("2024-03-01T10:00:00.000Z", "2024-03-01T17:00:00+07:00"));
        assert!(!same_timestamp("2024-03-01T10:00:00.000Z", "2024-03-01T10:00:00.001Z"));
        assert!(!same_timestamp("yesterday", "today"));
    }
}
